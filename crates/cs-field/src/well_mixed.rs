//! Offline single-zone surrogate for the field solver.
//!
//! The room is one well-mixed air volume. Every solver iteration relaxes its
//! temperature toward the steady balance between supply air and the walls.
//! Reports are written in the same flat `<name> <value>` layout the real
//! solver uses, so the session parses them unchanged.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use cs_core::units::constants::{CP_AIR_J_KG_K, RHO_AIR_KG_M3};
use cs_core::{dynamic_pressure, kgpm3, m2, mps, volumetric_mass_flow};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uom::si::mass_rate::kilogram_per_second;
use uom::si::pressure::pascal;

use crate::boundary::BoundaryKind;
use crate::console::SolverConsole;
use crate::error::{FieldError, FieldResult};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WellMixedParams {
    /// Cell zone name reported by volume integrals.
    pub zone: String,
    pub inlet_area_m2: f64,
    /// Convective conductance `h·A` of each wall (W/K).
    pub wall_conductance_w_k: f64,
    pub initial_temperature_k: f64,
    /// Fraction of the remaining imbalance removed per iteration.
    pub relaxation: f64,
}

impl Default for WellMixedParams {
    fn default() -> Self {
        Self {
            zone: "fluid".to_string(),
            inlet_area_m2: 0.04,
            wall_conductance_w_k: 15.0,
            initial_temperature_k: 293.15,
            relaxation: 0.05,
        }
    }
}

#[derive(Clone, Debug)]
struct Face {
    name: String,
    kind: BoundaryKind,
    velocity: Option<f64>,
    temperature: Option<f64>,
    mass_flow: Option<f64>,
}

pub struct WellMixedConsole {
    params: WellMixedParams,
    working_dir: PathBuf,
    faces: Vec<Face>,
    room_temperature: Option<f64>,
    case: Option<PathBuf>,
    iterations: usize,
}

impl WellMixedConsole {
    pub fn new(params: WellMixedParams, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            params,
            working_dir: working_dir.into(),
            faces: Vec::new(),
            room_temperature: None,
            case: None,
            iterations: 0,
        }
    }

    /// Current room temperature, once fields are initialized.
    pub fn room_temperature(&self) -> Option<f64> {
        self.room_temperature
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    fn face_mut(&mut self, name: &str, kind: BoundaryKind) -> &mut Face {
        let idx = match self.faces.iter().position(|f| f.name == name) {
            Some(idx) => idx,
            None => {
                self.faces.push(Face {
                    name: name.to_string(),
                    kind,
                    velocity: None,
                    temperature: None,
                    mass_flow: None,
                });
                self.faces.len() - 1
            }
        };
        let face = &mut self.faces[idx];
        face.kind = kind;
        face
    }

    /// Supply mass flow (kg/s): fixed outlet flow when set, else inlet velocity.
    fn supply_mass_flow(&self) -> f64 {
        let fixed: Vec<f64> = self
            .faces
            .iter()
            .filter(|f| f.kind == BoundaryKind::Outlet)
            .filter_map(|f| f.mass_flow)
            .collect();
        if !fixed.is_empty() {
            return fixed.iter().sum();
        }
        self.faces
            .iter()
            .filter(|f| f.kind == BoundaryKind::Inlet)
            .filter_map(|f| f.velocity)
            .map(|v| {
                volumetric_mass_flow(kgpm3(RHO_AIR_KG_M3), mps(v), m2(self.params.inlet_area_m2))
                    .get::<kilogram_per_second>()
            })
            .sum()
    }

    fn supply_temperature(&self) -> Option<f64> {
        self.faces
            .iter()
            .filter(|f| f.kind == BoundaryKind::Inlet)
            .find_map(|f| f.temperature)
    }

    fn inlet_velocity(&self) -> f64 {
        let area = self.params.inlet_area_m2;
        if area <= 0.0 {
            return 0.0;
        }
        self.supply_mass_flow() / (RHO_AIR_KG_M3 * area)
    }

    fn relax(&mut self, iterations: usize) {
        let Some(mut t_room) = self.room_temperature else {
            return;
        };
        let m_cp = self.supply_mass_flow() * CP_AIR_J_KG_K;
        let mut num = 0.0;
        let mut den = 0.0;
        if let Some(t_in) = self.supply_temperature() {
            num += m_cp * t_in;
            den += m_cp;
        }
        let ha = self.params.wall_conductance_w_k;
        for wall in self.faces.iter().filter(|f| f.kind == BoundaryKind::Wall) {
            if let Some(tw) = wall.temperature {
                num += ha * tw;
                den += ha;
            }
        }
        if den > 0.0 {
            let target = num / den;
            for _ in 0..iterations {
                t_room += self.params.relaxation * (target - t_room);
            }
        }
        self.room_temperature = Some(t_room);
        self.iterations += iterations;
    }

    /// Heat flow into the room through a face (W).
    fn heat_flow(&self, face: &Face, t_room: f64) -> f64 {
        match face.kind {
            BoundaryKind::Inlet => face
                .temperature
                .map_or(0.0, |t_in| self.supply_mass_flow() * CP_AIR_J_KG_K * (t_in - t_room)),
            BoundaryKind::Outlet => 0.0,
            BoundaryKind::Wall => face
                .temperature
                .map_or(0.0, |tw| self.params.wall_conductance_w_k * (tw - t_room)),
        }
    }

    fn write_report(&self, file: &str, body: &str) -> FieldResult<()> {
        let path = self.working_dir.join(file);
        std::fs::write(&path, body).map_err(FieldError::io(&path))
    }

    fn room(&self, command: &str) -> FieldResult<f64> {
        self.room_temperature.ok_or_else(|| reject(command, "solution not initialized"))
    }

    fn report(&mut self, command: &str, tokens: &[&str]) -> FieldResult<String> {
        let file = tokens.last().copied().unwrap_or_default();
        let mut body = String::new();
        match tokens.first().copied().unwrap_or_default() {
            "/report/volume-integrals/mass-avg" => {
                let t_room = self.room(command)?;
                let _ = writeln!(body, "                    Mass-Weighted Average");
                let _ = writeln!(body, "                  Static Temperature                (k)");
                let _ = writeln!(body, "-------------------------------- --------------------");
                if tokens.get(1).copied() == Some(self.params.zone.as_str()) {
                    let _ = writeln!(body, "{:>32} {:>20.6}", self.params.zone, t_room);
                }
            }
            "/report/fluxes/mass-flow" => {
                self.room(command)?;
                let pattern = tokens.get(2).copied().unwrap_or_default();
                let prefix = pattern.trim_end_matches('*');
                let wildcard = pattern.ends_with('*');
                let outlets: Vec<&Face> = self
                    .faces
                    .iter()
                    .filter(|f| f.kind == BoundaryKind::Outlet)
                    .filter(|f| if wildcard { f.name.starts_with(prefix) } else { f.name == prefix })
                    .collect();
                let total = -self.supply_mass_flow();
                let _ = writeln!(body, "                         Mass Flow Rate                (kg/s)");
                let _ = writeln!(body, "-------------------------------- --------------------");
                let share = if outlets.is_empty() { 0.0 } else { total / outlets.len() as f64 };
                for face in &outlets {
                    let _ = writeln!(body, "{:>32} {:>20.8}", face.name, share);
                }
                let _ = writeln!(body, "{:>32} {:>20.8}", "Net", share * outlets.len() as f64);
            }
            "/report/surface-integrals/area-weighted-avg" => {
                self.room(command)?;
                let surface = tokens.get(1).copied().unwrap_or_default();
                let known = self.faces.iter().any(|f| f.name == surface);
                let q = dynamic_pressure(kgpm3(RHO_AIR_KG_M3), mps(self.inlet_velocity()))
                    .get::<pascal>();
                // drawing air through a free vent leaves the room below ambient
                let p = if self.faces.iter().any(|f| f.kind == BoundaryKind::Outlet && f.mass_flow.is_some()) {
                    -q
                } else {
                    q
                };
                let _ = writeln!(body, "                    Area-Weighted Average");
                let _ = writeln!(body, "                    Static Pressure                (pascal)");
                let _ = writeln!(body, "-------------------------------- --------------------");
                if known {
                    let _ = writeln!(body, "{:>32} {:>20.6}", surface, p);
                }
            }
            "/report/fluxes/heat-transfer" => {
                let t_room = self.room(command)?;
                let _ = writeln!(body, "                  Total Heat Transfer Rate                  (w)");
                let _ = writeln!(body, "-------------------------------- --------------------");
                let mut net = 0.0;
                for face in &self.faces {
                    let q = self.heat_flow(face, t_room);
                    net += q;
                    let _ = writeln!(body, "{:>32} {:>20.6}", face.name, q);
                }
                let _ = writeln!(body, "                ---------------- --------------------");
                let _ = writeln!(body, "{:>32} {:>20.6}", "Net", net);
            }
            _ => return Err(reject(command, "unrecognized report")),
        }
        self.write_report(file, &body)?;
        Ok(String::new())
    }

    fn define_boundary(&mut self, command: &str, tokens: &[&str]) -> FieldResult<String> {
        let name = tokens
            .get(1)
            .copied()
            .ok_or_else(|| reject(command, "missing boundary name"))?;
        let number = |idx: usize| -> FieldResult<f64> {
            tokens
                .get(idx)
                .and_then(|t| t.parse::<f64>().ok())
                .ok_or_else(|| reject(command, "malformed boundary arguments"))
        };
        match tokens[0] {
            "/define/boundary/velocity-inlet" => {
                let (v, t) = (number(7)?, number(11)?);
                let face = self.face_mut(name, BoundaryKind::Inlet);
                face.velocity = Some(v);
                face.temperature = Some(t);
            }
            "/define/boundary/inlet-vent" => {
                let t = number(8)?;
                let face = self.face_mut(name, BoundaryKind::Inlet);
                face.velocity = None;
                face.temperature = Some(t);
            }
            "/define/boundary/mass-flow-outlet" => {
                let m = number(5)?;
                self.face_mut(name, BoundaryKind::Outlet).mass_flow = Some(m);
            }
            "/define/boundary/zone-type" => {
                self.face_mut(name, BoundaryKind::Outlet).mass_flow = None;
            }
            "/define/boundary/wall" => {
                let t = number(9)?;
                self.face_mut(name, BoundaryKind::Wall).temperature = Some(t);
            }
            _ => return Err(reject(command, "unrecognized boundary type")),
        }
        Ok(String::new())
    }
}

fn reject(command: &str, message: &str) -> FieldError {
    FieldError::Rejected {
        command: command.to_string(),
        reply: format!("Error: {message}"),
    }
}

impl SolverConsole for WellMixedConsole {
    fn execute(&mut self, command: &str) -> FieldResult<String> {
        debug!(command, "surrogate command");
        let tokens: Vec<&str> = command.split_whitespace().collect();
        let Some(&head) = tokens.first() else {
            return Ok(String::new());
        };
        match head {
            "/file/read-case" => {
                let path = PathBuf::from(command[head.len()..].trim().trim_matches('"'));
                if !path.exists() {
                    return Err(reject(command, "case file not found"));
                }
                self.case = Some(path);
                self.faces.clear();
                self.room_temperature = None;
                Ok(String::new())
            }
            "/define/model" | "/define/operating-conditions" | "/file/confirm-overwrite" => {
                Ok(String::new())
            }
            "/mesh/check" => Ok(format!(
                "Domain extents: well-mixed zone '{}'\n Volume statistics: 1 cell\nDone.\n",
                self.params.zone
            )),
            "/solve/initialize/compute-defaults/all-zones" => {
                self.room_temperature = Some(self.params.initial_temperature_k);
                self.iterations = 0;
                Ok(String::new())
            }
            "/solve/iterate" => {
                self.room(command)?;
                let n = tokens
                    .get(1)
                    .and_then(|t| t.parse::<usize>().ok())
                    .ok_or_else(|| reject(command, "iteration count expected"))?;
                self.relax(n);
                Ok(format!("  iter  temperature\n{:>6} {:>12.6}\n", self.iterations, self.room_temperature.unwrap_or_default()))
            }
            "/file/write-case-data" => {
                let stem = tokens
                    .get(1)
                    .copied()
                    .ok_or_else(|| reject(command, "file name expected"))?;
                let mut case = String::new();
                let _ = writeln!(case, "zone {}", self.params.zone);
                if let Some(src) = &self.case {
                    let _ = writeln!(case, "source {}", src.display());
                }
                for face in &self.faces {
                    let _ = writeln!(case, "boundary {} {}", face.name, face.kind);
                }
                self.write_report(&format!("{stem}.cas"), &case)?;
                let data = format!("temperature {}\n", self.room_temperature.unwrap_or(self.params.initial_temperature_k));
                self.write_report(&format!("{stem}.dat"), &data)?;
                Ok(String::new())
            }
            h if h.starts_with("/define/boundary/") => self.define_boundary(command, &tokens),
            h if h.starts_with("/report/") => self.report(command, &tokens),
            _ => Err(reject(command, "unrecognized command")),
        }
    }

    fn working_dir(&self) -> &Path {
        &self.working_dir
    }
}
