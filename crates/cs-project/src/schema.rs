//! Configuration schema definitions.

use std::path::{Path, PathBuf};
use std::time::Duration;

use cs_exchange::{ExchangeResult, VariableExchangeMap};
use cs_field::{BoundaryKind, BoundarySpec, LaunchSpec, PressureMode, ReportQuery, WellMixedParams};
use serde::{Deserialize, Serialize};

use crate::initial::InitialSettings;

pub const LATEST_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CoSimConfig {
    pub version: u32,
    pub name: String,
    /// Lumped model definition; relative paths resolve against the config file.
    pub model: PathBuf,
    pub simulation: SimulationDef,
    pub cadence: CadenceDef,
    pub exchange: ExchangeDef,
    #[serde(default)]
    pub boundaries: Vec<BoundaryDef>,
    #[serde(default)]
    pub pressure_mode: PressureMode,
    #[serde(default = "default_reports")]
    pub reports: Vec<ReportDef>,
    #[serde(default)]
    pub initial: InitialDef,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub observables: Vec<String>,
    #[serde(default)]
    pub field: FieldDef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case: Option<PathBuf>,
    #[serde(default = "default_rooms")]
    pub rooms: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_room: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulationDef {
    pub t_end: f64,
    pub dt: f64,
    #[serde(default = "default_solve_iterations")]
    pub solve_iterations: usize,
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
    #[serde(default = "default_max_event_iterations")]
    pub max_event_iterations: usize,
}

fn default_solve_iterations() -> usize {
    100
}

fn default_max_steps() -> usize {
    10_000_000
}

fn default_max_event_iterations() -> usize {
    100
}

/// When an event triggers an exchange with the field solver.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CadenceDef {
    /// Count events; exchange once `every / increment` have accumulated.
    EventCount {
        every: f64,
        #[serde(default = "default_increment")]
        increment: f64,
    },
    /// Exchange every `every` seconds of simulated time.
    SimTime { every: f64 },
}

fn default_increment() -> f64 {
    0.001
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExchangeDef {
    #[serde(default)]
    pub model_to_field: String,
    #[serde(default)]
    pub field_to_model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BoundaryDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<BoundaryKind>,
    /// Fixed wall temperature (K) when no exchanged value drives it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

impl BoundaryDef {
    /// Declared kind, or the kind inferred from the name.
    pub fn resolved_kind(&self) -> Option<BoundaryKind> {
        self.kind.or_else(|| BoundaryKind::infer(&self.name))
    }

    pub fn to_spec(&self) -> Option<BoundarySpec> {
        let spec = BoundarySpec::new(self.name.clone(), self.resolved_kind()?);
        Some(match self.temperature {
            Some(t) => spec.with_temperature(t),
            None => spec,
        })
    }
}

/// A named field-side report, referenced as a source in `field_to_model`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportDef {
    pub name: String,
    #[serde(flatten)]
    pub query: ReportQuery,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub csv: Vec<CsvExportDef>,
}

/// One CSV file collecting a report value at every exchange.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CsvExportDef {
    pub file: String,
    pub column: String,
    /// Boundary to pick from a per-boundary report.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boundary: Option<String>,
}

fn csv(file: &str, column: &str, boundary: Option<&str>) -> CsvExportDef {
    CsvExportDef {
        file: file.to_string(),
        column: column.to_string(),
        boundary: boundary.map(str::to_string),
    }
}

/// Reports matching the room case the tool was first built around.
pub fn default_reports() -> Vec<ReportDef> {
    vec![
        ReportDef {
            name: "RoomT".to_string(),
            query: ReportQuery::VolumeMassAverage {
                zone: "cell-fuild".to_string(),
                quantity: "temperature".to_string(),
            },
            csv: vec![csv("TV_general.csv", "TValue", None)],
        },
        ReportDef {
            name: "outlet_massflow".to_string(),
            query: ReportQuery::SurfaceMassFlow {
                surface: "outlet*".to_string(),
            },
            csv: Vec::new(),
        },
        ReportDef {
            name: "inlet_pressureDifference".to_string(),
            query: ReportQuery::AreaWeightedAverage {
                surface: "inlet".to_string(),
                quantity: "pressure".to_string(),
            },
            csv: vec![csv("P_general.csv", "PValue", None)],
        },
        ReportDef {
            name: "fluxes".to_string(),
            query: ReportQuery::HeatTransfer {
                boundaries: ["inlet", "outlet", "wall-ceiling", "wall-floor", "wall-front"]
                    .into_iter()
                    .map(str::to_string)
                    .collect(),
            },
            csv: vec![
                csv("FluxesFloorV_general.csv", "FluxesFloorValue", Some("wall-floor")),
                csv("FluxesFrontV_general.csv", "FluxesFront", Some("wall-front")),
            ],
        },
    ]
}

/// Initial values applied before model initialization.
///
/// `names`/`values` are parallel lists; room, door and air-cleaner entries
/// expand into model variables through [`InitialSettings`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct InitialDef {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub names: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rooms: Vec<RoomInitDef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub doors: Vec<DoorDef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub air_cleaners: Vec<AirCleanerDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoomInitDef {
    pub room: String,
    /// Kelvin.
    pub temperature: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DoorDef {
    pub door: String,
    pub leakage: f64,
    pub discharge_coefficient: f64,
    pub flow_exponent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AirCleanerDef {
    pub cleaner: String,
    pub a: f64,
    pub b: f64,
}

impl InitialDef {
    /// Expand into settings. Explicit `names`/`values` are applied last.
    pub fn settings(&self) -> InitialSettings {
        let mut settings = InitialSettings::new();
        for r in &self.rooms {
            settings.room_temperature(&r.room, r.temperature);
        }
        for d in &self.doors {
            settings.door(&d.door, d.leakage, d.discharge_coefficient, d.flow_exponent);
        }
        for c in &self.air_cleaners {
            settings.air_cleaner(&c.cleaner, c.a, c.b);
        }
        for (name, value) in self.names.iter().zip(&self.values) {
            settings.set(name, *value);
        }
        settings
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldDef {
    /// Offline well-mixed room.
    Surrogate(WellMixedParams),
    /// External solver process.
    Process(ProcessDef),
}

impl Default for FieldDef {
    fn default() -> Self {
        FieldDef::Surrogate(WellMixedParams::default())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcessDef {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default = "default_ready_marker")]
    pub ready_marker: PathBuf,
    #[serde(default = "default_ready_token")]
    pub ready_token: String,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub startup_timeout_s: Option<f64>,
    #[serde(default = "default_command_timeout_s")]
    pub command_timeout_s: f64,
    #[serde(default = "default_prompt")]
    pub prompt: String,
}

fn default_ready_marker() -> PathBuf {
    PathBuf::from("aaS_FluentId.txt")
}

fn default_ready_token() -> String {
    "IOR:".to_string()
}

fn default_poll_interval_ms() -> u64 {
    200
}

fn default_command_timeout_s() -> f64 {
    600.0
}

fn default_prompt() -> String {
    ">".to_string()
}

impl ProcessDef {
    pub fn launch_spec(&self, working_dir: &Path) -> LaunchSpec {
        LaunchSpec {
            program: self.program.clone(),
            args: self.args.clone(),
            working_dir: working_dir.to_path_buf(),
            ready_marker: self.ready_marker.clone(),
            ready_token: self.ready_token.clone(),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            startup_timeout: self.startup_timeout_s.map(Duration::from_secs_f64),
            command_timeout: Duration::from_secs_f64(self.command_timeout_s),
            prompt: self.prompt.clone(),
        }
    }
}

fn default_rooms() -> Vec<String> {
    vec!["room1".to_string(), "room2".to_string()]
}

impl CoSimConfig {
    pub fn exchange_map(&self) -> ExchangeResult<VariableExchangeMap> {
        VariableExchangeMap::configure(&self.exchange.model_to_field, &self.exchange.field_to_model)
    }

    /// Boundaries whose kind could be resolved.
    pub fn boundary_specs(&self) -> Vec<BoundarySpec> {
        self.boundaries.iter().filter_map(BoundaryDef::to_spec).collect()
    }

    pub fn report(&self, name: &str) -> Option<&ReportDef> {
        self.reports.iter().find(|r| r.name == name)
    }

    pub fn initial_settings(&self) -> InitialSettings {
        self.initial.settings()
    }

    /// Room receiving the end-of-run snapshot.
    pub fn active_room(&self) -> Option<&str> {
        self.active_room
            .as_deref()
            .or_else(|| self.rooms.first().map(String::as_str))
    }

    /// Configured observables, or the first model→field source and the first
    /// field→model destination.
    pub fn observables_or_default(&self, map: &VariableExchangeMap) -> Vec<String> {
        if !self.observables.is_empty() {
            return self.observables.clone();
        }
        let mut names = Vec::new();
        if let Some(b) = map.model_to_field().first() {
            names.push(b.source.clone());
        }
        if let Some(b) = map.field_to_model().first() {
            let fanned = self.report(&b.source).and_then(|r| match &r.query {
                ReportQuery::HeatTransfer { boundaries } => boundaries.first(),
                _ => None,
            });
            names.push(match fanned {
                Some(boundary) => format!("{}{}", b.destination, boundary),
                None => b.destination.clone(),
            });
        }
        names
    }

    /// Resolve `path` against the directory holding the config file.
    pub fn resolve_path(config_path: &Path, path: &Path) -> PathBuf {
        if path.is_absolute() {
            return path.to_path_buf();
        }
        config_path
            .parent()
            .map(|dir| dir.join(path))
            .unwrap_or_else(|| path.to_path_buf())
    }
}
