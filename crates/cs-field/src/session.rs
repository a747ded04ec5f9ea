//! Field solver session: boundary setting, solving and report extraction.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use cs_core::units::constants;
use cs_exchange::{ExchangePayload, FieldTarget, FieldValue};
use tracing::{debug, info, warn};

use crate::boundary::{BoundarySpec, BoundaryStatus, BoundaryValues, PressureMode};
use crate::console::SolverConsole;
use crate::error::{FieldError, FieldResult};
use crate::report::{ReportQuery, value_after};

const MESH_CHECK_FILE: &str = "meshcheck.txt";
const SNAPSHOT_STEM: &str = "checkpoint";

/// One connection to the field solver plus the boundaries it drives.
pub struct FieldSolverSession<C> {
    console: C,
    mode: PressureMode,
    boundaries: Vec<BoundarySpec>,
    run_tag: String,
    initialized: bool,
    solves: usize,
    status: String,
}

impl<C: SolverConsole> FieldSolverSession<C> {
    pub fn new(console: C, mode: PressureMode, boundaries: Vec<BoundarySpec>) -> Self {
        Self {
            console,
            mode,
            boundaries,
            run_tag: "run".to_string(),
            initialized: false,
            solves: 0,
            status: String::new(),
        }
    }

    /// Tag embedded in report file names.
    pub fn with_run_tag(mut self, tag: impl Into<String>) -> Self {
        self.run_tag = tag.into();
        self
    }

    pub fn console(&self) -> &C {
        &self.console
    }

    pub fn console_mut(&mut self) -> &mut C {
        &mut self.console
    }

    pub fn mode(&self) -> PressureMode {
        self.mode
    }

    pub fn boundaries(&self) -> &[BoundarySpec] {
        &self.boundaries
    }

    pub fn boundary(&self, name: &str) -> Option<&BoundarySpec> {
        self.boundaries.iter().find(|b| b.name == name)
    }

    /// Status of the last boundary command (`Set Down` / `Set Error: ...`).
    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn solve_count(&self) -> usize {
        self.solves
    }

    pub fn working_dir(&self) -> &Path {
        self.console.working_dir()
    }

    /// Read a case file and prepare the physics used for room airflow.
    ///
    /// The mesh check output is written to `meshcheck.txt`; its path is returned.
    pub fn read_case(&mut self, case: &Path) -> FieldResult<PathBuf> {
        info!(case = %case.display(), "reading field case");
        self.console
            .execute(&format!("/file/read-case \"{}\"", case.display()))?;
        self.console.execute("/define/model viscous ke-rng yes")?;
        self.console.execute("/define/model energy yes no no no no")?;
        self.console.execute(&format!(
            "/define/operating-conditions gravity yes 0 {}",
            constants::G0_MPS2
        ))?;
        let check = self.console.execute("/mesh/check")?;
        let path = self.working_dir().join(MESH_CHECK_FILE);
        std::fs::write(&path, check).map_err(FieldError::io(&path))?;
        self.initialized = false;
        Ok(path)
    }

    /// Apply one boundary condition.
    ///
    /// Failures are captured in the returned status rather than propagated.
    pub fn set_boundary(&mut self, spec: &BoundarySpec, values: &BoundaryValues) -> BoundaryStatus {
        let result = spec
            .command(self.mode, values)
            .and_then(|cmd| self.console.execute(&cmd).map(drop));
        let status = match result {
            Ok(()) => {
                debug!(boundary = %spec.name, kind = %spec.kind, "boundary set");
                BoundaryStatus::Set
            }
            Err(e) => {
                warn!(boundary = %spec.name, error = %e, "boundary rejected");
                BoundaryStatus::Failed(e)
            }
        };
        self.status = status.to_string();
        status
    }

    /// Route an exchange payload of `<boundary>.<quantity>` entries to every
    /// declared boundary. The first failed boundary is returned as an error.
    pub fn apply_boundaries(&mut self, payload: &ExchangePayload) -> FieldResult<()> {
        let mut values: HashMap<String, BoundaryValues> = HashMap::new();
        for (name, value) in payload.iter() {
            let target = FieldTarget::parse(name).map_err(|_| FieldError::UnknownBoundary {
                name: name.to_string(),
            })?;
            if self.boundary(&target.boundary).is_none() {
                return Err(FieldError::UnknownBoundary {
                    name: target.boundary,
                });
            }
            values
                .entry(target.boundary)
                .or_default()
                .set(target.quantity, value);
        }
        for spec in self.boundaries.clone() {
            let v = values.get(&spec.name).copied().unwrap_or_default();
            if let BoundaryStatus::Failed(e) = self.set_boundary(&spec, &v) {
                return Err(e);
            }
        }
        Ok(())
    }

    /// Compute default field values in all zones.
    pub fn initialize_fields(&mut self) -> FieldResult<()> {
        self.console
            .execute("/solve/initialize/compute-defaults/all-zones")?;
        self.initialized = true;
        info!("field initialized");
        Ok(())
    }

    /// Run a fixed number of solver iterations. Convergence is not checked.
    pub fn solve(&mut self, iterations: usize) -> FieldResult<()> {
        if iterations == 0 {
            return Err(FieldError::Config {
                what: "solve iterations must be positive".to_string(),
            });
        }
        if !self.initialized {
            return Err(FieldError::Rejected {
                command: "solve".to_string(),
                reply: "fields are not initialized".to_string(),
            });
        }
        self.console.execute(&format!("/solve/iterate {iterations}"))?;
        self.solves += 1;
        debug!(iterations, solves = self.solves, "field solved");
        Ok(())
    }

    fn report_text(&mut self, report: &ReportQuery) -> FieldResult<String> {
        let tag = format!("{}_{}", self.run_tag, self.solves);
        let file_name = report.file_name(&tag);
        let path = self.working_dir().join(&file_name);
        match std::fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(FieldError::io(&path)(e)),
        }
        self.console.execute(&report.command(&file_name))?;
        std::fs::read_to_string(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                FieldError::ReportMissing { path: path.clone() }
            } else {
                FieldError::io(&path)(e)
            }
        })
    }

    /// Issue a report and parse every value it defines.
    pub fn query(&mut self, report: &ReportQuery) -> FieldResult<FieldValue> {
        let text = self.report_text(report)?;
        report.parse(&text)
    }

    /// Issue a report and read the value following `key`.
    pub fn query_scalar(&mut self, report: &ReportQuery, key: &str) -> FieldResult<f64> {
        let text = self.report_text(report)?;
        value_after(&text, key).map_err(|detail| FieldError::ReportParse {
            report: report.kind().to_string(),
            detail,
        })
    }

    /// Write a case+data snapshot and move it to the given paths.
    pub fn export_case_and_data(&mut self, target_case: &Path, target_data: &Path) -> FieldResult<()> {
        self.console.execute("/file/confirm-overwrite no")?;
        self.console
            .execute(&format!("/file/write-case-data {SNAPSHOT_STEM}"))?;
        let dir = self.working_dir().to_path_buf();
        move_file(&dir.join(format!("{SNAPSHOT_STEM}.cas")), target_case)?;
        move_file(&dir.join(format!("{SNAPSHOT_STEM}.dat")), target_data)?;
        info!(case = %target_case.display(), data = %target_data.display(), "snapshot exported");
        Ok(())
    }
}

fn move_file(from: &Path, to: &Path) -> FieldResult<()> {
    if let Some(parent) = to.parent() {
        std::fs::create_dir_all(parent).map_err(FieldError::io(parent))?;
    }
    if std::fs::rename(from, to).is_ok() {
        return Ok(());
    }
    std::fs::copy(from, to).map_err(FieldError::io(from))?;
    std::fs::remove_file(from).map_err(FieldError::io(from))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::BoundaryKind;

    /// Records commands and writes canned report files.
    struct ScriptedConsole {
        dir: PathBuf,
        commands: Vec<String>,
        report_body: String,
        reject_prefix: Option<&'static str>,
    }

    impl ScriptedConsole {
        fn new(name: &str) -> Self {
            let dir = std::env::temp_dir().join(format!("cs_field_session_{}_{name}", std::process::id()));
            std::fs::create_dir_all(&dir).unwrap();
            Self {
                dir,
                commands: Vec::new(),
                report_body: String::new(),
                reject_prefix: None,
            }
        }
    }

    impl SolverConsole for ScriptedConsole {
        fn execute(&mut self, command: &str) -> FieldResult<String> {
            self.commands.push(command.to_string());
            if let Some(prefix) = self.reject_prefix
                && command.starts_with(prefix)
            {
                return Err(FieldError::Rejected {
                    command: command.to_string(),
                    reply: "Error: invalid zone".to_string(),
                });
            }
            if command.starts_with("/report/") {
                let file = command.split_whitespace().last().unwrap();
                std::fs::write(self.dir.join(file), &self.report_body).unwrap();
            }
            Ok(String::new())
        }

        fn working_dir(&self) -> &Path {
            &self.dir
        }
    }

    fn session(name: &str) -> FieldSolverSession<ScriptedConsole> {
        FieldSolverSession::new(
            ScriptedConsole::new(name),
            PressureMode::Normal,
            vec![
                BoundarySpec::new("inlet", BoundaryKind::Inlet),
                BoundarySpec::new("outlet", BoundaryKind::Outlet),
                BoundarySpec::new("wall-floor", BoundaryKind::Wall).with_temperature(291.0),
            ],
        )
        .with_run_tag("t1")
    }

    #[test]
    fn payload_routes_to_each_boundary() {
        let mut s = session("route");
        let mut payload = ExchangePayload::new();
        payload.insert("inlet.v", 0.3);
        payload.insert("inlet.T", 295.0);
        s.apply_boundaries(&payload).unwrap();
        let cmds = &s.console().commands;
        assert_eq!(cmds.len(), 3);
        assert!(cmds[0].starts_with("/define/boundary/velocity-inlet inlet no no yes yes no 0.3"));
        assert_eq!(cmds[1], "/define/boundary/zone-type outlet outflow");
        assert!(cmds[2].ends_with("temperature no 291"));
        assert_eq!(s.status(), "Set Down");
    }

    #[test]
    fn unknown_boundary_in_payload() {
        let mut s = session("unknown");
        let mut payload = ExchangePayload::new();
        payload.insert("door.T", 290.0);
        let err = s.apply_boundaries(&payload).unwrap_err();
        assert_eq!(err.class(), cs_core::FailureClass::UnknownVariable);
    }

    #[test]
    fn rejected_boundary_becomes_status() {
        let mut s = session("reject");
        s.console_mut().reject_prefix = Some("/define/boundary/wall");
        let spec = s.boundary("wall-floor").cloned().unwrap();
        let status = s.set_boundary(&spec, &BoundaryValues::default());
        assert!(!status.is_set());
        assert!(s.status().starts_with("Set Error"));
    }

    #[test]
    fn solve_requires_initialization() {
        let mut s = session("solve");
        assert!(s.solve(100).is_err());
        s.initialize_fields().unwrap();
        s.solve(100).unwrap();
        assert_eq!(s.solve_count(), 1);
        assert_eq!(s.console().commands.last().unwrap(), "/solve/iterate 100");
        assert!(matches!(s.solve(0), Err(FieldError::Config { .. })));
    }

    #[test]
    fn report_file_is_tagged_and_parsed() {
        let mut s = session("report");
        s.console_mut().report_body = "Mass-Weighted Average\n fluid 297.5\n".to_string();
        let q = ReportQuery::VolumeMassAverage {
            zone: "fluid".into(),
            quantity: "temperature".into(),
        };
        assert_eq!(s.query(&q).unwrap(), FieldValue::Scalar(297.5));
        assert!(s.console().commands[0].ends_with("simuT_t1_0.txt"));
        assert_eq!(s.query_scalar(&q, "fluid").unwrap(), 297.5);
        let err = s.query_scalar(&q, "room2").unwrap_err();
        assert!(matches!(err, FieldError::ReportParse { .. }));
    }
}
