//! Run execution and persistence service.

use std::path::{Path, PathBuf};
use std::time::Instant;

use cs_field::{
    CancelToken, FieldSolverSession, ProcessConsole, ReportQuery, SolverConsole, WellMixedConsole,
    WellMixedParams,
};
use cs_model::ModelSession;
use cs_project::{CadenceDef, CoSimConfig, FieldDef};
use cs_results::{ResultRecorder, RunManifest, RunStatus, RunStore, SeriesSpec, TimeseriesRecord};
use cs_sim::{
    CadencePolicy, CoSimulationDriver, DRIVER_VERSION, DriverOptions, DriverProgress, ExchangePlan,
    RunOutcome,
};
use tracing::{info, warn};

use crate::error::AppResult;
use crate::progress::{RunProgressEvent, RunStage};
use crate::project_service;
use crate::workspace::RunWorkspace;

/// Case and data file names of the end-of-run checkpoint.
pub const CHECKPOINT_CASE: &str = "test.cas";
pub const CHECKPOINT_DATA: &str = "test.dat";

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Directory holding per-run directories and the run store. Defaults to
    /// the directory of the configuration file.
    pub work_root: Option<PathBuf>,
    /// Use the offline surrogate even when a solver process is configured.
    pub force_surrogate: bool,
    /// Aborts the wait for the solver process to become ready. Embedders
    /// trigger it from their own interrupt handling; the CLI leaves it unset.
    pub cancel: CancelToken,
}

pub struct RunRequest<'a> {
    pub config_path: &'a Path,
    pub options: RunOptions,
}

#[derive(Debug, Clone)]
pub struct RunResponse {
    pub run_id: String,
    pub manifest: RunManifest,
    pub outcome: RunOutcome,
    /// Per-run working directory.
    pub run_dir: PathBuf,
}

fn emit_progress(
    progress_cb: &mut Option<&mut dyn FnMut(RunProgressEvent)>,
    stage: RunStage,
    started: Instant,
    message: Option<String>,
) {
    if let Some(cb) = progress_cb.as_deref_mut() {
        cb(RunProgressEvent::stage(
            stage,
            started.elapsed().as_secs_f64(),
            message,
        ));
    }
}

pub fn run(request: &RunRequest) -> AppResult<RunResponse> {
    run_with_progress(request, None)
}

/// Execute a co-simulation run and stream progress events.
///
/// A run whose exchange failed still returns `Ok`; its manifest carries
/// status `Aborted` and the failure string.
pub fn run_with_progress(
    request: &RunRequest,
    mut progress_cb: Option<&mut dyn FnMut(RunProgressEvent)>,
) -> AppResult<RunResponse> {
    let started = Instant::now();
    let config_path = request.config_path;

    emit_progress(
        &mut progress_cb,
        RunStage::LoadingConfig,
        started,
        Some(format!("Loading {}", config_path.display())),
    );
    let config = project_service::load_config(config_path)?;
    let work_root = work_root(config_path, &request.options);

    emit_progress(&mut progress_cb, RunStage::PreparingWorkspace, started, None);
    let workspace = RunWorkspace::create(&work_root, &config.rooms)?;
    let run_tag = new_run_tag();
    info!(
        name = %config.name,
        run_tag = %run_tag,
        dir = %workspace.root().display(),
        "run workspace ready"
    );

    emit_progress(&mut progress_cb, RunStage::LoadingModel, started, None);
    let model_path = CoSimConfig::resolve_path(config_path, &config.model);
    let model = ModelSession::load(&model_path)?;

    emit_progress(&mut progress_cb, RunStage::ConnectingSolver, started, None);
    let console = open_console(&config, &workspace, &request.options)?;
    let mut field = FieldSolverSession::new(console, config.pressure_mode, config.boundary_specs())
        .with_run_tag(run_tag.clone());

    if let Some(case) = &config.case {
        emit_progress(&mut progress_cb, RunStage::ReadingCase, started, None);
        field.read_case(&CoSimConfig::resolve_path(config_path, case))?;
    }

    let plan = exchange_plan(&config)?;
    let recorder = ResultRecorder::new(config.observables_or_default(&plan.map), series_specs(&config))
        .with_output_dir(workspace.results_dir());
    let mut driver = CoSimulationDriver::new(model, field, plan, recorder, driver_options(&config))?;

    let outcome = {
        let mut forward = |p: &DriverProgress| {
            if let Some(cb) = progress_cb.as_deref_mut() {
                cb(RunProgressEvent {
                    stage: RunStage::Simulating,
                    elapsed_wall_s: started.elapsed().as_secs_f64(),
                    message: None,
                    driver: Some(p.clone()),
                });
            }
        };
        driver.run_with_progress(Some(&mut forward))?
    };
    let (_model, mut field, recorder) = driver.into_parts();

    if outcome.is_finished()
        && let Some(room_dir) = config.active_room().and_then(|room| workspace.room_dir(room))
    {
        emit_progress(&mut progress_cb, RunStage::ExportingCheckpoint, started, None);
        let case = room_dir.join(CHECKPOINT_CASE);
        let data = room_dir.join(CHECKPOINT_DATA);
        if let Err(e) = field.export_case_and_data(&case, &data) {
            warn!(error = %e, "checkpoint export failed");
        }
    }

    emit_progress(&mut progress_cb, RunStage::SavingResults, started, None);
    let run_id = cs_results::compute_run_id(&config, DRIVER_VERSION);
    let manifest = RunManifest {
        run_id: run_id.clone(),
        name: config.name.clone(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        run_tag,
        status: if outcome.is_finished() {
            RunStatus::Finished
        } else {
            RunStatus::Aborted
        },
        failure: (!outcome.is_finished()).then(|| outcome.status.clone()),
        t_end_s: config.simulation.t_end,
        dt_s: config.simulation.dt,
        t_final_s: outcome.t_final,
        steps: outcome.steps,
        events: outcome.events,
        exchanges: outcome.exchanges,
        driver_version: DRIVER_VERSION.to_string(),
    };
    let store = RunStore::for_work_root(&work_root)?;
    store.save_run(&manifest, &recorder.timeseries_records())?;

    emit_progress(
        &mut progress_cb,
        RunStage::Completed,
        started,
        Some(outcome.status.clone()),
    );
    info!(run_id = %run_id, status = %outcome.status, "run saved");

    Ok(RunResponse {
        run_id,
        manifest,
        outcome,
        run_dir: workspace.root().to_path_buf(),
    })
}

fn work_root(config_path: &Path, options: &RunOptions) -> PathBuf {
    options.work_root.clone().unwrap_or_else(|| {
        config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    })
}

fn new_run_tag() -> String {
    let mut tag = uuid::Uuid::new_v4().simple().to_string();
    tag.truncate(8);
    tag
}

fn open_console(
    config: &CoSimConfig,
    workspace: &RunWorkspace,
    options: &RunOptions,
) -> AppResult<Box<dyn SolverConsole>> {
    let field_dir = workspace.field_dir();
    let console: Box<dyn SolverConsole> = match &config.field {
        FieldDef::Surrogate(params) => {
            Box::new(WellMixedConsole::new(params.clone(), field_dir))
        }
        FieldDef::Process(_) if options.force_surrogate => {
            Box::new(WellMixedConsole::new(surrogate_params(config), field_dir))
        }
        FieldDef::Process(def) => {
            Box::new(ProcessConsole::launch(&def.launch_spec(field_dir), &options.cancel)?)
        }
    };
    Ok(console)
}

/// Surrogate parameters whose zone matches the first volume report.
fn surrogate_params(config: &CoSimConfig) -> WellMixedParams {
    let zone = config.reports.iter().find_map(|r| match &r.query {
        ReportQuery::VolumeMassAverage { zone, .. } => Some(zone.clone()),
        _ => None,
    });
    let mut params = WellMixedParams::default();
    if let Some(zone) = zone {
        params.zone = zone;
    }
    params
}

fn exchange_plan(config: &CoSimConfig) -> AppResult<ExchangePlan> {
    Ok(ExchangePlan {
        map: config.exchange_map()?,
        reports: config
            .reports
            .iter()
            .map(|r| (r.name.clone(), r.query.clone()))
            .collect(),
    })
}

fn series_specs(config: &CoSimConfig) -> Vec<SeriesSpec> {
    config
        .reports
        .iter()
        .flat_map(|r| {
            r.csv.iter().map(|c| SeriesSpec {
                report: r.name.clone(),
                boundary: c.boundary.clone(),
                file: c.file.clone(),
                column: c.column.clone(),
            })
        })
        .collect()
}

fn driver_options(config: &CoSimConfig) -> DriverOptions {
    let sim = &config.simulation;
    let initial = config.initial_settings();
    DriverOptions {
        t_start: 0.0,
        t_end: sim.t_end,
        dt: sim.dt,
        solve_iterations: sim.solve_iterations,
        max_steps: sim.max_steps,
        max_event_iterations: sim.max_event_iterations,
        cadence: match config.cadence {
            CadenceDef::EventCount { every, increment } => {
                CadencePolicy::EventCount { every, increment }
            }
            CadenceDef::SimTime { every } => CadencePolicy::SimTime { every },
        },
        initial_names: initial.names(),
        initial_values: initial.values(),
    }
}

/// Stored runs under `work_root`, most recent first.
pub fn list_runs(work_root: &Path) -> AppResult<Vec<RunManifest>> {
    let store = RunStore::for_work_root(work_root)?;
    Ok(store.list_runs()?)
}

/// Load a stored run's manifest and sampled trajectory.
pub fn load_run(work_root: &Path, run_id: &str) -> AppResult<(RunManifest, Vec<TimeseriesRecord>)> {
    let store = RunStore::for_work_root(work_root)?;
    let manifest = store.load_manifest(run_id)?;
    let records = store.load_timeseries(run_id)?;
    Ok((manifest, records))
}
