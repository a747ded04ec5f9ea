//! Shared application service layer for the co-simulation tools.
//!
//! Wires a configuration file into model and field sessions, runs the
//! driver inside a fresh per-run working directory and persists the result.

pub mod error;
pub mod progress;
pub mod project_service;
pub mod query;
pub mod run_service;
pub mod workspace;

pub use error::{AppError, AppResult};
pub use progress::{RunProgressEvent, RunStage};
pub use project_service::{BindingRow, BindingSummary, describe_bindings, load_config};
pub use query::{RunSummary, extract_series, get_run_summary, list_variables};
pub use run_service::{RunOptions, RunRequest, RunResponse, list_runs, load_run, run, run_with_progress};
pub use workspace::RunWorkspace;
