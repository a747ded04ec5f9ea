//! Field-solver session for co-simulation.
//!
//! Provides:
//! - `SolverConsole`: line-oriented command channel to a field solver
//! - `ProcessConsole`: external solver process with readiness wait and timeouts
//! - `FieldSolverSession`: boundary commands, report queries, case preparation, checkpoints
//! - `WellMixedConsole`: offline single-zone surrogate speaking the same command subset

pub mod boundary;
pub mod console;
pub mod error;
pub mod report;
pub mod session;
pub mod well_mixed;

pub use boundary::{BoundaryKind, BoundarySpec, BoundaryStatus, BoundaryValues, PressureMode};
pub use console::{CancelToken, LaunchSpec, ProcessConsole, SolverConsole, wait_for_ready_marker};
pub use error::{FieldError, FieldResult};
pub use report::{ReportQuery, value_after};
pub use session::FieldSolverSession;
pub use well_mixed::{WellMixedConsole, WellMixedParams};
