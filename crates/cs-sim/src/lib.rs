//! cs-sim: co-simulation driver.
//!
//! Provides:
//! - `CoSimulationDriver`: explicit-Euler loop over a `ModelSession` with
//!   time, state and step event handling, exchanging boundary values with a
//!   `FieldSolverSession` at the configured cadence
//! - cadence policies (legacy event counting or simulated-time interval)
//! - progress snapshots for front ends

pub mod cadence;
pub mod driver;
pub mod error;
pub mod progress;

pub use cadence::{CadencePolicy, CommunicationCounter, required_events};
pub use driver::{CoSimulationDriver, DriverOptions, ExchangePlan, RunOutcome};
pub use error::{SimError, SimResult};
pub use progress::{DriverPhase, DriverProgress};

/// Version string recorded in run manifests and mixed into run ids.
pub const DRIVER_VERSION: &str = env!("CARGO_PKG_VERSION");
