//! cs-core: shared foundation for the co-simulation workspace.
//!
//! Contains:
//! - error (failure taxonomy shared by every crate, core error type)
//! - numeric (Real, event-time tolerance, float helpers)
//! - units (uom SI types + constructors)
//! - timing (wall-clock timers for run summaries)

pub mod error;
pub mod numeric;
pub mod timing;
pub mod units;

pub use error::{CoreError, CoreResult, FailureClass};
pub use numeric::*;
pub use timing::Timer;
pub use units::*;
