//! Lumped-parameter model sessions for co-simulation.
//!
//! Provides:
//! - `ModelExchange`: the interface a loaded model artifact implements
//! - `ModelSession`: mode state machine, explicit Euler advance, scoped initialization
//! - `LumpedModel`: declarative lumped thermal network loaded from YAML or JSON

pub mod definition;
pub mod error;
pub mod exchange;
pub mod integrator;
pub mod lumped;
pub mod session;

pub use definition::ModelDefinition;
pub use error::{ModelError, ModelResult};
pub use exchange::{EventInfo, ModelExchange};
pub use integrator::ForwardEuler;
pub use lumped::LumpedModel;
pub use session::{InitializationScope, ModelMode, ModelSession};
