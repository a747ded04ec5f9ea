//! Bidirectional variable exchange between the lumped model and the field solver.
//!
//! A binding string such as `"supply.v inlet.v;supply.T inlet.T"` is split
//! first on `;`, then on whitespace, into ordered `(source, destination)`
//! pairs. One binding set exists per direction. Resolving a set reads every
//! source and collects the values under their destination names, later
//! bindings overwriting earlier ones that share a destination.

pub mod binding;
pub mod error;
pub mod map;
pub mod target;

pub use binding::{Binding, BindingSet, Direction};
pub use error::{ExchangeError, ExchangeResult};
pub use map::{ExchangePayload, FieldValue, VariableExchangeMap};
pub use target::{FieldTarget, Quantity};
