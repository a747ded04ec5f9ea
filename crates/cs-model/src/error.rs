//! Error types for model sessions.

use std::path::PathBuf;

use cs_core::{CoreError, FailureClass};
use thiserror::Error;

use crate::session::ModelMode;

/// Errors raised by a model session or a loaded model.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Failed to load model {path}: {message}")]
    Load { path: PathBuf, message: String },

    #[error("Malformed model definition: {what}")]
    Definition { what: String },

    #[error("Invalid configuration: {what}")]
    Config { what: String },

    #[error("Unknown variable: {name}")]
    UnknownVariable { name: String },

    #[error("Variable is not settable: {name}")]
    ReadOnly { name: String },

    #[error("Operation '{operation}' not allowed in {mode:?} mode")]
    InvalidTransition {
        operation: &'static str,
        mode: ModelMode,
    },

    #[error("Discrete states did not settle after {iterations} event iterations")]
    EventIterationLimit { iterations: usize },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type ModelResult<T> = Result<T, ModelError>;

impl ModelError {
    pub fn class(&self) -> FailureClass {
        match self {
            ModelError::Load { .. } | ModelError::Definition { .. } => FailureClass::Load,
            ModelError::Config { .. } | ModelError::InvalidArg { .. } => FailureClass::Config,
            ModelError::UnknownVariable { .. } | ModelError::ReadOnly { .. } => {
                FailureClass::UnknownVariable
            }
            ModelError::InvalidTransition { .. } | ModelError::EventIterationLimit { .. } => {
                FailureClass::Internal
            }
            ModelError::Core(e) => e.class(),
        }
    }
}
