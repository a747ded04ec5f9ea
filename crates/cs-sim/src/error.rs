//! Error types for the co-simulation driver.

use cs_core::FailureClass;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Invalid driver configuration: {what}")]
    Config { what: String },

    #[error("Step limit of {steps} reached at t = {t}")]
    StepLimit { steps: usize, t: f64 },

    #[error("Non-positive step at t = {t} (next event at {t_next})")]
    ZeroStep { t: f64, t_next: f64 },

    #[error(transparent)]
    Model(#[from] cs_model::ModelError),

    #[error(transparent)]
    Field(#[from] cs_field::FieldError),

    #[error(transparent)]
    Results(#[from] cs_results::ResultsError),

    #[error(transparent)]
    Core(#[from] cs_core::CoreError),
}

pub type SimResult<T> = Result<T, SimError>;

impl SimError {
    pub fn class(&self) -> FailureClass {
        match self {
            SimError::InvalidArg { .. } | SimError::Config { .. } => FailureClass::Config,
            SimError::StepLimit { .. } | SimError::ZeroStep { .. } => FailureClass::Internal,
            SimError::Model(e) => e.class(),
            SimError::Field(e) => e.class(),
            SimError::Results(e) => e.class(),
            SimError::Core(e) => e.class(),
        }
    }
}
