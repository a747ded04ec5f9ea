//! cs-results: run recording, CSV/plot export and the run store.

pub mod csv;
pub mod hash;
pub mod plot;
pub mod recorder;
pub mod store;
pub mod types;

pub use hash::compute_run_id;
pub use recorder::{ExchangeRecord, ResultRecorder, SeriesSpec};
pub use store::RunStore;
pub use types::*;

use cs_core::FailureClass;

pub type ResultsResult<T> = Result<T, ResultsError>;

#[derive(thiserror::Error, Debug)]
pub enum ResultsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Run not found: {run_id}")]
    RunNotFound { run_id: String },

    #[error("Invalid path: {message}")]
    InvalidPath { message: String },

    #[error("Sample has {got} values but {expected} observables are recorded")]
    SampleWidth { expected: usize, got: usize },

    #[error("Plot error: {message}")]
    Plot { message: String },
}

impl ResultsError {
    pub fn class(&self) -> FailureClass {
        match self {
            ResultsError::RunNotFound { .. } | ResultsError::InvalidPath { .. } => {
                FailureClass::Load
            }
            ResultsError::Io(_)
            | ResultsError::Json(_)
            | ResultsError::SampleWidth { .. }
            | ResultsError::Plot { .. } => FailureClass::Internal,
        }
    }
}
