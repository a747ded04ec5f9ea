//! Error types for the cs-app service layer.

use std::path::PathBuf;

use cs_core::FailureClass;

/// Application error wrapping every backend error, so front ends see one type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Project(#[from] cs_project::ProjectError),

    #[error(transparent)]
    Exchange(#[from] cs_exchange::ExchangeError),

    #[error(transparent)]
    Model(#[from] cs_model::ModelError),

    #[error(transparent)]
    Field(#[from] cs_field::FieldError),

    #[error(transparent)]
    Simulation(#[from] cs_sim::SimError),

    #[error(transparent)]
    Results(#[from] cs_results::ResultsError),

    #[error("Failed to create run directory {path}")]
    Workspace {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for cs-app operations.
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn class(&self) -> FailureClass {
        match self {
            AppError::Project(e) => e.class(),
            AppError::Exchange(e) => e.class(),
            AppError::Model(e) => e.class(),
            AppError::Field(e) => e.class(),
            AppError::Simulation(e) => e.class(),
            AppError::Results(e) => e.class(),
            AppError::Workspace { .. } | AppError::Io(_) => FailureClass::Internal,
            AppError::InvalidInput(_) => FailureClass::Config,
        }
    }

    /// `"<Class>: <message>"`, the form shown to users.
    pub fn status(&self) -> String {
        self.class().status(self)
    }
}
