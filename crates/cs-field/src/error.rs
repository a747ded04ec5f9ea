//! Error types for field-solver sessions.

use std::path::PathBuf;

use cs_core::FailureClass;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FieldError {
    #[error("Failed to launch field solver '{program}': {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Readiness marker {marker} not ready after {seconds:.1} s")]
    ReadyTimeout { marker: PathBuf, seconds: f64 },

    #[error("Field solver exited: {status}")]
    Exited { status: String },

    #[error("Wait for field solver cancelled")]
    Cancelled,

    #[error("Command '{command}' rejected: {reply}")]
    Rejected { command: String, reply: String },

    #[error("Command '{command}' timed out after {seconds:.1} s")]
    Timeout { command: String, seconds: f64 },

    #[error("Report file {path} was not written")]
    ReportMissing { path: PathBuf },

    #[error("Report '{report}': {detail}")]
    ReportParse { report: String, detail: String },

    #[error("Unknown boundary: {name}")]
    UnknownBoundary { name: String },

    #[error("Unknown report: {name}")]
    UnknownReport { name: String },

    #[error("Boundary '{boundary}' needs a value for {quantity}")]
    MissingValue {
        boundary: String,
        quantity: &'static str,
    },

    #[error("Invalid field configuration: {what}")]
    Config { what: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type FieldResult<T> = Result<T, FieldError>;

impl FieldError {
    pub fn class(&self) -> FailureClass {
        match self {
            FieldError::Launch { .. }
            | FieldError::ReadyTimeout { .. }
            | FieldError::Exited { .. }
            | FieldError::Cancelled => FailureClass::Connection,
            FieldError::Rejected { .. }
            | FieldError::Timeout { .. }
            | FieldError::ReportMissing { .. } => FailureClass::ExternalSolver,
            FieldError::ReportParse { .. } => FailureClass::ReportParse,
            FieldError::UnknownBoundary { .. }
            | FieldError::UnknownReport { .. }
            | FieldError::MissingValue { .. } => FailureClass::UnknownVariable,
            FieldError::Config { .. } => FailureClass::Config,
            FieldError::Io { .. } => FailureClass::Internal,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> FieldError {
        let path = path.into();
        move |source| FieldError::Io { path, source }
    }
}
