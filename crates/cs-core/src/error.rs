use std::fmt;

use thiserror::Error;

pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Non-finite numeric value for {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Invariant violated: {what}")]
    Invariant { what: &'static str },
}

/// Failure classes surfaced to the user when a run stops.
///
/// Every crate error maps onto exactly one class. The `Display` form is the
/// prefix of the human-readable status string reported for a failed run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FailureClass {
    /// Malformed binding strings, mismatched initial names/values, bad options.
    Config,
    /// Model or field-solver artifact missing or unreadable.
    Load,
    /// A bound variable name absent from a symbol table.
    UnknownVariable,
    /// Expected token missing from a field-solver report.
    ReportParse,
    /// Boundary, solve or report command rejected by the field solver.
    ExternalSolver,
    /// Field-solver process failed to start or never became ready.
    Connection,
    /// Invariant violations and local I/O failures.
    Internal,
}

impl FailureClass {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureClass::Config => "ConfigError",
            FailureClass::Load => "LoadError",
            FailureClass::UnknownVariable => "UnknownVariableError",
            FailureClass::ReportParse => "ReportParseError",
            FailureClass::ExternalSolver => "ExternalSolverError",
            FailureClass::Connection => "ConnectionError",
            FailureClass::Internal => "InternalError",
        }
    }

    /// Format a status string for an error of this class.
    pub fn status(self, message: impl fmt::Display) -> String {
        format!("{}: {}", self.as_str(), message)
    }
}

impl fmt::Display for FailureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl CoreError {
    pub fn class(&self) -> FailureClass {
        match self {
            CoreError::InvalidArg { .. } => FailureClass::Config,
            CoreError::NonFinite { .. } | CoreError::Invariant { .. } => FailureClass::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_string_carries_class_prefix() {
        let status = FailureClass::ReportParse.status("token 'outlet' missing");
        assert_eq!(status, "ReportParseError: token 'outlet' missing");
    }

    #[test]
    fn core_errors_classify() {
        assert_eq!(
            CoreError::InvalidArg { what: "dt" }.class(),
            FailureClass::Config
        );
        assert_eq!(
            CoreError::NonFinite {
                what: "x",
                value: f64::NAN
            }
            .class(),
            FailureClass::Internal
        );
    }
}
