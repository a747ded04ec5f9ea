//! Error types for binding configuration.

use cs_core::FailureClass;
use thiserror::Error;

use crate::binding::Direction;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExchangeError {
    #[error("{direction} binding #{index} '{entry}' must have exactly two tokens, found {tokens}")]
    Parse {
        direction: Direction,
        index: usize,
        entry: String,
        tokens: usize,
    },

    #[error("'{name}' is not a field target; expected <boundary>.<v|T|m_flow>")]
    Target { name: String },
}

impl ExchangeError {
    pub fn class(&self) -> FailureClass {
        match self {
            ExchangeError::Parse { .. } | ExchangeError::Target { .. } => FailureClass::Config,
        }
    }
}

pub type ExchangeResult<T> = Result<T, ExchangeError>;
