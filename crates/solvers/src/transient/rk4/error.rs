use std::error::Error as StdError;

use thiserror::Error;
use tangent_core::TimeGridError;

/// Errors that can occur during RK4 sensitivity integration.
#[derive(Debug, Error)]
pub enum Error {
    #[error("dimension mismatch: {0}")]
    DimensionMismatch(#[from] DimensionError),

    #[error("model error: {0}")]
    Model(#[source] Box<dyn StdError + Send + Sync>),

    #[error("integration diverged at step {step}")]
    Diverged { step: usize },
}

impl Error {
    pub(crate) fn model<E: StdError + Send + Sync + 'static>(err: E) -> Self {
        Self::Model(Box::new(err))
    }
}

/// Malformed integrator inputs or model outputs.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DimensionError {
    #[error("invalid time grid: {0}")]
    TimeGrid(#[from] TimeGridError),

    #[error("time grid has {grid} samples but the external series has {rows} rows")]
    ExternalRows { grid: usize, rows: usize },

    #[error("model reads {expected} external signals but the series has {found} columns")]
    ExternalColumns { expected: usize, found: usize },

    #[error("model has {expected} state components but the initial state has {found}")]
    InitialState { expected: usize, found: usize },

    #[error("{what} has shape {found:?}, expected {expected:?}")]
    ModelOutput {
        what: &'static str,
        expected: (usize, usize),
        found: (usize, usize),
    },
}

impl From<TimeGridError> for Error {
    fn from(err: TimeGridError) -> Self {
        Self::DimensionMismatch(err.into())
    }
}
