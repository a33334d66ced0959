use std::error::Error as StdError;

use crate::optimization::EvalError;

/// Errors that can occur during an SQP solve.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("starting point has {found} variables but the problem has {expected}")]
    InvalidStart { expected: usize, found: usize },

    #[error("{what} has shape {found:?}, expected {expected:?}")]
    ShapeMismatch {
        what: &'static str,
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("model error: {0}")]
    Model(Box<dyn StdError + Send + Sync>),

    #[error("problem error: {0}")]
    Problem(Box<dyn StdError + Send + Sync>),
}

impl<ME, PE> From<EvalError<ME, PE>> for Error
where
    ME: StdError + Send + Sync + 'static,
    PE: StdError + Send + Sync + 'static,
{
    fn from(err: EvalError<ME, PE>) -> Self {
        match err {
            EvalError::Model(e) => Error::Model(Box::new(e)),
            EvalError::Problem(e) => Error::Problem(Box::new(e)),
        }
    }
}
