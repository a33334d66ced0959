use tangent_core::{ConstrainedProblem, Model, Observer};

use crate::optimization::EvalError;

use super::Action;

/// Events emitted by the SQP solver.
///
/// [`Event::Iterated`] is emitted for the starting point (iteration 0) and
/// after every accepted step. Failure events are emitted when a trial point
/// proposed by the line search cannot be evaluated; the solver rejects that
/// point and backtracks.
pub enum Event<'a, M, P>
where
    M: Model,
    P: ConstrainedProblem<Input = M::Input, Output = M::Output>,
{
    /// A new iterate was accepted.
    Iterated {
        /// Major iteration count.
        iter: usize,

        /// Decision variables at the iterate.
        x: &'a [f64],

        objective: f64,

        /// Largest absolute constraint value.
        violation: f64,

        /// The model input at this iterate.
        input: &'a M::Input,

        /// The model output at this iterate.
        output: &'a M::Output,
    },

    /// Model evaluation failed at a trial point.
    ModelFailed {
        iter: usize,

        /// The trial point that failed.
        x: &'a [f64],

        /// The model error.
        error: &'a M::Error,
    },

    /// Problem method failed at a trial point.
    ProblemFailed {
        iter: usize,

        /// The trial point that failed.
        x: &'a [f64],

        /// The problem error.
        error: &'a P::Error,
    },
}

impl<M, P> Event<'_, M, P>
where
    M: Model,
    P: ConstrainedProblem<Input = M::Input, Output = M::Output>,
{
    /// Returns the iteration during which the event occurred.
    #[must_use]
    pub fn iter(&self) -> usize {
        match self {
            Self::Iterated { iter, .. }
            | Self::ModelFailed { iter, .. }
            | Self::ProblemFailed { iter, .. } => *iter,
        }
    }

    /// Returns the decision variables that were evaluated (or attempted).
    #[must_use]
    pub fn x(&self) -> &[f64] {
        match self {
            Self::Iterated { x, .. } | Self::ModelFailed { x, .. } | Self::ProblemFailed { x, .. } => {
                x
            }
        }
    }

    /// Emits a failure event and returns the observer's action.
    pub(super) fn emit_failure<Obs>(
        iter: usize,
        x: &[f64],
        error: &EvalError<M::Error, P::Error>,
        observer: &mut Obs,
    ) -> Option<Action>
    where
        Obs: for<'a> Observer<Event<'a, M, P>, Action>,
    {
        match error {
            EvalError::Model(e) => {
                let event = Event::ModelFailed { iter, x, error: e };
                observer.observe(&event)
            }
            EvalError::Problem(e) => {
                let event = Event::ProblemFailed { iter, x, error: e };
                observer.observe(&event)
            }
        }
    }
}
