//! Sequential quadratic programming for equality-constrained problems.
//!
//! # Algorithm
//!
//! Each major iteration linearizes the constraints and builds a quadratic
//! model of the Lagrangian around the current iterate, then solves
//!
//! ```text
//! minimize    ½ dᵀBd + ∇fᵀd
//! subject to  ∇c d = -c
//!             lower ≤ x + d ≤ upper
//! ```
//!
//! for a search direction `d`. `B` is a damped BFGS approximation of the
//! Lagrangian Hessian. A backtracking line search on the L1 merit function
//! `f + Σ μᵢ|cᵢ|` picks the step length, with penalties `μ` tracking the QP
//! multipliers.
//!
//! The solve converges when the objective change of an accepted step and the
//! largest constraint magnitude both fall below [`Config::accuracy`].
//!
//! # Gradients
//!
//! With [`GradientSource::Analytic`] the problem supplies gradients, which for
//! trajectory problems come from the sensitivities the integrator already
//! produced. [`GradientSource::FiniteDifference`] spends one extra model call
//! per decision variable instead.
//!
//! # Observer Events
//!
//! - [`Event::Iterated`]: the start point and every accepted iterate
//! - [`Event::ModelFailed`] and [`Event::ProblemFailed`]: a trial point could
//!   not be evaluated and was rejected
//!
//! Observers can return [`Action::StopEarly`] to halt and keep the current
//! iterate.

mod action;
mod bfgs;
mod config;
mod error;
mod event;
mod qp;
mod search;
mod solution;


pub use action::Action;
pub use config::{Config, ConfigError, GradientSource};
pub use error::Error;
pub use event::Event;
pub use solution::{Solution, Status};

use tangent_core::{ConstrainedProblem, Model, Observer};

use search::search;

/// Minimizes the objective subject to the problem's equality constraints.
///
/// The starting point is projected onto the bounds before it is evaluated.
///
/// # Errors
///
/// Returns an error if `x0` has the wrong length, if the start point or its
/// gradients cannot be evaluated, or if the problem reports constraints or
/// gradients of the wrong shape. Failures at trial points during the line
/// search are not errors; they are reported to the observer and rejected.
pub fn minimize<M, P, Obs>(
    model: &M,
    problem: &P,
    x0: &[f64],
    config: &Config,
    observer: Obs,
) -> Result<Solution<M::Input, M::Output>, Error>
where
    M: Model,
    P: ConstrainedProblem<Input = M::Input, Output = M::Output>,
    Obs: for<'a> Observer<Event<'a, M, P>, Action>,
{
    search(model, problem, x0, config, observer)
}

/// Minimizes the objective without observer support.
///
/// This is a convenience wrapper around [`minimize`] that uses a no-op observer.
///
/// # Errors
///
/// See [`minimize`].
pub fn minimize_unobserved<M, P>(
    model: &M,
    problem: &P,
    x0: &[f64],
    config: &Config,
) -> Result<Solution<M::Input, M::Output>, Error>
where
    M: Model,
    P: ConstrainedProblem<Input = M::Input, Output = M::Output>,
{
    minimize(model, problem, x0, config, ())
}
