//! Capability traits for cross-solver observers.
//!
//! These traits abstract over solver-specific event and action types, enabling
//! observers to work generically across different solvers.
//!
//! # Example
//!
//! ```rust
//! use tangent_core::Observer;
//! use tangent_observers::traits::{CanStopEarly, HasConstraintViolation};
//!
//! struct Feasible {
//!     tolerance: f64,
//! }
//!
//! impl<E: HasConstraintViolation, A: CanStopEarly> Observer<E, A> for Feasible {
//!     fn observe(&mut self, event: &E) -> Option<A> {
//!         (event.violation() < self.tolerance).then(A::stop_early)
//!     }
//! }
//! ```

use tangent_core::{ConstrainedProblem, Model};
use tangent_solvers::{optimization::sqp, transient::rk4};

/// An event tied to a solver iteration (or integration step).
pub trait HasIteration {
    fn iteration(&self) -> usize;
}

/// An event that carries an objective value.
pub trait HasObjective {
    /// Returns the objective for this event.
    ///
    /// Returns `f64::NAN` when the event represents an error and no objective
    /// is available.
    fn objective(&self) -> f64;
}

/// An event that carries the largest constraint magnitude.
pub trait HasConstraintViolation {
    /// Returns the constraint violation for this event.
    ///
    /// Returns `f64::NAN` when the event represents an error.
    fn violation(&self) -> f64;
}

/// An action type that can signal early termination.
pub trait CanStopEarly {
    /// Returns the action that stops the solver early.
    fn stop_early() -> Self;
}

impl<M, P> HasIteration for sqp::Event<'_, M, P>
where
    M: Model,
    P: ConstrainedProblem<Input = M::Input, Output = M::Output>,
{
    fn iteration(&self) -> usize {
        self.iter()
    }
}

impl<M, P> HasObjective for sqp::Event<'_, M, P>
where
    M: Model,
    P: ConstrainedProblem<Input = M::Input, Output = M::Output>,
{
    fn objective(&self) -> f64 {
        match self {
            sqp::Event::Iterated { objective, .. } => *objective,
            sqp::Event::ModelFailed { .. } | sqp::Event::ProblemFailed { .. } => f64::NAN,
        }
    }
}

impl<M, P> HasConstraintViolation for sqp::Event<'_, M, P>
where
    M: Model,
    P: ConstrainedProblem<Input = M::Input, Output = M::Output>,
{
    fn violation(&self) -> f64 {
        match self {
            sqp::Event::Iterated { violation, .. } => *violation,
            sqp::Event::ModelFailed { .. } | sqp::Event::ProblemFailed { .. } => f64::NAN,
        }
    }
}

impl HasIteration for rk4::Event<'_> {
    fn iteration(&self) -> usize {
        self.step
    }
}

impl CanStopEarly for sqp::Action {
    fn stop_early() -> Self {
        Self::StopEarly
    }
}

impl CanStopEarly for rk4::Action {
    fn stop_early() -> Self {
        Self::StopEarly
    }
}
