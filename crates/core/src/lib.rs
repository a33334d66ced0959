//! Core traits and types for differentiable time-integration problems.
//!
//! This crate defines the shared abstractions that integrators, optimizers,
//! observers, and models build on:
//!
//! - [`Model`]: a callable that maps a typed input to a typed output
//! - [`Snapshot`]: a captured input/output pair from a model call
//! - [`Observer`]: receives solver events and optionally returns control actions
//! - [`DifferentiableModel`]: an ODE right-hand side with analytic partials
//! - [`TimeGrid`]: validated, strictly increasing time samples
//! - [`TrajectoryEvaluator`]: maps a state trajectory to a scalar and its
//!   gradient through integrator sensitivities
//! - [`ConstrainedProblem`]: adapts decision variables to model inputs and
//!   extracts an objective and equality constraints from model outputs

mod bounds;
mod dynamics;
mod evaluator;
mod model;
mod observer;
mod problems;
mod time_grid;

pub use bounds::{Bounds, BoundsError};
pub use dynamics::{Dependencies, DifferentiableModel};
pub use evaluator::TrajectoryEvaluator;
pub use observer::Observer;
pub use problems::ConstrainedProblem;
pub use time_grid::{TimeGrid, TimeGridError};
pub use {model::Model, model::Snapshot};
