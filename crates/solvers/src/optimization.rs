//! Solvers for constrained optimization problems.
//!
//! A [`ConstrainedProblem`] maps decision variables `x` to model inputs, calls
//! the model, and extracts an objective and equality constraints. Solvers in
//! this module search for the `x` within bounds that minimizes the objective
//! while satisfying the constraints.
//!
//! # Solvers
//!
//! - [`sqp`]: sequential quadratic programming with quasi-Newton Hessian
//!   updates, driven by analytic or finite-difference gradients
//!
//! [`ConstrainedProblem`]: tangent_core::ConstrainedProblem

mod evaluate;

pub use evaluate::{
    EvalError, Evaluation, Gradients, analytic_gradients, evaluate, finite_difference_gradients,
};

pub mod sqp;
