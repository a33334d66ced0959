//! Numerical solvers for tangent problems.
//!
//! - [`transient`]: time integrators that propagate forward sensitivities
//!   alongside the state trajectory
//! - [`optimization`]: gradient-based optimizers for constrained problems

pub mod optimization;
pub mod transient;
