//! Time integrators for initial-value problems.
//!
//! # Solvers
//!
//! - [`rk4`]: classical fixed-step 4th-order Runge-Kutta with exact forward
//!   sensitivities with respect to external inputs and the initial state

pub mod rk4;
