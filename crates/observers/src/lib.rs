//! Reusable observers for tangent solvers.
//!
//! This crate provides [`Observer`] implementations and capability traits that
//! work across the integrator and the optimizer.
//!
//! # Modules
//!
//! - [`traits`]: capability traits for cross-solver observers
//!   ([`HasIteration`], [`HasObjective`], [`HasConstraintViolation`],
//!   [`CanStopEarly`])
//! - [`budget`]: stops a solver once an iteration or wall-clock budget is spent
//!
//! [`Observer`]: tangent_core::Observer
//! [`HasIteration`]: traits::HasIteration
//! [`HasObjective`]: traits::HasObjective
//! [`HasConstraintViolation`]: traits::HasConstraintViolation
//! [`CanStopEarly`]: traits::CanStopEarly

pub mod budget;
pub mod traits;

pub use budget::Budget;
