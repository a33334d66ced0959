//! The vehicle chassis problem for tangent.
//!
//! A [`Chassis`] integrates mass and velocity under engine torque. A
//! [`DriveSchedule`] supplies the time grid and external series, evaluators
//! score the velocity trajectory, and [`Tuning`] poses schedule design as a
//! constrained optimization problem solvable with
//! [`sqp`](tangent_solvers::optimization::sqp).
//!
//! # Example
//!
//! ```rust
//! use tangent_core::Model;
//! use tangent_vehicle::{Chassis, DriveSchedule, InitialState};
//!
//! let schedule = DriveSchedule::reference().unwrap();
//! let integrator = schedule.integrator(Chassis::default());
//! let integration = integrator
//!     .call(&schedule.inputs(&InitialState::default()))
//!     .unwrap();
//!
//! assert!(integration.final_state()[Chassis::VELOCITY] > 0.0);
//! ```

pub mod chassis;
pub mod evaluators;
pub mod schedule;
pub mod tuning;

pub use chassis::{Chassis, ChassisError, ChassisParameters, InitialState, Resistance};
pub use evaluators::{EvaluatorError, FinalSpeed, SpeedMismatch};
pub use schedule::{DriveSchedule, ScheduleError};
pub use tuning::{Constraint, Decision, Objective, Tuning, TuningError};
