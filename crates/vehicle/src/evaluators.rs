//! Trajectory evaluators over the chassis velocity.

use ndarray::{Array1, Array2, ArrayView2};
use tangent_core::TrajectoryEvaluator;
use thiserror::Error;

use crate::Chassis;

/// Errors from evaluating a trajectory against a target.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum EvaluatorError {
    #[error("trajectory has {found} rows but the target has {expected}")]
    Length { expected: usize, found: usize },

    #[error("trajectory has {found} state components, expected at least {expected}")]
    Components { expected: usize, found: usize },
}

/// Sum of squared differences between velocity and a target series.
///
/// `value = Σₜ (v[t] - target[t])²`
#[derive(Debug, Clone, PartialEq)]
pub struct SpeedMismatch {
    target: Array1<f64>,
}

impl SpeedMismatch {
    /// Creates the evaluator for a target velocity series in m/s.
    #[must_use]
    pub fn new(target: Array1<f64>) -> Self {
        Self { target }
    }

    #[must_use]
    pub fn target(&self) -> &Array1<f64> {
        &self.target
    }

    fn residuals(&self, trajectory: ArrayView2<'_, f64>) -> Result<Array1<f64>, EvaluatorError> {
        check_shape(trajectory, self.target.len())?;
        Ok(&trajectory.column(Chassis::VELOCITY) - &self.target)
    }
}

impl TrajectoryEvaluator for SpeedMismatch {
    type Error = EvaluatorError;

    fn value(&self, trajectory: ArrayView2<'_, f64>) -> Result<f64, Self::Error> {
        let residuals = self.residuals(trajectory)?;
        Ok(residuals.dot(&residuals))
    }

    fn state_gradient(&self, trajectory: ArrayView2<'_, f64>) -> Result<Array2<f64>, Self::Error> {
        let residuals = self.residuals(trajectory)?;
        let mut gradient = Array2::zeros(trajectory.raw_dim());
        gradient
            .column_mut(Chassis::VELOCITY)
            .assign(&(residuals * 2.0));
        Ok(gradient)
    }
}

/// Difference between the final velocity and a target speed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FinalSpeed {
    target: f64,
    samples: usize,
}

impl FinalSpeed {
    /// Creates the evaluator for trajectories of `samples` rows.
    ///
    /// `target` is in m/s.
    #[must_use]
    pub fn new(target: f64, samples: usize) -> Self {
        Self { target, samples }
    }

    #[must_use]
    pub fn target(&self) -> f64 {
        self.target
    }
}

impl TrajectoryEvaluator for FinalSpeed {
    type Error = EvaluatorError;

    fn value(&self, trajectory: ArrayView2<'_, f64>) -> Result<f64, Self::Error> {
        check_shape(trajectory, self.samples)?;
        Ok(trajectory[[self.samples - 1, Chassis::VELOCITY]] - self.target)
    }

    fn state_gradient(&self, trajectory: ArrayView2<'_, f64>) -> Result<Array2<f64>, Self::Error> {
        check_shape(trajectory, self.samples)?;
        let mut gradient = Array2::zeros(trajectory.raw_dim());
        gradient[[self.samples - 1, Chassis::VELOCITY]] = 1.0;
        Ok(gradient)
    }
}

fn check_shape(trajectory: ArrayView2<'_, f64>, rows: usize) -> Result<(), EvaluatorError> {
    let (found_rows, components) = trajectory.dim();
    if found_rows != rows || rows == 0 {
        return Err(EvaluatorError::Length {
            expected: rows,
            found: found_rows,
        });
    }
    if components <= Chassis::VELOCITY {
        return Err(EvaluatorError::Components {
            expected: Chassis::VELOCITY + 1,
            found: components,
        });
    }
    Ok(())
}
