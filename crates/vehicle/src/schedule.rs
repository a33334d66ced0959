//! Time grids and external-input series for driving the chassis.

use ndarray::{Array1, Array2};
use tangent_core::{TimeGrid, TimeGridError};
use tangent_solvers::transient::rk4;
use thiserror::Error;
use uom::si::{
    f64::{Time, Torque},
    time::second,
    torque::newton_meter,
};

use crate::{Chassis, InitialState};

/// Errors that can occur when building a [`DriveSchedule`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ScheduleError {
    #[error(transparent)]
    Grid(#[from] TimeGridError),

    #[error("{signal} has {found} samples but the grid has {expected}")]
    Length {
        signal: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("{signal} sample {index} is not finite")]
    NonFinite { signal: &'static str, index: usize },
}

/// Engine torque and torque ratio over a time grid.
///
/// The schedule owns the chassis external series. Each call to
/// [`DriveSchedule::externals`] builds a fresh `N×3` array with columns
/// ordered as [`Chassis::TIME`], [`Chassis::TORQUE_RATIO`] and
/// [`Chassis::ENGINE_TORQUE`].
#[derive(Debug, Clone, PartialEq)]
pub struct DriveSchedule {
    grid: TimeGrid,
    torque_ratio: Array1<f64>,
    engine_torque: Array1<f64>,
}

impl DriveSchedule {
    /// Creates a schedule from per-sample series on `grid`.
    ///
    /// Engine torque is in N·m; the torque ratio is dimensionless.
    ///
    /// # Errors
    ///
    /// Returns an error if either series differs in length from the grid or
    /// contains non-finite values.
    pub fn new(
        grid: TimeGrid,
        engine_torque: Array1<f64>,
        torque_ratio: Array1<f64>,
    ) -> Result<Self, ScheduleError> {
        check_series("engine torque", &engine_torque, grid.len())?;
        check_series("torque ratio", &torque_ratio, grid.len())?;
        Ok(Self {
            grid,
            torque_ratio,
            engine_torque,
        })
    }

    /// Creates a uniform schedule from `0` to `end` holding torque and ratio
    /// constant.
    ///
    /// # Errors
    ///
    /// Returns an error if the grid is invalid or the values are not finite.
    pub fn constant(
        step: Time,
        end: Time,
        engine_torque: Torque,
        torque_ratio: f64,
    ) -> Result<Self, ScheduleError> {
        let grid = TimeGrid::uniform(step.get::<second>(), end.get::<second>())?;
        let n = grid.len();
        Self::new(
            grid,
            Array1::from_elem(n, engine_torque.get::<newton_meter>()),
            Array1::from_elem(n, torque_ratio),
        )
    }

    /// 200 N·m at unit ratio, sampled every 4 s over 764 s.
    ///
    /// # Errors
    ///
    /// Never fails in practice; the signature mirrors [`DriveSchedule::constant`].
    pub fn reference() -> Result<Self, ScheduleError> {
        Self::constant(
            Time::new::<second>(4.0),
            Time::new::<second>(764.0),
            Torque::new::<newton_meter>(200.0),
            1.0,
        )
    }

    #[must_use]
    pub fn grid(&self) -> &TimeGrid {
        &self.grid
    }

    /// Number of samples (`N`).
    #[must_use]
    pub fn len(&self) -> usize {
        self.grid.len()
    }

    /// Always `false`; a valid grid has at least two samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.grid.is_empty()
    }

    /// Engine torque per sample, in N·m.
    #[must_use]
    pub fn engine_torque(&self) -> &Array1<f64> {
        &self.engine_torque
    }

    #[must_use]
    pub fn torque_ratio(&self) -> &Array1<f64> {
        &self.torque_ratio
    }

    /// Builds the `N×3` external series for the chassis.
    #[must_use]
    pub fn externals(&self) -> Array2<f64> {
        let mut externals = Array2::<f64>::zeros((self.len(), 3));
        externals
            .column_mut(Chassis::TIME)
            .assign(&Array1::from(self.grid.as_slice().to_vec()));
        externals
            .column_mut(Chassis::TORQUE_RATIO)
            .assign(&self.torque_ratio);
        externals
            .column_mut(Chassis::ENGINE_TORQUE)
            .assign(&self.engine_torque);
        externals
    }

    /// Builds integrator inputs starting from `initial`.
    #[must_use]
    pub fn inputs(&self, initial: &InitialState) -> rk4::Inputs {
        rk4::Inputs::new(self.externals(), initial.to_array())
    }

    /// Builds an integrator for `chassis` on this schedule's grid.
    #[must_use]
    pub fn integrator(&self, chassis: Chassis) -> rk4::SensitivityIntegrator<Chassis> {
        rk4::SensitivityIntegrator::new(chassis, self.grid.clone())
    }
}

fn check_series(
    signal: &'static str,
    series: &Array1<f64>,
    expected: usize,
) -> Result<(), ScheduleError> {
    if series.len() != expected {
        return Err(ScheduleError::Length {
            signal,
            expected,
            found: series.len(),
        });
    }
    match series.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(ScheduleError::NonFinite { signal, index }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn reference_schedule_covers_the_horizon() {
        let schedule = DriveSchedule::reference().unwrap();

        assert_eq!(schedule.len(), 192);
        assert_relative_eq!(schedule.grid().end(), 764.0);
        assert!(schedule.engine_torque().iter().all(|&t| t == 200.0));
        assert!(schedule.torque_ratio().iter().all(|&r| r == 1.0));
    }

    #[test]
    fn externals_are_ordered_by_signal() {
        let grid = TimeGrid::new(vec![0.0, 2.0, 5.0]).unwrap();
        let schedule =
            DriveSchedule::new(grid, array![100.0, 150.0, 125.0], array![1.0, 2.0, 0.5]).unwrap();

        let externals = schedule.externals();

        assert_eq!(
            externals,
            array![[0.0, 1.0, 100.0], [2.0, 2.0, 150.0], [5.0, 0.5, 125.0]]
        );
    }

    #[test]
    fn rejects_mismatched_series() {
        let grid = TimeGrid::new(vec![0.0, 1.0, 2.0]).unwrap();

        let result = DriveSchedule::new(grid, array![1.0, 2.0], array![1.0, 1.0, 1.0]);

        assert_eq!(
            result,
            Err(ScheduleError::Length {
                signal: "engine torque",
                expected: 3,
                found: 2
            })
        );
    }

    #[test]
    fn rejects_non_finite_samples() {
        let grid = TimeGrid::new(vec![0.0, 1.0]).unwrap();

        let result = DriveSchedule::new(grid, array![1.0, 2.0], array![1.0, f64::NAN]);

        assert_eq!(
            result,
            Err(ScheduleError::NonFinite {
                signal: "torque ratio",
                index: 1
            })
        );
    }
}
