//! Classical 4th-order Runge-Kutta integration with forward sensitivities.
//!
//! This module integrates a [`DifferentiableModel`] over a fixed [`TimeGrid`]
//! and, in the same pass, propagates the Jacobians of every trajectory sample
//! with respect to every external-input sample and the initial state:
//!
//! ```text
//! y[t+1] = y[t] + h/6·(k1 + 2·k2 + 2·k3 + k4)
//! S[t+1] = Φ[t]·S[t] + forcing from external[t] and external[t+1]
//! ```
//!
//! External inputs are known only at grid samples; stages that fall between
//! samples use linear interpolation, which for the RK4 midpoint stages is the
//! average of the two bracketing samples.
//!
//! The sensitivity recursion is the tangent of the discrete scheme, so the
//! returned gradients are exact for the integrated trajectory rather than an
//! approximation of the continuous ODE's gradients. Sensitivities to future
//! inputs are never written and stay exactly zero.
//!
//! # Example
//!
//! ```ignore
//! use tangent_solvers::transient::rk4::{Inputs, SensitivityIntegrator};
//!
//! let integrator = SensitivityIntegrator::new(model, grid);
//! let result = integrator.integrate(&Inputs::new(externals, initial_state))?;
//!
//! let final_speed = result.final_state()[1];
//! ```

mod action;
mod error;
mod event;
mod solution;
mod stage;

#[cfg(test)]
mod tests;

pub use action::Action;
pub use error::{DimensionError, Error};
pub use event::Event;
pub use solution::{Integration, Parameter, Status};

use ndarray::{Array1, Array2, Array3, Array4, ArrayView1, ArrayView2, Axis, s};
use tracing::debug;

use tangent_core::{DifferentiableModel, Model, Observer, TimeGrid};

use stage::LinearizedStep;

/// Values the integrator reads for one integration.
///
/// Every integration reads these buffers in full; nothing carries over from a
/// previous call.
#[derive(Debug, Clone, PartialEq)]
pub struct Inputs {
    /// External-input series, N×K: row `t` holds every signal at sample `t`.
    pub externals: Array2<f64>,

    /// Initial state (length M).
    pub initial_state: Array1<f64>,
}

impl Inputs {
    /// Creates integrator inputs.
    #[must_use]
    pub fn new(externals: Array2<f64>, initial_state: Array1<f64>) -> Self {
        Self {
            externals,
            initial_state,
        }
    }
}

/// Fixed-step RK4 integrator that propagates forward sensitivities.
///
/// The integrator owns its model and time grid. Integrations take their
/// inputs by reference and return freshly allocated results, so repeated
/// calls with the same inputs produce bit-identical output.
#[derive(Debug, Clone)]
pub struct SensitivityIntegrator<M> {
    model: M,
    grid: TimeGrid,
}

impl<M: DifferentiableModel> SensitivityIntegrator<M> {
    /// Creates an integrator over a validated time grid.
    pub fn new(model: M, grid: TimeGrid) -> Self {
        Self { model, grid }
    }

    /// Creates an integrator from raw time samples.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if the samples do not form a
    /// strictly increasing grid of at least two non-negative values.
    pub fn from_samples(model: M, samples: Vec<f64>) -> Result<Self, Error> {
        Ok(Self::new(model, TimeGrid::new(samples)?))
    }

    /// The model being integrated.
    pub fn model(&self) -> &M {
        &self.model
    }

    /// The time grid.
    pub fn grid(&self) -> &TimeGrid {
        &self.grid
    }

    /// Validates inputs against the grid and the model's declared sizes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if the external series does not
    /// have one row per grid sample and one column per external signal, or if
    /// the initial state has the wrong length.
    pub fn initialize(
        &self,
        externals: ArrayView2<'_, f64>,
        initial_state: ArrayView1<'_, f64>,
    ) -> Result<(), Error> {
        let (rows, cols) = externals.dim();
        if rows != self.grid.len() {
            return Err(DimensionError::ExternalRows {
                grid: self.grid.len(),
                rows,
            }
            .into());
        }
        if cols != self.model.external_len() {
            return Err(DimensionError::ExternalColumns {
                expected: self.model.external_len(),
                found: cols,
            }
            .into());
        }
        if initial_state.len() != self.model.state_len() {
            return Err(DimensionError::InitialState {
                expected: self.model.state_len(),
                found: initial_state.len(),
            }
            .into());
        }
        Ok(())
    }

    /// Integrates across the whole grid without observation.
    ///
    /// # Errors
    ///
    /// See [`integrate_observed`](Self::integrate_observed).
    pub fn integrate(&self, inputs: &Inputs) -> Result<Integration, Error> {
        self.integrate_observed(inputs, ())
    }

    /// Integrates across the grid, emitting an [`Event`] per sample.
    ///
    /// # Algorithm
    ///
    /// 1. Validate inputs and seed row 0: the initial state, `∂y/∂y₀ = I`,
    ///    `∂y/∂external = 0`.
    /// 2. For each step `t`:
    ///    - Evaluate the four RK4 stages and their Jacobians.
    ///    - Advance the state.
    ///    - Map the previous sensitivities through the step's transition and
    ///      add the forcing from `external[t]` and `external[t + 1]`.
    ///    - Fail with [`Error::Diverged`] if anything in the new row is not
    ///      finite.
    ///    - Emit an [`Event`]; stop if the observer returns
    ///      [`Action::StopEarly`].
    ///
    /// # Errors
    ///
    /// Returns an error if the inputs are malformed, a model callback fails
    /// or returns a wrongly shaped result, or the integration diverges.
    pub fn integrate_observed<Obs>(
        &self,
        inputs: &Inputs,
        mut observer: Obs,
    ) -> Result<Integration, Error>
    where
        Obs: for<'a> Observer<Event<'a>, Action>,
    {
        let externals = inputs.externals.view();
        self.initialize(externals, inputs.initial_state.view())?;

        let n = self.grid.len();
        let m = self.model.state_len();
        let k = self.model.external_len();
        let time = self.grid.as_slice();

        debug!(samples = n, states = m, signals = k, "starting RK4 integration");

        let mut trajectory = Array2::<f64>::zeros((n, m));
        let mut d_external = Array4::<f64>::zeros((n, m, n, k));
        let mut d_initial = Array3::<f64>::zeros((n, m, m));

        trajectory.row_mut(0).assign(&inputs.initial_state);
        d_initial
            .index_axis_mut(Axis(0), 0)
            .assign(&Array2::<f64>::eye(m));

        let event = Event {
            step: 0,
            time: time[0],
            state: trajectory.row(0),
        };
        if let Some(Action::StopEarly) = observer.observe(&event) {
            return Ok(truncate(trajectory, d_external, d_initial, time, 0));
        }

        for t in 0..n - 1 {
            let step = LinearizedStep::compute(
                &self.model,
                self.grid.step(t),
                externals.row(t),
                externals.row(t + 1),
                trajectory.row(t),
            )?;

            trajectory.row_mut(t + 1).assign(&step.next_state);

            let next_initial = step
                .transition
                .dot(&d_initial.index_axis(Axis(0), t));
            d_initial
                .index_axis_mut(Axis(0), t + 1)
                .assign(&next_initial);

            // Samples after t + 1 cannot influence row t + 1.
            for sample in 0..=t {
                let mut next = step
                    .transition
                    .dot(&d_external.slice(s![t, .., sample, ..]));
                if sample == t {
                    next += &step.forcing_left;
                }
                d_external
                    .slice_mut(s![t + 1, .., sample, ..])
                    .assign(&next);
            }
            d_external
                .slice_mut(s![t + 1, .., t + 1, ..])
                .assign(&step.forcing_right);

            let finite = trajectory.row(t + 1).iter().all(|v| v.is_finite())
                && d_initial
                    .index_axis(Axis(0), t + 1)
                    .iter()
                    .all(|v| v.is_finite())
                && d_external
                    .slice(s![t + 1, .., ..=t + 1, ..])
                    .iter()
                    .all(|v| v.is_finite());
            if !finite {
                debug!(step = t + 1, time = time[t + 1], "RK4 integration diverged");
                return Err(Error::Diverged { step: t + 1 });
            }

            let event = Event {
                step: t + 1,
                time: time[t + 1],
                state: trajectory.row(t + 1),
            };
            if let Some(Action::StopEarly) = observer.observe(&event) {
                return Ok(truncate(trajectory, d_external, d_initial, time, t + 1));
            }
        }

        Ok(Integration {
            status: Status::Complete,
            steps: n - 1,
            time: time.to_vec(),
            trajectory,
            d_external,
            d_initial,
        })
    }
}

impl<M: DifferentiableModel> Model for SensitivityIntegrator<M> {
    type Input = Inputs;
    type Output = Integration;
    type Error = Error;

    fn call(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
        self.integrate(input)
    }
}

/// Builds the result for an integration stopped after `steps` steps.
fn truncate(
    trajectory: Array2<f64>,
    d_external: Array4<f64>,
    d_initial: Array3<f64>,
    time: &[f64],
    steps: usize,
) -> Integration {
    let rows = steps + 1;
    Integration {
        status: Status::StoppedByObserver,
        steps,
        time: time[..rows].to_vec(),
        trajectory: trajectory.slice(s![..rows, ..]).to_owned(),
        d_external: d_external.slice(s![..rows, .., .., ..]).to_owned(),
        d_initial: d_initial.slice(s![..rows, .., ..]).to_owned(),
    }
}
