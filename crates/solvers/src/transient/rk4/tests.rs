use std::convert::Infallible;

use approx::{assert_abs_diff_eq, assert_relative_eq};
use ndarray::{Array1, Array2, ArrayView1, Axis, array, s};
use thiserror::Error;

use tangent_core::{Dependencies, DifferentiableModel, Model, TimeGrid};

use super::{
    Action, DimensionError, Error, Event, Inputs, Integration, Parameter, SensitivityIntegrator,
    Status,
};

// --- Test fixtures ---

/// `dy/dt = -rate·y + u`, with a single external `u`.
struct LinearDecay {
    rate: f64,
}

impl LinearDecay {
    /// Closed-form solution for constant `u`.
    fn exact(&self, y0: f64, u: f64, t: f64) -> f64 {
        let steady = u / self.rate;
        steady + (y0 - steady) * (-self.rate * t).exp()
    }
}

impl DifferentiableModel for LinearDecay {
    type Error = Infallible;

    fn state_len(&self) -> usize {
        1
    }

    fn external_len(&self) -> usize {
        1
    }

    fn derivative(
        &self,
        external: ArrayView1<'_, f64>,
        state: ArrayView1<'_, f64>,
    ) -> Result<Array1<f64>, Self::Error> {
        Ok(array![-self.rate * state[0] + external[0]])
    }

    fn jacobian_wrt_state(
        &self,
        _external: ArrayView1<'_, f64>,
        _state: ArrayView1<'_, f64>,
    ) -> Result<Array2<f64>, Self::Error> {
        Ok(array![[-self.rate]])
    }

    fn jacobian_wrt_external(
        &self,
        _external: ArrayView1<'_, f64>,
        _state: ArrayView1<'_, f64>,
    ) -> Result<Array2<f64>, Self::Error> {
        Ok(array![[1.0]])
    }

    fn declared_dependencies(&self) -> Dependencies {
        Dependencies::new(["u"], ["y"])
    }
}

/// A nonlinear two-state system driven by `[time, u, w]`:
///
/// ```text
/// da/dt = -0.5·a + u·b
/// db/dt = w - 0.2·b² + 0.1·time·a
/// ```
struct Coupled;

impl DifferentiableModel for Coupled {
    type Error = Infallible;

    fn state_len(&self) -> usize {
        2
    }

    fn external_len(&self) -> usize {
        3
    }

    fn derivative(
        &self,
        x: ArrayView1<'_, f64>,
        y: ArrayView1<'_, f64>,
    ) -> Result<Array1<f64>, Self::Error> {
        let (time, u, w) = (x[0], x[1], x[2]);
        let (a, b) = (y[0], y[1]);
        Ok(array![-0.5 * a + u * b, w - 0.2 * b * b + 0.1 * time * a])
    }

    fn jacobian_wrt_state(
        &self,
        x: ArrayView1<'_, f64>,
        y: ArrayView1<'_, f64>,
    ) -> Result<Array2<f64>, Self::Error> {
        let (time, u) = (x[0], x[1]);
        Ok(array![[-0.5, u], [0.1 * time, -0.4 * y[1]]])
    }

    fn jacobian_wrt_external(
        &self,
        _x: ArrayView1<'_, f64>,
        y: ArrayView1<'_, f64>,
    ) -> Result<Array2<f64>, Self::Error> {
        let (a, b) = (y[0], y[1]);
        Ok(array![[0.0, b, 0.0], [0.1 * a, 0.0, 1.0]])
    }

    fn declared_dependencies(&self) -> Dependencies {
        Dependencies::new(["time", "u", "w"], ["a", "b"])
    }
}

/// `dy/dt = y²`, which escapes to infinity in finite time.
struct Blowup;

impl DifferentiableModel for Blowup {
    type Error = Infallible;

    fn state_len(&self) -> usize {
        1
    }

    fn external_len(&self) -> usize {
        1
    }

    fn derivative(
        &self,
        _x: ArrayView1<'_, f64>,
        y: ArrayView1<'_, f64>,
    ) -> Result<Array1<f64>, Self::Error> {
        Ok(array![y[0] * y[0]])
    }

    fn jacobian_wrt_state(
        &self,
        _x: ArrayView1<'_, f64>,
        y: ArrayView1<'_, f64>,
    ) -> Result<Array2<f64>, Self::Error> {
        Ok(array![[2.0 * y[0]]])
    }

    fn jacobian_wrt_external(
        &self,
        _x: ArrayView1<'_, f64>,
        _y: ArrayView1<'_, f64>,
    ) -> Result<Array2<f64>, Self::Error> {
        Ok(array![[0.0]])
    }

    fn declared_dependencies(&self) -> Dependencies {
        Dependencies::new(["unused"], ["y"])
    }
}

#[derive(Debug, Error)]
#[error("state {0} is out of range")]
struct OutOfRange(f64);

/// Constant growth that refuses to evaluate above a ceiling.
struct Ceiling {
    limit: f64,
}

impl DifferentiableModel for Ceiling {
    type Error = OutOfRange;

    fn state_len(&self) -> usize {
        1
    }

    fn external_len(&self) -> usize {
        1
    }

    fn derivative(
        &self,
        _x: ArrayView1<'_, f64>,
        y: ArrayView1<'_, f64>,
    ) -> Result<Array1<f64>, Self::Error> {
        if y[0] > self.limit {
            return Err(OutOfRange(y[0]));
        }
        Ok(array![1.0])
    }

    fn jacobian_wrt_state(
        &self,
        _x: ArrayView1<'_, f64>,
        _y: ArrayView1<'_, f64>,
    ) -> Result<Array2<f64>, Self::Error> {
        Ok(array![[0.0]])
    }

    fn jacobian_wrt_external(
        &self,
        _x: ArrayView1<'_, f64>,
        _y: ArrayView1<'_, f64>,
    ) -> Result<Array2<f64>, Self::Error> {
        Ok(array![[0.0]])
    }

    fn declared_dependencies(&self) -> Dependencies {
        Dependencies::new(["unused"], ["y"])
    }
}

/// Returns a one-column derivative for a two-state model.
struct WrongShape;

impl DifferentiableModel for WrongShape {
    type Error = Infallible;

    fn state_len(&self) -> usize {
        2
    }

    fn external_len(&self) -> usize {
        1
    }

    fn derivative(
        &self,
        _x: ArrayView1<'_, f64>,
        _y: ArrayView1<'_, f64>,
    ) -> Result<Array1<f64>, Self::Error> {
        Ok(array![0.0])
    }

    fn jacobian_wrt_state(
        &self,
        _x: ArrayView1<'_, f64>,
        _y: ArrayView1<'_, f64>,
    ) -> Result<Array2<f64>, Self::Error> {
        Ok(Array2::zeros((2, 2)))
    }

    fn jacobian_wrt_external(
        &self,
        _x: ArrayView1<'_, f64>,
        _y: ArrayView1<'_, f64>,
    ) -> Result<Array2<f64>, Self::Error> {
        Ok(Array2::zeros((2, 1)))
    }

    fn declared_dependencies(&self) -> Dependencies {
        Dependencies::default()
    }
}

fn constant_inputs(grid: &TimeGrid, u: f64, y0: f64) -> Inputs {
    Inputs::new(Array2::from_elem((grid.len(), 1), u), array![y0])
}

/// Time-varying externals `[time, u(t), w(t)]` for [`Coupled`].
fn coupled_inputs(grid: &TimeGrid) -> Inputs {
    let mut externals = Array2::zeros((grid.len(), 3));
    for (mut row, &t) in externals.axis_iter_mut(Axis(0)).zip(grid.as_slice()) {
        row[0] = t;
        row[1] = 1.0 + 0.5 * (3.0 * t).sin();
        row[2] = 0.2 * (2.0 * t).cos();
    }
    Inputs::new(externals, array![1.0, 0.5])
}

fn final_error(h: f64) -> f64 {
    let model = LinearDecay { rate: 1.0 };
    let (y0, u) = (2.0, 0.5);
    let grid = TimeGrid::uniform(h, 2.0).unwrap();
    let end = grid.end();
    let exact = model.exact(y0, u, end);

    let result = SensitivityIntegrator::new(model, grid.clone())
        .integrate(&constant_inputs(&grid, u, y0))
        .unwrap();

    (result.final_state()[0] - exact).abs()
}

// --- Tests ---

#[test]
fn matches_closed_form_solution() {
    let model = LinearDecay { rate: 0.7 };
    let grid = TimeGrid::uniform(0.05, 3.0).unwrap();
    let integrator = SensitivityIntegrator::new(model, grid.clone());

    let result = integrator.integrate(&constant_inputs(&grid, 1.5, 0.0)).unwrap();

    assert_eq!(result.status, Status::Complete);
    assert_eq!(result.steps, grid.len() - 1);
    for (t, &time) in grid.as_slice().iter().enumerate() {
        let exact = integrator.model().exact(0.0, 1.5, time);
        assert_relative_eq!(result.trajectory[[t, 0]], exact, epsilon = 1e-7);
    }
}

#[test]
fn error_shrinks_fourth_order() {
    let coarse = final_error(0.2);
    let fine = final_error(0.1);
    let ratio = coarse / fine;

    assert!(coarse > 1e-10, "coarse error too small to measure: {coarse}");
    assert!(
        (14.0..18.0).contains(&ratio),
        "halving h should cut the error ~16×, got {ratio}"
    );
}

#[test]
fn initial_rows_are_identity_and_zero() {
    let grid = TimeGrid::uniform(0.1, 1.0).unwrap();
    let result = SensitivityIntegrator::new(Coupled, grid.clone())
        .integrate(&coupled_inputs(&grid))
        .unwrap();

    assert_eq!(
        result.d_initial.index_axis(Axis(0), 0),
        Array2::<f64>::eye(2)
    );
    assert!(
        result
            .d_external
            .index_axis(Axis(0), 0)
            .iter()
            .all(|&v| v == 0.0)
    );
}

#[test]
fn no_sensitivity_to_future_inputs() {
    let grid = TimeGrid::uniform(0.1, 1.0).unwrap();
    let n = grid.len();
    let result = SensitivityIntegrator::new(Coupled, grid.clone())
        .integrate(&coupled_inputs(&grid))
        .unwrap();

    for t in 0..n {
        for sample in t + 1..n {
            assert!(
                result
                    .d_external
                    .slice(s![t, .., sample, ..])
                    .iter()
                    .all(|&v| v == 0.0),
                "row {t} depends on future sample {sample}"
            );
        }
    }

    // The sample at the end of a step does drive that step.
    assert!(result.d_external[[1, 0, 1, 1]] != 0.0);
}

#[test]
fn external_sensitivities_match_finite_differences() {
    let grid = TimeGrid::uniform(0.1, 1.0).unwrap();
    let integrator = SensitivityIntegrator::new(Coupled, grid.clone());
    let inputs = coupled_inputs(&grid);
    let result = integrator.integrate(&inputs).unwrap();

    let eps = 1e-6;
    let n = grid.len();
    for sample in 0..n {
        for signal in 0..3 {
            let mut plus = inputs.clone();
            plus.externals[[sample, signal]] += eps;
            let mut minus = inputs.clone();
            minus.externals[[sample, signal]] -= eps;

            let up = integrator.integrate(&plus).unwrap().trajectory;
            let down = integrator.integrate(&minus).unwrap().trajectory;
            let fd = (up - down) / (2.0 * eps);

            let analytic = result.sensitivity(Parameter::External { signal, sample });
            for ((t, i), &expected) in fd.indexed_iter() {
                assert_abs_diff_eq!(analytic[[t, i]], expected, epsilon = 1e-7);
            }
        }
    }
}

#[test]
fn initial_state_sensitivities_match_finite_differences() {
    let grid = TimeGrid::uniform(0.1, 1.0).unwrap();
    let integrator = SensitivityIntegrator::new(Coupled, grid.clone());
    let inputs = coupled_inputs(&grid);
    let result = integrator.integrate(&inputs).unwrap();

    let eps = 1e-6;
    for component in 0..2 {
        let mut plus = inputs.clone();
        plus.initial_state[component] += eps;
        let mut minus = inputs.clone();
        minus.initial_state[component] -= eps;

        let up = integrator.integrate(&plus).unwrap().trajectory;
        let down = integrator.integrate(&minus).unwrap().trajectory;
        let fd = (up - down) / (2.0 * eps);

        let analytic = result.sensitivity(Parameter::InitialState { component });
        for ((t, i), &expected) in fd.indexed_iter() {
            assert_abs_diff_eq!(analytic[[t, i]], expected, epsilon = 1e-7);
        }
    }
}

#[test]
fn repeated_integrations_are_bit_identical() {
    let grid = TimeGrid::uniform(0.1, 1.0).unwrap();
    let integrator = SensitivityIntegrator::new(Coupled, grid.clone());
    let inputs = coupled_inputs(&grid);

    let first = integrator.integrate(&inputs).unwrap();
    let second = integrator.call(&inputs).unwrap();

    assert_eq!(first.trajectory, second.trajectory);
    assert_eq!(first.d_external, second.d_external);
    assert_eq!(first.d_initial, second.d_initial);
}

#[test]
fn non_uniform_grid_tracks_closed_form() {
    let model = LinearDecay { rate: 1.0 };
    let samples: Vec<f64> = (0..=20).map(|i| 0.1 * f64::from(i).powf(1.5) / 4.0).collect();
    let grid = TimeGrid::new(samples).unwrap();
    let integrator = SensitivityIntegrator::new(model, grid.clone());

    let result = integrator.integrate(&constant_inputs(&grid, 0.0, 1.0)).unwrap();

    assert_relative_eq!(
        result.final_state()[0],
        (-grid.end()).exp(),
        max_relative = 1e-4
    );
}

#[test]
fn gathers_sensitivities_for_selected_parameters() {
    let grid = TimeGrid::uniform(0.1, 1.0).unwrap();
    let result = SensitivityIntegrator::new(Coupled, grid.clone())
        .integrate(&coupled_inputs(&grid))
        .unwrap();

    let parameters = [
        Parameter::External {
            signal: 1,
            sample: 4,
        },
        Parameter::InitialState { component: 1 },
    ];
    let gathered = result.sensitivities(&parameters);

    assert_eq!(gathered.dim(), (grid.len(), 2, 2));
    assert_eq!(
        gathered.slice(s![.., .., 0]),
        result.d_external.slice(s![.., .., 4, 1])
    );
    assert_eq!(
        gathered.slice(s![.., .., 1]),
        result.d_initial.slice(s![.., .., 1])
    );
}

#[test]
fn rejects_mismatched_rows() {
    let grid = TimeGrid::uniform(0.1, 1.0).unwrap();
    let integrator = SensitivityIntegrator::new(LinearDecay { rate: 1.0 }, grid);
    let inputs = Inputs::new(Array2::zeros((5, 1)), array![0.0]);

    let error = integrator.integrate(&inputs).unwrap_err();

    assert!(matches!(
        error,
        Error::DimensionMismatch(DimensionError::ExternalRows { grid: 11, rows: 5 })
    ));
}

#[test]
fn rejects_mismatched_signals_and_state() {
    let grid = TimeGrid::uniform(0.1, 1.0).unwrap();
    let integrator = SensitivityIntegrator::new(Coupled, grid.clone());

    let wrong_signals = Inputs::new(Array2::zeros((grid.len(), 2)), array![1.0, 0.0]);
    assert!(matches!(
        integrator.integrate(&wrong_signals),
        Err(Error::DimensionMismatch(
            DimensionError::ExternalColumns {
                expected: 3,
                found: 2
            }
        ))
    ));

    let wrong_state = Inputs::new(Array2::zeros((grid.len(), 3)), array![1.0]);
    assert!(matches!(
        integrator.integrate(&wrong_state),
        Err(Error::DimensionMismatch(DimensionError::InitialState {
            expected: 2,
            found: 1
        }))
    ));
}

#[test]
fn rejects_non_increasing_samples() {
    let result = SensitivityIntegrator::from_samples(Coupled, vec![0.0, 2.0, 1.0]);

    assert!(matches!(
        result,
        Err(Error::DimensionMismatch(DimensionError::TimeGrid(_)))
    ));
}

#[test]
fn rejects_wrongly_shaped_model_output() {
    let grid = TimeGrid::uniform(1.0, 2.0).unwrap();
    let integrator = SensitivityIntegrator::new(WrongShape, grid.clone());
    let inputs = Inputs::new(Array2::zeros((grid.len(), 1)), array![0.0, 0.0]);

    assert!(matches!(
        integrator.integrate(&inputs),
        Err(Error::DimensionMismatch(DimensionError::ModelOutput {
            what: "derivative",
            ..
        }))
    ));
}

#[test]
fn reports_divergence_step() {
    let grid = TimeGrid::uniform(0.5, 10.0).unwrap();
    let integrator = SensitivityIntegrator::new(Blowup, grid.clone());

    let error = integrator
        .integrate(&constant_inputs(&grid, 0.0, 1.0))
        .unwrap_err();

    match error {
        Error::Diverged { step } => assert!(step > 1 && step < grid.len()),
        other => panic!("expected divergence, got {other}"),
    }
}

#[test]
fn propagates_model_errors() {
    let grid = TimeGrid::uniform(1.0, 10.0).unwrap();
    let integrator = SensitivityIntegrator::new(Ceiling { limit: 3.5 }, grid.clone());

    let error = integrator
        .integrate(&constant_inputs(&grid, 0.0, 0.0))
        .unwrap_err();

    assert!(matches!(error, Error::Model(_)));
    assert!(error.to_string().contains("out of range"));
}

#[test]
fn observer_can_stop_early() {
    let grid = TimeGrid::uniform(0.1, 1.0).unwrap();
    let integrator = SensitivityIntegrator::new(Coupled, grid.clone());

    let mut times = Vec::new();
    let observer = |event: &Event<'_>| {
        times.push(event.time);
        (event.step == 3).then_some(Action::StopEarly)
    };

    let result: Integration = integrator
        .integrate_observed(&coupled_inputs(&grid), observer)
        .unwrap();

    assert_eq!(result.status, Status::StoppedByObserver);
    assert_eq!(result.steps, 3);
    assert_eq!(result.trajectory.nrows(), 4);
    assert_eq!(result.d_external.dim(), (4, 2, grid.len(), 3));
    assert_eq!(result.time.len(), 4);
    assert_eq!(times.len(), 4);
    assert_relative_eq!(times[3], 0.3, epsilon = 1e-12);
}
