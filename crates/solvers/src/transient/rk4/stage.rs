//! Linearization of a single RK4 step.
//!
//! With externals `x_l = external[t]`, `x_r = external[t + 1]` and their
//! midpoint `x_m`, one step from state `y` with size `h` is
//!
//! ```text
//! k1 = f(x_l, y)
//! k2 = f(x_m, y + h/2·k1)
//! k3 = f(x_m, y + h/2·k2)
//! k4 = f(x_r, y + h·k3)
//! y⁺ = y + h/6·(k1 + 2·k2 + 2·k3 + k4)
//! ```
//!
//! Differentiating the same four stages gives the tangent map
//!
//! ```text
//! ∂y⁺/∂y   = I + h/6·(K1 + 2·K2 + 2·K3 + K4)
//! ∂y⁺/∂x_l = h/6·(L1 + 2·L2 + 2·L3 + L4)
//! ∂y⁺/∂x_r = h/6·(R1 + 2·R2 + 2·R3 + R4)
//! ```
//!
//! where `K`, `L`, `R` are stage tangents built from `∂f/∂y` and `∂f/∂x` at
//! the stage points, with `x_m` contributing half to each side. The result is
//! the exact derivative of the discrete map, so it agrees with finite
//! differences of a re-integration.

use ndarray::{Array1, Array2, ArrayView1};

use tangent_core::DifferentiableModel;

use super::{DimensionError, Error};

/// Weight of `x_l` and `x_r` in the external value used by each stage.
const LEFT_WEIGHTS: [f64; 4] = [1.0, 0.5, 0.5, 0.0];
const RIGHT_WEIGHTS: [f64; 4] = [0.0, 0.5, 0.5, 1.0];

/// Step fractions at which stages 2..4 sample the state.
const STAGE_FRACTIONS: [f64; 3] = [0.5, 0.5, 1.0];

/// Combination weights of the four stages.
const STAGE_WEIGHTS: [f64; 4] = [1.0, 2.0, 2.0, 1.0];

/// State update and tangent map for one step.
pub(super) struct LinearizedStep {
    /// State at the end of the step.
    pub(super) next_state: Array1<f64>,

    /// `∂y⁺/∂y` (M×M).
    pub(super) transition: Array2<f64>,

    /// `∂y⁺/∂external[t]` (M×K).
    pub(super) forcing_left: Array2<f64>,

    /// `∂y⁺/∂external[t + 1]` (M×K).
    pub(super) forcing_right: Array2<f64>,
}

/// Model evaluations at one stage point.
struct Stage {
    derivative: Array1<f64>,
    jac_state: Array2<f64>,
    jac_external: Array2<f64>,
}

impl LinearizedStep {
    /// Advances `state` by one step of size `h` and linearizes the step.
    pub(super) fn compute<M: DifferentiableModel>(
        model: &M,
        h: f64,
        left: ArrayView1<'_, f64>,
        right: ArrayView1<'_, f64>,
        state: ArrayView1<'_, f64>,
    ) -> Result<Self, Error> {
        let m = model.state_len();
        let k = model.external_len();
        let middle = (&left + &right) * 0.5;
        let externals = [left.view(), middle.view(), middle.view(), right.view()];

        // Forward pass: stage derivatives and Jacobians at each stage point.
        let mut stages: Vec<Stage> = Vec::with_capacity(4);
        for (i, external) in externals.iter().enumerate() {
            let stage_state = match i {
                0 => state.to_owned(),
                _ => &state + &(&stages[i - 1].derivative * (STAGE_FRACTIONS[i - 1] * h)),
            };
            stages.push(Stage::evaluate(model, *external, stage_state.view(), m, k)?);
        }

        let mut increment = Array1::<f64>::zeros(m);
        for (stage, weight) in stages.iter().zip(STAGE_WEIGHTS) {
            increment.scaled_add(weight, &stage.derivative);
        }
        let next_state = &state + &(increment * (h / 6.0));

        let transition = propagate(&stages, h, Array2::eye(m), |_| None) + Array2::<f64>::eye(m);
        let forcing_left = propagate(&stages, h, Array2::zeros((m, k)), |i| {
            Some(&stages[i].jac_external * LEFT_WEIGHTS[i])
        });
        let forcing_right = propagate(&stages, h, Array2::zeros((m, k)), |i| {
            Some(&stages[i].jac_external * RIGHT_WEIGHTS[i])
        });

        Ok(Self {
            next_state,
            transition,
            forcing_left,
            forcing_right,
        })
    }
}

impl Stage {
    fn evaluate<M: DifferentiableModel>(
        model: &M,
        external: ArrayView1<'_, f64>,
        state: ArrayView1<'_, f64>,
        m: usize,
        k: usize,
    ) -> Result<Self, Error> {
        let derivative = model.derivative(external, state).map_err(Error::model)?;
        check_shape("derivative", (derivative.len(), 1), (m, 1))?;

        let jac_state = model
            .jacobian_wrt_state(external, state)
            .map_err(Error::model)?;
        check_shape("state Jacobian", jac_state.dim(), (m, m))?;

        let jac_external = model
            .jacobian_wrt_external(external, state)
            .map_err(Error::model)?;
        check_shape("external Jacobian", jac_external.dim(), (m, k))?;

        Ok(Self {
            derivative,
            jac_state,
            jac_external,
        })
    }
}

/// Pushes a seed tangent through the four stages and combines them.
///
/// `seed` is the tangent of the step's starting state (identity for the
/// transition, zero for the external forcing). `source(i)` is an extra
/// direct contribution to stage `i`, used for the external Jacobians.
/// Returns `h/6·Σ wᵢ·Tᵢ`, the increment's tangent.
fn propagate<F>(stages: &[Stage], h: f64, seed: Array2<f64>, source: F) -> Array2<f64>
where
    F: Fn(usize) -> Option<Array2<f64>>,
{
    let mut combined = Array2::<f64>::zeros(seed.dim());
    let mut previous: Option<Array2<f64>> = None;

    for (i, stage) in stages.iter().enumerate() {
        let stage_input = match &previous {
            None => seed.clone(),
            Some(prev) => &seed + &(prev * (STAGE_FRACTIONS[i - 1] * h)),
        };
        let mut tangent = stage.jac_state.dot(&stage_input);
        if let Some(direct) = source(i) {
            tangent += &direct;
        }
        combined.scaled_add(STAGE_WEIGHTS[i], &tangent);
        previous = Some(tangent);
    }

    combined * (h / 6.0)
}

fn check_shape(
    what: &'static str,
    found: (usize, usize),
    expected: (usize, usize),
) -> Result<(), DimensionError> {
    if found == expected {
        Ok(())
    } else {
        Err(DimensionError::ModelOutput {
            what,
            expected,
            found,
        })
    }
}
