use ndarray::{Array1, Array2};
use thiserror::Error;

use tangent_core::{Bounds, ConstrainedProblem, Model, Snapshot};

/// The result of evaluating a constrained problem at a given `x`.
#[derive(Debug, Clone)]
pub struct Evaluation<I, O> {
    pub x: Vec<f64>,

    pub objective: f64,

    pub constraints: Array1<f64>,

    pub snapshot: Snapshot<I, O>,
}

impl<I, O> Evaluation<I, O> {
    /// Largest absolute constraint value.
    #[must_use]
    pub fn violation(&self) -> f64 {
        self.constraints.iter().fold(0.0, |max, c| max.max(c.abs()))
    }
}

/// Objective gradient and constraint Jacobian at an evaluated point.
#[derive(Debug, Clone, PartialEq)]
pub struct Gradients {
    /// `∂objective/∂x` (length n).
    pub objective: Array1<f64>,

    /// `∂constraints/∂x` (m×n).
    pub constraints: Array2<f64>,
}

/// Errors that can occur when evaluating a constrained problem.
#[derive(Debug, Error)]
pub enum EvalError<ME, PE> {
    /// The model call failed.
    #[error("model call failed")]
    Model(#[source] ME),

    /// Failed to construct input or compute the objective or constraints.
    #[error("problem error")]
    Problem(#[source] PE),
}

/// Evaluates the model in the context of a constrained problem.
///
/// This function maps `x` to model input, calls the model, then computes the
/// objective and constraints from the input and output.
///
/// # Errors
///
/// Returns an error if input mapping, the model call, or the objective or
/// constraint computation fails.
pub fn evaluate<M, P>(
    model: &M,
    problem: &P,
    x: &[f64],
) -> Result<Evaluation<M::Input, M::Output>, EvalError<M::Error, P::Error>>
where
    M: Model,
    P: ConstrainedProblem<Input = M::Input, Output = M::Output>,
{
    let input = problem.input(x).map_err(EvalError::Problem)?;
    let output = model.call(&input).map_err(EvalError::Model)?;
    let objective = problem
        .objective(&input, &output)
        .map_err(EvalError::Problem)?;
    let constraints = problem
        .constraints(&input, &output)
        .map_err(EvalError::Problem)?;

    Ok(Evaluation {
        x: x.to_vec(),
        objective,
        constraints,
        snapshot: Snapshot::new(input, output),
    })
}

/// Asks the problem for its analytic gradients at an evaluated point.
///
/// # Errors
///
/// Returns the problem's error if either gradient cannot be computed.
pub fn analytic_gradients<P>(
    problem: &P,
    snapshot: &Snapshot<P::Input, P::Output>,
) -> Result<Gradients, P::Error>
where
    P: ConstrainedProblem,
{
    Ok(Gradients {
        objective: problem.objective_gradient(&snapshot.input, &snapshot.output)?,
        constraints: problem.constraint_jacobian(&snapshot.input, &snapshot.output)?,
    })
}

/// Approximates gradients with forward differences around `base`.
///
/// Variable `j` is perturbed by `step · max(|x_j|, 1)`, stepping backwards
/// instead when the forward point would leave the bounds. Costs one model
/// evaluation per variable.
///
/// # Errors
///
/// Returns an error if any perturbed evaluation fails.
pub fn finite_difference_gradients<M, P>(
    model: &M,
    problem: &P,
    base: &Evaluation<M::Input, M::Output>,
    step: f64,
) -> Result<Gradients, EvalError<M::Error, P::Error>>
where
    M: Model,
    P: ConstrainedProblem<Input = M::Input, Output = M::Output>,
{
    let n = base.x.len();
    let m = base.constraints.len();
    let bounds = problem.bounds();

    let mut objective = Array1::zeros(n);
    let mut constraints = Array2::zeros((m, n));

    for j in 0..n {
        let delta = perturbation(base.x[j], step, bounds.get(j).copied());
        let mut x = base.x.clone();
        x[j] += delta;

        let perturbed = evaluate(model, problem, &x)?;
        objective[j] = (perturbed.objective - base.objective) / delta;
        let column = (&perturbed.constraints - &base.constraints) / delta;
        constraints.column_mut(j).assign(&column);
    }

    Ok(Gradients {
        objective,
        constraints,
    })
}

fn perturbation(x: f64, step: f64, bounds: Option<Bounds>) -> f64 {
    let delta = step * x.abs().max(1.0);
    match bounds {
        Some(bounds) if x + delta > bounds.upper() => -delta,
        _ => delta,
    }
}
