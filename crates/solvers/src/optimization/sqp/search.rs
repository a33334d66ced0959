use nalgebra::{DMatrix, DVector};
use ndarray::{Array1, Array2};
use tangent_core::{Bounds, ConstrainedProblem, Model, Observer};
use tracing::{debug, warn};

use crate::optimization::{
    EvalError, Evaluation, Gradients, analytic_gradients, evaluate, finite_difference_gradients,
};

use super::{
    Action, Config, Error, Event, GradientSource, Solution, Status, bfgs, qp,
};

/// Sufficient decrease factor for the merit line search.
const ARMIJO: f64 = 1e-4;

/// Step length reduction per backtracking step.
const BACKTRACK: f64 = 0.5;

/// Relative step size below which a search direction counts as zero.
const NEGLIGIBLE_STEP: f64 = 1e-10;

/// An accepted point with its gradients.
struct Iterate<I, O> {
    eval: Evaluation<I, O>,
    gradients: Gradients,
}

impl<I, O> Iterate<I, O> {
    fn into_solution(self, status: Status, iters: usize, evaluations: usize) -> Solution<I, O> {
        let violation = self.eval.violation();
        Solution {
            status,
            x: self.eval.x,
            objective: self.eval.objective,
            constraints: self.eval.constraints,
            violation,
            snapshot: self.eval.snapshot,
            iters,
            evaluations,
        }
    }

    /// Gradient of the Lagrangian `f + νᵀc` for the given multipliers.
    fn lagrangian_gradient(&self, multipliers: &DVector<f64>) -> DVector<f64> {
        to_vector(&self.gradients.objective)
            + to_matrix(&self.gradients.constraints).transpose() * multipliers
    }

    fn emit<M, P, Obs>(&self, iter: usize, observer: &mut Obs) -> Option<Action>
    where
        M: Model<Input = I, Output = O>,
        P: ConstrainedProblem<Input = I, Output = O>,
        Obs: for<'a> Observer<Event<'a, M, P>, Action>,
    {
        let event = Event::Iterated {
            iter,
            x: &self.eval.x,
            objective: self.eval.objective,
            violation: self.eval.violation(),
            input: &self.eval.snapshot.input,
            output: &self.eval.snapshot.output,
        };
        observer.observe(&event)
    }
}

pub(super) fn search<M, P, Obs>(
    model: &M,
    problem: &P,
    x0: &[f64],
    config: &Config,
    mut observer: Obs,
) -> Result<Solution<M::Input, M::Output>, Error>
where
    M: Model,
    P: ConstrainedProblem<Input = M::Input, Output = M::Output>,
    Obs: for<'a> Observer<Event<'a, M, P>, Action>,
{
    let bounds = problem.bounds();
    let n = bounds.len();
    let m = problem.constraint_count();
    if x0.len() != n {
        return Err(Error::InvalidStart {
            expected: n,
            found: x0.len(),
        });
    }

    let start: Vec<f64> = x0.iter().zip(bounds).map(|(&x, b)| b.clamp(x)).collect();
    let mut evaluations = 1;
    let eval = match evaluate(model, problem, &start) {
        Ok(eval) => eval,
        Err(err) => {
            // The solve ends here either way, so the observer's action is moot.
            Event::<M, P>::emit_failure(0, &start, &err, &mut observer);
            return Err(err.into());
        }
    };
    check_constraints(&eval, m)?;
    let start_gradients = gradients(model, problem, &eval, config, &mut evaluations)?;
    let mut iterate = Iterate {
        eval,
        gradients: start_gradients,
    };

    debug!(
        objective = iterate.eval.objective,
        violation = iterate.eval.violation(),
        "sqp start"
    );
    if let Some(Action::StopEarly) = iterate.emit::<M, P, _>(0, &mut observer) {
        return Ok(iterate.into_solution(Status::StoppedByObserver, 0, evaluations));
    }

    let accuracy = config.accuracy();
    let mut hessian = DMatrix::<f64>::identity(n, n);
    let mut penalty = DVector::<f64>::zeros(m);

    for iter in 1..=config.max_iters() {
        let gradient = to_vector(&iterate.gradients.objective);
        let jacobian = to_matrix(&iterate.gradients.constraints);
        let constraints = to_vector(&iterate.eval.constraints);
        let x = &iterate.eval.x;

        let step = match qp::solve(&hessian, &gradient, &jacobian, &constraints, x, bounds) {
            Some(step) => step,
            None => {
                hessian = DMatrix::identity(n, n);
                match qp::solve(&hessian, &gradient, &jacobian, &constraints, x, bounds) {
                    Some(step) => step,
                    None => {
                        warn!(iter, "linearized constraints are inconsistent");
                        return Ok(iterate.into_solution(
                            Status::ConstraintInfeasible,
                            iter - 1,
                            evaluations,
                        ));
                    }
                }
            }
        };

        for (mu, nu) in penalty.iter_mut().zip(step.multipliers.iter()) {
            *mu = nu.abs().max(0.5 * (*mu + nu.abs()));
        }

        let violation = iterate.eval.violation();
        let merit_start = merit(iterate.eval.objective, &iterate.eval.constraints, &penalty);
        let slope = gradient.dot(&step.direction)
            - penalty
                .iter()
                .zip(constraints.iter())
                .map(|(mu, c)| mu * c.abs())
                .sum::<f64>();
        let x_scale = 1.0 + x.iter().fold(0.0_f64, |max, v| max.max(v.abs()));
        let negligible = step.direction.amax() <= NEGLIGIBLE_STEP * x_scale;

        if slope >= 0.0 || negligible {
            let status = if violation <= accuracy {
                Status::Converged
            } else {
                warn!(iter, violation, "no descent direction for an infeasible iterate");
                Status::ConstraintInfeasible
            };
            return Ok(iterate.into_solution(status, iter - 1, evaluations));
        }

        let mut alpha = 1.0;
        let mut accepted = None;
        for _ in 0..config.max_line_search_steps() {
            let trial_x = trial_point(x, &step.direction, alpha, bounds);
            evaluations += 1;
            match evaluate(model, problem, &trial_x) {
                Ok(trial) => {
                    check_constraints(&trial, m)?;
                    let merit_trial = merit(trial.objective, &trial.constraints, &penalty);
                    if merit_trial <= merit_start + ARMIJO * alpha * slope {
                        accepted = Some(trial);
                        break;
                    }
                }
                Err(err) => {
                    debug!(iter, alpha, "trial point failed, backtracking");
                    if let Some(Action::StopEarly) =
                        Event::<M, P>::emit_failure(iter, &trial_x, &err, &mut observer)
                    {
                        return Ok(iterate.into_solution(
                            Status::StoppedByObserver,
                            iter - 1,
                            evaluations,
                        ));
                    }
                }
            }
            alpha *= BACKTRACK;
        }

        let Some(trial) = accepted else {
            let status = if violation > accuracy {
                Status::ConstraintInfeasible
            } else {
                Status::Stalled
            };
            warn!(iter, violation, ?status, "line search failed to reduce the merit function");
            return Ok(iterate.into_solution(status, iter - 1, evaluations));
        };

        let trial_gradients = gradients(model, problem, &trial, config, &mut evaluations)?;
        let next = Iterate {
            eval: trial,
            gradients: trial_gradients,
        };

        let s = DVector::from_iterator(
            n,
            next.eval.x.iter().zip(x.iter()).map(|(new, old)| new - old),
        );
        let y = next.lagrangian_gradient(&step.multipliers)
            - iterate.lagrangian_gradient(&step.multipliers);
        bfgs::update(&mut hessian, &s, &y, iter == 1);

        let objective_change = (next.eval.objective - iterate.eval.objective).abs();
        iterate = next;

        debug!(
            iter,
            alpha,
            objective = iterate.eval.objective,
            violation = iterate.eval.violation(),
            "sqp step accepted"
        );
        if let Some(Action::StopEarly) = iterate.emit::<M, P, _>(iter, &mut observer) {
            return Ok(iterate.into_solution(Status::StoppedByObserver, iter, evaluations));
        }

        if objective_change < accuracy && iterate.eval.violation() < accuracy {
            return Ok(iterate.into_solution(Status::Converged, iter, evaluations));
        }
    }

    warn!(
        max_iters = config.max_iters(),
        violation = iterate.eval.violation(),
        "sqp reached the iteration limit"
    );
    let iters = config.max_iters();
    Ok(iterate.into_solution(Status::IterationLimitReached, iters, evaluations))
}

/// Computes gradients from the configured source, counting model calls.
fn gradients<M, P>(
    model: &M,
    problem: &P,
    eval: &Evaluation<M::Input, M::Output>,
    config: &Config,
    evaluations: &mut usize,
) -> Result<Gradients, Error>
where
    M: Model,
    P: ConstrainedProblem<Input = M::Input, Output = M::Output>,
{
    let gradients = match config.gradient_source() {
        GradientSource::Analytic => analytic_gradients(problem, &eval.snapshot)
            .map_err(EvalError::<M::Error, P::Error>::Problem)?,
        GradientSource::FiniteDifference { step } => {
            *evaluations += eval.x.len();
            finite_difference_gradients(model, problem, eval, step)?
        }
    };

    let n = eval.x.len();
    let m = eval.constraints.len();
    if gradients.objective.len() != n {
        return Err(Error::ShapeMismatch {
            what: "objective gradient",
            expected: (n, 1),
            found: (gradients.objective.len(), 1),
        });
    }
    if gradients.constraints.dim() != (m, n) {
        return Err(Error::ShapeMismatch {
            what: "constraint Jacobian",
            expected: (m, n),
            found: gradients.constraints.dim(),
        });
    }

    Ok(gradients)
}

fn check_constraints<I, O>(eval: &Evaluation<I, O>, m: usize) -> Result<(), Error> {
    if eval.constraints.len() == m {
        Ok(())
    } else {
        Err(Error::ShapeMismatch {
            what: "constraints",
            expected: (m, 1),
            found: (eval.constraints.len(), 1),
        })
    }
}

/// L1 merit function `f + Σ μᵢ|cᵢ|`.
fn merit(objective: f64, constraints: &Array1<f64>, penalty: &DVector<f64>) -> f64 {
    objective
        + constraints
            .iter()
            .zip(penalty.iter())
            .map(|(c, mu)| mu * c.abs())
            .sum::<f64>()
}

fn trial_point(x: &[f64], direction: &DVector<f64>, alpha: f64, bounds: &[Bounds]) -> Vec<f64> {
    x.iter()
        .zip(direction.iter())
        .zip(bounds)
        .map(|((&x, &d), b)| b.clamp(x + alpha * d))
        .collect()
}

fn to_vector(values: &Array1<f64>) -> DVector<f64> {
    DVector::from_iterator(values.len(), values.iter().copied())
}

fn to_matrix(values: &Array2<f64>) -> DMatrix<f64> {
    let (rows, cols) = values.dim();
    DMatrix::from_fn(rows, cols, |i, j| values[[i, j]])
}
