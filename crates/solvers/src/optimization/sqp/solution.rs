use ndarray::Array1;
use tangent_core::Snapshot;

/// How an SQP solve finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Objective change and constraint violation are both below the accuracy.
    Converged,

    /// Reached the iteration limit without converging.
    IterationLimitReached,

    /// The constraints could not be satisfied from the current iterate.
    ConstraintInfeasible,

    /// The line search could not reduce the merit function from a feasible
    /// iterate.
    Stalled,

    /// Stopped early due to an observer decision.
    StoppedByObserver,
}

/// The result of an SQP solve.
///
/// Unless the status is [`Status::Converged`], the reported point is the last
/// accepted iterate, which is the best found by the solver's merit function.
#[derive(Debug, Clone)]
pub struct Solution<I, O> {
    pub status: Status,

    /// Decision variables at the reported point.
    pub x: Vec<f64>,

    pub objective: f64,

    pub constraints: Array1<f64>,

    /// Largest absolute constraint value at the reported point.
    pub violation: f64,

    pub snapshot: Snapshot<I, O>,

    /// Major iterations completed.
    pub iters: usize,

    /// Total model evaluations, including line search and finite differences.
    pub evaluations: usize,
}
