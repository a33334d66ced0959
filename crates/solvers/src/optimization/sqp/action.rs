/// Actions an observer can return to steer the SQP solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Stop and return the current iterate.
    StopEarly,
}
