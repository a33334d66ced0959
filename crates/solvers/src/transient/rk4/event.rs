use ndarray::ArrayView1;

/// Event emitted by the RK4 integrator for each trajectory sample.
///
/// Step 0 is the initial state before any integration.
/// Steps 1..N-1 are emitted after each integration step.
#[derive(Debug, Clone)]
pub struct Event<'a> {
    /// The step number (0 for the initial state).
    pub step: usize,

    /// Time at this sample.
    pub time: f64,

    /// State at this sample.
    pub state: ArrayView1<'a, f64>,
}
