//! An observer that enforces an iteration and wall-clock budget.

use std::time::{Duration, Instant};

use tangent_core::Observer;
use tracing::debug;

use crate::traits::{CanStopEarly, HasIteration};

/// Stops a solver once either budget is spent.
///
/// The iteration budget is compared against [`HasIteration::iteration`], so
/// repeated events within one iteration count once. The clock starts when the
/// budget is created; call [`Budget::restart`] to reuse it for another solve.
///
/// ```rust
/// use std::time::Duration;
///
/// use tangent_observers::Budget;
///
/// let budget = Budget::new(50, Duration::from_secs(10));
/// assert_eq!(budget.max_iters(), Some(50));
/// ```
#[derive(Debug, Clone)]
pub struct Budget {
    max_iters: Option<usize>,
    max_duration: Option<Duration>,
    started: Instant,
}

impl Budget {
    /// Creates a budget limited by both iterations and elapsed time.
    #[must_use]
    pub fn new(max_iters: usize, max_duration: Duration) -> Self {
        Self {
            max_iters: Some(max_iters),
            max_duration: Some(max_duration),
            started: Instant::now(),
        }
    }

    /// Creates a budget limited only by iterations.
    #[must_use]
    pub fn iterations(max_iters: usize) -> Self {
        Self {
            max_iters: Some(max_iters),
            max_duration: None,
            started: Instant::now(),
        }
    }

    /// Creates a budget limited only by elapsed time.
    #[must_use]
    pub fn duration(max_duration: Duration) -> Self {
        Self {
            max_iters: None,
            max_duration: Some(max_duration),
            started: Instant::now(),
        }
    }

    #[must_use]
    pub fn max_iters(&self) -> Option<usize> {
        self.max_iters
    }

    #[must_use]
    pub fn max_duration(&self) -> Option<Duration> {
        self.max_duration
    }

    /// Time elapsed since the budget was created or last restarted.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Restarts the clock.
    pub fn restart(&mut self) {
        self.started = Instant::now();
    }

    /// Returns `true` if `iteration` or the elapsed time exceeds the budget.
    #[must_use]
    pub fn is_spent(&self, iteration: usize) -> bool {
        let iters_spent = self.max_iters.is_some_and(|max| iteration >= max);
        let time_spent = self
            .max_duration
            .is_some_and(|max| self.started.elapsed() >= max);
        iters_spent || time_spent
    }
}

impl<E, A> Observer<E, A> for Budget
where
    E: HasIteration,
    A: CanStopEarly,
{
    fn observe(&mut self, event: &E) -> Option<A> {
        let iteration = event.iteration();
        if self.is_spent(iteration) {
            debug!(iteration, elapsed = ?self.elapsed(), "budget spent, stopping early");
            Some(A::stop_early())
        } else {
            None
        }
    }
}
