use thiserror::Error;

/// An immutable, strictly increasing sequence of non-negative time samples.
///
/// Steps between samples need not be equal; integrators take each step size
/// as `samples[t + 1] - samples[t]`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde-derive", derive(serde::Serialize))]
pub struct TimeGrid {
    samples: Vec<f64>,
}

/// Errors that can occur when validating a time grid.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum TimeGridError {
    #[error("time grid needs at least two samples, got {len}")]
    TooShort { len: usize },

    #[error("time sample {index} is not finite")]
    NonFinite { index: usize },

    #[error("time sample {index} is negative")]
    Negative { index: usize },

    #[error("time sample {index} does not increase on the previous sample")]
    NotIncreasing { index: usize },

    #[error("step size must be finite and positive, got {step}")]
    InvalidStep { step: f64 },

    #[error("uniform grid would need {intervals} steps, more than {max}", max = TimeGrid::MAX_SAMPLES - 1)]
    TooManySamples { intervals: f64 },
}

impl TimeGrid {
    /// Largest number of samples [`TimeGrid::uniform`] will generate.
    pub const MAX_SAMPLES: usize = 1 << 24;

    /// Creates a grid from explicit samples.
    ///
    /// # Errors
    ///
    /// Returns an error if there are fewer than two samples, or if any sample
    /// is non-finite, negative, or not greater than its predecessor.
    pub fn new(samples: Vec<f64>) -> Result<Self, TimeGridError> {
        if samples.len() < 2 {
            return Err(TimeGridError::TooShort { len: samples.len() });
        }

        for (index, &t) in samples.iter().enumerate() {
            if !t.is_finite() {
                return Err(TimeGridError::NonFinite { index });
            }
            if t < 0.0 {
                return Err(TimeGridError::Negative { index });
            }
            if index > 0 && t <= samples[index - 1] {
                return Err(TimeGridError::NotIncreasing { index });
            }
        }

        Ok(Self { samples })
    }

    /// Creates a uniform grid `0, step, 2·step, …` whose last sample is the
    /// largest multiple of `step` not exceeding `end`.
    ///
    /// # Errors
    ///
    /// Returns an error if `step` is not finite and positive, or if the
    /// resulting grid would have fewer than two or more than
    /// [`TimeGrid::MAX_SAMPLES`] samples.
    pub fn uniform(step: f64, end: f64) -> Result<Self, TimeGridError> {
        if !step.is_finite() || step <= 0.0 {
            return Err(TimeGridError::InvalidStep { step });
        }
        if !end.is_finite() {
            return Err(TimeGridError::NonFinite { index: 0 });
        }

        // Tolerate round-off so that `end` itself is included when it is a
        // multiple of `step`.
        let intervals = (end / step + 1e-9).floor().max(0.0);

        #[allow(clippy::cast_precision_loss)]
        let max = Self::MAX_SAMPLES as f64;
        if intervals >= max {
            return Err(TimeGridError::TooManySamples { intervals });
        }

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let count = intervals as usize + 1;

        #[allow(clippy::cast_precision_loss)]
        let samples = (0..count).map(|i| i as f64 * step).collect();

        Self::new(samples)
    }

    /// Number of samples (`N`).
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always `false`; a valid grid has at least two samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Size of the step from sample `index` to sample `index + 1`.
    ///
    /// # Panics
    ///
    /// Panics if `index + 1` is out of range.
    #[must_use]
    pub fn step(&self, index: usize) -> f64 {
        self.samples[index + 1] - self.samples[index]
    }

    /// First sample.
    #[must_use]
    pub fn start(&self) -> f64 {
        self.samples[0]
    }

    /// Last sample.
    #[must_use]
    pub fn end(&self) -> f64 {
        self.samples[self.samples.len() - 1]
    }

    /// The samples as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.samples
    }
}

impl AsRef<[f64]> for TimeGrid {
    fn as_ref(&self) -> &[f64] {
        &self.samples
    }
}

impl TryFrom<Vec<f64>> for TimeGrid {
    type Error = TimeGridError;

    fn try_from(samples: Vec<f64>) -> Result<Self, Self::Error> {
        Self::new(samples)
    }
}
