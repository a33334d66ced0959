use thiserror::Error;

/// Inclusive lower and upper limits on a decision variable.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-derive", derive(serde::Serialize, serde::Deserialize))]
pub struct Bounds {
    lower: f64,
    upper: f64,
}

/// Errors that can occur when constructing [`Bounds`].
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum BoundsError {
    #[error("bounds must not be NaN")]
    NaN,

    #[error("lower bound {lower} exceeds upper bound {upper}")]
    Inverted { lower: f64, upper: f64 },
}

impl Bounds {
    /// Creates bounds `[lower, upper]`.
    ///
    /// Infinite limits are allowed and leave that side unbounded.
    ///
    /// # Errors
    ///
    /// Returns an error if either limit is NaN or `lower > upper`.
    pub fn new(lower: f64, upper: f64) -> Result<Self, BoundsError> {
        if lower.is_nan() || upper.is_nan() {
            return Err(BoundsError::NaN);
        }
        if lower > upper {
            return Err(BoundsError::Inverted { lower, upper });
        }
        Ok(Self { lower, upper })
    }

    /// Bounds that admit every finite value.
    #[must_use]
    pub fn unbounded() -> Self {
        Self {
            lower: f64::NEG_INFINITY,
            upper: f64::INFINITY,
        }
    }

    #[must_use]
    pub fn lower(&self) -> f64 {
        self.lower
    }

    #[must_use]
    pub fn upper(&self) -> f64 {
        self.upper
    }

    /// Returns `true` if `x` lies within the bounds.
    #[must_use]
    pub fn contains(&self, x: f64) -> bool {
        x >= self.lower && x <= self.upper
    }

    /// Projects `x` onto the bounds.
    #[must_use]
    pub fn clamp(&self, x: f64) -> f64 {
        x.clamp(self.lower, self.upper)
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::unbounded()
    }
}
