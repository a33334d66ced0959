use thiserror::Error;

/// Where the solver gets objective and constraint gradients.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-derive", derive(serde::Serialize, serde::Deserialize))]
pub enum GradientSource {
    /// Ask the problem for its analytic gradients.
    Analytic,

    /// Approximate gradients with forward differences.
    ///
    /// Each variable is perturbed by `step · max(|x|, 1)`.
    FiniteDifference { step: f64 },
}

/// Configuration for the SQP solver.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-derive", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    max_iters: usize,
    accuracy: f64,
    gradient_source: GradientSource,
    max_line_search_steps: usize,
}

/// Errors that can occur when validating an SQP solver config.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("accuracy must be finite and positive")]
    Accuracy,

    #[error("finite-difference step must be finite and positive")]
    FiniteDifferenceStep,

    #[error("line search needs at least one step")]
    LineSearchSteps,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_iters: 100,
            accuracy: 1e-9,
            gradient_source: GradientSource::Analytic,
            max_line_search_steps: 30,
        }
    }
}

impl Config {
    /// Creates a new config with a validated accuracy and gradient source.
    ///
    /// The line search is allowed 30 backtracking steps; use
    /// [`Config::with_line_search_steps`] to change it.
    ///
    /// # Errors
    ///
    /// Returns an error if `accuracy` or the finite-difference step is not
    /// finite and positive.
    pub fn new(
        max_iters: usize,
        accuracy: f64,
        gradient_source: GradientSource,
    ) -> Result<Self, ConfigError> {
        if !accuracy.is_finite() || accuracy <= 0.0 {
            return Err(ConfigError::Accuracy);
        }
        if let GradientSource::FiniteDifference { step } = gradient_source {
            if !step.is_finite() || step <= 0.0 {
                return Err(ConfigError::FiniteDifferenceStep);
            }
        }

        Ok(Self {
            max_iters,
            accuracy,
            gradient_source,
            ..Self::default()
        })
    }

    /// Sets the maximum number of backtracking steps per line search.
    ///
    /// # Errors
    ///
    /// Returns an error if `steps` is zero.
    pub fn with_line_search_steps(self, steps: usize) -> Result<Self, ConfigError> {
        if steps == 0 {
            return Err(ConfigError::LineSearchSteps);
        }
        Ok(Self {
            max_line_search_steps: steps,
            ..self
        })
    }

    /// Returns the maximum number of major iterations.
    #[must_use]
    pub fn max_iters(&self) -> usize {
        self.max_iters
    }

    /// Returns the tolerance on objective change and constraint violation.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        self.accuracy
    }

    #[must_use]
    pub fn gradient_source(&self) -> GradientSource {
        self.gradient_source
    }

    #[must_use]
    pub fn max_line_search_steps(&self) -> usize {
        self.max_line_search_steps
    }
}
