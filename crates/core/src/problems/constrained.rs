use ndarray::{Array1, Array2};

use crate::Bounds;

/// Defines an equality-constrained optimization problem.
///
/// A constrained problem maps decision variables `x` to a model input, then
/// computes an objective and equality constraints `c(x) = 0` from the model
/// input and output. Solvers search for the `x` within [`bounds`] that
/// minimizes the objective while driving the constraints to zero.
///
/// The number of decision variables is the length of [`bounds`].
///
/// The gradient methods are only called when a solver is configured to use
/// analytic gradients. Problems whose model carries sensitivities (such as an
/// integrated trajectory) should compute them from the output rather than by
/// re-evaluating the model.
///
/// [`bounds`]: ConstrainedProblem::bounds
pub trait ConstrainedProblem {
    type Input;
    type Output;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Bounds for each decision variable.
    fn bounds(&self) -> &[Bounds];

    /// Number of equality constraints.
    fn constraint_count(&self) -> usize;

    /// Number of decision variables.
    fn dimension(&self) -> usize {
        self.bounds().len()
    }

    /// Maps decision variables (`x`) into a model input.
    ///
    /// The returned input must be built entirely from `x` and the problem's
    /// fixed data, never by mutating a previous input.
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the input cannot be constructed from `x`.
    fn input(&self, x: &[f64]) -> Result<Self::Input, Self::Error>;

    /// Computes the objective value from model input/output.
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the objective cannot be computed.
    fn objective(&self, input: &Self::Input, output: &Self::Output) -> Result<f64, Self::Error>;

    /// Computes the equality constraint values from model input/output.
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the constraints cannot be computed.
    fn constraints(
        &self,
        input: &Self::Input,
        output: &Self::Output,
    ) -> Result<Array1<f64>, Self::Error>;

    /// Computes the objective gradient with respect to `x`.
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the gradient cannot be computed.
    fn objective_gradient(
        &self,
        input: &Self::Input,
        output: &Self::Output,
    ) -> Result<Array1<f64>, Self::Error>;

    /// Computes the constraint Jacobian (constraints × variables).
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the Jacobian cannot be computed.
    fn constraint_jacobian(
        &self,
        input: &Self::Input,
        output: &Self::Output,
    ) -> Result<Array2<f64>, Self::Error>;
}
