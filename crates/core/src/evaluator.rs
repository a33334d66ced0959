use ndarray::{Array1, Array2, ArrayView2, ArrayView3};

/// Maps a state trajectory to a scalar and its gradient.
///
/// Evaluators translate an integrated trajectory (N×M) into an objective or
/// constraint value. Gradients with respect to decision variables come from
/// the chain rule over the integrator's sensitivities rather than from an
/// independent derivative computation:
///
/// ```text
/// d(value)/d(p) = Σ_t Σ_i ∂value/∂state[t, i] · ∂state[t, i]/∂p
/// ```
pub trait TrajectoryEvaluator {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Computes the value for a trajectory.
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the trajectory does not fit the evaluator.
    fn value(&self, trajectory: ArrayView2<'_, f64>) -> Result<f64, Self::Error>;

    /// Computes `∂value/∂state[t, i]` for every trajectory entry (N×M).
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the trajectory does not fit the evaluator.
    fn state_gradient(&self, trajectory: ArrayView2<'_, f64>) -> Result<Array2<f64>, Self::Error>;

    /// Computes the gradient with respect to `P` decision variables.
    ///
    /// `sensitivities` has shape N×M×P and holds `∂state[t, i]/∂p`.
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the trajectory does not fit the evaluator.
    ///
    /// # Panics
    ///
    /// Panics if the leading dimensions of `sensitivities` differ from the
    /// trajectory shape.
    fn gradient(
        &self,
        trajectory: ArrayView2<'_, f64>,
        sensitivities: ArrayView3<'_, f64>,
    ) -> Result<Array1<f64>, Self::Error> {
        let weights = self.state_gradient(trajectory)?;
        let (rows, cols, params) = sensitivities.dim();
        assert_eq!(
            (rows, cols),
            weights.dim(),
            "sensitivities must match the trajectory shape"
        );

        let mut gradient = Array1::zeros(params);
        for ((t, i), &weight) in weights.indexed_iter() {
            if weight != 0.0 {
                gradient.scaled_add(weight, &sensitivities.slice(ndarray::s![t, i, ..]));
            }
        }
        Ok(gradient)
    }
}
