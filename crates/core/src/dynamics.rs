use ndarray::{Array1, Array2, ArrayView1};

/// An ODE right-hand side `f(external, state)` with analytic partials.
///
/// A differentiable model describes the continuous-time derivative of an
/// `M`-component state driven by `K` external signals, together with the
/// Jacobians `∂f/∂state` (M×M) and `∂f/∂external` (M×K). Sensitivity
/// integrators combine these to propagate exact trajectory gradients.
///
/// All methods must be pure. Integrators evaluate them at intermediate stage
/// points, not only at time-grid samples, so they must accept any argument
/// values in the model's domain.
///
/// Signal counts are fixed when the model is constructed and must not change
/// between calls.
pub trait DifferentiableModel {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Number of state components (`M`).
    fn state_len(&self) -> usize;

    /// Number of external signals (`K`).
    fn external_len(&self) -> usize;

    /// Computes the state derivative at `(external, state)`.
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the derivative cannot be evaluated.
    fn derivative(
        &self,
        external: ArrayView1<'_, f64>,
        state: ArrayView1<'_, f64>,
    ) -> Result<Array1<f64>, Self::Error>;

    /// Computes `∂(state_dot)/∂(state)` as an M×M matrix.
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the Jacobian cannot be evaluated.
    fn jacobian_wrt_state(
        &self,
        external: ArrayView1<'_, f64>,
        state: ArrayView1<'_, f64>,
    ) -> Result<Array2<f64>, Self::Error>;

    /// Computes `∂(state_dot)/∂(external)` as an M×K matrix.
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the Jacobian cannot be evaluated.
    fn jacobian_wrt_external(
        &self,
        external: ArrayView1<'_, f64>,
        state: ArrayView1<'_, f64>,
    ) -> Result<Array2<f64>, Self::Error>;

    /// Names the external signals the model reads and the outputs it produces.
    ///
    /// Used by calling code to wire series to the model. Integrators do not
    /// consult it.
    fn declared_dependencies(&self) -> Dependencies;
}

/// Declared signal names of a [`DifferentiableModel`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde-derive", derive(serde::Serialize, serde::Deserialize))]
pub struct Dependencies {
    /// External signal names, in column order of the external series.
    pub inputs: Vec<String>,

    /// Output names the model produces.
    pub outputs: Vec<String>,
}

impl Dependencies {
    /// Creates a dependency declaration from input and output names.
    pub fn new<I, O>(inputs: I, outputs: O) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
        O: IntoIterator,
        O::Item: Into<String>,
    {
        Self {
            inputs: inputs.into_iter().map(Into::into).collect(),
            outputs: outputs.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the column index of the named external signal, if declared.
    #[must_use]
    pub fn input_index(&self, name: &str) -> Option<usize> {
        self.inputs.iter().position(|input| input == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_index_follows_declaration_order() {
        let deps = Dependencies::new(["time", "torque_ratio", "engine_torque"], ["state"]);

        assert_eq!(deps.input_index("time"), Some(0));
        assert_eq!(deps.input_index("engine_torque"), Some(2));
        assert_eq!(deps.input_index("drag"), None);
        assert_eq!(deps.outputs, vec!["state".to_string()]);
    }
}
