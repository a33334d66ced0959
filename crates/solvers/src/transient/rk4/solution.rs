use ndarray::{Array2, Array3, Array4, ArrayView1, ArrayView2, Axis, s};

/// Indicates how the integrator terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Integrated across the whole time grid.
    Complete,

    /// Stopped early due to an observer action.
    StoppedByObserver,
}

/// An input the trajectory can be differentiated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-derive", derive(serde::Serialize, serde::Deserialize))]
pub enum Parameter {
    /// Sample `sample` of external signal `signal`.
    External { signal: usize, sample: usize },

    /// Component `component` of the initial state.
    InitialState { component: usize },
}

/// The result of an RK4 sensitivity integration.
///
/// With `R = steps + 1` computed rows, `N` grid samples, `M` state components
/// and `K` external signals:
///
/// - `trajectory` is R×M; row `t` is the state at sample `t`
/// - `d_external` is R×M×N×K; `[t, i, s, j]` is `∂state[t, i]/∂external[s, j]`
/// - `d_initial` is R×M×M; `[t, i, c]` is `∂state[t, i]/∂initial_state[c]`
///
/// `d_external[t, .., s, ..]` is exactly zero whenever `s > t`.
#[derive(Debug, Clone)]
pub struct Integration {
    /// How the integrator terminated.
    pub status: Status,

    /// Number of integration steps completed.
    pub steps: usize,

    /// Time at each computed row.
    pub time: Vec<f64>,

    /// State trajectory.
    pub trajectory: Array2<f64>,

    /// Sensitivity of the trajectory to every external sample.
    pub d_external: Array4<f64>,

    /// Sensitivity of the trajectory to the initial state.
    pub d_initial: Array3<f64>,
}

impl Integration {
    /// Time history of one state component.
    ///
    /// # Panics
    ///
    /// Panics if `component` is out of range.
    #[must_use]
    pub fn state(&self, component: usize) -> ArrayView1<'_, f64> {
        self.trajectory.column(component)
    }

    /// State at the last computed row.
    #[must_use]
    pub fn final_state(&self) -> ArrayView1<'_, f64> {
        self.trajectory.row(self.steps)
    }

    /// Sensitivity of the whole trajectory (R×M) to a single parameter.
    ///
    /// # Panics
    ///
    /// Panics if the parameter indexes outside the integrated problem.
    #[must_use]
    pub fn sensitivity(&self, parameter: Parameter) -> ArrayView2<'_, f64> {
        match parameter {
            Parameter::External { signal, sample } => {
                self.d_external.slice(s![.., .., sample, signal])
            }
            Parameter::InitialState { component } => {
                self.d_initial.slice(s![.., .., component])
            }
        }
    }

    /// Gathers `∂trajectory/∂p` for a list of parameters into an R×M×P array.
    ///
    /// # Panics
    ///
    /// Panics if any parameter indexes outside the integrated problem.
    #[must_use]
    pub fn sensitivities(&self, parameters: &[Parameter]) -> Array3<f64> {
        let (rows, states) = self.trajectory.dim();
        let mut gathered = Array3::zeros((rows, states, parameters.len()));
        for (column, &parameter) in parameters.iter().enumerate() {
            gathered
                .index_axis_mut(Axis(2), column)
                .assign(&self.sensitivity(parameter));
        }
        gathered
    }
}
