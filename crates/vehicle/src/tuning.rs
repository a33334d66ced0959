//! Drive-schedule tuning as a constrained optimization problem.
//!
//! [`Tuning`] treats selected samples of the drive schedule (and optionally the
//! initial state) as decision variables. Each evaluation rebuilds the
//! integrator inputs from scratch, integrates the chassis, and reads the
//! objective and constraints off the resulting trajectory. Analytic gradients
//! come from the integration's sensitivities.

use ndarray::{Array1, Array2};
use tangent_core::{Bounds, BoundsError, ConstrainedProblem, TrajectoryEvaluator};
use tangent_solvers::{
    optimization::sqp::{Config, ConfigError, GradientSource},
    transient::rk4::{Inputs, Integration, Parameter},
};
use thiserror::Error;
use tracing::debug;

use crate::{Chassis, DriveSchedule, EvaluatorError, FinalSpeed, InitialState, SpeedMismatch};

/// A quantity the optimizer is allowed to adjust.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde-derive", derive(serde::Serialize, serde::Deserialize))]
pub enum Decision {
    /// Engine torque (N·m) at one schedule sample.
    EngineTorque { sample: usize },

    /// Torque ratio at one schedule sample.
    TorqueRatio { sample: usize },

    /// One component of the initial state ([`Chassis::MASS`] or
    /// [`Chassis::VELOCITY`]).
    InitialState { component: usize },
}

impl Decision {
    fn parameter(self) -> Parameter {
        match self {
            Decision::EngineTorque { sample } => Parameter::External {
                signal: Chassis::ENGINE_TORQUE,
                sample,
            },
            Decision::TorqueRatio { sample } => Parameter::External {
                signal: Chassis::TORQUE_RATIO,
                sample,
            },
            Decision::InitialState { component } => Parameter::InitialState { component },
        }
    }
}

/// A decision with its physical bounds and scale.
///
/// The optimizer works in scaled units `x = value / scale`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Variable {
    decision: Decision,
    scale: f64,
}

/// What the optimizer minimizes.
#[derive(Debug, Clone, PartialEq)]
pub enum Objective {
    /// Sum of engine torque over every schedule sample.
    TotalEngineTorque,

    /// Squared velocity error against a target series.
    SpeedMismatch(SpeedMismatch),
}

/// An equality constraint the optimizer drives to zero.
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    SpeedMismatch(SpeedMismatch),
    FinalSpeed(FinalSpeed),
}

impl Constraint {
    fn evaluator(&self) -> &dyn TrajectoryEvaluator<Error = EvaluatorError> {
        match self {
            Constraint::SpeedMismatch(evaluator) => evaluator,
            Constraint::FinalSpeed(evaluator) => evaluator,
        }
    }
}

/// Errors from building or evaluating a [`Tuning`] problem.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TuningError {
    #[error("{decision:?} is outside a schedule of {samples} samples")]
    OutOfRange { decision: Decision, samples: usize },

    #[error("{decision:?} is already a decision variable")]
    Duplicate { decision: Decision },

    #[error("scale must be finite and positive, got {scale}")]
    Scale { scale: f64 },

    #[error("{decision:?} has invalid bounds")]
    Bounds {
        decision: Decision,
        #[source]
        source: BoundsError,
    },

    #[error("expected {expected} decision variables, got {found}")]
    Dimension { expected: usize, found: usize },

    #[error(transparent)]
    Evaluator(#[from] EvaluatorError),
}

/// Tunes a drive schedule against an objective and equality constraints.
#[derive(Debug, Clone, PartialEq)]
pub struct Tuning {
    schedule: DriveSchedule,
    initial_state: InitialState,
    objective: Objective,
    constraints: Vec<Constraint>,
    variables: Vec<Variable>,
    bounds: Vec<Bounds>,
}

impl Tuning {
    /// Creates a problem with no decision variables or constraints.
    ///
    /// The schedule and initial state supply every value that is not a
    /// decision variable.
    #[must_use]
    pub fn new(schedule: DriveSchedule, initial_state: InitialState, objective: Objective) -> Self {
        Self {
            schedule,
            initial_state,
            objective,
            constraints: Vec::new(),
            variables: Vec::new(),
            bounds: Vec::new(),
        }
    }

    /// The vehicle assembly's formulation: minimize total engine torque over
    /// every torque and ratio sample while matching `target_speed`.
    ///
    /// Engine torque is bounded to `[-500, 500]` N·m and the torque ratio to
    /// `[0.1, 3]`.
    ///
    /// # Errors
    ///
    /// Returns an error if `target_speed` does not match the schedule length.
    pub fn original_formulation(
        schedule: DriveSchedule,
        initial_state: InitialState,
        target_speed: Array1<f64>,
    ) -> Result<Self, TuningError> {
        let samples = schedule.len();
        if target_speed.len() != samples {
            return Err(EvaluatorError::Length {
                expected: samples,
                found: target_speed.len(),
            }
            .into());
        }

        let mut tuning = Self::new(schedule, initial_state, Objective::TotalEngineTorque)
            .with_constraint(Constraint::SpeedMismatch(SpeedMismatch::new(target_speed)));
        for sample in 0..samples {
            tuning = tuning.with_variable(Decision::EngineTorque { sample }, -500.0, 500.0, 1.0)?;
        }
        for sample in 0..samples {
            tuning = tuning.with_variable(Decision::TorqueRatio { sample }, 0.1, 3.0, 1.0)?;
        }
        Ok(tuning)
    }

    /// Solver settings used with [`Tuning::original_formulation`].
    ///
    /// # Errors
    ///
    /// Never fails in practice; the settings are valid.
    pub fn original_config() -> Result<Config, ConfigError> {
        Config::new(100, 1e-16, GradientSource::Analytic)
    }

    /// Adds a decision variable with physical bounds `[lower, upper]`.
    ///
    /// The optimizer sees the variable divided by `scale`.
    ///
    /// # Errors
    ///
    /// Returns an error if the decision is out of range or repeated, the
    /// bounds are invalid, or the scale is not finite and positive.
    pub fn with_variable(
        mut self,
        decision: Decision,
        lower: f64,
        upper: f64,
        scale: f64,
    ) -> Result<Self, TuningError> {
        let samples = self.schedule.len();
        let in_range = match decision {
            Decision::EngineTorque { sample } | Decision::TorqueRatio { sample } => {
                sample < samples
            }
            Decision::InitialState { component } => component <= Chassis::VELOCITY,
        };
        if !in_range {
            return Err(TuningError::OutOfRange { decision, samples });
        }
        if self.variables.iter().any(|v| v.decision == decision) {
            return Err(TuningError::Duplicate { decision });
        }
        if !scale.is_finite() || scale <= 0.0 {
            return Err(TuningError::Scale { scale });
        }
        let bounds = Bounds::new(lower / scale, upper / scale)
            .map_err(|source| TuningError::Bounds { decision, source })?;

        self.variables.push(Variable { decision, scale });
        self.bounds.push(bounds);
        Ok(self)
    }

    /// Adds an equality constraint.
    #[must_use]
    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    #[must_use]
    pub fn schedule(&self) -> &DriveSchedule {
        &self.schedule
    }

    /// Decision variables in the order the optimizer sees them.
    pub fn decisions(&self) -> impl Iterator<Item = Decision> + '_ {
        self.variables.iter().map(|v| v.decision)
    }

    /// Scaled decision variables read from the schedule and initial state.
    ///
    /// This is the natural starting point for a solve.
    #[must_use]
    pub fn start(&self) -> Vec<f64> {
        let initial = self.initial_state.to_array();
        self.variables
            .iter()
            .map(|v| {
                let value = match v.decision {
                    Decision::EngineTorque { sample } => self.schedule.engine_torque()[sample],
                    Decision::TorqueRatio { sample } => self.schedule.torque_ratio()[sample],
                    Decision::InitialState { component } => initial[component],
                };
                value / v.scale
            })
            .collect()
    }

    /// Physical values of scaled decision variables.
    #[must_use]
    pub fn unscale(&self, x: &[f64]) -> Vec<f64> {
        x.iter()
            .zip(&self.variables)
            .map(|(x, v)| x * v.scale)
            .collect()
    }

    fn parameters(&self) -> Vec<Parameter> {
        self.variables.iter().map(|v| v.decision.parameter()).collect()
    }

    fn scales(&self) -> Array1<f64> {
        self.variables.iter().map(|v| v.scale).collect()
    }
}

impl ConstrainedProblem for Tuning {
    type Input = Inputs;
    type Output = Integration;
    type Error = TuningError;

    fn bounds(&self) -> &[Bounds] {
        &self.bounds
    }

    fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    fn input(&self, x: &[f64]) -> Result<Inputs, Self::Error> {
        if x.len() != self.variables.len() {
            return Err(TuningError::Dimension {
                expected: self.variables.len(),
                found: x.len(),
            });
        }

        let mut externals = self.schedule.externals();
        let mut initial_state = self.initial_state.to_array();
        for (&scaled, variable) in x.iter().zip(&self.variables) {
            let value = scaled * variable.scale;
            match variable.decision {
                Decision::EngineTorque { sample } => {
                    externals[[sample, Chassis::ENGINE_TORQUE]] = value;
                }
                Decision::TorqueRatio { sample } => {
                    externals[[sample, Chassis::TORQUE_RATIO]] = value;
                }
                Decision::InitialState { component } => initial_state[component] = value,
            }
        }

        Ok(Inputs::new(externals, initial_state))
    }

    fn objective(&self, input: &Inputs, output: &Integration) -> Result<f64, Self::Error> {
        match &self.objective {
            Objective::TotalEngineTorque => {
                Ok(input.externals.column(Chassis::ENGINE_TORQUE).sum())
            }
            Objective::SpeedMismatch(evaluator) => {
                Ok(evaluator.value(output.trajectory.view())?)
            }
        }
    }

    fn constraints(&self, _input: &Inputs, output: &Integration) -> Result<Array1<f64>, Self::Error> {
        let values = self
            .constraints
            .iter()
            .map(|c| c.evaluator().value(output.trajectory.view()))
            .collect::<Result<Array1<f64>, _>>()?;
        debug!(steps = output.steps, ?values, "evaluated tuning constraints");
        Ok(values)
    }

    fn objective_gradient(
        &self,
        _input: &Inputs,
        output: &Integration,
    ) -> Result<Array1<f64>, Self::Error> {
        let gradient: Array1<f64> = match &self.objective {
            Objective::TotalEngineTorque => self
                .variables
                .iter()
                .map(|v| match v.decision {
                    Decision::EngineTorque { .. } => 1.0,
                    Decision::TorqueRatio { .. } | Decision::InitialState { .. } => 0.0,
                })
                .collect(),
            Objective::SpeedMismatch(evaluator) => {
                let sensitivities = output.sensitivities(&self.parameters());
                evaluator.gradient(output.trajectory.view(), sensitivities.view())?
            }
        };
        Ok(gradient * self.scales())
    }

    fn constraint_jacobian(
        &self,
        _input: &Inputs,
        output: &Integration,
    ) -> Result<Array2<f64>, Self::Error> {
        let scales = self.scales();
        let sensitivities = output.sensitivities(&self.parameters());

        let mut jacobian = Array2::zeros((self.constraints.len(), self.variables.len()));
        for (row, constraint) in self.constraints.iter().enumerate() {
            let gradient = constraint
                .evaluator()
                .gradient(output.trajectory.view(), sensitivities.view())?;
            jacobian.row_mut(row).assign(&(gradient * &scales));
        }
        Ok(jacobian)
    }
}
