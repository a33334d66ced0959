//! Longitudinal chassis dynamics driven by engine torque.
//!
//! The state is `[mass, velocity]` and the external signals are
//! `[time, torque_ratio, engine_torque]`:
//!
//! ```text
//! d(mass)/dt     = -fuel_burn · time
//! d(velocity)/dt = (engine_torque · torque_ratio / tire_radius - resistance) / mass
//! ```
//!
//! where `tire_radius = tire_circumference / 2π`. Rolling friction and
//! aerodynamic drag are only applied with [`Resistance::FrictionAndDrag`].

use std::f64::consts::PI;

use ndarray::{Array1, Array2, ArrayView1, array};
use tangent_core::{Dependencies, DifferentiableModel};
use thiserror::Error;
use uom::si::{
    acceleration::meter_per_second_squared,
    area::square_meter,
    f64::{Acceleration, Area, Length, Mass, MassDensity, Velocity},
    length::meter,
    mass::kilogram,
    mass_density::kilogram_per_cubic_meter,
    velocity::meter_per_second,
};

/// Physical parameters of the chassis.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-derive", derive(serde::Serialize, serde::Deserialize))]
pub struct ChassisParameters {
    pub tire_circumference: Length,

    /// Rolling friction coefficient (multiplies weight).
    pub friction_coefficient: f64,

    /// Aerodynamic drag coefficient (multiplies `½ρAV²`).
    pub drag_coefficient: f64,

    pub frontal_area: Area,

    pub air_density: MassDensity,

    pub gravity: Acceleration,

    /// Fuel burn coefficient in kg/s²; mass falls at `fuel_burn · time`.
    pub fuel_burn: f64,
}

impl Default for ChassisParameters {
    fn default() -> Self {
        Self {
            tire_circumference: Length::new::<meter>(1.905),
            friction_coefficient: 0.035,
            drag_coefficient: 0.3,
            frontal_area: Area::new::<square_meter>(2.164),
            air_density: MassDensity::new::<kilogram_per_cubic_meter>(1.225),
            gravity: Acceleration::new::<meter_per_second_squared>(9.8),
            fuel_burn: 0.001,
        }
    }
}

/// Which resistive forces act on the chassis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde-derive", derive(serde::Serialize, serde::Deserialize))]
pub enum Resistance {
    /// Torque alone accelerates the vehicle.
    #[default]
    Omitted,

    /// Opposes motion with `Cf·m·g + ½·ρ·Cd·A·V²`.
    FrictionAndDrag,
}

/// Initial mass and velocity of the vehicle.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-derive", derive(serde::Serialize, serde::Deserialize))]
pub struct InitialState {
    pub mass: Mass,
    pub velocity: Velocity,
}

impl Default for InitialState {
    fn default() -> Self {
        Self {
            mass: Mass::new::<kilogram>(1400.0),
            velocity: Velocity::new::<meter_per_second>(0.0),
        }
    }
}

impl InitialState {
    /// The state vector `[mass (kg), velocity (m/s)]`.
    #[must_use]
    pub fn to_array(&self) -> Array1<f64> {
        array![
            self.mass.get::<kilogram>(),
            self.velocity.get::<meter_per_second>()
        ]
    }
}

/// Errors from constructing or evaluating a [`Chassis`].
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum ChassisError {
    #[error("{name} must be finite and positive, got {value}")]
    NotPositive { name: &'static str, value: f64 },

    #[error("{name} must be finite and non-negative, got {value}")]
    Negative { name: &'static str, value: f64 },

    #[error("{name} must be finite, got {value}")]
    NonFinite { name: &'static str, value: f64 },

    #[error("vehicle mass must be positive, got {mass} kg")]
    MassDepleted { mass: f64 },
}

/// The chassis as a differentiable model.
///
/// Parameters are held in SI units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Chassis {
    tire_radius: f64,
    friction: f64,
    drag: f64,
    fuel_burn: f64,
    resistance: Resistance,
}

impl Chassis {
    /// Index of the mass state component.
    pub const MASS: usize = 0;
    /// Index of the velocity state component.
    pub const VELOCITY: usize = 1;

    /// Index of the time external signal.
    pub const TIME: usize = 0;
    /// Index of the torque ratio external signal.
    pub const TORQUE_RATIO: usize = 1;
    /// Index of the engine torque external signal.
    pub const ENGINE_TORQUE: usize = 2;

    /// Creates a chassis from validated parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the tire circumference is not positive, if any
    /// resistance parameter is negative, or if any value is not finite.
    pub fn new(parameters: ChassisParameters, resistance: Resistance) -> Result<Self, ChassisError> {
        let ChassisParameters {
            tire_circumference,
            friction_coefficient,
            drag_coefficient,
            frontal_area,
            air_density,
            gravity,
            fuel_burn,
        } = parameters;

        let circumference = positive("tire circumference", tire_circumference.get::<meter>())?;
        let friction_coefficient = non_negative("friction coefficient", friction_coefficient)?;
        let drag_coefficient = non_negative("drag coefficient", drag_coefficient)?;
        let area = non_negative("frontal area", frontal_area.get::<square_meter>())?;
        let density = non_negative("air density", air_density.get::<kilogram_per_cubic_meter>())?;
        let gravity = non_negative("gravity", gravity.get::<meter_per_second_squared>())?;
        if !fuel_burn.is_finite() {
            return Err(ChassisError::NonFinite {
                name: "fuel burn",
                value: fuel_burn,
            });
        }

        Ok(Self {
            tire_radius: circumference / (2.0 * PI),
            friction: friction_coefficient * gravity,
            drag: 0.5 * density * drag_coefficient * area,
            fuel_burn,
            resistance,
        })
    }

    /// Effective wheel radius in meters.
    #[must_use]
    pub fn tire_radius(&self) -> f64 {
        self.tire_radius
    }

    #[must_use]
    pub fn resistance(&self) -> Resistance {
        self.resistance
    }

    /// Decomposes `(external, state)` and checks that the mass is usable.
    fn point(
        external: ArrayView1<'_, f64>,
        state: ArrayView1<'_, f64>,
    ) -> Result<Point, ChassisError> {
        let mass = state[Self::MASS];
        if mass.is_nan() || mass <= 0.0 {
            return Err(ChassisError::MassDepleted { mass });
        }
        Ok(Point {
            time: external[Self::TIME],
            torque_ratio: external[Self::TORQUE_RATIO],
            engine_torque: external[Self::ENGINE_TORQUE],
            mass,
            velocity: state[Self::VELOCITY],
        })
    }

    /// Resistive force and its partials `(force, ∂/∂mass, ∂/∂velocity)`.
    fn resisting_force(&self, mass: f64, velocity: f64) -> (f64, f64, f64) {
        match self.resistance {
            Resistance::Omitted => (0.0, 0.0, 0.0),
            Resistance::FrictionAndDrag => {
                let direction = direction(velocity);
                let force = direction * (self.friction * mass + self.drag * velocity * velocity);
                let d_mass = direction * self.friction;
                let d_velocity = 2.0 * self.drag * velocity.abs();
                (force, d_mass, d_velocity)
            }
        }
    }
}

impl Default for Chassis {
    fn default() -> Self {
        // Known-good values, unwrap is safe
        Self::new(ChassisParameters::default(), Resistance::Omitted).unwrap()
    }
}

struct Point {
    time: f64,
    torque_ratio: f64,
    engine_torque: f64,
    mass: f64,
    velocity: f64,
}

impl DifferentiableModel for Chassis {
    type Error = ChassisError;

    fn state_len(&self) -> usize {
        2
    }

    fn external_len(&self) -> usize {
        3
    }

    fn derivative(
        &self,
        external: ArrayView1<'_, f64>,
        state: ArrayView1<'_, f64>,
    ) -> Result<Array1<f64>, Self::Error> {
        let p = Self::point(external, state)?;

        let wheel_force = p.engine_torque * p.torque_ratio / self.tire_radius;
        let (resisting, _, _) = self.resisting_force(p.mass, p.velocity);

        Ok(array![
            -self.fuel_burn * p.time,
            (wheel_force - resisting) / p.mass
        ])
    }

    fn jacobian_wrt_state(
        &self,
        external: ArrayView1<'_, f64>,
        state: ArrayView1<'_, f64>,
    ) -> Result<Array2<f64>, Self::Error> {
        let p = Self::point(external, state)?;

        let wheel_force = p.engine_torque * p.torque_ratio / self.tire_radius;
        let (resisting, d_mass, d_velocity) = self.resisting_force(p.mass, p.velocity);
        let m2 = p.mass * p.mass;

        Ok(array![
            [0.0, 0.0],
            [
                -(wheel_force - resisting) / m2 - d_mass / p.mass,
                -d_velocity / p.mass
            ],
        ])
    }

    fn jacobian_wrt_external(
        &self,
        external: ArrayView1<'_, f64>,
        state: ArrayView1<'_, f64>,
    ) -> Result<Array2<f64>, Self::Error> {
        let p = Self::point(external, state)?;
        let lever = self.tire_radius * p.mass;

        Ok(array![
            [-self.fuel_burn, 0.0, 0.0],
            [0.0, p.engine_torque / lever, p.torque_ratio / lever],
        ])
    }

    fn declared_dependencies(&self) -> Dependencies {
        Dependencies::new(["t", "torque_ratio", "engine_torque"], ["mass", "velocity"])
    }
}

/// Sign of the velocity, with zero at rest.
fn direction(velocity: f64) -> f64 {
    if velocity > 0.0 {
        1.0
    } else if velocity < 0.0 {
        -1.0
    } else {
        0.0
    }
}

fn positive(name: &'static str, value: f64) -> Result<f64, ChassisError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ChassisError::NotPositive { name, value })
    }
}

fn non_negative(name: &'static str, value: f64) -> Result<f64, ChassisError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(ChassisError::Negative { name, value })
    }
}
