use approx::assert_relative_eq;
use ndarray::Array1;
use tangent_core::{Bounds, ConstrainedProblem, Model, TimeGrid};
use tangent_observers::Budget;
use tangent_solvers::optimization::sqp::{self, Config, GradientSource, Status};
use tangent_vehicle::{
    Chassis, Constraint, Decision, DriveSchedule, FinalSpeed, InitialState, Objective,
    SpeedMismatch, Tuning,
};

const KNOWN_TORQUE: [f64; 6] = [200.0, 150.0, 250.0, 300.0, 180.0, 220.0];

/// Velocity produced by the known torque profile, and a tuning problem that
/// starts from constant 200 N·m and must recover samples 1 through 5.
fn recovery() -> (Tuning, DriveSchedule) {
    let grid = TimeGrid::uniform(4.0, 20.0).unwrap();
    let n = grid.len();

    let known = DriveSchedule::new(grid.clone(), Array1::from(KNOWN_TORQUE.to_vec()), Array1::ones(n))
        .unwrap();
    let target = known
        .integrator(Chassis::default())
        .call(&known.inputs(&InitialState::default()))
        .unwrap()
        .state(Chassis::VELOCITY)
        .to_owned();
    let final_speed = target[n - 1];

    let start = DriveSchedule::new(grid, Array1::from_elem(n, 200.0), Array1::ones(n)).unwrap();
    let mut tuning = Tuning::new(
        start.clone(),
        InitialState::default(),
        Objective::SpeedMismatch(SpeedMismatch::new(target)),
    )
    .with_constraint(Constraint::FinalSpeed(FinalSpeed::new(final_speed, n)));
    for sample in 1..n {
        tuning = tuning
            .with_variable(Decision::EngineTorque { sample }, -500.0, 500.0, 100.0)
            .unwrap();
    }

    (tuning, start)
}

#[test]
fn recovers_known_torque_profile() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let (tuning, schedule) = recovery();
    let integrator = schedule.integrator(Chassis::default());
    let config = Config::new(100, 1e-10, GradientSource::Analytic).unwrap();

    let solution = sqp::minimize_unobserved(&integrator, &tuning, &tuning.start(), &config).unwrap();

    assert_eq!(solution.status, Status::Converged);
    assert!(solution.objective < 1e-8);
    assert!(solution.violation < 1e-10);
    let torque = tuning.unscale(&solution.x);
    for (found, expected) in torque.iter().zip(&KNOWN_TORQUE[1..]) {
        assert_relative_eq!(*found, *expected, epsilon = 1e-2);
    }

    // The integrated output carries the recovered schedule.
    let recovered = solution.snapshot.input.externals.column(Chassis::ENGINE_TORQUE);
    assert_relative_eq!(recovered[0], 200.0);
    assert_relative_eq!(recovered[3], 300.0, epsilon = 1e-2);
}

#[test]
fn analytic_gradients_need_fewer_model_evaluations() {
    let (tuning, schedule) = recovery();
    let integrator = schedule.integrator(Chassis::default());

    let analytic = sqp::minimize_unobserved(
        &integrator,
        &tuning,
        &tuning.start(),
        &Config::new(100, 1e-10, GradientSource::Analytic).unwrap(),
    )
    .unwrap();
    let finite_difference = sqp::minimize_unobserved(
        &integrator,
        &tuning,
        &tuning.start(),
        &Config::new(100, 1e-10, GradientSource::FiniteDifference { step: 1e-7 }).unwrap(),
    )
    .unwrap();

    assert_eq!(analytic.status, Status::Converged);
    assert_eq!(finite_difference.status, Status::Converged);
    assert!(analytic.iters <= finite_difference.iters);
    assert!(analytic.evaluations < finite_difference.evaluations);

    let torque = tuning.unscale(&finite_difference.x);
    for (found, expected) in torque.iter().zip(&KNOWN_TORQUE[1..]) {
        assert_relative_eq!(*found, *expected, epsilon = 1e-2);
    }
}

#[test]
fn budget_stops_the_optimizer() {
    let (tuning, schedule) = recovery();
    let integrator = schedule.integrator(Chassis::default());
    let config = Config::new(100, 1e-10, GradientSource::Analytic).unwrap();

    let solution = sqp::minimize(
        &integrator,
        &tuning,
        &tuning.start(),
        &config,
        Budget::iterations(2),
    )
    .unwrap();

    assert_eq!(solution.status, Status::StoppedByObserver);
    assert_eq!(solution.iters, 2);
}

#[test]
fn original_formulation_evaluates_at_the_reference_schedule() {
    let schedule = DriveSchedule::reference().unwrap();
    let integrator = schedule.integrator(Chassis::default());
    let target = Array1::from_elem(schedule.len(), 10.0);
    let tuning =
        Tuning::original_formulation(schedule, InitialState::default(), target).unwrap();

    let evaluation = tangent_solvers::optimization::evaluate(&integrator, &tuning, &tuning.start())
        .unwrap();

    assert_relative_eq!(evaluation.objective, 200.0 * 192.0);
    assert_eq!(evaluation.constraints.len(), 1);
    assert!(evaluation.constraints[0] > 0.0);

    let config = Tuning::original_config().unwrap();
    assert_eq!(config.max_iters(), 100);
    assert_eq!(tuning.dimension(), 2 * 192);
    assert_eq!(tuning.bounds()[0], Bounds::new(-500.0, 500.0).unwrap());
    assert_eq!(tuning.bounds()[192], Bounds::new(0.1, 3.0).unwrap());
}
