use nalgebra::{Matrix3, Vector3};

use crate::domain::errors::PlantError;
use crate::domain::models::{Scenario, State};

/// Port for the simulated plant.
///
/// The optimization core treats the plant as an opaque, possibly-failing
/// black box: it only advances a state by one step under a constant control
/// force. Failures are converted into penalty costs by the fitness evaluator.
///
/// # Examples
///
/// ```no_run
/// use smc_tune::domain::ports::Plant;
/// use smc_tune::domain::models::State;
///
/// fn advance(plant: &mut dyn Plant, state: State) -> Option<State> {
///     plant.step(&state, 1.5, 0.01).ok()
/// }
/// ```
pub trait Plant: Send {
    /// Advance `state` by `dt` seconds with control force `control` held
    /// constant over the step.
    fn step(&mut self, state: &State, control: f64, dt: f64) -> Result<State, PlantError>;
}

/// Builds one plant instance per scenario run.
///
/// Each evaluation worker constructs its own plants, so implementations
/// must be shareable across threads but plants themselves are not shared.
pub trait PlantFactory: Send + Sync {
    fn create(&self, scenario: &Scenario) -> Result<Box<dyn Plant>, PlantError>;
}

impl<F> PlantFactory for F
where
    F: Fn(&Scenario) -> Result<Box<dyn Plant>, PlantError> + Send + Sync,
{
    fn create(&self, scenario: &Scenario) -> Result<Box<dyn Plant>, PlantError> {
        self(scenario)
    }
}

/// Rigid-body model `M(q)·q̈ + h(q, q̇) = B·u` used for equivalent control.
pub trait DynamicsModel: Send + Sync {
    /// Inertia matrix `M(q)`.
    fn mass_matrix(&self, state: &State) -> Matrix3<f64>;

    /// Coriolis, centrifugal, gravity and friction terms `h(q, q̇)`.
    fn bias_forces(&self, state: &State) -> Vector3<f64>;

    /// Input distribution `B`. The cart is the only actuated coordinate.
    fn input_vector(&self) -> Vector3<f64> {
        Vector3::new(1.0, 0.0, 0.0)
    }

    /// Generalized accelerations `q̈ = M⁻¹(B·u − h)`, or `None` when `M` is
    /// singular.
    fn accelerations(&self, state: &State, control: f64) -> Option<Vector3<f64>> {
        let rhs = self.input_vector() * control - self.bias_forces(state);
        self.mass_matrix(state).lu().solve(&rhs)
    }
}
