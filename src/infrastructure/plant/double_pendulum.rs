//! Reference cart double-inverted-pendulum plant.
//!
//! ## Model
//!
//! Generalized coordinates `q = [x, θ1, θ2]`, angles measured from upright
//! and positive in the direction a positive cart force accelerates the lower
//! link. Lagrangian dynamics:
//!
//! ```text
//! M(q)·q̈ + h(q, q̇) = B·u
//!
//!        ┌ d1        −d2·c1     −d3·c2 ┐
//! M(q) = │ −d2·c1    d4         d5·c12 │
//!        └ −d3·c2    d5·c12     d6     ┘
//!
//! h(q, q̇) = [ d2·s1·θ̇1² + d3·s2·θ̇2² + b0·ẋ,
//!             d5·s12·θ̇2² − f1·s1 + b1·θ̇1,
//!            −d5·s12·θ̇1² − f2·s2 + b2·θ̇2 ]
//!
//! B = [1, 0, 0]ᵀ,  c12 = cos(θ1 − θ2),  s12 = sin(θ1 − θ2)
//! ```
//!
//! Integrated with fixed-step classical Runge-Kutta (RK4); the control force
//! is held constant over a step.

use nalgebra::{Matrix3, Vector3};

use crate::domain::errors::PlantError;
use crate::domain::models::{PhysicsConfig, Scenario, State, STATE_DIM};
use crate::domain::ports::{DynamicsModel, Plant, PlantFactory};

/// Lumped inertial and gravity coefficients of the Lagrangian model.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Coefficients {
    d1: f64,
    d2: f64,
    d3: f64,
    d4: f64,
    d5: f64,
    d6: f64,
    f1: f64,
    f2: f64,
    friction: [f64; 3],
}

impl Coefficients {
    fn from_physics(p: &PhysicsConfig) -> Self {
        let (m0, m1, m2) = (p.cart_mass, p.link1.mass, p.link2.mass);
        let (big_l1, l1, l2) = (p.link1.length, p.link1.com, p.link2.com);
        let g = p.gravity;
        Self {
            d1: m0 + m1 + m2,
            d2: m1 * l1 + m2 * big_l1,
            d3: m2 * l2,
            d4: m1 * l1 * l1 + m2 * big_l1 * big_l1 + p.link1.inertia,
            d5: m2 * big_l1 * l2,
            d6: m2 * l2 * l2 + p.link2.inertia,
            f1: (m1 * l1 + m2 * big_l1) * g,
            f2: m2 * l2 * g,
            friction: [p.cart_friction, p.link1.friction, p.link2.friction],
        }
    }
}

/// Cart double-pendulum with viscous friction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DoublePendulum {
    physics: PhysicsConfig,
    coeffs: Coefficients,
}

impl DoublePendulum {
    /// Plant with the given physical parameters.
    pub fn new(physics: PhysicsConfig) -> Self {
        Self {
            coeffs: Coefficients::from_physics(&physics),
            physics,
        }
    }

    /// Plant whose link masses and inertias are scaled by `scale`.
    pub fn with_mass_scale(physics: PhysicsConfig, scale: f64) -> Self {
        let mut scaled = physics;
        for link in [&mut scaled.link1, &mut scaled.link2] {
            link.mass *= scale;
            link.inertia *= scale;
        }
        Self::new(scaled)
    }

    pub fn physics(&self) -> &PhysicsConfig {
        &self.physics
    }

    /// State derivative `[q̇, q̈]`.
    pub fn derivative(&self, state: &State, control: f64) -> Result<[f64; STATE_DIM], PlantError> {
        let qdd = self
            .accelerations(state, control)
            .ok_or(PlantError::SingularMassMatrix)?;
        let [xd, t1d, t2d] = state.velocities();
        Ok([xd, t1d, t2d, qdd[0], qdd[1], qdd[2]])
    }

    fn rk4(&self, state: &State, control: f64, dt: f64) -> Result<State, PlantError> {
        let offset = |base: &State, k: &[f64; STATE_DIM], h: f64| {
            let mut next = base.0;
            for (value, slope) in next.iter_mut().zip(k) {
                *value += h * slope;
            }
            State(next)
        };

        let k1 = self.derivative(state, control)?;
        let k2 = self.derivative(&offset(state, &k1, 0.5 * dt), control)?;
        let k3 = self.derivative(&offset(state, &k2, 0.5 * dt), control)?;
        let k4 = self.derivative(&offset(state, &k3, dt), control)?;

        let mut next = state.0;
        for i in 0..STATE_DIM {
            next[i] += dt / 6.0 * (k1[i] + 2.0 * k2[i] + 2.0 * k3[i] + k4[i]);
        }
        Ok(State(next))
    }
}

impl Default for DoublePendulum {
    fn default() -> Self {
        Self::new(PhysicsConfig::default())
    }
}

impl DynamicsModel for DoublePendulum {
    fn mass_matrix(&self, state: &State) -> Matrix3<f64> {
        let c = &self.coeffs;
        let (c1, c2) = (state.theta1().cos(), state.theta2().cos());
        let c12 = (state.theta1() - state.theta2()).cos();
        Matrix3::new(
            c.d1,
            -c.d2 * c1,
            -c.d3 * c2,
            -c.d2 * c1,
            c.d4,
            c.d5 * c12,
            -c.d3 * c2,
            c.d5 * c12,
            c.d6,
        )
    }

    fn bias_forces(&self, state: &State) -> Vector3<f64> {
        let c = &self.coeffs;
        let (s1, s2) = (state.theta1().sin(), state.theta2().sin());
        let s12 = (state.theta1() - state.theta2()).sin();
        let [xd, t1d, t2d] = state.velocities();
        let [b0, b1, b2] = c.friction;
        Vector3::new(
            c.d2 * s1 * t1d * t1d + c.d3 * s2 * t2d * t2d + b0 * xd,
            c.d5 * s12 * t2d * t2d - c.f1 * s1 + b1 * t1d,
            -c.d5 * s12 * t1d * t1d - c.f2 * s2 + b2 * t2d,
        )
    }
}

impl Plant for DoublePendulum {
    fn step(&mut self, state: &State, control: f64, dt: f64) -> Result<State, PlantError> {
        if !(dt > 0.0 && dt.is_finite()) {
            return Err(PlantError::IntegrationFailed(format!(
                "step size must be positive, got {dt}"
            )));
        }
        if !control.is_finite() {
            return Err(PlantError::IntegrationFailed(format!(
                "non-finite control force {control}"
            )));
        }
        let next = self.rk4(state, control, dt)?;
        match next.first_non_finite() {
            Some((index, value)) => Err(PlantError::NonFiniteState { index, value }),
            None => Ok(next),
        }
    }
}

/// Builds one [`DoublePendulum`] per scenario, applying the scenario's mass
/// scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DoublePendulumFactory {
    physics: PhysicsConfig,
}

impl DoublePendulumFactory {
    pub fn new(physics: PhysicsConfig) -> Self {
        Self { physics }
    }
}

impl PlantFactory for DoublePendulumFactory {
    fn create(&self, scenario: &Scenario) -> Result<Box<dyn Plant>, PlantError> {
        Ok(Box::new(DoublePendulum::with_mass_scale(
            self.physics,
            scenario.parameter_scale,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frictionless() -> PhysicsConfig {
        let mut physics = PhysicsConfig::default();
        physics.cart_friction = 0.0;
        physics.link1.friction = 0.0;
        physics.link2.friction = 0.0;
        physics
    }

    #[test]
    fn test_upright_is_equilibrium() {
        let mut plant = DoublePendulum::default();
        let next = plant.step(&State::UPRIGHT, 0.0, 0.01).unwrap();
        assert!(next.max_abs() < 1e-12);
    }

    #[test]
    fn test_mass_matrix_is_symmetric_positive_definite() {
        let plant = DoublePendulum::default();
        let state = State::new(0.0, 0.4, -0.7, 0.0, 0.0, 0.0);
        let m = plant.mass_matrix(&state);
        assert!((m - m.transpose()).norm() < 1e-12);
        assert!(m.cholesky().is_some());
    }

    #[test]
    fn test_tilted_pendulum_falls_further() {
        let mut plant = DoublePendulum::default();
        let mut state = State::new(0.0, 0.05, 0.05, 0.0, 0.0, 0.0);
        for _ in 0..20 {
            state = plant.step(&state, 0.0, 0.01).unwrap();
        }
        assert!(state.theta1() > 0.05);
    }

    #[test]
    fn test_positive_force_tips_lower_link_positive() {
        let plant = DoublePendulum::default();
        let qdd = plant.accelerations(&State::UPRIGHT, 1.0).unwrap();
        assert!(qdd[0] > 0.0);
        assert!(qdd[1] > 0.0);
    }

    #[test]
    fn test_energy_conserved_without_friction() {
        // Small swing about the upright equilibrium with no input: RK4 at a
        // fine step keeps the total energy nearly constant.
        let physics = frictionless();
        let model = DoublePendulum::new(physics);
        let mut plant = model;
        let energy = |s: &State| {
            let m = model.mass_matrix(s);
            let v = Vector3::from(s.velocities());
            let kinetic = 0.5 * v.dot(&(m * v));
            let c = Coefficients::from_physics(&physics);
            let potential = c.f1 * s.theta1().cos() + c.f2 * s.theta2().cos();
            kinetic + potential
        };
        let mut state = State::new(0.0, 0.02, -0.01, 0.0, 0.0, 0.0);
        let e0 = energy(&state);
        for _ in 0..100 {
            state = plant.step(&state, 0.0, 0.001).unwrap();
        }
        assert!((energy(&state) - e0).abs() < 1e-6);
    }

    #[test]
    fn test_rejects_non_finite_control() {
        let mut plant = DoublePendulum::default();
        assert!(matches!(
            plant.step(&State::UPRIGHT, f64::NAN, 0.01),
            Err(PlantError::IntegrationFailed(_))
        ));
    }

    #[test]
    fn test_factory_scales_link_masses() {
        let factory = DoublePendulumFactory::new(PhysicsConfig::default());
        let scenario = Scenario::new("heavy", State::UPRIGHT).with_parameter_scale(1.5);
        assert!(factory.create(&scenario).is_ok());

        let heavy = DoublePendulum::with_mass_scale(PhysicsConfig::default(), 1.5);
        assert!((heavy.physics().link1.mass - 0.3).abs() < 1e-12);
        assert!((heavy.physics().cart_mass - 1.5).abs() < 1e-12);
    }
}
