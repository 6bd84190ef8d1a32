//! Linear sliding surface `s = Λ·q + L·q̇`.

use serde::{Deserialize, Serialize};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::state::{State, STATE_DIM};

/// Linear sliding surface over the full state vector.
///
/// The surface value is a fixed linear combination of state components; the
/// weights are set at construction and never change. With the usual pendulum
/// parameterization the cart components carry zero weight and the upper link
/// enters with opposite sign, since holding it upright means driving the
/// lower link underneath it:
///
/// ```text
/// s = λ1·θ1 − λ2·θ2 + k1·θ̇1 − k2·θ̇2
/// ```
///
/// Because `s` is linear in the weights, scaling every gain by `c` scales
/// the surface value by `c`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlidingSurface {
    /// Weights on the generalized coordinates `[x, θ1, θ2]` (the Λ row).
    position_weights: [f64; 3],
    /// Weights on the generalized velocities `[ẋ, θ̇1, θ̇2]` (the L row).
    velocity_weights: [f64; 3],
}

impl SlidingSurface {
    /// Surface from raw weight rows. Signs are part of the weights.
    pub fn new(position_weights: [f64; 3], velocity_weights: [f64; 3]) -> DomainResult<Self> {
        if position_weights
            .iter()
            .chain(velocity_weights.iter())
            .any(|w| !w.is_finite())
        {
            return Err(DomainError::ValidationFailed(
                "sliding surface weights must be finite".to_string(),
            ));
        }
        Ok(Self {
            position_weights,
            velocity_weights,
        })
    }

    /// Pendulum-angle surface from velocity gains `k1, k2` and position gains
    /// `λ1, λ2` (all positive for a stabilizing surface).
    pub fn from_angle_gains(k1: f64, k2: f64, lambda1: f64, lambda2: f64) -> DomainResult<Self> {
        Self::new([0.0, lambda1, -lambda2], [0.0, k1, -k2])
    }

    /// Evaluate the surface for a raw state slice.
    pub fn compute(&self, state: &[f64]) -> DomainResult<f64> {
        let state = State::from_slice(state).map_err(|_| DomainError::StateDimensionMismatch {
            expected: STATE_DIM,
            actual: state.len(),
        })?;
        Ok(self.evaluate(&state))
    }

    /// Evaluate the surface for a typed state.
    pub fn evaluate(&self, state: &State) -> f64 {
        dot3(&self.position_weights, &state.positions())
            + dot3(&self.velocity_weights, &state.velocities())
    }

    /// Model-based surface derivative given generalized accelerations.
    ///
    /// `ṡ = Λ·q̇ + L·q̈`
    pub fn derivative(&self, state: &State, accelerations: &[f64; 3]) -> f64 {
        dot3(&self.position_weights, &state.velocities())
            + dot3(&self.velocity_weights, accelerations)
    }

    /// Backward finite difference of two successive surface values.
    ///
    /// Returns 0.0 for a non-positive step.
    pub fn finite_difference(current: f64, previous: f64, dt: f64) -> f64 {
        if dt > 0.0 {
            (current - previous) / dt
        } else {
            0.0
        }
    }

    /// The Λ row.
    pub fn position_weights(&self) -> [f64; 3] {
        self.position_weights
    }

    /// The L row.
    pub fn velocity_weights(&self) -> [f64; 3] {
        self.velocity_weights
    }

    /// Surface with every weight multiplied by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            position_weights: self.position_weights.map(|w| w * factor),
            velocity_weights: self.velocity_weights.map(|w| w * factor),
        }
    }
}

fn dot3(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_angle_surface_ignores_cart() {
        let surface = SlidingSurface::from_angle_gains(2.0, 1.0, 5.0, 3.0).unwrap();
        let s = surface
            .compute(&[10.0, 0.1, -0.05, 4.0, 0.2, 0.4])
            .unwrap();
        let expected = 5.0 * 0.1 - 3.0 * -0.05 + 2.0 * 0.2 - 1.0 * 0.4;
        assert!((s - expected).abs() < 1e-12);
    }

    #[test]
    fn test_dimension_mismatch() {
        let surface = SlidingSurface::from_angle_gains(1.0, 1.0, 1.0, 1.0).unwrap();
        assert!(matches!(
            surface.compute(&[0.0; 5]),
            Err(DomainError::StateDimensionMismatch { expected: 6, actual: 5 })
        ));
    }

    #[test]
    fn test_model_based_derivative_matches_finite_difference_for_linear_motion() {
        let surface = SlidingSurface::from_angle_gains(2.0, 1.0, 5.0, 3.0).unwrap();
        let dt = 1e-6;
        let state = State::new(0.0, 0.1, 0.2, 0.0, 0.3, -0.1);
        let acc = [0.0, 1.5, -0.5];
        let next = State::new(
            0.0,
            0.1 + 0.3 * dt,
            0.2 - 0.1 * dt,
            0.0,
            0.3 + 1.5 * dt,
            -0.1 - 0.5 * dt,
        );
        let fd = SlidingSurface::finite_difference(surface.evaluate(&next), surface.evaluate(&state), dt);
        assert!((fd - surface.derivative(&state, &acc)).abs() < 1e-4);
    }

    #[test]
    fn test_non_finite_weights_rejected() {
        assert!(SlidingSurface::from_angle_gains(f64::NAN, 1.0, 1.0, 1.0).is_err());
    }

    #[test]
    fn test_finite_difference_zero_dt() {
        assert_eq!(SlidingSurface::finite_difference(1.0, 0.0, 0.0), 0.0);
    }
}
