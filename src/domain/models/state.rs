//! Plant state vector for the cart double pendulum.

use serde::{Deserialize, Serialize};

use crate::domain::errors::{DomainError, DomainResult};

/// Number of components in a [`State`].
pub const STATE_DIM: usize = 6;

/// Full state of the cart double pendulum.
///
/// Layout: `[x, θ1, θ2, ẋ, θ̇1, θ̇2]`. Angles are measured from the upright
/// position, positive in the direction a positive cart force accelerates the
/// lower link.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct State(pub [f64; STATE_DIM]);

impl State {
    /// The upright equilibrium at the track origin.
    pub const UPRIGHT: Self = Self([0.0; STATE_DIM]);

    /// State from its six components.
    pub fn new(x: f64, theta1: f64, theta2: f64, x_dot: f64, theta1_dot: f64, theta2_dot: f64) -> Self {
        Self([x, theta1, theta2, x_dot, theta1_dot, theta2_dot])
    }

    /// Build a state from a slice, failing if the length is not [`STATE_DIM`].
    pub fn from_slice(values: &[f64]) -> DomainResult<Self> {
        let array: [f64; STATE_DIM] =
            values
                .try_into()
                .map_err(|_| DomainError::StateDimensionMismatch {
                    expected: STATE_DIM,
                    actual: values.len(),
                })?;
        Ok(Self(array))
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn x(&self) -> f64 {
        self.0[0]
    }

    pub fn theta1(&self) -> f64 {
        self.0[1]
    }

    pub fn theta2(&self) -> f64 {
        self.0[2]
    }

    pub fn x_dot(&self) -> f64 {
        self.0[3]
    }

    pub fn theta1_dot(&self) -> f64 {
        self.0[4]
    }

    pub fn theta2_dot(&self) -> f64 {
        self.0[5]
    }

    /// Generalized coordinates `[x, θ1, θ2]`.
    pub fn positions(&self) -> [f64; 3] {
        [self.0[0], self.0[1], self.0[2]]
    }

    /// Generalized velocities `[ẋ, θ̇1, θ̇2]`.
    pub fn velocities(&self) -> [f64; 3] {
        [self.0[3], self.0[4], self.0[5]]
    }

    /// Index and value of the first non-finite component, if any.
    pub fn first_non_finite(&self) -> Option<(usize, f64)> {
        self.0
            .iter()
            .copied()
            .enumerate()
            .find(|(_, v)| !v.is_finite())
    }

    /// Largest absolute component.
    pub fn max_abs(&self) -> f64 {
        self.0.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()))
    }

    /// Sum of squared components, optionally weighted per component.
    pub fn weighted_norm_sq(&self, weights: &[f64; STATE_DIM]) -> f64 {
        self.0
            .iter()
            .zip(weights.iter())
            .map(|(v, w)| w * v * v)
            .sum()
    }
}

impl Default for State {
    fn default() -> Self {
        Self::UPRIGHT
    }
}

impl From<[f64; STATE_DIM]> for State {
    fn from(values: [f64; STATE_DIM]) -> Self {
        Self(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_slice_rejects_wrong_length() {
        let err = State::from_slice(&[0.0; 4]).unwrap_err();
        assert_eq!(
            err,
            DomainError::StateDimensionMismatch {
                expected: 6,
                actual: 4
            }
        );
    }

    #[test]
    fn test_accessors_follow_layout() {
        let s = State::new(1.0, 0.1, -0.2, 0.5, 0.01, -0.02);
        assert_eq!(s.x(), 1.0);
        assert_eq!(s.theta2(), -0.2);
        assert_eq!(s.positions(), [1.0, 0.1, -0.2]);
        assert_eq!(s.velocities(), [0.5, 0.01, -0.02]);
    }

    #[test]
    fn test_first_non_finite() {
        let mut s = State::UPRIGHT;
        assert!(s.first_non_finite().is_none());
        s.0[4] = f64::NAN;
        assert_eq!(s.first_non_finite().map(|(i, _)| i), Some(4));
    }
}
