//! Super-twisting (second-order) sliding-mode controller.
//!
//! ```text
//! u  = u_eq − K1·|s|^½·switch(s) + z
//! ż  = −K2·switch(s)
//! ```
//!
//! Both terms are continuous in time, so the applied force does not switch
//! discontinuously; under a disturbance with Lipschitz bound `L` both `s` and
//! `ṡ` reach zero in finite time when the gains satisfy
//! [`validate_sta_gains`]. The integral state `z` is clamped to
//! `±max_force` so it cannot wind up while the actuator saturates.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{check_state, saturate, EquivalentControl};
use crate::domain::errors::{ControlError, DomainError, DomainResult};
use crate::domain::models::control::{ControlHistory, ControlSample, SlidingSurface, SwitchingFunction};
use crate::domain::models::{ControllerKind, ControllerSettings, GainVector, State};
use crate::domain::ports::{ControlOutput, DynamicsModel, InternalState, SlidingModeController};

/// Outcome of the super-twisting gain feasibility check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StaFeasibility {
    /// Proportional gain K1.
    pub k1: f64,
    /// Integral gain K2.
    pub k2: f64,
    /// Disturbance Lipschitz bound L.
    pub lipschitz: f64,
    /// `2·L`; `K1` must exceed it.
    pub min_k1: f64,
    /// `(5·L·K1 + 4·L²) / (2·K1)`; `K2` must exceed it.
    pub min_k2: f64,
}

impl StaFeasibility {
    /// `K1 > 2L`.
    pub fn proportional_ok(&self) -> bool {
        self.k1 > self.min_k1
    }

    /// `K2 > (5·L·K1 + 4·L²) / (2·K1)`.
    pub fn integral_ok(&self) -> bool {
        self.k2 > self.min_k2
    }

    /// Both conditions hold.
    pub fn is_feasible(&self) -> bool {
        self.proportional_ok() && self.integral_ok()
    }

    /// Convert to a validation result.
    pub fn into_result(self) -> DomainResult<Self> {
        if self.is_feasible() {
            Ok(self)
        } else {
            Err(DomainError::ValidationFailed(format!(
                "super-twisting gains K1={} K2={} infeasible for L={}: need K1 > {:.4} and K2 > {:.4}",
                self.k1, self.k2, self.lipschitz, self.min_k1, self.min_k2
            )))
        }
    }
}

/// Check the finite-time convergence conditions `K1 > 2L` and
/// `K2 > (5·L·K1 + 4·L²) / (2·K1)` for disturbance Lipschitz bound `L`.
///
/// This is a design-time check; controllers do not call it.
pub fn validate_sta_gains(k1: f64, k2: f64, lipschitz: f64) -> StaFeasibility {
    let l = lipschitz.max(0.0);
    let min_k2 = if k1 > 0.0 {
        (5.0 * l * k1 + 4.0 * l * l) / (2.0 * k1)
    } else {
        f64::INFINITY
    };
    StaFeasibility {
        k1,
        k2,
        lipschitz: l,
        min_k1: 2.0 * l,
        min_k2,
    }
}

/// Second-order sliding-mode controller (super-twisting algorithm).
pub struct SuperTwistingSmc {
    gains: GainVector,
    surface: SlidingSurface,
    switching: SwitchingFunction,
    boundary_layer: f64,
    k1: f64,
    k2: f64,
    max_force: f64,
    integral: f64,
    equivalent: EquivalentControl,
}

impl SuperTwistingSmc {
    /// Build from `[K1, K2, k1, k2, λ1, λ2]`.
    pub fn new(
        gains: GainVector,
        settings: &ControllerSettings,
        model: Option<Arc<dyn DynamicsModel>>,
    ) -> DomainResult<Self> {
        gains.expect_len(ControllerKind::SuperTwisting)?;
        let g = gains.as_slice();
        for (value, name) in g.iter().zip(ControllerKind::SuperTwisting.gain_names()) {
            if !(*value > 0.0 && value.is_finite()) {
                return Err(DomainError::NonPositiveParameter {
                    name: (*name).to_string(),
                    value: *value,
                });
            }
        }
        settings.switching.check_boundary_layer(settings.boundary_layer)?;
        if !(settings.max_force > 0.0) {
            return Err(DomainError::NonPositiveParameter {
                name: "max_force".to_string(),
                value: settings.max_force,
            });
        }

        let surface = SlidingSurface::from_angle_gains(g[2], g[3], g[4], g[5])?;
        let model = model.filter(|_| settings.equivalent_control);
        Ok(Self {
            surface,
            switching: settings.switching,
            boundary_layer: settings.boundary_layer,
            k1: g[0],
            k2: g[1],
            max_force: settings.max_force,
            integral: 0.0,
            equivalent: EquivalentControl::new(model, settings.controllability_threshold),
            gains,
        })
    }

    /// Current integral state `z`.
    pub fn integral(&self) -> f64 {
        self.integral
    }

    /// Check this controller's twisting gains against `lipschitz`.
    pub fn feasibility(&self, lipschitz: f64) -> StaFeasibility {
        validate_sta_gains(self.k1, self.k2, lipschitz)
    }
}

impl SlidingModeController for SuperTwistingSmc {
    fn kind(&self) -> ControllerKind {
        ControllerKind::SuperTwisting
    }

    fn gains(&self) -> &GainVector {
        &self.gains
    }

    fn max_force(&self) -> f64 {
        self.max_force
    }

    fn compute_control(
        &mut self,
        state: &State,
        dt: f64,
        history: &mut ControlHistory,
    ) -> Result<ControlOutput, ControlError> {
        check_state(state)?;
        let s = self.surface.evaluate(state);
        let u_eq = self.equivalent.compute(&self.surface, state).force;
        let switch = self.switching.apply(s, self.boundary_layer);

        let u = u_eq - self.k1 * s.abs().sqrt() * switch + self.integral;
        if dt > 0.0 {
            self.integral =
                (self.integral - self.k2 * switch * dt).clamp(-self.max_force, self.max_force);
        }

        let output = saturate(
            u,
            s,
            self.max_force,
            InternalState::SuperTwisting {
                integral: self.integral,
            },
        )?;
        history.push(ControlSample {
            surface: s,
            surface_derivative: None,
            force: output.force,
            gain: self.k1,
            uncertainty: None,
            mode: None,
            adaptation: None,
        });
        Ok(output)
    }

    fn reset(&mut self) {
        self.integral = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> SuperTwistingSmc {
        let settings = ControllerSettings::for_kind(ControllerKind::SuperTwisting);
        SuperTwistingSmc::new(ControllerKind::SuperTwisting.reference_gains(), &settings, None)
            .unwrap()
    }

    #[test]
    fn test_feasibility_conditions() {
        let ok = validate_sta_gains(10.0, 20.0, 1.0);
        assert!(ok.is_feasible());
        assert!((ok.min_k2 - 2.7).abs() < 1e-12);

        let weak_proportional = validate_sta_gains(1.5, 100.0, 1.0);
        assert!(!weak_proportional.proportional_ok());
        assert!(weak_proportional.into_result().is_err());

        let weak_integral = validate_sta_gains(10.0, 2.0, 1.0);
        assert!(weak_integral.proportional_ok());
        assert!(!weak_integral.integral_ok());
    }

    #[test]
    fn test_zero_disturbance_bound_is_always_feasible() {
        assert!(validate_sta_gains(0.1, 0.1, 0.0).is_feasible());
    }

    #[test]
    fn test_integral_accumulates_and_resets() {
        let mut c = controller();
        let state = State::new(0.0, 0.1, 0.0, 0.0, 0.0, 0.0);
        let mut history = ControlHistory::disabled();
        for _ in 0..10 {
            c.compute_control(&state, 0.01, &mut history).unwrap();
        }
        assert!(c.integral() < 0.0);
        c.reset();
        assert_eq!(c.integral(), 0.0);
    }

    #[test]
    fn test_integral_is_clamped() {
        let mut c = controller();
        let state = State::new(0.0, 0.5, 0.0, 0.0, 0.0, 0.0);
        let mut history = ControlHistory::disabled();
        for _ in 0..10_000 {
            c.compute_control(&state, 0.01, &mut history).unwrap();
        }
        assert!(c.integral() >= -c.max_force());
    }

    #[test]
    fn test_internal_state_reports_integral() {
        let mut c = controller();
        let out = c
            .compute_control(
                &State::new(0.0, 0.05, 0.0, 0.0, 0.0, 0.0),
                0.01,
                &mut ControlHistory::disabled(),
            )
            .unwrap();
        match out.internal {
            InternalState::SuperTwisting { integral } => assert_eq!(integral, c.integral()),
            other => panic!("unexpected internal state {other:?}"),
        }
    }

    #[test]
    fn test_non_positive_gain_rejected() {
        let settings = ControllerSettings::for_kind(ControllerKind::SuperTwisting);
        let gains = GainVector::new(vec![25.0, 0.0, 1.0, 3.0, 10.0, 15.0]);
        assert!(matches!(
            SuperTwistingSmc::new(gains, &settings, None).err(),
            Some(DomainError::NonPositiveParameter { .. })
        ));
    }
}
