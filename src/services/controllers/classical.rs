//! Classical sliding-mode controller.
//!
//! ```text
//! u = u_eq − K·switch(s, Φ_eff) − kd·s,    Φ_eff = Φ + slope·|s|
//! ```
//!
//! The boundary layer widens with `|s|` when `slope > 0`, which keeps the
//! reaching phase smooth without giving up accuracy close to the surface.

use std::sync::Arc;

use super::{check_state, saturate, EquivalentControl};
use crate::domain::errors::{ControlError, DomainError, DomainResult};
use crate::domain::models::control::{ControlHistory, ControlSample, SlidingSurface, SwitchingFunction};
use crate::domain::models::{ControllerKind, ControllerSettings, GainVector, State};
use crate::domain::ports::{ControlOutput, DynamicsModel, InternalState, SlidingModeController};

/// Boundary-layer sliding-mode controller with fixed gains.
pub struct ClassicalSmc {
    gains: GainVector,
    surface: SlidingSurface,
    switching: SwitchingFunction,
    boundary_layer: f64,
    boundary_layer_slope: f64,
    switching_gain: f64,
    damping_gain: f64,
    max_force: f64,
    equivalent: EquivalentControl,
}

impl ClassicalSmc {
    /// Build from `[k1, k2, λ1, λ2, K, kd]`.
    pub fn new(
        gains: GainVector,
        settings: &ControllerSettings,
        model: Option<Arc<dyn DynamicsModel>>,
    ) -> DomainResult<Self> {
        gains.expect_len(ControllerKind::Classical)?;
        let g = gains.as_slice();
        for (index, name) in ["k1", "k2", "lambda1", "lambda2", "K"].iter().enumerate() {
            if !(g[index] > 0.0 && g[index].is_finite()) {
                return Err(DomainError::NonPositiveParameter {
                    name: (*name).to_string(),
                    value: g[index],
                });
            }
        }
        if !(g[5] >= 0.0 && g[5].is_finite()) {
            return Err(DomainError::NonPositiveParameter {
                name: "kd".to_string(),
                value: g[5],
            });
        }
        settings.switching.check_boundary_layer(settings.boundary_layer)?;
        if !(settings.max_force > 0.0) {
            return Err(DomainError::NonPositiveParameter {
                name: "max_force".to_string(),
                value: settings.max_force,
            });
        }

        let surface = SlidingSurface::from_angle_gains(g[0], g[1], g[2], g[3])?;
        let model = model.filter(|_| settings.equivalent_control);
        Ok(Self {
            surface,
            switching: settings.switching,
            boundary_layer: settings.boundary_layer,
            boundary_layer_slope: settings.boundary_layer_slope.max(0.0),
            switching_gain: g[4],
            damping_gain: g[5],
            max_force: settings.max_force,
            equivalent: EquivalentControl::new(model, settings.controllability_threshold),
            gains,
        })
    }

    pub fn surface(&self) -> &SlidingSurface {
        &self.surface
    }

    /// Boundary-layer width in effect at surface value `s`.
    pub fn effective_boundary_layer(&self, s: f64) -> f64 {
        self.boundary_layer + self.boundary_layer_slope * s.abs()
    }
}

impl SlidingModeController for ClassicalSmc {
    fn kind(&self) -> ControllerKind {
        ControllerKind::Classical
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
        _dt: f64,
        history: &mut ControlHistory,
    ) -> Result<ControlOutput, ControlError> {
        check_state(state)?;
        let s = self.surface.evaluate(state);
        let u_eq = self.equivalent.compute(&self.surface, state).force;
        let switch = self.switching.apply(s, self.effective_boundary_layer(s));
        let u = u_eq - self.switching_gain * switch - self.damping_gain * s;

        let output = saturate(u, s, self.max_force, InternalState::Stateless)?;
        history.push(ControlSample {
            surface: s,
            surface_derivative: None,
            force: output.force,
            gain: self.switching_gain,
            uncertainty: None,
            mode: None,
            adaptation: None,
        });
        Ok(output)
    }

    fn reset(&mut self) {}
}
