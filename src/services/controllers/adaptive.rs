//! Adaptive sliding-mode controller.
//!
//! ```text
//! u = −K(t)·switch(s, Φ) − α·s
//! ```
//!
//! `K(t)` is owned by an [`AdaptationLaw`] whose rate γ is the fifth gain.
//! The law is advanced before the force is computed, so each step uses the
//! freshly adapted gain. When an [`UncertaintyEstimator`] is configured its
//! bound η̂ is fed into the adaptation as an extra growth term; the surface
//! derivative it needs comes from a backward finite difference.

use crate::domain::errors::{ControlError, DomainError, DomainResult};
use crate::domain::models::control::{
    AdaptationConfig, AdaptationLaw, ControlHistory, ControlSample, SlidingSurface,
    SwitchingFunction, UncertaintyEstimator,
};
use crate::domain::models::{ControllerKind, ControllerSettings, GainVector, State};
use crate::domain::ports::{ControlOutput, InternalState, SlidingModeController};

use super::{check_state, saturate};

/// Sliding-mode controller whose switching gain adapts online.
pub struct AdaptiveSmc {
    gains: GainVector,
    surface: SlidingSurface,
    switching: SwitchingFunction,
    boundary_layer: f64,
    damping: f64,
    max_force: f64,
    adaptation: AdaptationLaw,
    estimator: Option<UncertaintyEstimator>,
    previous_surface: Option<f64>,
    last_force: f64,
}

impl AdaptiveSmc {
    /// Build from `[k1, k2, λ1, λ2, γ]`.
    pub fn new(gains: GainVector, settings: &ControllerSettings) -> DomainResult<Self> {
        gains.expect_len(ControllerKind::Adaptive)?;
        let g = gains.as_slice();
        for (value, name) in g.iter().zip(ControllerKind::Adaptive.gain_names()) {
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
        if !(settings.damping >= 0.0 && settings.damping.is_finite()) {
            return Err(DomainError::ValidationFailed(format!(
                "damping must be non-negative, got {}",
                settings.damping
            )));
        }

        let adaptation = AdaptationLaw::new(AdaptationConfig {
            gamma: g[4],
            ..settings.adaptation
        })?;
        let estimator = settings
            .uncertainty
            .map(UncertaintyEstimator::new)
            .transpose()?;

        Ok(Self {
            surface: SlidingSurface::from_angle_gains(g[0], g[1], g[2], g[3])?,
            switching: settings.switching,
            boundary_layer: settings.boundary_layer,
            damping: settings.damping,
            max_force: settings.max_force,
            adaptation,
            estimator,
            previous_surface: None,
            last_force: 0.0,
            gains,
        })
    }

    /// Current adaptive switching gain `K`.
    pub fn adaptive_gain(&self) -> f64 {
        self.adaptation.gain()
    }

    /// Current disturbance bound, when an estimator is configured.
    pub fn uncertainty_estimate(&self) -> Option<f64> {
        self.estimator.as_ref().map(UncertaintyEstimator::estimate)
    }
}

impl SlidingModeController for AdaptiveSmc {
    fn kind(&self) -> ControllerKind {
        ControllerKind::Adaptive
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
        let s_dot = self
            .previous_surface
            .map(|prev| SlidingSurface::finite_difference(s, prev, dt));
        self.previous_surface = Some(s);

        let eta = match (&mut self.estimator, s_dot) {
            (Some(estimator), Some(s_dot)) => Some(estimator.update(s, s_dot, self.last_force, dt)),
            (Some(estimator), None) => Some(estimator.estimate()),
            (None, _) => None,
        };
        let record = self.adaptation.update(s, dt, eta);
        let gain = record.new_gain;

        let u = -gain * self.switching.apply(s, self.boundary_layer) - self.damping * s;
        let output = saturate(
            u,
            s,
            self.max_force,
            InternalState::Adaptive {
                gain,
                uncertainty: eta.unwrap_or(0.0),
            },
        )?;
        self.last_force = output.force;

        history.push(ControlSample {
            surface: s,
            surface_derivative: s_dot,
            force: output.force,
            gain,
            uncertainty: eta,
            mode: None,
            adaptation: Some(record),
        });
        Ok(output)
    }

    fn reset(&mut self) {
        self.adaptation.reset();
        if let Some(estimator) = &mut self.estimator {
            estimator.reset();
        }
        self.previous_surface = None;
        self.last_force = 0.0;
    }
}
