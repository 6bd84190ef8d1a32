//! Hybrid adaptive / super-twisting controller.
//!
//! Far from the surface the controller runs an adaptive law to drive `s`
//! toward zero quickly; close to it it hands over to super-twisting for a
//! chattering-free finish. The hand-over uses a hysteresis band around
//! `surface_threshold`:
//!
//! ```text
//! Adaptive      → SuperTwisting   when |s| < threshold·(1 − hysteresis)
//! SuperTwisting → Adaptive        when |s| > threshold·(1 + hysteresis)
//! ```
//!
//! Near a singular configuration (a link close to horizontal, or a
//! vanishing `L·M⁻¹·B`) the adaptive mode is forced regardless of `s`.
//!
//! The surface derivative is computed from the dynamics model when one is
//! supplied and equivalent control is enabled. Otherwise it falls back to a
//! backward finite difference, and each controller instance logs a warning
//! the first time it does so.
//!
//! Gain adaptation uses the modified law whenever the settings carry a
//! projection margin (the hybrid defaults do).

use std::sync::Arc;

use tracing::{debug, warn};

use super::{check_state, saturate, EquivalentControl};
use crate::domain::errors::{ControlError, DomainError, DomainResult};
use crate::domain::models::control::{
    AdaptationLaw, ControlHistory, ControlSample, HybridMode, SlidingSurface, SwitchingFunction,
    UncertaintyEstimator,
};
use crate::domain::models::{ControllerKind, ControllerSettings, GainVector, HybridConfig, State};
use crate::domain::ports::{ControlOutput, DynamicsModel, InternalState, SlidingModeController};

/// Controller that switches between adaptive and super-twisting modes.
pub struct HybridAdaptiveSta {
    gains: GainVector,
    surface: SlidingSurface,
    switching: SwitchingFunction,
    boundary_layer: f64,
    max_force: f64,
    config: HybridConfig,
    controllability_threshold: f64,
    adaptation: AdaptationLaw,
    estimator: Option<UncertaintyEstimator>,
    equivalent: EquivalentControl,
    mode: HybridMode,
    integral: f64,
    previous_surface: Option<f64>,
    last_force: f64,
    fallback_warned: bool,
}

impl HybridAdaptiveSta {
    /// Build from `[c1, λ1, c2, λ2]`.
    ///
    /// The surface is `s = c1·(θ̇1 + λ1·θ1) − c2·(θ̇2 + λ2·θ2)`.
    pub fn new(
        gains: GainVector,
        settings: &ControllerSettings,
        model: Option<Arc<dyn DynamicsModel>>,
    ) -> DomainResult<Self> {
        gains.expect_len(ControllerKind::Hybrid)?;
        let g = gains.as_slice();
        for (value, name) in g.iter().zip(ControllerKind::Hybrid.gain_names()) {
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
        validate_hybrid(&settings.hybrid)?;

        let (c1, lambda1, c2, lambda2) = (g[0], g[1], g[2], g[3]);
        let surface = SlidingSurface::from_angle_gains(c1, c2, c1 * lambda1, c2 * lambda2)?;
        let adaptation = match settings.adaptation.projection_margin {
            Some(margin) => AdaptationLaw::modified(settings.adaptation, margin)?,
            None => AdaptationLaw::new(settings.adaptation)?,
        };
        let estimator = settings
            .uncertainty
            .map(UncertaintyEstimator::new)
            .transpose()?;

        let model = model.filter(|_| settings.equivalent_control);

        Ok(Self {
            surface,
            switching: settings.switching,
            boundary_layer: settings.boundary_layer,
            max_force: settings.max_force,
            config: settings.hybrid,
            controllability_threshold: settings.controllability_threshold,
            adaptation,
            estimator,
            equivalent: EquivalentControl::new(model, settings.controllability_threshold),
            mode: HybridMode::Adaptive,
            integral: 0.0,
            previous_surface: None,
            last_force: 0.0,
            fallback_warned: false,
            gains,
        })
    }

    /// Sub-mode used for the most recent step.
    pub fn active_mode(&self) -> HybridMode {
        self.mode
    }

    pub fn adaptive_gain(&self) -> f64 {
        self.adaptation.gain()
    }

    /// Super-twisting integral state `z`.
    pub fn integral(&self) -> f64 {
        self.integral
    }

    /// Whether `ṡ` comes from the dynamics model rather than a finite
    /// difference.
    pub fn model_based_derivative(&self) -> bool {
        self.equivalent.is_enabled()
    }

    fn near_singularity(&self, state: &State, controllability: Option<f64>) -> bool {
        let min_cos = state.theta1().cos().abs().min(state.theta2().cos().abs());
        min_cos < self.config.singularity_cos_threshold
            || controllability.is_some_and(|c| c.abs() < self.controllability_threshold)
    }

    fn next_mode(&self, s: f64, singular: bool) -> HybridMode {
        if singular {
            return HybridMode::Adaptive;
        }
        let threshold = self.config.surface_threshold;
        let hysteresis = self.config.hysteresis;
        match self.mode {
            HybridMode::Adaptive if s.abs() < threshold * (1.0 - hysteresis) => {
                HybridMode::SuperTwisting
            }
            HybridMode::SuperTwisting if s.abs() > threshold * (1.0 + hysteresis) => {
                HybridMode::Adaptive
            }
            mode => mode,
        }
    }

    fn surface_derivative(&mut self, state: &State, s: f64, dt: f64) -> f64 {
        if let Some(s_dot) = self
            .equivalent
            .surface_derivative(&self.surface, state, self.last_force)
        {
            return s_dot;
        }
        if !self.fallback_warned {
            self.fallback_warned = true;
            warn!(
                model = self.equivalent.is_enabled(),
                "hybrid surface derivative falls back to finite differences"
            );
        }
        self.previous_surface
            .map(|prev| SlidingSurface::finite_difference(s, prev, dt))
            .unwrap_or(0.0)
    }
}

fn validate_hybrid(config: &HybridConfig) -> DomainResult<()> {
    if !(config.surface_threshold > 0.0 && config.surface_threshold.is_finite()) {
        return Err(DomainError::NonPositiveParameter {
            name: "surface_threshold".to_string(),
            value: config.surface_threshold,
        });
    }
    if !(0.0..1.0).contains(&config.hysteresis) {
        return Err(DomainError::ValidationFailed(format!(
            "hysteresis must be in [0, 1), got {}",
            config.hysteresis
        )));
    }
    if config.twisting_gains.iter().any(|k| !(*k > 0.0 && k.is_finite())) {
        return Err(DomainError::ValidationFailed(format!(
            "twisting gains must be positive, got {:?}",
            config.twisting_gains
        )));
    }
    Ok(())
}

impl SlidingModeController for HybridAdaptiveSta {
    fn kind(&self) -> ControllerKind {
        ControllerKind::Hybrid
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
        let s_dot = self.surface_derivative(state, s, dt);
        self.previous_surface = Some(s);

        let eta = self
            .estimator
            .as_mut()
            .map(|estimator| estimator.update(s, s_dot, self.last_force, dt));

        let equivalent = self.equivalent.compute(&self.surface, state);
        let singular = self.near_singularity(state, equivalent.controllability);
        let mode = self.next_mode(s, singular);
        if mode != self.mode {
            debug!(from = ?self.mode, to = ?mode, surface = s, singular, "hybrid mode switch");
            self.mode = mode;
        }

        let switch = self.switching.apply(s, self.boundary_layer);
        let mut record = None;
        let u = match self.mode {
            HybridMode::Adaptive => {
                self.integral = 0.0;
                let step = self.adaptation.update(s, dt, eta);
                record = Some(step);
                equivalent.force - step.new_gain * switch
            }
            HybridMode::SuperTwisting => {
                let [k1, k2] = self.config.twisting_gains;
                let u = equivalent.force - k1 * s.abs().sqrt() * switch + self.integral;
                if dt > 0.0 {
                    self.integral =
                        (self.integral - k2 * switch * dt).clamp(-self.max_force, self.max_force);
                }
                u
            }
        };

        let gain = match self.mode {
            HybridMode::Adaptive => self.adaptation.gain(),
            HybridMode::SuperTwisting => self.config.twisting_gains[0],
        };
        let output = saturate(
            u,
            s,
            self.max_force,
            InternalState::Hybrid {
                mode: self.mode,
                gain: self.adaptation.gain(),
                integral: self.integral,
            },
        )?;
        self.last_force = output.force;

        history.push(ControlSample {
            surface: s,
            surface_derivative: Some(s_dot),
            force: output.force,
            gain,
            uncertainty: eta,
            mode: Some(self.mode),
            adaptation: record,
        });
        Ok(output)
    }

    fn reset(&mut self) {
        self.adaptation.reset();
        if let Some(estimator) = &mut self.estimator {
            estimator.reset();
        }
        self.mode = HybridMode::Adaptive;
        self.integral = 0.0;
        self.previous_surface = None;
        self.last_force = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::plant::DoublePendulum;

    fn settings() -> ControllerSettings {
        ControllerSettings::for_kind(ControllerKind::Hybrid)
    }

    fn controller(with_model: bool) -> HybridAdaptiveSta {
        let model: Option<Arc<dyn DynamicsModel>> = if with_model {
            Some(Arc::new(DoublePendulum::default()))
        } else {
            None
        };
        HybridAdaptiveSta::new(ControllerKind::Hybrid.reference_gains(), &settings(), model)
            .unwrap()
    }

    /// State whose surface value is exactly `s` (only θ1 non-zero).
    fn state_with_surface(c: &HybridAdaptiveSta, s: f64) -> State {
        let lambda = c.surface.position_weights()[1];
        State::new(0.0, s / lambda, 0.0, 0.0, 0.0, 0.0)
    }

    #[test]
    fn test_starts_in_adaptive_mode() {
        assert_eq!(controller(true).active_mode(), HybridMode::Adaptive);
    }

    #[test]
    fn test_switches_to_twisting_inside_band() {
        let mut c = controller(true);
        let state = state_with_surface(&c, 0.1);
        c.compute_control(&state, 0.01, &mut ControlHistory::disabled())
            .unwrap();
        assert_eq!(c.active_mode(), HybridMode::SuperTwisting);
    }

    #[test]
    fn test_hysteresis_holds_mode_between_thresholds() {
        let mut c = controller(true);
        let mut history = ControlHistory::disabled();
        // threshold 0.5, hysteresis 0.2: band is (0.4, 0.6)
        c.compute_control(&state_with_surface(&c, 0.5), 0.01, &mut history)
            .unwrap();
        assert_eq!(c.active_mode(), HybridMode::Adaptive);

        c.compute_control(&state_with_surface(&c, 0.3), 0.01, &mut history)
            .unwrap();
        assert_eq!(c.active_mode(), HybridMode::SuperTwisting);

        c.compute_control(&state_with_surface(&c, 0.55), 0.01, &mut history)
            .unwrap();
        assert_eq!(c.active_mode(), HybridMode::SuperTwisting);

        c.compute_control(&state_with_surface(&c, 0.7), 0.01, &mut history)
            .unwrap();
        assert_eq!(c.active_mode(), HybridMode::Adaptive);
    }

    #[test]
    fn test_singularity_forces_adaptive_mode() {
        let mut c = controller(true);
        let mut history = ControlHistory::disabled();
        c.compute_control(&state_with_surface(&c, 0.1), 0.01, &mut history)
            .unwrap();
        assert_eq!(c.active_mode(), HybridMode::SuperTwisting);

        // upper link nearly horizontal, surface still small
        let lambda2 = -c.surface.position_weights()[2];
        let theta2 = 1.5;
        let lambda1 = c.surface.position_weights()[1];
        let theta1 = lambda2 * theta2 / lambda1;
        let state = State::new(0.0, theta1, theta2, 0.0, 0.0, 0.0);
        assert!(c.surface.evaluate(&state).abs() < 1e-9);
        c.compute_control(&state, 0.01, &mut history).unwrap();
        assert_eq!(c.active_mode(), HybridMode::Adaptive);
    }

    #[test]
    fn test_adaptive_mode_clears_integral() {
        let mut c = controller(true);
        let mut history = ControlHistory::disabled();
        for _ in 0..20 {
            c.compute_control(&state_with_surface(&c, 0.2), 0.01, &mut history)
                .unwrap();
        }
        assert!(c.integral() != 0.0);
        c.compute_control(&state_with_surface(&c, 2.0), 0.01, &mut history)
            .unwrap();
        assert_eq!(c.active_mode(), HybridMode::Adaptive);
        assert_eq!(c.integral(), 0.0);
    }

    #[test]
    fn test_history_records_mode_and_derivative() {
        let mut c = controller(false);
        let mut history = ControlHistory::with_capacity(4);
        c.compute_control(&state_with_surface(&c, 1.0), 0.01, &mut history)
            .unwrap();
        c.compute_control(&state_with_surface(&c, 0.9), 0.01, &mut history)
            .unwrap();
        let last = history.last().unwrap();
        assert_eq!(last.mode, Some(HybridMode::Adaptive));
        assert!((last.surface_derivative.unwrap() + 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_disabled_equivalent_control_uses_finite_difference() {
        let mut s = settings();
        s.equivalent_control = false;
        let mut c = HybridAdaptiveSta::new(
            ControllerKind::Hybrid.reference_gains(),
            &s,
            Some(Arc::new(DoublePendulum::default())),
        )
        .unwrap();
        assert!(!c.model_based_derivative());
        assert!(controller(true).model_based_derivative());

        let mut history = ControlHistory::with_capacity(4);
        c.compute_control(&state_with_surface(&c, 1.0), 0.01, &mut history)
            .unwrap();
        assert!(c.fallback_warned);
        c.compute_control(&state_with_surface(&c, 0.9), 0.01, &mut history)
            .unwrap();
        assert!((history.last().unwrap().surface_derivative.unwrap() + 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_adaptive_mode_records_adaptation_step() {
        let mut c = controller(true);
        let mut history = ControlHistory::with_capacity(8);
        let before = c.adaptive_gain();
        c.compute_control(&state_with_surface(&c, 2.0), 0.01, &mut history)
            .unwrap();
        let record = history.last().unwrap().adaptation.unwrap();
        assert_eq!(record.old_gain, before);
        assert_eq!(record.new_gain, c.adaptive_gain());

        // inside the band the twisting mode does not adapt
        for _ in 0..3 {
            c.compute_control(&state_with_surface(&c, 0.1), 0.01, &mut history)
                .unwrap();
        }
        assert_eq!(c.active_mode(), HybridMode::SuperTwisting);
        assert!(history.last().unwrap().adaptation.is_none());
    }

    #[test]
    fn test_default_settings_select_modified_law() {
        let c = controller(true);
        assert!(c.adaptation.config().projection_margin.is_some());
    }

    #[test]
    fn test_reset_returns_to_adaptive() {
        let mut c = controller(true);
        c.compute_control(&state_with_surface(&c, 0.1), 0.01, &mut ControlHistory::disabled())
            .unwrap();
        c.reset();
        assert_eq!(c.active_mode(), HybridMode::Adaptive);
        assert_eq!(c.integral(), 0.0);
    }

    #[test]
    fn test_invalid_hysteresis_rejected() {
        let mut s = settings();
        s.hybrid.hysteresis = 1.0;
        assert!(HybridAdaptiveSta::new(ControllerKind::Hybrid.reference_gains(), &s, None).is_err());
    }
}
