//! Rolling disturbance-magnitude estimation from surface and control samples.
//!
//! Each step blends three indicators of unmodelled disturbance:
//!
//! 1. **Reaching-law violation** -- `|ṡ + η·sign(s)|`, how far the observed
//!    surface dynamics are from the nominal reaching law `ṡ = −η·sign(s)`.
//! 2. **Control effectiveness** -- `|ṡ| / max(|u|, ε)`, surface motion per
//!    unit of applied force.
//! 3. **Sliding-condition violation** -- `max(0, s·ṡ + η·|s|)`, positive only
//!    when `s·ṡ ≤ −η|s|` is violated.
//!
//! The estimate follows `η̂ ← λ·η̂ + α·indicator`. The last `window` raw
//! indicator samples back a normal-approximation confidence interval on the
//! indicator itself, so the interval reflects sample spread rather than the
//! smoothed trajectory of `η̂`.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::switching::sign;
use crate::domain::errors::{DomainError, DomainResult};

/// Denominator floor for the control-effectiveness ratio.
pub const EFFECTIVENESS_EPSILON: f64 = 1e-6;

/// Static parameters of an [`UncertaintyEstimator`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UncertaintyConfig {
    /// Number of recent indicator samples kept for the confidence interval.
    pub window: usize,
    /// Forgetting factor λ in `(0, 1]`.
    pub forgetting_factor: f64,
    /// Indicator gain α.
    pub gain: f64,
    /// Nominal reaching rate η.
    pub reaching_rate: f64,
    /// Blend weights for (reaching, effectiveness, sliding) indicators.
    pub weights: [f64; 3],
    /// z-score used for the confidence interval (1.96 for ~95 %).
    pub z_score: f64,
}

impl Default for UncertaintyConfig {
    fn default() -> Self {
        Self {
            window: 50,
            forgetting_factor: 0.95,
            gain: 0.05,
            reaching_rate: 0.5,
            weights: [0.4, 0.3, 0.3],
            z_score: 1.96,
        }
    }
}

impl UncertaintyConfig {
    /// Fails on an empty window, a forgetting factor outside `(0, 1]`
    /// or negative weights.
    pub fn validate(&self) -> DomainResult<()> {
        if self.window == 0 {
            return Err(DomainError::ValidationFailed(
                "uncertainty window must be at least 1".to_string(),
            ));
        }
        if !(self.forgetting_factor > 0.0 && self.forgetting_factor <= 1.0) {
            return Err(DomainError::ValidationFailed(format!(
                "forgetting factor must be in (0, 1], got {}",
                self.forgetting_factor
            )));
        }
        for (name, value) in [
            ("gain", self.gain),
            ("z_score", self.z_score),
        ] {
            if !(value > 0.0 && value.is_finite()) {
                return Err(DomainError::NonPositiveParameter {
                    name: name.to_string(),
                    value,
                });
            }
        }
        if self.reaching_rate < 0.0 || self.weights.iter().any(|w| *w < 0.0 || !w.is_finite()) {
            return Err(DomainError::ValidationFailed(
                "reaching rate and indicator weights must be non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Mean indicator with a symmetric confidence interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    /// Mean of the windowed samples.
    pub mean: f64,
    pub lower: f64,
    pub upper: f64,
    /// Number of samples behind the interval.
    pub samples: usize,
}

/// Exponential-forgetting disturbance estimator.
#[derive(Debug, Clone)]
pub struct UncertaintyEstimator {
    config: UncertaintyConfig,
    estimate: f64,
    recent: VecDeque<f64>,
}

impl UncertaintyEstimator {
    /// Estimator starting from a zero bound.
    pub fn new(config: UncertaintyConfig) -> DomainResult<Self> {
        config.validate()?;
        Ok(Self {
            recent: VecDeque::with_capacity(config.window),
            estimate: 0.0,
            config,
        })
    }

    /// Current uncertainty bound η̂.
    pub fn estimate(&self) -> f64 {
        self.estimate
    }

    /// Clear the bound and the sample window.
    pub fn reset(&mut self) {
        self.estimate = 0.0;
        self.recent.clear();
    }

    /// Blended disturbance indicator for one sample.
    pub fn indicator(&self, surface: f64, surface_derivative: f64, control: f64) -> f64 {
        let eta = self.config.reaching_rate;
        let reaching = (surface_derivative + eta * sign(surface)).abs();
        let effectiveness = surface_derivative.abs() / control.abs().max(EFFECTIVENESS_EPSILON);
        let sliding = (surface * surface_derivative + eta * surface.abs()).max(0.0);
        let [w_r, w_e, w_s] = self.config.weights;
        w_r * reaching + w_e * effectiveness + w_s * sliding
    }

    /// Fold one `(s, ṡ, u)` sample taken over a step of `dt` seconds into the
    /// estimate and return the new bound.
    ///
    /// Non-finite samples and steps with `dt <= 0` leave the estimate and the
    /// sample window unchanged.
    pub fn update(&mut self, surface: f64, surface_derivative: f64, control: f64, dt: f64) -> f64 {
        if !(dt > 0.0) {
            return self.estimate;
        }
        let indicator = self.indicator(surface, surface_derivative, control);
        if !indicator.is_finite() {
            return self.estimate;
        }
        self.estimate = self.config.forgetting_factor * self.estimate + self.config.gain * indicator;
        if self.recent.len() == self.config.window {
            self.recent.pop_front();
        }
        self.recent.push_back(indicator);
        self.estimate
    }

    /// Normal-approximation confidence interval over the recent indicator
    /// samples. Falls back to the current estimate before any sample.
    pub fn confidence_interval(&self) -> ConfidenceInterval {
        let n = self.recent.len();
        if n == 0 {
            return ConfidenceInterval {
                mean: self.estimate,
                lower: self.estimate,
                upper: self.estimate,
                samples: 0,
            };
        }
        let mean = self.recent.iter().sum::<f64>() / n as f64;
        let variance = if n > 1 {
            self.recent.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64
        } else {
            0.0
        };
        let half_width = self.config.z_score * (variance / n as f64).sqrt();
        ConfidenceInterval {
            mean,
            lower: (mean - half_width).max(0.0),
            upper: mean + half_width,
            samples: n,
        }
    }
}
