//! Online gain adaptation with leakage, dead zone, rate limiting and bounds.
//!
//! ## Update Rule
//!
//! ```text
//! |s| <  dead_zone  :  K̇ = −σ·K
//! |s| >= dead_zone  :  K̇ = γ·|s| − σ·K + γ·η̂      (η̂: uncertainty estimate, optional)
//!
//! K̇ ← clip(K̇, −rate_limit, rate_limit)
//! K  ← clip(K + K̇·dt, K_min, K_max)
//! ```
//!
//! The modified law additionally scales `K̇` toward zero when `K` is within
//! `projection_margin` of a bound and `K̇` points at that bound, so the gain
//! approaches the bound smoothly instead of repeatedly clamping against it.
//!
//! Each update returns an [`AdaptationRecord`]; retaining records is the
//! caller's decision (see [`super::ControlHistory`]).

use serde::{Deserialize, Serialize};

use crate::domain::errors::{DomainError, DomainResult};

/// Static parameters of an adaptation law.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdaptationConfig {
    /// Adaptation rate γ.
    pub gamma: f64,
    /// Leakage σ (0 disables leakage).
    pub leak_rate: f64,
    /// Surface magnitude below which only leakage is applied.
    pub dead_zone: f64,
    /// Maximum |K̇|.
    pub rate_limit: f64,
    /// Lower gain bound.
    pub k_min: f64,
    /// Upper gain bound.
    pub k_max: f64,
    /// Initial gain. `None` starts at the midpoint of `[k_min, k_max]`.
    pub k_init: Option<f64>,
    /// Width of the projection band of the modified law. `None` selects the
    /// standard law.
    pub projection_margin: Option<f64>,
}

impl Default for AdaptationConfig {
    fn default() -> Self {
        Self {
            gamma: 2.0,
            leak_rate: 0.01,
            dead_zone: 0.01,
            rate_limit: 100.0,
            k_min: 0.1,
            k_max: 100.0,
            k_init: Some(10.0),
            projection_margin: None,
        }
    }
}

impl AdaptationConfig {
    /// Fails on non-positive rates, inverted bounds or an initial gain
    /// outside `[k_min, k_max]`.
    pub fn validate(&self) -> DomainResult<()> {
        positive("gamma", self.gamma)?;
        positive("rate_limit", self.rate_limit)?;
        non_negative("leak_rate", self.leak_rate)?;
        non_negative("dead_zone", self.dead_zone)?;
        non_negative("k_min", self.k_min)?;
        if self.k_min >= self.k_max || !self.k_max.is_finite() {
            return Err(DomainError::InvalidBounds {
                index: 0,
                lower: self.k_min,
                upper: self.k_max,
            });
        }
        if let Some(k0) = self.k_init {
            if !(self.k_min..=self.k_max).contains(&k0) {
                return Err(DomainError::GainOutOfBounds {
                    index: 0,
                    value: k0,
                    lower: self.k_min,
                    upper: self.k_max,
                });
            }
        }
        if let Some(margin) = self.projection_margin {
            positive("projection_margin", margin)?;
        }
        Ok(())
    }

    fn initial_gain(&self) -> f64 {
        self.k_init
            .unwrap_or_else(|| 0.5 * (self.k_min + self.k_max))
    }
}

fn positive(name: &str, value: f64) -> DomainResult<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(DomainError::NonPositiveParameter {
            name: name.to_string(),
            value,
        })
    }
}

fn non_negative(name: &str, value: f64) -> DomainResult<()> {
    if value >= 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(DomainError::ValidationFailed(format!(
            "'{name}' must be non-negative, got {value}"
        )))
    }
}

/// One adaptation step, recorded for later analysis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdaptationRecord {
    /// Gain before the step.
    pub old_gain: f64,
    /// Gain after integration and clipping.
    pub new_gain: f64,
    /// `γ·|s|` (zero inside the dead zone).
    pub growth: f64,
    /// `−σ·K`.
    pub leakage: f64,
    /// `γ·η̂` (zero inside the dead zone or without an estimate).
    pub uncertainty_term: f64,
    /// Rate after limiting and projection, before integration.
    pub rate: f64,
    /// `|s|` was below the dead zone; only leakage applied.
    pub in_dead_zone: bool,
    /// The raw rate exceeded `rate_limit`.
    pub rate_limited: bool,
    /// The modified law scaled the rate near a bound.
    pub projected: bool,
}

/// Scalar gain adaptation. Owns the adaptive gain `K`.
#[derive(Debug, Clone, PartialEq)]
pub struct AdaptationLaw {
    config: AdaptationConfig,
    gain: f64,
}

impl AdaptationLaw {
    /// Standard law, or the modified law when `projection_margin` is set.
    pub fn new(config: AdaptationConfig) -> DomainResult<Self> {
        config.validate()?;
        Ok(Self {
            gain: config.initial_gain(),
            config,
        })
    }

    /// Modified law with boundary projection of width `margin`.
    pub fn modified(config: AdaptationConfig, margin: f64) -> DomainResult<Self> {
        Self::new(AdaptationConfig {
            projection_margin: Some(margin),
            ..config
        })
    }

    /// Current adaptive gain `K`.
    pub fn gain(&self) -> f64 {
        self.gain
    }

    pub fn config(&self) -> &AdaptationConfig {
        &self.config
    }

    /// Restore the initial gain. The only way the gain moves other than
    /// [`Self::update`].
    pub fn reset(&mut self) {
        self.gain = self.config.initial_gain();
    }

    /// Advance the gain by one step.
    pub fn update(&mut self, surface: f64, dt: f64, uncertainty: Option<f64>) -> AdaptationRecord {
        let cfg = &self.config;
        let old_gain = self.gain;
        let leakage = -cfg.leak_rate * old_gain;
        let in_dead_zone = surface.abs() < cfg.dead_zone;

        let (growth, uncertainty_term) = if in_dead_zone {
            (0.0, 0.0)
        } else {
            let estimate = uncertainty.filter(|u| u.is_finite()).unwrap_or(0.0).max(0.0);
            (cfg.gamma * surface.abs(), cfg.gamma * estimate)
        };

        let raw_rate = growth + leakage + uncertainty_term;
        let mut rate = raw_rate.clamp(-cfg.rate_limit, cfg.rate_limit);
        let rate_limited = rate != raw_rate;

        let mut projected = false;
        if let Some(margin) = cfg.projection_margin {
            let to_upper = cfg.k_max - old_gain;
            let to_lower = old_gain - cfg.k_min;
            if rate > 0.0 && to_upper < margin {
                rate *= (to_upper / margin).max(0.0);
                projected = true;
            } else if rate < 0.0 && to_lower < margin {
                rate *= (to_lower / margin).max(0.0);
                projected = true;
            }
        }

        let new_gain = if dt > 0.0 {
            (old_gain + rate * dt).clamp(cfg.k_min, cfg.k_max)
        } else {
            old_gain
        };
        self.gain = new_gain;

        AdaptationRecord {
            old_gain,
            new_gain,
            growth,
            leakage,
            uncertainty_term,
            rate,
            in_dead_zone,
            rate_limited,
            projected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AdaptationConfig {
        AdaptationConfig {
            gamma: 5.0,
            leak_rate: 0.1,
            dead_zone: 0.0,
            rate_limit: 1000.0,
            k_min: 0.0,
            k_max: 50.0,
            k_init: Some(10.0),
            projection_margin: None,
        }
    }

    #[test]
    fn test_gain_grows_with_surface() {
        let mut law = AdaptationLaw::new(config()).unwrap();
        let rec = law.update(1.0, 0.01, None);
        assert!(rec.new_gain > rec.old_gain);
        assert!((rec.growth - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_dead_zone_applies_only_leakage() {
        let mut law = AdaptationLaw::new(AdaptationConfig {
            dead_zone: 0.5,
            ..config()
        })
        .unwrap();
        let rec = law.update(0.2, 0.01, Some(3.0));
        assert!(rec.in_dead_zone);
        assert_eq!(rec.growth, 0.0);
        assert_eq!(rec.uncertainty_term, 0.0);
        assert!(rec.new_gain < rec.old_gain);
    }

    #[test]
    fn test_leakage_decays_toward_zero() {
        let mut law = AdaptationLaw::new(config()).unwrap();
        for _ in 0..20_000 {
            law.update(0.0, 0.01, None);
        }
        assert!(law.gain() < 0.01, "gain = {}", law.gain());
    }

    #[test]
    fn test_gain_invariant_without_leakage_or_surface() {
        let mut law = AdaptationLaw::new(AdaptationConfig {
            leak_rate: 0.0,
            ..config()
        })
        .unwrap();
        for _ in 0..1000 {
            law.update(0.0, 0.01, None);
        }
        assert_eq!(law.gain(), 10.0);
    }

    #[test]
    fn test_rate_limit() {
        let mut law = AdaptationLaw::new(AdaptationConfig {
            rate_limit: 2.0,
            ..config()
        })
        .unwrap();
        let rec = law.update(100.0, 0.1, None);
        assert!(rec.rate_limited);
        assert!((rec.new_gain - 10.2).abs() < 1e-12);
    }

    #[test]
    fn test_gain_clipped_to_bounds() {
        let mut law = AdaptationLaw::new(config()).unwrap();
        for _ in 0..1000 {
            law.update(100.0, 0.1, None);
        }
        assert_eq!(law.gain(), 50.0);
    }

    #[test]
    fn test_projection_slows_approach_to_upper_bound() {
        let mut plain = AdaptationLaw::new(AdaptationConfig {
            k_init: Some(49.0),
            ..config()
        })
        .unwrap();
        let mut projected = AdaptationLaw::modified(
            AdaptationConfig {
                k_init: Some(49.0),
                ..config()
            },
            5.0,
        )
        .unwrap();
        let a = plain.update(1.0, 0.01, None);
        let b = projected.update(1.0, 0.01, None);
        assert!(b.projected);
        assert!(b.new_gain - b.old_gain < a.new_gain - a.old_gain);
        assert!(b.new_gain <= 50.0);
    }

    #[test]
    fn test_reset_restores_initial_gain() {
        let mut law = AdaptationLaw::new(config()).unwrap();
        law.update(3.0, 0.1, None);
        assert_ne!(law.gain(), 10.0);
        law.reset();
        assert_eq!(law.gain(), 10.0);
    }

    #[test]
    fn test_midpoint_initialization() {
        let law = AdaptationLaw::new(AdaptationConfig {
            k_init: None,
            ..config()
        })
        .unwrap();
        assert_eq!(law.gain(), 25.0);
    }

    #[test]
    fn test_invalid_configs_fail_fast() {
        assert!(AdaptationLaw::new(AdaptationConfig { gamma: 0.0, ..config() }).is_err());
        assert!(AdaptationLaw::new(AdaptationConfig { k_min: 5.0, k_max: 1.0, ..config() }).is_err());
        assert!(AdaptationLaw::new(AdaptationConfig { k_init: Some(99.0), ..config() }).is_err());
        assert!(AdaptationLaw::new(AdaptationConfig { rate_limit: -1.0, ..config() }).is_err());
    }
}
