//! Per-iteration convergence snapshot and the thresholds that interpret it.

use serde::{Deserialize, Serialize};

use super::ConvergenceStatus;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::ControllerKind;

// ============================================================================
// CriteriaSnapshot
// ============================================================================

/// Which independent convergence criteria hold at one iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CriteriaSnapshot {
    /// Best fitness moved less than the absolute tolerance over the window.
    pub fitness_tolerance: bool,
    /// Relative improvement over the window is below the threshold.
    pub relative_improvement: bool,
    /// Population diversity collapsed below the threshold.
    pub diversity_collapse: bool,
    /// Early and recent halves of the window are statistically
    /// indistinguishable.
    pub statistical_plateau: bool,
    /// The decay model predicts no meaningful iterations remaining.
    pub prediction_complete: bool,
}

impl CriteriaSnapshot {
    /// Number of criteria currently satisfied.
    pub fn count(&self) -> usize {
        [
            self.fitness_tolerance,
            self.relative_improvement,
            self.diversity_collapse,
            self.statistical_plateau,
            self.prediction_complete,
        ]
        .iter()
        .filter(|c| **c)
        .count()
    }
}

// ============================================================================
// ConvergenceMetrics
// ============================================================================

/// Immutable per-iteration snapshot produced by the convergence analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceMetrics {
    pub iteration: usize,
    /// Global best cost at this iteration.
    pub best_fitness: f64,
    pub mean_fitness: f64,
    /// Sample standard deviation of the viable costs.
    pub fitness_std: f64,
    /// Mean pairwise particle distance. `None` when positions were not
    /// supplied.
    pub population_diversity: Option<f64>,
    /// Smoothed per-iteration fitness decrease over the velocity window.
    /// Positive means improving.
    pub convergence_velocity: f64,
    /// Relative best-fitness improvement over the stagnation window.
    pub improvement_rate: f64,
    /// `1 / (1 + CV)` of recent best fitness; 1.0 means perfectly flat.
    pub stagnation_score: f64,
    /// Relative diversity decrease over the stagnation window.
    pub diversity_loss_rate: Option<f64>,
    /// Iterations until per-iteration improvement drops below the fitness
    /// tolerance, from a log-linear fit. `None` when the fit is not usable.
    pub predicted_remaining_iterations: Option<f64>,
    /// Confidence in `status` (0.0 -- 1.0).
    pub confidence_level: f64,
    /// Which individual criteria held.
    pub criteria: CriteriaSnapshot,
    /// Classification derived from the criteria.
    pub status: ConvergenceStatus,
}

// ============================================================================
// ConvergenceCriteria
// ============================================================================

/// Thresholds used to classify the search state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvergenceCriteria {
    /// Absolute best-fitness change regarded as "no change".
    pub fitness_tolerance: f64,
    /// Relative improvement regarded as "no improvement".
    pub relative_improvement_threshold: f64,
    /// Mean pairwise distance regarded as a collapsed swarm.
    pub diversity_threshold: f64,
    /// Trailing window for tolerance, improvement, and statistical tests.
    pub stagnation_window: usize,
    /// Window for the smoothed convergence velocity.
    pub velocity_window: usize,
    /// Trailing window for the log-linear remaining-iterations fit.
    pub prediction_window: usize,
    /// Two-sided significance level for the early-vs-recent test.
    pub significance_level: f64,
    /// Iterations required before any terminal classification.
    pub min_iterations: usize,
    /// Number of agreeing criteria needed to declare convergence.
    pub required_criteria: usize,
    /// Diversity below this value during the early phase is premature.
    pub premature_diversity_threshold: f64,
    /// Iterations that count as the early phase.
    pub early_phase_iterations: usize,
    /// Relative diversity loss over the window regarded as "rapid".
    pub rapid_diversity_loss: f64,
    /// Stagnation score above which the run counts as flat.
    pub stagnation_score_threshold: f64,
    /// Fraction of deltas that must alternate sign to flag oscillation.
    pub oscillation_ratio: f64,
    /// Fraction of worsening deltas that flags divergence.
    pub divergence_ratio: f64,
}

impl Default for ConvergenceCriteria {
    fn default() -> Self {
        Self {
            fitness_tolerance: 1e-6,
            relative_improvement_threshold: 1e-3,
            diversity_threshold: 1e-3,
            stagnation_window: 10,
            velocity_window: 5,
            prediction_window: 15,
            significance_level: 0.05,
            min_iterations: 10,
            required_criteria: 2,
            premature_diversity_threshold: 1e-4,
            early_phase_iterations: 5,
            rapid_diversity_loss: 0.9,
            stagnation_score_threshold: 0.99,
            oscillation_ratio: 0.8,
            divergence_ratio: 0.7,
        }
    }
}

impl ConvergenceCriteria {
    /// Thresholds tuned to the cost landscape of each controller kind.
    ///
    /// Adaptive and hybrid controllers have noisier costs (the adapted gain
    /// depends on the whole trajectory) and get looser tolerances and a longer
    /// window.
    pub fn for_controller(kind: ControllerKind) -> Self {
        let base = Self::default();
        match kind {
            ControllerKind::Classical => Self {
                fitness_tolerance: 1e-4,
                diversity_threshold: 1e-2,
                ..base
            },
            ControllerKind::SuperTwisting => Self {
                fitness_tolerance: 1e-4,
                diversity_threshold: 1e-2,
                stagnation_window: 12,
                ..base
            },
            ControllerKind::Adaptive => Self {
                fitness_tolerance: 1e-3,
                relative_improvement_threshold: 5e-3,
                diversity_threshold: 5e-2,
                stagnation_window: 15,
                min_iterations: 15,
                ..base
            },
            ControllerKind::Hybrid => Self {
                fitness_tolerance: 1e-3,
                relative_improvement_threshold: 5e-3,
                diversity_threshold: 5e-2,
                stagnation_window: 15,
                min_iterations: 15,
                oscillation_ratio: 0.85,
                ..base
            },
        }
    }

    /// Every threshold must be positive and finite; window sizes and the
    /// required-criteria count have lower limits.
    pub fn validate(&self) -> DomainResult<()> {
        for (name, value) in [
            ("fitness_tolerance", self.fitness_tolerance),
            ("relative_improvement_threshold", self.relative_improvement_threshold),
            ("diversity_threshold", self.diversity_threshold),
            ("significance_level", self.significance_level),
            ("premature_diversity_threshold", self.premature_diversity_threshold),
            ("rapid_diversity_loss", self.rapid_diversity_loss),
            ("stagnation_score_threshold", self.stagnation_score_threshold),
            ("oscillation_ratio", self.oscillation_ratio),
            ("divergence_ratio", self.divergence_ratio),
        ] {
            if !(value > 0.0 && value.is_finite()) {
                return Err(DomainError::NonPositiveParameter {
                    name: name.to_string(),
                    value,
                });
            }
        }
        if self.stagnation_window < 4 {
            return Err(DomainError::ValidationFailed(format!(
                "stagnation_window must be at least 4, got {}",
                self.stagnation_window
            )));
        }
        if self.velocity_window == 0 || self.prediction_window < 3 {
            return Err(DomainError::ValidationFailed(
                "velocity_window must be >= 1 and prediction_window >= 3".to_string(),
            ));
        }
        if self.required_criteria < 2 {
            return Err(DomainError::ValidationFailed(format!(
                "required_criteria must be at least 2, got {}",
                self.required_criteria
            )));
        }
        if self.significance_level >= 1.0 {
            return Err(DomainError::ValidationFailed(
                "significance_level must be below 1".to_string(),
            ));
        }
        Ok(())
    }
}
