//! Per-iteration convergence analysis of a population-based search.
//!
//! The analyzer is fed one population snapshot per iteration (fitness of
//! every particle, optionally their positions) and produces an immutable
//! [`ConvergenceMetrics`] record. Classification follows a fixed precedence:
//!
//! 1. `Initializing` until enough iterations exist to compute deltas.
//! 2. `PrematureConvergence`: diversity collapsed during the early phase,
//!    or diversity fell rapidly while fitness did not improve.
//! 3. `Diverging`: most recent best-fitness deltas are worsening.
//! 4. `Oscillating`: significant deltas keep alternating sign.
//! 5. `Converged`: at least `required_criteria` independent criteria agree.
//! 6. `Stagnated`: flat fitness while the population is still spread out.
//! 7. `Converging`: one criterion holds, or improvement is steady.
//! 8. `Exploring` otherwise.
//!
//! Ratios with near-zero denominators use an epsilon floor and fall back to
//! neutral values instead of producing NaN or infinities.

use tracing::{debug, info};

use crate::domain::errors::DomainResult;
use crate::domain::models::{
    ControllerKind, ConvergenceCriteria, ConvergenceMetrics, ConvergenceStatus, CriteriaSnapshot,
};

/// Denominator floor for relative measures.
const EPSILON: f64 = 1e-12;

/// Classifies optimizer progress from a sliding window of iterations.
pub struct ConvergenceAnalyzer {
    criteria: ConvergenceCriteria,
    best: Vec<f64>,
    diversity: Vec<Option<f64>>,
    history: Vec<ConvergenceMetrics>,
    status: ConvergenceStatus,
}

impl ConvergenceAnalyzer {
    /// Analyzer over validated `criteria`.
    pub fn new(criteria: ConvergenceCriteria) -> DomainResult<Self> {
        criteria.validate()?;
        Ok(Self {
            criteria,
            best: Vec::new(),
            diversity: Vec::new(),
            history: Vec::new(),
            status: ConvergenceStatus::NotStarted,
        })
    }

    /// Analyzer with the default criteria for `kind`.
    pub fn for_controller(kind: ControllerKind) -> DomainResult<Self> {
        Self::new(ConvergenceCriteria::for_controller(kind))
    }

    pub fn criteria(&self) -> &ConvergenceCriteria {
        &self.criteria
    }

    pub fn status(&self) -> ConvergenceStatus {
        self.status
    }

    /// Metrics of every iteration seen so far.
    pub fn history(&self) -> &[ConvergenceMetrics] {
        &self.history
    }

    pub fn latest(&self) -> Option<&ConvergenceMetrics> {
        self.history.last()
    }

    /// Forget all iterations and return to `NotStarted`.
    pub fn reset(&mut self) {
        self.best.clear();
        self.diversity.clear();
        self.history.clear();
        self.status = ConvergenceStatus::NotStarted;
    }

    /// Analyze one iteration.
    ///
    /// Non-finite fitness values are ignored for the statistics; an iteration
    /// where every value is non-finite counts as a best of `+∞` for the
    /// deltas.
    pub fn update(
        &mut self,
        iteration: usize,
        fitness: &[f64],
        positions: Option<&[Vec<f64>]>,
    ) -> ConvergenceMetrics {
        let finite: Vec<f64> = fitness.iter().copied().filter(|f| f.is_finite()).collect();
        let best_fitness = finite.iter().copied().fold(f64::INFINITY, f64::min);
        let (mean_fitness, fitness_std) = mean_std(&finite);
        let population_diversity = positions.map(mean_pairwise_distance);

        self.best.push(best_fitness);
        self.diversity.push(population_diversity);

        let c = &self.criteria;
        let n = self.best.len();
        let window = tail(&self.best, c.stagnation_window);

        let convergence_velocity = {
            let w = tail(&self.best, c.velocity_window + 1);
            if w.len() >= 2 {
                finite_or_zero((w[0] - w[w.len() - 1]) / (w.len() - 1) as f64)
            } else {
                0.0
            }
        };
        let improvement_rate = if window.len() >= 2 {
            let first = window[0];
            finite_or_zero((first - window[window.len() - 1]) / first.abs().max(EPSILON))
        } else {
            0.0
        };
        let stagnation_score = {
            let (mean, std) = mean_std(window);
            if mean.is_finite() && std.is_finite() {
                1.0 / (1.0 + std / mean.abs().max(EPSILON))
            } else {
                0.0
            }
        };
        let diversity_loss_rate = {
            let start = n.saturating_sub(c.stagnation_window);
            match (self.diversity[start], population_diversity) {
                (Some(earlier), Some(now)) if n > 1 => {
                    Some(finite_or_zero((earlier - now) / earlier.max(EPSILON)))
                }
                _ => None,
            }
        };
        let predicted_remaining_iterations =
            predict_remaining(tail(&self.best, c.prediction_window), c.fitness_tolerance);

        let full_window = window.len() >= c.stagnation_window;
        let criteria = if full_window {
            CriteriaSnapshot {
                fitness_tolerance: spread(window) < c.fitness_tolerance,
                relative_improvement: improvement_rate.abs() < c.relative_improvement_threshold,
                diversity_collapse: population_diversity.is_some_and(|d| d < c.diversity_threshold),
                statistical_plateau: welch_p_value(window)
                    .is_some_and(|p| p > c.significance_level),
                prediction_complete: predicted_remaining_iterations.is_some_and(|r| r < 1.0),
            }
        } else {
            CriteriaSnapshot::default()
        };

        let (status, confidence_level) = self.classify(
            n,
            window,
            &criteria,
            population_diversity,
            diversity_loss_rate,
            improvement_rate,
            stagnation_score,
            convergence_velocity,
        );

        if status != self.status {
            info!(
                iteration,
                from = %self.status,
                to = %status,
                best_fitness,
                criteria = criteria.count(),
                "convergence status changed"
            );
            self.status = status;
        }

        let metrics = ConvergenceMetrics {
            iteration,
            best_fitness,
            mean_fitness,
            fitness_std,
            population_diversity,
            convergence_velocity,
            improvement_rate,
            stagnation_score,
            diversity_loss_rate,
            predicted_remaining_iterations,
            confidence_level,
            criteria,
            status,
        };
        debug!(iteration, status = %status, velocity = convergence_velocity, "convergence metrics");
        self.history.push(metrics.clone());
        metrics
    }

    #[allow(clippy::too_many_arguments)]
    fn classify(
        &self,
        n: usize,
        window: &[f64],
        criteria: &CriteriaSnapshot,
        diversity: Option<f64>,
        diversity_loss: Option<f64>,
        improvement_rate: f64,
        stagnation_score: f64,
        velocity: f64,
    ) -> (ConvergenceStatus, f64) {
        let c = &self.criteria;
        if n < c.velocity_window.max(3) {
            return (ConvergenceStatus::Initializing, 0.0);
        }

        let early_collapse = n <= c.early_phase_iterations
            && diversity.is_some_and(|d| d < c.premature_diversity_threshold);
        let rapid_loss = window.len() >= c.stagnation_window
            && diversity_loss.is_some_and(|l| l >= c.rapid_diversity_loss)
            && improvement_rate.abs() < c.relative_improvement_threshold
            && !criteria.fitness_tolerance;
        if early_collapse || rapid_loss {
            return (ConvergenceStatus::PrematureConvergence, 0.8);
        }

        let deltas: Vec<f64> = window
            .windows(2)
            .map(|w| w[1] - w[0])
            .filter(|d| d.is_finite())
            .collect();
        if !deltas.is_empty() {
            let worsening = deltas.iter().filter(|d| **d > 0.0).count() as f64 / deltas.len() as f64;
            let net = window[window.len() - 1] - window[0];
            if worsening >= c.divergence_ratio && net > c.fitness_tolerance {
                return (ConvergenceStatus::Diverging, worsening);
            }

            let significant: Vec<f64> = deltas
                .iter()
                .copied()
                .filter(|d| d.abs() > c.fitness_tolerance)
                .collect();
            if significant.len() >= 4 {
                let flips = significant
                    .windows(2)
                    .filter(|w| w[0].signum() != w[1].signum())
                    .count() as f64
                    / (significant.len() - 1) as f64;
                if flips >= c.oscillation_ratio {
                    return (ConvergenceStatus::Oscillating, flips);
                }
            }
        }

        let mature = n >= c.min_iterations && window.len() >= c.stagnation_window;
        let agreeing = criteria.count();
        if mature && agreeing >= c.required_criteria {
            return (ConvergenceStatus::Converged, agreeing as f64 / 5.0);
        }

        let dispersed = !criteria.diversity_collapse;
        if mature
            && dispersed
            && stagnation_score > c.stagnation_score_threshold
            && improvement_rate.abs() < c.relative_improvement_threshold
        {
            return (ConvergenceStatus::Stagnated, stagnation_score);
        }

        if agreeing >= 1 || (velocity > 0.0 && improvement_rate < 10.0 * c.relative_improvement_threshold) {
            let confidence = if agreeing >= 1 { agreeing as f64 / 5.0 } else { 0.3 };
            return (ConvergenceStatus::Converging, confidence);
        }
        (ConvergenceStatus::Exploring, 1.0 - stagnation_score)
    }
}

// ============================================================================
// Statistics helpers
// ============================================================================

fn tail(values: &[f64], len: usize) -> &[f64] {
    &values[values.len().saturating_sub(len)..]
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

fn spread(values: &[f64]) -> f64 {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    if max.is_finite() && min.is_finite() {
        max - min
    } else {
        f64::INFINITY
    }
}

/// Mean and sample standard deviation. `(∞, 0)` for an empty slice.
fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (f64::INFINITY, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    if values.len() < 2 {
        return (mean, 0.0);
    }
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    (mean, var.sqrt())
}

/// Mean Euclidean distance over all particle pairs.
pub fn mean_pairwise_distance(positions: &[Vec<f64>]) -> f64 {
    let n = positions.len();
    if n < 2 {
        return 0.0;
    }
    let mut total = 0.0;
    for i in 0..n {
        for j in (i + 1)..n {
            total += positions[i]
                .iter()
                .zip(&positions[j])
                .map(|(a, b)| (a - b).powi(2))
                .sum::<f64>()
                .sqrt();
        }
    }
    total / (n * (n - 1) / 2) as f64
}

/// Fit `ln(δₖ) = a + b·k` to the positive per-iteration improvements and
/// solve for the iteration at which `δ` drops below `tolerance`.
///
/// Returns `Some(0.0)` when every recent improvement is already below the
/// tolerance, `None` when the fit is unusable (too few points, or no decay).
fn predict_remaining(best: &[f64], tolerance: f64) -> Option<f64> {
    if best.len() < 3 || best.iter().any(|b| !b.is_finite()) {
        return None;
    }
    let deltas: Vec<f64> = best.windows(2).map(|w| w[0] - w[1]).collect();
    if deltas.iter().all(|d| *d < tolerance) {
        return Some(0.0);
    }
    let points: Vec<(f64, f64)> = deltas
        .iter()
        .enumerate()
        .filter(|(_, d)| **d > EPSILON)
        .map(|(k, d)| (k as f64, d.ln()))
        .collect();
    if points.len() < 3 {
        return None;
    }
    let m = points.len() as f64;
    let mean_k = points.iter().map(|p| p.0).sum::<f64>() / m;
    let mean_y = points.iter().map(|p| p.1).sum::<f64>() / m;
    let sxx: f64 = points.iter().map(|p| (p.0 - mean_k).powi(2)).sum();
    let sxy: f64 = points.iter().map(|p| (p.0 - mean_k) * (p.1 - mean_y)).sum();
    if sxx < EPSILON {
        return None;
    }
    let slope = sxy / sxx;
    if slope >= 0.0 {
        return None;
    }
    let intercept = mean_y - slope * mean_k;
    let crossing = (tolerance.max(EPSILON).ln() - intercept) / slope;
    let last = (deltas.len() - 1) as f64;
    Some((crossing - last).max(0.0))
}

/// Two-sided p-value of Welch's t-test between the first and second half of
/// `window`, using the normal approximation of the t distribution.
///
/// Two constant halves give 1.0 when equal and 0.0 otherwise.
fn welch_p_value(window: &[f64]) -> Option<f64> {
    if window.len() < 4 || window.iter().any(|v| !v.is_finite()) {
        return None;
    }
    let (early, recent) = window.split_at(window.len() / 2);
    let (m1, s1) = mean_std(early);
    let (m2, s2) = mean_std(recent);
    let se = (s1 * s1 / early.len() as f64 + s2 * s2 / recent.len() as f64).sqrt();
    if se < EPSILON {
        let scale = m1.abs().max(m2.abs()).max(1.0);
        return Some(if (m1 - m2).abs() <= EPSILON * scale { 1.0 } else { 0.0 });
    }
    let t = (m1 - m2).abs() / se;
    Some(2.0 * (1.0 - normal_cdf(t)))
}

fn normal_cdf(x: f64) -> f64 {
    0.5 * (1.0 + erf(x / std::f64::consts::SQRT_2))
}

/// Abramowitz & Stegun 7.1.26, absolute error below 1.5e-7.
fn erf(x: f64) -> f64 {
    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();
    let t = 1.0 / (1.0 + 0.327_591_1 * x);
    let poly = t
        * (0.254_829_592
            + t * (-0.284_496_736 + t * (1.421_413_741 + t * (-1.453_152_027 + t * 1.061_405_429))));
    sign * (1.0 - poly * (-x * x).exp())
}
