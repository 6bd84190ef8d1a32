//! Global-best particle swarm optimizer over controller gain vectors.
//!
//! ## Update Rule
//!
//! ```text
//! w(t) = w0 + (w1 − w0)·t/(T − 1)
//! v    ← w(t)·v + c1·r1·(p_best − x) + c2·r2·(g_best − x)     r1, r2 ~ U(0,1) per dimension
//! v    ← clip(v, −v_max, v_max)                                 v_max = clamp·(upper − lower)
//! x    ← clip(x + v, lower, upper)
//! ```
//!
//! All randomness comes from one `StdRng` owned by the run and seeded from
//! the configuration, so a seed and a deterministic fitness function fully
//! determine the trajectory. Bests are replaced only on a strictly lower
//! cost, which keeps the earlier-found point on ties.

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::domain::errors::OptimizationError;
use crate::domain::models::{
    ConvergenceCriteria, ConvergenceMetrics, ConvergenceStatus, GainBounds, OptimizerConfig,
};
use crate::domain::ports::FitnessFunction;
use crate::services::convergence_analyzer::{mean_pairwise_distance, ConvergenceAnalyzer};

// ============================================================================
// Result types
// ============================================================================

/// Why the run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    MaxIterations,
    Converged,
    Stagnated,
}

impl TerminationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MaxIterations => "max_iterations",
            Self::Converged => "converged",
            Self::Stagnated => "stagnated",
        }
    }
}

/// One row of the optimization history. Iteration 0 is the initial swarm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    /// 0 for the initial swarm.
    pub iteration: usize,
    /// Global best cost after this iteration.
    pub best_cost: f64,
    pub best_position: Vec<f64>,
    /// Mean personal-best cost over viable particles.
    pub mean_cost: f64,
    /// Mean pairwise particle distance in gain units.
    pub diversity: f64,
    pub inertia: f64,
    /// Candidates whose cost reached the failure penalty.
    pub failed_candidates: usize,
    pub convergence: Option<ConvergenceMetrics>,
}

/// Outcome of one optimization run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    /// Unique id attached to every log event of the run.
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Seed the swarm was drawn with. Replaying it reproduces the run.
    pub seed: u64,
    pub swarm_size: usize,
    pub iterations: usize,
    /// Total fitness evaluations, initial swarm included.
    pub evaluations: usize,
    pub best_position: Vec<f64>,
    pub best_cost: f64,
    /// Analyzer status at the last iteration.
    pub status: ConvergenceStatus,
    pub termination: TerminationReason,
    /// One record per iteration, starting with the initial swarm.
    pub history: Vec<IterationRecord>,
}

impl OptimizationResult {
    /// Global best cost per history entry. Non-increasing.
    pub fn best_cost_history(&self) -> Vec<f64> {
        self.history.iter().map(|r| r.best_cost).collect()
    }

    pub fn duration_secs(&self) -> f64 {
        (self.finished_at - self.started_at).num_milliseconds() as f64 / 1000.0
    }
}

// ============================================================================
// PsoOptimizer
// ============================================================================

/// Seeded particle swarm optimizer over a box of gain bounds.
pub struct PsoOptimizer {
    config: OptimizerConfig,
    bounds: GainBounds,
    criteria: Option<ConvergenceCriteria>,
    initial_guess: Option<Vec<f64>>,
}

impl PsoOptimizer {
    /// Validate `config` against `bounds` and build an optimizer.
    pub fn new(config: OptimizerConfig, bounds: GainBounds) -> Result<Self, OptimizationError> {
        bounds.validate()?;
        validate_config(&config)?;
        Ok(Self {
            config,
            bounds,
            criteria: None,
            initial_guess: None,
        })
    }

    /// Analyze every iteration with these criteria (enables early stopping).
    pub fn with_convergence(mut self, criteria: ConvergenceCriteria) -> Self {
        self.criteria = Some(criteria);
        self
    }

    /// Place the first particle at `guess` (clamped into bounds).
    pub fn with_initial_guess(mut self, guess: Vec<f64>) -> Result<Self, OptimizationError> {
        if guess.len() != self.bounds.dim() {
            return Err(OptimizationError::DimensionMismatch {
                expected: self.bounds.dim(),
                actual: guess.len(),
            });
        }
        self.initial_guess = Some(guess);
        Ok(self)
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    pub fn bounds(&self) -> &GainBounds {
        &self.bounds
    }

    /// Run with the configured swarm size and iteration count.
    pub fn optimize<F>(&self, fitness: &F) -> Result<OptimizationResult, OptimizationError>
    where
        F: FitnessFunction + ?Sized,
    {
        self.optimize_with(fitness, self.config.swarm_size, self.config.iterations)
    }

    /// Run with call-time overrides of swarm size and iteration count.
    pub fn optimize_with<F>(
        &self,
        fitness: &F,
        swarm_size: usize,
        iterations: usize,
    ) -> Result<OptimizationResult, OptimizationError>
    where
        F: FitnessFunction + ?Sized,
    {
        self.run(fitness, swarm_size, iterations, |_| {})
    }

    /// Run and call `observer` after every iteration (including the initial
    /// swarm evaluation).
    pub fn run<F, O>(
        &self,
        fitness: &F,
        swarm_size: usize,
        iterations: usize,
        mut observer: O,
    ) -> Result<OptimizationResult, OptimizationError>
    where
        F: FitnessFunction + ?Sized,
        O: FnMut(&IterationRecord),
    {
        if swarm_size == 0 || iterations == 0 {
            return Err(OptimizationError::InvalidConfiguration(format!(
                "swarm size ({swarm_size}) and iterations ({iterations}) must be positive"
            )));
        }
        let started_at = Utc::now();
        let run_id = Uuid::new_v4();
        let seed = self.config.seed.unwrap_or_else(rand::random);
        let mut rng = StdRng::seed_from_u64(seed);
        let mut analyzer = self.criteria.map(ConvergenceAnalyzer::new).transpose()?;

        let dim = self.bounds.dim();
        let v_max: Vec<f64> = self
            .bounds
            .ranges()
            .iter()
            .map(|r| self.config.velocity_clamp * r)
            .collect();

        info!(%run_id, seed, swarm_size, iterations, dim, "starting particle swarm optimization");

        let mut positions: Vec<Vec<f64>> = (0..swarm_size)
            .map(|_| {
                (0..dim)
                    .map(|d| rng.gen_range(self.bounds.lower[d]..=self.bounds.upper[d]))
                    .collect()
            })
            .collect();
        if let Some(guess) = &self.initial_guess {
            let mut seeded = guess.clone();
            self.bounds.clamp_in_place(&mut seeded);
            positions[0] = seeded;
        }
        let velocities: Vec<Vec<f64>> = (0..swarm_size)
            .map(|_| (0..dim).map(|d| rng.gen_range(-v_max[d]..=v_max[d])).collect())
            .collect();

        let costs = self.evaluate(fitness, &positions)?;
        if costs.iter().all(|c| fitness.is_failure(*c)) {
            error!(%run_id, candidates = swarm_size, "every candidate of the initial swarm failed");
            return Err(OptimizationError::AllCandidatesFailed {
                iteration: 0,
                candidates: swarm_size,
            });
        }
        let mut swarm = Swarm::new(positions, velocities, costs.clone());
        let mut evaluations = swarm_size;

        let mut history = Vec::with_capacity(iterations + 1);
        let record = self.record(0, &costs, &swarm, self.config.inertia, fitness, analyzer.as_mut());
        observer(&record);
        history.push(record);

        let mut termination = TerminationReason::MaxIterations;
        for t in 0..iterations {
            let inertia = self.inertia_at(t, iterations);
            for i in 0..swarm_size {
                for d in 0..dim {
                    let r1: f64 = rng.gen();
                    let r2: f64 = rng.gen();
                    let x = swarm.positions[i][d];
                    let v = inertia * swarm.velocities[i][d]
                        + self.config.cognitive * r1 * (swarm.personal_best[i][d] - x)
                        + self.config.social * r2 * (swarm.global_best[d] - x);
                    let v = v.clamp(-v_max[d], v_max[d]);
                    swarm.velocities[i][d] = v;
                    swarm.positions[i][d] =
                        (x + v).clamp(self.bounds.lower[d], self.bounds.upper[d]);
                }
            }

            let costs = self.evaluate(fitness, &swarm.positions)?;
            evaluations += swarm_size;
            swarm.absorb(&costs);

            let record = self.record(t + 1, &costs, &swarm, inertia, fitness, analyzer.as_mut());
            if record.failed_candidates == swarm_size {
                error!(%run_id, iteration = t + 1, "every candidate failed this iteration");
            }
            observer(&record);
            let status = record.convergence.as_ref().map(|m| m.status);
            history.push(record);

            match status {
                Some(ConvergenceStatus::Converged) if self.config.early_stopping => {
                    termination = TerminationReason::Converged;
                    break;
                }
                Some(ConvergenceStatus::Stagnated) if self.config.stop_on_stagnation => {
                    termination = TerminationReason::Stagnated;
                    break;
                }
                _ => {}
            }
        }

        if fitness.is_failure(swarm.global_cost) {
            error!(%run_id, best_cost = swarm.global_cost, "optimization found no viable candidate");
            return Err(OptimizationError::AllCandidatesFailed {
                iteration: history.len() - 1,
                candidates: swarm_size,
            });
        }

        let status = analyzer
            .as_ref()
            .map(ConvergenceAnalyzer::status)
            .unwrap_or(ConvergenceStatus::NotStarted);
        info!(
            %run_id,
            best_cost = swarm.global_cost,
            iterations = history.len() - 1,
            termination = termination.as_str(),
            status = %status,
            "particle swarm optimization finished"
        );

        Ok(OptimizationResult {
            run_id,
            started_at,
            finished_at: Utc::now(),
            seed,
            swarm_size,
            iterations: history.len() - 1,
            evaluations,
            best_position: swarm.global_best,
            best_cost: swarm.global_cost,
            status,
            termination,
            history,
        })
    }

    fn inertia_at(&self, t: usize, iterations: usize) -> f64 {
        let span = iterations.saturating_sub(1).max(1) as f64;
        let w0 = self.config.inertia;
        w0 + (self.config.inertia_end - w0) * t as f64 / span
    }

    fn evaluate<F>(&self, fitness: &F, positions: &[Vec<f64>]) -> Result<Vec<f64>, OptimizationError>
    where
        F: FitnessFunction + ?Sized,
    {
        let mut costs = fitness.evaluate_batch(positions);
        if costs.len() != positions.len() {
            return Err(OptimizationError::DimensionMismatch {
                expected: positions.len(),
                actual: costs.len(),
            });
        }
        // NaN never compares lower, so it would pin a best in place
        for cost in costs.iter_mut().filter(|c| c.is_nan()) {
            *cost = f64::INFINITY;
        }
        Ok(costs)
    }

    /// Summarize one iteration. The analyzer sees the personal-best costs,
    /// which only ever improve, together with the current positions.
    fn record<F>(
        &self,
        iteration: usize,
        costs: &[f64],
        swarm: &Swarm,
        inertia: f64,
        fitness: &F,
        analyzer: Option<&mut ConvergenceAnalyzer>,
    ) -> IterationRecord
    where
        F: FitnessFunction + ?Sized,
    {
        let viable: Vec<f64> = costs
            .iter()
            .copied()
            .filter(|c| !fitness.is_failure(*c))
            .collect();
        let failed_candidates = costs.len() - viable.len();
        let mean_cost = if viable.is_empty() {
            f64::INFINITY
        } else {
            viable.iter().sum::<f64>() / viable.len() as f64
        };
        if failed_candidates > 0 && failed_candidates < costs.len() {
            warn!(iteration, failed_candidates, "candidates assigned the failure penalty");
        }

        let convergence = analyzer.map(|a| {
            let memory: Vec<f64> = swarm
                .personal_cost
                .iter()
                .copied()
                .filter(|c| !fitness.is_failure(*c))
                .collect();
            a.update(iteration, &memory, Some(&swarm.positions))
        });
        let diversity = convergence
            .as_ref()
            .and_then(|m| m.population_diversity)
            .unwrap_or_else(|| mean_pairwise_distance(&swarm.positions));

        info!(
            iteration,
            best_cost = swarm.global_cost,
            mean_cost,
            diversity,
            status = convergence.as_ref().map(|m| m.status.as_str()).unwrap_or("n/a"),
            "pso iteration"
        );

        IterationRecord {
            iteration,
            best_cost: swarm.global_cost,
            best_position: swarm.global_best.clone(),
            mean_cost,
            diversity,
            inertia,
            failed_candidates,
            convergence,
        }
    }
}

// ============================================================================
// Swarm state
// ============================================================================

struct Swarm {
    positions: Vec<Vec<f64>>,
    velocities: Vec<Vec<f64>>,
    personal_best: Vec<Vec<f64>>,
    personal_cost: Vec<f64>,
    global_best: Vec<f64>,
    global_cost: f64,
}

impl Swarm {
    fn new(positions: Vec<Vec<f64>>, velocities: Vec<Vec<f64>>, costs: Vec<f64>) -> Self {
        let mut global = 0;
        for i in 1..costs.len() {
            if costs[i] < costs[global] {
                global = i;
            }
        }
        Self {
            personal_best: positions.clone(),
            global_best: positions[global].clone(),
            global_cost: costs[global],
            personal_cost: costs,
            positions,
            velocities,
        }
    }

    /// Fold freshly evaluated costs into the personal and global bests,
    /// replacing only on strict improvement.
    fn absorb(&mut self, costs: &[f64]) {
        for (i, &cost) in costs.iter().enumerate() {
            if cost < self.personal_cost[i] {
                self.personal_cost[i] = cost;
                self.personal_best[i].clone_from(&self.positions[i]);
            }
            if cost < self.global_cost {
                self.global_cost = cost;
                self.global_best.clone_from(&self.positions[i]);
            }
        }
    }
}

fn validate_config(config: &OptimizerConfig) -> Result<(), OptimizationError> {
    let invalid = |msg: String| Err(OptimizationError::InvalidConfiguration(msg));
    if config.swarm_size == 0 {
        return invalid("swarm_size must be positive".to_string());
    }
    if config.iterations == 0 {
        return invalid("iterations must be positive".to_string());
    }
    for (name, value) in [
        ("inertia", config.inertia),
        ("inertia_end", config.inertia_end),
        ("cognitive", config.cognitive),
        ("social", config.social),
        ("velocity_clamp", config.velocity_clamp),
    ] {
        if !(value > 0.0 && value.is_finite()) {
            return invalid(format!("{name} must be positive, got {value}"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sphere(x: &[f64]) -> f64 {
        (x[0] - 3.0).powi(2) + (x[1] + 2.0).powi(2)
    }

    fn optimizer(seed: u64) -> PsoOptimizer {
        let config = OptimizerConfig {
            swarm_size: 20,
            iterations: 50,
            cognitive: 1.5,
            social: 1.5,
            seed: Some(seed),
            ..OptimizerConfig::default()
        };
        PsoOptimizer::new(config, GainBounds::uniform(2, -10.0, 10.0).unwrap()).unwrap()
    }

    #[test]
    fn test_finds_sphere_minimum() {
        let result = optimizer(42).optimize(&sphere).unwrap();
        assert!(result.best_cost < 1e-3);
        assert!((result.best_position[0] - 3.0).abs() < 1e-2);
        assert!((result.best_position[1] + 2.0).abs() < 1e-2);
        assert_eq!(result.history.len(), 51);
        assert_eq!(result.evaluations, 20 * 51);
    }

    #[test]
    fn test_same_seed_same_trajectory() {
        let a = optimizer(7).optimize(&sphere).unwrap();
        let b = optimizer(7).optimize(&sphere).unwrap();
        assert_eq!(a.best_cost_history(), b.best_cost_history());
        assert_eq!(a.best_position, b.best_position);
    }

    #[test]
    fn test_best_cost_is_monotone() {
        let result = optimizer(3).optimize(&sphere).unwrap();
        for w in result.history.windows(2) {
            assert!(w[1].best_cost <= w[0].best_cost);
        }
    }

    #[test]
    fn test_call_time_overrides() {
        let result = optimizer(1).optimize_with(&sphere, 5, 3).unwrap();
        assert_eq!(result.swarm_size, 5);
        assert_eq!(result.iterations, 3);
        assert_eq!(result.evaluations, 20);
    }

    #[test]
    fn test_positions_stay_in_bounds() {
        let bounds = GainBounds::uniform(2, -1.0, 1.0).unwrap();
        let opt = PsoOptimizer::new(
            OptimizerConfig {
                seed: Some(9),
                ..OptimizerConfig::default()
            },
            bounds,
        )
        .unwrap();
        let check = |x: &[f64]| -> f64 {
            assert!(x.iter().all(|v| (-1.0..=1.0).contains(v)));
            x[0] + x[1]
        };
        let result = opt.optimize_with(&check, 10, 20).unwrap();
        assert!(result.best_cost < -1.9);
    }

    #[test]
    fn test_all_failed_candidates_is_an_error() {
        let always_nan = |_: &[f64]| f64::NAN;
        assert!(matches!(
            optimizer(1).optimize(&always_nan),
            Err(OptimizationError::AllCandidatesFailed { iteration: 0, .. })
        ));
    }

    #[test]
    fn test_initial_guess_occupies_first_particle() {
        let opt = optimizer(11).with_initial_guess(vec![3.0, -2.0]).unwrap();
        let result = opt.optimize_with(&sphere, 4, 1).unwrap();
        assert_eq!(result.history[0].best_cost, 0.0);
        assert_eq!(result.history[0].best_position, vec![3.0, -2.0]);
    }

    #[test]
    fn test_initial_guess_dimension_checked() {
        assert!(optimizer(1).with_initial_guess(vec![1.0]).is_err());
    }

    #[test]
    fn test_early_stopping_on_convergence() {
        let opt = PsoOptimizer::new(
            OptimizerConfig {
                swarm_size: 20,
                iterations: 300,
                seed: Some(5),
                ..OptimizerConfig::default()
            },
            GainBounds::uniform(2, -10.0, 10.0).unwrap(),
        )
        .unwrap()
        .with_convergence(ConvergenceCriteria::default());
        let result = opt.optimize(&sphere).unwrap();
        assert_eq!(result.termination, TerminationReason::Converged);
        assert!(result.iterations < 300);
        assert!(result.status.is_converged());
    }

    #[test]
    fn test_observer_sees_every_iteration() {
        let mut seen = Vec::new();
        optimizer(2)
            .run(&sphere, 6, 4, |r| seen.push(r.iteration))
            .unwrap();
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = OptimizerConfig {
            social: 0.0,
            ..OptimizerConfig::default()
        };
        assert!(PsoOptimizer::new(config, GainBounds::uniform(2, 0.0, 1.0).unwrap()).is_err());
    }
}
