//! Closed-loop fitness evaluation of candidate gain vectors.
//!
//! For each candidate the evaluator builds one controller through the
//! supplied [`ControllerFactory`], then runs every scenario of the configured
//! [`ScenarioSet`] against a fresh plant from the [`PlantFactory`]:
//!
//! ```text
//! J_scenario = w_x·∫xᵀQx dt + w_u·∫u² dt + w_du·∫(Δu/dt)² dt + w_s·∫s² dt
//!            + instability_penalty·(1 + unfinished fraction)     (failed runs only)
//! J          = Σ normalized_weight · J_scenario
//! ```
//!
//! Nothing here propagates an error. A controller that cannot be built, or
//! a candidate that exceeds its wall-clock budget, costs `failure_penalty`;
//! a scenario that goes unstable adds `instability_penalty`. Both are logged
//! and the batch carries on.

use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::errors::{ControlError, DomainError, DomainResult};
use crate::domain::models::control::{ControlHistory, ControlSample};
use crate::domain::models::{
    FailureReason, FitnessConfig, GainVector, Scenario, ScenarioSet, SimulationFailure,
    SimulationMetrics, SimulationResult,
};
use crate::domain::ports::{ControllerFactory, FitnessFunction, PlantFactory, SlidingModeController};

// ============================================================================
// Cost records
// ============================================================================

/// Weighted cost terms of one scenario run.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CostBreakdown {
    /// Weighted state tracking term.
    pub state_error: f64,
    /// Weighted `∫u² dt`.
    pub control_effort: f64,
    /// Weighted `∫(Δu/dt)² dt`.
    pub control_rate: f64,
    /// Weighted `∫s² dt`.
    pub sliding_energy: f64,
    /// Instability penalty. Zero for runs that finish.
    pub penalty: f64,
}

impl CostBreakdown {
    /// Sum of every term.
    pub fn total(&self) -> f64 {
        self.state_error + self.control_effort + self.control_rate + self.sliding_energy + self.penalty
    }
}

/// Outcome of one scenario for one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioOutcome {
    pub scenario: String,
    /// Normalized weight of this scenario in the aggregate.
    pub weight: f64,
    pub cost: CostBreakdown,
    pub metrics: SimulationMetrics,
    /// Set when the run stopped early.
    pub failure: Option<SimulationFailure>,
    /// Retained controller samples (see [`FitnessEvaluator::with_history_capacity`]).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<ControlSample>,
}

/// Full evaluation record of one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateEvaluation {
    pub gains: Vec<f64>,
    /// Aggregate cost, capped at the failure penalty.
    pub cost: f64,
    /// Set when the candidate was rejected before or during simulation and
    /// assigned the failure penalty.
    pub rejection: Option<String>,
    /// Per-scenario breakdown. Empty for rejected candidates.
    pub scenarios: Vec<ScenarioOutcome>,
}

impl CandidateEvaluation {
    fn rejected(gains: &[f64], cost: f64, reason: String) -> Self {
        Self {
            gains: gains.to_vec(),
            cost,
            rejection: Some(reason),
            scenarios: Vec::new(),
        }
    }

    pub fn failed_scenarios(&self) -> usize {
        self.scenarios.iter().filter(|s| s.failure.is_some()).count()
    }
}

// ============================================================================
// FitnessEvaluator
// ============================================================================

/// Scores gain vectors by closed-loop simulation over a scenario set.
///
/// Cheap to share across threads: every evaluation builds its own
/// controller and plants.
pub struct FitnessEvaluator {
    controllers: Arc<dyn ControllerFactory>,
    plants: Arc<dyn PlantFactory>,
    scenarios: ScenarioSet,
    weights: Vec<f64>,
    config: FitnessConfig,
    history_capacity: usize,
}

impl FitnessEvaluator {
    /// Build an evaluator. Fails on an invalid scenario set or on a penalty
    /// ordering other than `failure_penalty >= instability_penalty > 0`.
    pub fn new(
        controllers: Arc<dyn ControllerFactory>,
        plants: Arc<dyn PlantFactory>,
        scenarios: ScenarioSet,
        config: FitnessConfig,
    ) -> DomainResult<Self> {
        scenarios.validate()?;
        if !(config.instability_penalty > 0.0
            && config.failure_penalty >= config.instability_penalty
            && config.failure_penalty.is_finite())
        {
            return Err(DomainError::ValidationFailed(format!(
                "penalties must satisfy failure ({}) >= instability ({}) > 0",
                config.failure_penalty, config.instability_penalty
            )));
        }
        Ok(Self {
            weights: scenarios.normalized_weights(),
            controllers,
            plants,
            scenarios,
            config,
            history_capacity: 0,
        })
    }

    /// Retain the last `capacity` control samples per scenario run.
    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }

    pub fn config(&self) -> &FitnessConfig {
        &self.config
    }

    pub fn scenarios(&self) -> &ScenarioSet {
        &self.scenarios
    }

    /// Scalar cost of one candidate.
    pub fn evaluate(&self, gains: &[f64]) -> f64 {
        self.evaluate_detailed(gains).cost
    }

    /// Costs of a batch, in candidate order.
    pub fn evaluate_batch(&self, candidates: &[Vec<f64>]) -> Vec<f64> {
        if self.config.parallel {
            candidates.par_iter().map(|c| self.evaluate(c)).collect()
        } else {
            candidates.iter().map(|c| self.evaluate(c)).collect()
        }
    }

    /// True for costs that represent a candidate that could not be evaluated.
    pub fn is_failure(&self, cost: f64) -> bool {
        !cost.is_finite() || cost >= self.config.failure_penalty
    }

    /// Evaluate one candidate and keep the per-scenario breakdown.
    pub fn evaluate_detailed(&self, gains: &[f64]) -> CandidateEvaluation {
        let gain_vector = GainVector::new(gains.to_vec());
        let mut controller = match self.controllers.create(&gain_vector) {
            Ok(controller) => controller,
            Err(err) => {
                warn!(gains = ?gains, error = %err, "controller construction failed; assigning failure penalty");
                return CandidateEvaluation::rejected(gains, self.config.failure_penalty, err.to_string());
            }
        };

        let deadline = (self.config.timeout_ms > 0)
            .then(|| Instant::now() + Duration::from_millis(self.config.timeout_ms));

        let mut total = 0.0;
        let mut outcomes = Vec::with_capacity(self.scenarios.len());
        for (scenario, &weight) in self.scenarios.scenarios().iter().zip(&self.weights) {
            controller.reset();
            let mut result = self.simulate(controller.as_mut(), scenario, deadline);

            if let Some(SimulationFailure {
                reason: FailureReason::Timeout,
                ..
            }) = result.failure
            {
                warn!(gains = ?gains, scenario = %scenario.name, "candidate exceeded its time budget; assigning failure penalty");
                return CandidateEvaluation::rejected(
                    gains,
                    self.config.failure_penalty,
                    format!("timeout after {} ms", self.config.timeout_ms),
                );
            }

            result.compute_metrics(self.config.settling_fraction);
            let cost = self.scenario_cost(&result, scenario);
            if let Some(failure) = &result.failure {
                warn!(
                    gains = ?gains,
                    scenario = %scenario.name,
                    step = failure.step,
                    time = failure.time,
                    reason = ?failure.reason,
                    "scenario failed; adding instability penalty"
                );
            }
            total += weight * cost.total();
            outcomes.push(ScenarioOutcome {
                scenario: scenario.name.clone(),
                weight,
                cost,
                metrics: result.metrics,
                failure: result.failure,
                history: result.history,
            });
        }

        let cost = if total.is_finite() {
            total.min(self.config.failure_penalty)
        } else {
            warn!(gains = ?gains, "non-finite aggregate cost; assigning failure penalty");
            self.config.failure_penalty
        };
        CandidateEvaluation {
            gains: gains.to_vec(),
            cost,
            rejection: None,
            scenarios: outcomes,
        }
    }

    /// Run one scenario in closed loop. Failures end the run early and are
    /// recorded on the result, together with the retained controller samples.
    pub fn simulate(
        &self,
        controller: &mut dyn SlidingModeController,
        scenario: &Scenario,
        deadline: Option<Instant>,
    ) -> SimulationResult {
        let steps = scenario.steps();
        let mut result = SimulationResult {
            scenario: scenario.name.clone(),
            dt: scenario.dt,
            states: Vec::with_capacity(steps + 1),
            controls: Vec::with_capacity(steps),
            surfaces: Vec::with_capacity(steps),
            metrics: SimulationMetrics::default(),
            failure: None,
            history: Vec::new(),
        };
        result.states.push(scenario.initial_state);

        let mut history = ControlHistory::with_capacity(self.history_capacity);
        self.rollout(controller, scenario, deadline, &mut history, &mut result);
        result.history = history.iter().copied().collect();
        result
    }

    fn rollout(
        &self,
        controller: &mut dyn SlidingModeController,
        scenario: &Scenario,
        deadline: Option<Instant>,
        history: &mut ControlHistory,
        result: &mut SimulationResult,
    ) {
        let steps = scenario.steps();
        let dt = scenario.dt;
        let fail = |result: &mut SimulationResult, step: usize, reason: FailureReason| {
            result.failure = Some(SimulationFailure {
                step,
                time: step as f64 * dt,
                reason,
            });
        };

        let mut plant = match self.plants.create(scenario) {
            Ok(plant) => plant,
            Err(err) => {
                fail(result, 0, FailureReason::PlantFailure(err.to_string()));
                return;
            }
        };
        let mut state = scenario.initial_state;

        for step in 0..steps {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                fail(result, step, FailureReason::Timeout);
                return;
            }

            let output = match controller.compute_control(&state, dt, history) {
                Ok(output) => output,
                Err(ControlError::NonFiniteControl { .. }) => {
                    fail(result, step, FailureReason::NonFiniteControl);
                    return;
                }
                Err(err) => {
                    fail(result, step, FailureReason::ControllerFailure(err.to_string()));
                    return;
                }
            };

            state = match plant.step(&state, output.force, dt) {
                Ok(next) => next,
                Err(err) => {
                    fail(result, step, FailureReason::PlantFailure(err.to_string()));
                    return;
                }
            };
            result.controls.push(output.force);
            result.surfaces.push(output.surface);
            result.states.push(state);

            let max_abs = state.max_abs();
            if max_abs > self.config.divergence_threshold {
                fail(result, step + 1, FailureReason::StateDivergence { max_abs });
                return;
            }
            let angle = if state.theta1().abs() >= state.theta2().abs() {
                state.theta1()
            } else {
                state.theta2()
            };
            if angle.abs() > self.config.angle_limit {
                fail(result, step + 1, FailureReason::AngleLimit { angle });
                return;
            }
        }
    }

    fn scenario_cost(&self, result: &SimulationResult, scenario: &Scenario) -> CostBreakdown {
        let cfg = &self.config;
        let dt = result.dt;

        let state_ise: f64 = result
            .states
            .iter()
            .skip(1)
            .map(|s| s.weighted_norm_sq(&cfg.state_weights))
            .sum::<f64>()
            * dt;
        let effort: f64 = result.controls.iter().map(|u| u * u).sum::<f64>() * dt;
        let rate: f64 = result
            .controls
            .windows(2)
            .map(|w| {
                let du = (w[1] - w[0]) / dt;
                du * du
            })
            .sum::<f64>()
            * dt;
        let sliding: f64 = result.surfaces.iter().map(|s| s * s).sum::<f64>() * dt;

        let raw = [state_ise, effort, rate, sliding];
        let scaled = if cfg.normalize {
            let mut out = raw;
            for (value, norm) in out.iter_mut().zip(cfg.normalization) {
                if norm > f64::EPSILON {
                    *value /= norm;
                }
            }
            out
        } else {
            raw
        };

        let penalty = match &result.failure {
            Some(failure) => {
                let steps = scenario.steps().max(1) as f64;
                let unfinished = 1.0 - (failure.step as f64 / steps).min(1.0);
                cfg.instability_penalty * (1.0 + unfinished)
            }
            None => 0.0,
        };

        CostBreakdown {
            state_error: cfg.state_error * scaled[0],
            control_effort: cfg.control_effort * scaled[1],
            control_rate: cfg.control_rate * scaled[2],
            sliding_energy: cfg.sliding_energy * scaled[3],
            penalty,
        }
    }
}

impl FitnessFunction for FitnessEvaluator {
    fn evaluate_batch(&self, candidates: &[Vec<f64>]) -> Vec<f64> {
        FitnessEvaluator::evaluate_batch(self, candidates)
    }

    fn is_failure(&self, cost: f64) -> bool {
        FitnessEvaluator::is_failure(self, cost)
    }
}
