//! End-to-end gain tuning for one controller kind.
//!
//! Wires the configured controller settings, scenario set and fitness policy
//! into a [`FitnessEvaluator`], runs a [`PsoOptimizer`] over the kind's gain
//! bounds, and re-evaluates the winner in detail for the report. The plant
//! and the nominal dynamics model are injected so this layer stays free of
//! any concrete physics.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::errors::OptimizationError;
use crate::domain::models::{Config, ControllerKind};
use crate::domain::ports::{DynamicsModel, PlantFactory};
use crate::services::controllers::ControllerBuilder;
use crate::services::fitness_evaluator::{CandidateEvaluation, FitnessEvaluator};
use crate::services::pso_optimizer::{IterationRecord, OptimizationResult, PsoOptimizer};

/// Call-time overrides for one tuning run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TuningRequest {
    /// Controller to tune. Defaults to classical.
    pub kind: Option<ControllerKind>,
    /// Overrides `optimizer.swarm_size`.
    pub swarm_size: Option<usize>,
    /// Overrides `optimizer.iterations`.
    pub iterations: Option<usize>,
    /// Overrides `optimizer.seed`.
    pub seed: Option<u64>,
}

impl TuningRequest {
    pub fn for_kind(kind: ControllerKind) -> Self {
        Self {
            kind: Some(kind),
            ..Self::default()
        }
    }
}

/// Everything a caller needs to present or persist a tuning run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TuningReport {
    pub kind: ControllerKind,
    pub gain_names: Vec<String>,
    /// Cost of the configured reference gains.
    pub reference_cost: f64,
    /// Detailed re-evaluation of the best gains.
    pub best: CandidateEvaluation,
    pub optimization: OptimizationResult,
}

impl TuningReport {
    /// Relative cost reduction over the reference gains (positive is better).
    pub fn improvement(&self) -> f64 {
        if self.reference_cost.abs() < f64::EPSILON {
            0.0
        } else {
            (self.reference_cost - self.optimization.best_cost) / self.reference_cost
        }
    }
}

/// Runs tuning jobs against an injected plant and dynamics model.
pub struct TuningService {
    config: Config,
    model: Arc<dyn DynamicsModel>,
    plants: Arc<dyn PlantFactory>,
}

impl TuningService {
    pub fn new(config: Config, model: Arc<dyn DynamicsModel>, plants: Arc<dyn PlantFactory>) -> Self {
        Self {
            config,
            model,
            plants,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Controller builder for `kind` with the nominal model attached.
    pub fn builder(&self, kind: ControllerKind) -> ControllerBuilder {
        ControllerBuilder::new(kind, self.config.controllers.get(kind).clone())
            .with_model(Arc::clone(&self.model))
    }

    /// Fitness evaluator for `kind` over the configured scenarios.
    pub fn evaluator(&self, kind: ControllerKind) -> Result<FitnessEvaluator, OptimizationError> {
        let settings = self.config.controllers.get(kind);
        Ok(FitnessEvaluator::new(
            Arc::new(self.builder(kind)),
            Arc::clone(&self.plants),
            self.config.effective_scenarios(),
            self.config.fitness.clone(),
        )?
        .with_history_capacity(settings.history_capacity))
    }

    /// Optimizer for `kind`. `seed` takes precedence over the configured one.
    pub fn optimizer(
        &self,
        kind: ControllerKind,
        seed: Option<u64>,
    ) -> Result<PsoOptimizer, OptimizationError> {
        let settings = self.config.controllers.get(kind);
        let mut config = self.config.optimizer.clone();
        if seed.is_some() {
            config.seed = seed;
        }
        let mut optimizer = PsoOptimizer::new(config, settings.bounds.clone())?
            .with_convergence(*self.config.convergence.get(kind));
        if self.config.optimizer.seed_with_reference {
            optimizer = optimizer.with_initial_guess(settings.reference_gains.as_slice().to_vec())?;
        }
        Ok(optimizer)
    }

    /// Run one tuning job, reporting every iteration to `observer`.
    pub fn tune<O>(&self, request: &TuningRequest, observer: O) -> Result<TuningReport, OptimizationError>
    where
        O: FnMut(&IterationRecord),
    {
        let kind = request.kind.unwrap_or(ControllerKind::Classical);
        let evaluator = self.evaluator(kind)?;
        let optimizer = self.optimizer(kind, request.seed)?;
        let swarm_size = request.swarm_size.unwrap_or(self.config.optimizer.swarm_size);
        let iterations = request.iterations.unwrap_or(self.config.optimizer.iterations);

        let reference = self.config.controllers.get(kind).reference_gains.clone();
        let reference_cost = evaluator.evaluate(reference.as_slice());
        info!(kind = %kind, reference_cost, swarm_size, iterations, "tuning controller gains");

        let optimization = optimizer.run(&evaluator, swarm_size, iterations, observer)?;
        let best = evaluator.evaluate_detailed(&optimization.best_position);
        info!(
            kind = %kind,
            best_cost = optimization.best_cost,
            reference_cost,
            termination = optimization.termination.as_str(),
            "tuning finished"
        );

        Ok(TuningReport {
            kind,
            gain_names: kind.gain_names().iter().map(|n| (*n).to_string()).collect(),
            reference_cost,
            best,
            optimization,
        })
    }
}
