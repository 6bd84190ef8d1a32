//! Common test utilities for integration tests
//!
//! Shared fixtures for building evaluators and services over short
//! scenarios so the integration tests stay fast.

#![allow(dead_code)]

use std::sync::Arc;

use smc_tune::domain::models::{
    Config, ControllerKind, ControllerSettings, FitnessConfig, PhysicsConfig, Scenario,
    ScenarioSet, State,
};
use smc_tune::infrastructure::plant::{DoublePendulum, DoublePendulumFactory};
use smc_tune::services::{ControllerBuilder, FitnessEvaluator, TuningService};

/// Two short scenarios (1 s at 10 ms) around upright.
pub fn short_scenarios() -> ScenarioSet {
    ScenarioSet::new(vec![
        Scenario::new("nominal", State::new(0.0, 0.05, -0.03, 0.0, 0.0, 0.0))
            .with_horizon(1.0, 0.01)
            .with_weight(2.0),
        Scenario::new("offset", State::new(0.1, 0.02, 0.04, 0.0, 0.0, 0.0))
            .with_horizon(1.0, 0.01),
    ])
    .expect("valid scenarios")
}

/// Evaluator for `kind` on the reference plant with its default settings.
pub fn evaluator(kind: ControllerKind, scenarios: ScenarioSet, config: FitnessConfig) -> FitnessEvaluator {
    let physics = PhysicsConfig::default();
    let builder = ControllerBuilder::new(kind, ControllerSettings::for_kind(kind))
        .with_model(Arc::new(DoublePendulum::new(physics)));
    FitnessEvaluator::new(
        Arc::new(builder),
        Arc::new(DoublePendulumFactory::new(physics)),
        scenarios,
        config,
    )
    .expect("valid evaluator")
}

/// Tuning service over [`short_scenarios`] with a fixed seed.
pub fn tuning_service(seed: u64) -> TuningService {
    let mut config = Config::default();
    config.scenarios = short_scenarios();
    config.optimizer.seed = Some(seed);
    let physics = config.physics;
    TuningService::new(
        config,
        Arc::new(DoublePendulum::new(physics)),
        Arc::new(DoublePendulumFactory::new(physics)),
    )
}

/// Setup test logging
///
/// Initializes tracing subscriber for test output.
/// Call this at the beginning of tests that need logging.
pub fn setup_test_logging() {
    use tracing_subscriber::fmt;

    let _ = fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
