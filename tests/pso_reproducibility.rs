//! Seeded runs of the particle swarm optimizer must be bit-identical.

mod common;

use smc_tune::domain::models::{ControllerKind, FitnessConfig, GainBounds, OptimizerConfig};
use smc_tune::services::{PsoOptimizer, TuningRequest};

fn rastrigin(x: &[f64]) -> f64 {
    10.0 * x.len() as f64
        + x.iter()
            .map(|v| v * v - 10.0 * (2.0 * std::f64::consts::PI * v).cos())
            .sum::<f64>()
}

fn optimizer(seed: u64) -> PsoOptimizer {
    PsoOptimizer::new(
        OptimizerConfig {
            seed: Some(seed),
            early_stopping: false,
            ..OptimizerConfig::default()
        },
        GainBounds::uniform(3, -5.12, 5.12).unwrap(),
    )
    .unwrap()
}

#[test]
fn test_same_seed_same_trajectory_on_analytic_function() {
    let a = optimizer(11).optimize_with(&rastrigin, 15, 25).unwrap();
    let b = optimizer(11).optimize_with(&rastrigin, 15, 25).unwrap();

    assert_eq!(a.best_position, b.best_position);
    assert_eq!(a.best_cost, b.best_cost);
    assert_eq!(a.best_cost_history(), b.best_cost_history());
    let positions_a: Vec<_> = a.history.iter().map(|r| r.best_position.clone()).collect();
    let positions_b: Vec<_> = b.history.iter().map(|r| r.best_position.clone()).collect();
    assert_eq!(positions_a, positions_b);
    assert_ne!(a.run_id, b.run_id);
}

#[test]
fn test_different_seeds_explore_differently() {
    let a = optimizer(1).optimize_with(&rastrigin, 15, 10).unwrap();
    let b = optimizer(2).optimize_with(&rastrigin, 15, 10).unwrap();
    assert_ne!(a.history[0].best_position, b.history[0].best_position);
}

#[test]
fn test_history_length_and_evaluation_count() {
    let result = optimizer(5).optimize_with(&rastrigin, 12, 20).unwrap();
    assert_eq!(result.history.len(), 21);
    assert_eq!(result.evaluations, 12 * 21);
    assert_eq!(result.history[0].iteration, 0);
    assert!(result
        .best_cost_history()
        .windows(2)
        .all(|w| w[1] <= w[0]));
}

#[test]
fn test_seeded_evaluator_run_is_reproducible() {
    let kind = ControllerKind::Hybrid;
    let fitness = common::evaluator(kind, common::short_scenarios(), FitnessConfig::default());
    let bounds = kind.default_bounds();
    let config = OptimizerConfig {
        seed: Some(23),
        early_stopping: false,
        ..OptimizerConfig::default()
    };

    let a = PsoOptimizer::new(config.clone(), bounds.clone())
        .unwrap()
        .optimize_with(&fitness, 6, 3)
        .unwrap();
    let b = PsoOptimizer::new(config, bounds.clone())
        .unwrap()
        .optimize_with(&fitness, 6, 3)
        .unwrap();

    assert_eq!(a.best_position, b.best_position);
    assert_eq!(a.best_cost_history(), b.best_cost_history());
    assert!(bounds.contains(&a.best_position));
}

#[test]
fn test_tuning_service_reproducible_with_request_seed() {
    let request = TuningRequest {
        kind: Some(ControllerKind::Classical),
        swarm_size: Some(5),
        iterations: Some(2),
        seed: Some(77),
    };
    let a = common::tuning_service(1).tune(&request, |_| {}).unwrap();
    let b = common::tuning_service(2).tune(&request, |_| {}).unwrap();
    assert_eq!(a.optimization.seed, 77);
    assert_eq!(a.optimization.best_position, b.optimization.best_position);
    assert_eq!(a.reference_cost, b.reference_cost);
}
