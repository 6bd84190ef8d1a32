//! Convergence analysis wired into the particle swarm optimizer.

mod common;

use smc_tune::domain::models::{
    ControllerKind, ConvergenceCriteria, ConvergenceStatus, GainBounds, OptimizerConfig,
};
use smc_tune::services::{ConvergenceAnalyzer, PsoOptimizer, TerminationReason};

fn flat(_: &[f64]) -> f64 {
    4.0
}

fn bowl(x: &[f64]) -> f64 {
    x.iter().map(|v| (v - 1.0).powi(2)).sum()
}

fn optimizer(config: OptimizerConfig, criteria: ConvergenceCriteria) -> PsoOptimizer {
    PsoOptimizer::new(config, GainBounds::uniform(3, -5.0, 5.0).unwrap())
        .unwrap()
        .with_convergence(criteria)
}

#[test]
fn test_flat_landscape_converges_once_window_fills() {
    let criteria = ConvergenceCriteria::default();
    let result = optimizer(
        OptimizerConfig {
            seed: Some(9),
            ..OptimizerConfig::default()
        },
        criteria,
    )
    .optimize_with(&flat, 10, 60)
    .unwrap();

    assert_eq!(result.termination, TerminationReason::Converged);
    assert_eq!(result.status, ConvergenceStatus::Converged);
    assert!(result.iterations + 1 >= criteria.min_iterations);
    assert!(result.iterations < 60);
    assert_eq!(result.best_cost, 4.0);
}

#[test]
fn test_every_record_carries_metrics_and_starts_initializing() {
    let result = optimizer(
        OptimizerConfig {
            seed: Some(4),
            early_stopping: false,
            ..OptimizerConfig::default()
        },
        ConvergenceCriteria::default(),
    )
    .optimize_with(&bowl, 12, 15)
    .unwrap();

    assert_eq!(result.history.len(), 16);
    for (i, record) in result.history.iter().enumerate() {
        let metrics = record.convergence.as_ref().expect("metrics recorded");
        assert_eq!(metrics.iteration, i);
        assert!(metrics.best_fitness >= record.best_cost - 1e-12);
    }
    let first = result.history[0].convergence.as_ref().unwrap();
    assert_eq!(first.status, ConvergenceStatus::Initializing);
    assert_eq!(result.termination, TerminationReason::MaxIterations);
}

#[test]
fn test_without_criteria_status_stays_not_started() {
    let result = PsoOptimizer::new(
        OptimizerConfig {
            seed: Some(2),
            ..OptimizerConfig::default()
        },
        GainBounds::uniform(2, -1.0, 1.0).unwrap(),
    )
    .unwrap()
    .optimize_with(&bowl, 6, 5)
    .unwrap();

    assert_eq!(result.status, ConvergenceStatus::NotStarted);
    assert!(result.history.iter().all(|r| r.convergence.is_none()));
    assert_eq!(result.termination, TerminationReason::MaxIterations);
}

#[test]
fn test_analyzer_replays_optimizer_best_costs() {
    let result = optimizer(
        OptimizerConfig {
            seed: Some(31),
            early_stopping: false,
            ..OptimizerConfig::default()
        },
        ConvergenceCriteria::default(),
    )
    .optimize_with(&bowl, 10, 30)
    .unwrap();

    let mut analyzer = ConvergenceAnalyzer::new(ConvergenceCriteria::default()).unwrap();
    for record in &result.history {
        analyzer.update(record.iteration, &[record.best_cost], None);
    }
    assert_eq!(analyzer.history().len(), 31);
    assert_ne!(analyzer.status(), ConvergenceStatus::Diverging);
    assert_ne!(analyzer.status(), ConvergenceStatus::Oscillating);
}

#[test]
fn test_per_kind_criteria_validate() {
    for kind in ControllerKind::ALL {
        let analyzer = ConvergenceAnalyzer::for_controller(kind).unwrap();
        assert!(analyzer.criteria().validate().is_ok());
        assert_eq!(analyzer.status(), ConvergenceStatus::NotStarted);
    }
}

#[test]
fn test_invalid_criteria_rejected() {
    let criteria = ConvergenceCriteria {
        significance_level: 0.0,
        ..ConvergenceCriteria::default()
    };
    assert!(ConvergenceAnalyzer::new(criteria).is_err());
}
