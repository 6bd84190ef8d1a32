//! Closed-loop fitness evaluation against the reference plant.

mod common;

use std::sync::Arc;

use smc_tune::domain::errors::PlantError;
use smc_tune::domain::models::{
    ControllerKind, ControllerSettings, FitnessConfig, Scenario, ScenarioSet, State,
};
use smc_tune::domain::ports::{FitnessFunction, Plant};
use smc_tune::infrastructure::plant::DoublePendulum;
use smc_tune::services::{ControllerBuilder, FitnessEvaluator};

#[test]
fn test_every_kind_scores_reference_gains_below_failure_penalty() {
    for kind in ControllerKind::ALL {
        let eval = common::evaluator(kind, common::short_scenarios(), FitnessConfig::default());
        let detail = eval.evaluate_detailed(kind.reference_gains().as_slice());
        assert!(detail.rejection.is_none(), "{kind}: {:?}", detail.rejection);
        assert_eq!(detail.scenarios.len(), 2);
        assert!(detail.cost.is_finite());
        assert!(!eval.is_failure(detail.cost), "{kind} cost {}", detail.cost);
        let failures: Vec<_> = detail.scenarios.iter().map(|s| &s.failure).collect();
        assert_eq!(detail.failed_scenarios(), 0, "{kind}: {failures:?}");
    }
}

#[test]
fn test_scenario_weights_are_normalized_in_breakdown() {
    let kind = ControllerKind::Classical;
    let eval = common::evaluator(kind, common::short_scenarios(), FitnessConfig::default());
    let detail = eval.evaluate_detailed(kind.reference_gains().as_slice());
    let weights: Vec<f64> = detail.scenarios.iter().map(|s| s.weight).collect();
    assert!((weights[0] - 2.0 / 3.0).abs() < 1e-12);
    assert!((weights[1] - 1.0 / 3.0).abs() < 1e-12);

    let recombined: f64 = detail
        .scenarios
        .iter()
        .map(|s| s.weight * s.cost.total())
        .sum();
    assert!((recombined - detail.cost).abs() <= 1e-9 * detail.cost.max(1.0));
}

#[test]
fn test_evaluation_is_deterministic() {
    let kind = ControllerKind::Adaptive;
    let eval = common::evaluator(kind, common::short_scenarios(), FitnessConfig::default());
    let gains = kind.reference_gains().into_inner();
    assert_eq!(eval.evaluate(&gains), eval.evaluate(&gains));
}

#[test]
fn test_invalid_candidates_get_failure_penalty_without_aborting_batch() {
    let kind = ControllerKind::SuperTwisting;
    let eval = common::evaluator(kind, common::short_scenarios(), FitnessConfig::default());
    let reference = kind.reference_gains().into_inner();
    let batch = vec![
        reference.clone(),
        vec![1.0; 4],
        vec![-1.0, 1.0, 1.0, 1.0, 1.0, 1.0],
        reference,
    ];
    let costs = eval.evaluate_batch(&batch);
    assert_eq!(costs.len(), 4);
    assert_eq!(costs[1], eval.config().failure_penalty);
    assert_eq!(costs[2], eval.config().failure_penalty);
    assert!(!eval.is_failure(costs[0]));
    assert_eq!(costs[0], costs[3]);
}

#[test]
fn test_divergent_run_is_penalized_but_not_a_failure() {
    struct Runaway;

    impl Plant for Runaway {
        fn step(&mut self, state: &State, _: f64, dt: f64) -> Result<State, PlantError> {
            let mut next = *state;
            next.0[1] += 5.0 * dt;
            Ok(next)
        }
    }

    let kind = ControllerKind::Classical;
    let builder = ControllerBuilder::new(kind, ControllerSettings::for_kind(kind))
        .with_model(Arc::new(DoublePendulum::default()));
    let plants = |_: &Scenario| -> Result<Box<dyn Plant>, PlantError> { Ok(Box::new(Runaway)) };
    let eval = FitnessEvaluator::new(
        Arc::new(builder),
        Arc::new(plants),
        common::short_scenarios(),
        FitnessConfig::default(),
    )
    .unwrap();

    let detail = eval.evaluate_detailed(kind.reference_gains().as_slice());
    assert_eq!(detail.failed_scenarios(), 2);
    assert!(detail.cost >= eval.config().instability_penalty);
    assert!(!eval.is_failure(detail.cost));
}

#[test]
fn test_harder_scenario_costs_more() {
    let kind = ControllerKind::Classical;
    let small = ScenarioSet::new(vec![
        Scenario::new("small", State::new(0.0, 0.01, 0.0, 0.0, 0.0, 0.0)).with_horizon(1.0, 0.01),
    ])
    .unwrap();
    let large = ScenarioSet::new(vec![
        Scenario::new("large", State::new(0.0, 0.10, 0.0, 0.0, 0.0, 0.0)).with_horizon(1.0, 0.01),
    ])
    .unwrap();
    let gains = kind.reference_gains().into_inner();
    let a = common::evaluator(kind, small, FitnessConfig::default()).evaluate(&gains);
    let b = common::evaluator(kind, large, FitnessConfig::default()).evaluate(&gains);
    assert!(b > a, "small {a} large {b}");
}

#[test]
fn test_evaluator_is_a_fitness_function() {
    fn as_port(f: &dyn FitnessFunction, candidates: &[Vec<f64>]) -> Vec<f64> {
        f.evaluate_batch(candidates)
    }
    let kind = ControllerKind::Hybrid;
    let eval = common::evaluator(kind, common::short_scenarios(), FitnessConfig::default());
    let costs = as_port(&eval, &[kind.reference_gains().into_inner()]);
    assert_eq!(costs.len(), 1);
    assert!(!FitnessFunction::is_failure(&eval, costs[0]));
}
