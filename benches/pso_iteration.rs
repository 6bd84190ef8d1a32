//! Optimizer and fitness evaluation benchmarks.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use smc_tune::domain::models::{
    ControllerKind, ControllerSettings, FitnessConfig, GainBounds, OptimizerConfig, PhysicsConfig,
    Scenario, ScenarioSet, State,
};
use smc_tune::infrastructure::plant::{DoublePendulum, DoublePendulumFactory};
use smc_tune::services::{ControllerBuilder, FitnessEvaluator, PsoOptimizer};

fn evaluator(kind: ControllerKind, parallel: bool) -> FitnessEvaluator {
    let physics = PhysicsConfig::default();
    let scenarios = ScenarioSet::new(vec![
        Scenario::new("bench", State::new(0.0, 0.05, -0.03, 0.0, 0.0, 0.0)).with_horizon(2.0, 0.01),
    ])
    .expect("valid scenario");
    FitnessEvaluator::new(
        Arc::new(
            ControllerBuilder::new(kind, ControllerSettings::for_kind(kind))
                .with_model(Arc::new(DoublePendulum::new(physics))),
        ),
        Arc::new(DoublePendulumFactory::new(physics)),
        scenarios,
        FitnessConfig {
            parallel,
            ..FitnessConfig::default()
        },
    )
    .expect("valid evaluator")
}

fn bench_candidate_evaluation(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluate_candidate");
    for kind in ControllerKind::ALL {
        let eval = evaluator(kind, false);
        let gains = kind.reference_gains().into_inner();
        group.bench_with_input(BenchmarkId::from_parameter(kind), &gains, |b, gains| {
            b.iter(|| black_box(eval.evaluate(gains)));
        });
    }
    group.finish();
}

fn bench_swarm_batch(c: &mut Criterion) {
    let kind = ControllerKind::Classical;
    let bounds = kind.default_bounds();
    let batch: Vec<Vec<f64>> = (0..16)
        .map(|i| {
            let t = i as f64 / 15.0;
            bounds
                .lower
                .iter()
                .zip(&bounds.upper)
                .map(|(l, u)| l + t * (u - l))
                .collect()
        })
        .collect();

    let mut group = c.benchmark_group("evaluate_batch");
    group.throughput(Throughput::Elements(batch.len() as u64));
    for parallel in [false, true] {
        let eval = evaluator(kind, parallel);
        let label = if parallel { "parallel" } else { "sequential" };
        group.bench_with_input(BenchmarkId::from_parameter(label), &batch, |b, batch| {
            b.iter(|| black_box(eval.evaluate_batch(batch)));
        });
    }
    group.finish();
}

fn bench_pso_update(c: &mut Criterion) {
    let sphere = |x: &[f64]| x.iter().map(|v| v * v).sum::<f64>();
    let mut group = c.benchmark_group("pso_iterations");
    for dim in [4usize, 6] {
        let optimizer = PsoOptimizer::new(
            OptimizerConfig {
                seed: Some(1),
                early_stopping: false,
                ..OptimizerConfig::default()
            },
            GainBounds::uniform(dim, -10.0, 10.0).expect("valid bounds"),
        )
        .expect("valid optimizer");
        group.bench_with_input(BenchmarkId::new("sphere", dim), &dim, |b, _| {
            b.iter(|| black_box(optimizer.optimize_with(&sphere, 30, 50)));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_candidate_evaluation, bench_swarm_batch, bench_pso_update);
criterion_main!(benches);
