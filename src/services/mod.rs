//! Service layer: the control laws, closed-loop fitness evaluation, the
//! swarm optimizer and its convergence analysis.

pub mod controllers;
pub mod convergence_analyzer;
pub mod fitness_evaluator;
pub mod pso_optimizer;
pub mod tuning_service;

pub use controllers::{
    AdaptiveSmc, ClassicalSmc, ControllerBuilder, EquivalentControl, HybridAdaptiveSta,
    SuperTwistingSmc,
};
pub use convergence_analyzer::ConvergenceAnalyzer;
pub use fitness_evaluator::{CandidateEvaluation, CostBreakdown, FitnessEvaluator, ScenarioOutcome};
pub use pso_optimizer::{IterationRecord, OptimizationResult, PsoOptimizer, TerminationReason};
pub use tuning_service::{TuningReport, TuningRequest, TuningService};
