//! smc-tune - Sliding-Mode Controller Tuning
//!
//! smc-tune tunes the gains of sliding-mode controllers for a cart
//! double-inverted pendulum with a particle swarm optimizer, scoring each
//! candidate by closed-loop simulation over a weighted scenario set.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): State, gains, control building blocks and port traits
//! - **Service Layer** (`services`): Control laws, fitness evaluation, PSO and convergence analysis
//! - **Infrastructure Layer** (`infrastructure`): Configuration, logging and the reference plant
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use smc_tune::domain::models::{Config, ControllerKind};
//! use smc_tune::infrastructure::plant::{DoublePendulum, DoublePendulumFactory};
//! use smc_tune::services::{TuningRequest, TuningService};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let physics = config.physics;
//!     let service = TuningService::new(
//!         config,
//!         Arc::new(DoublePendulum::new(physics)),
//!         Arc::new(DoublePendulumFactory::new(physics)),
//!     );
//!     let report = service.tune(&TuningRequest::for_kind(ControllerKind::Hybrid), |_| {})?;
//!     println!("best gains: {:?}", report.optimization.best_position);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{ControlError, DomainError, DomainResult, OptimizationError, PlantError};
pub use domain::models::{
    Config, ControllerKind, ConvergenceCriteria, ConvergenceStatus, GainBounds, GainVector,
    Scenario, ScenarioSet, State,
};
pub use domain::ports::{
    ControllerFactory, DynamicsModel, FitnessFunction, Plant, PlantFactory, SlidingModeController,
};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{
    ControllerBuilder, ConvergenceAnalyzer, FitnessEvaluator, OptimizationResult, PsoOptimizer,
    TuningReport, TuningService,
};
