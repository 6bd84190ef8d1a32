pub mod config;
pub mod control;
pub mod convergence;
pub mod gains;
pub mod scenario;
pub mod simulation;
pub mod state;

pub use config::{
    Config, ControllerSettings, ControllersConfig, ConvergenceConfig, FitnessConfig, HybridConfig,
    LinkConfig, LoggingConfig, OptimizerConfig, PhysicsConfig, ScenarioDrawConfig,
};
pub use convergence::{ConvergenceCriteria, ConvergenceMetrics, ConvergenceStatus, CriteriaSnapshot};
pub use gains::{ControllerKind, GainBounds, GainVector};
pub use scenario::{Scenario, ScenarioSet};
pub use simulation::{FailureReason, SimulationFailure, SimulationMetrics, SimulationResult};
pub use state::{State, STATE_DIM};
