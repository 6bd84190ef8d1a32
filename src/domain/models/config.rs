use serde::{Deserialize, Serialize};

use crate::domain::models::control::{AdaptationConfig, SwitchingFunction, UncertaintyConfig};
use crate::domain::models::convergence::ConvergenceCriteria;
use crate::domain::models::{ControllerKind, GainBounds, GainVector, ScenarioSet};

/// Main configuration structure for smc-tune
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Particle swarm settings
    #[serde(default)]
    pub optimizer: OptimizerConfig,

    /// Per-controller-kind bounds and law parameters
    #[serde(default)]
    pub controllers: ControllersConfig,

    /// Cost weights and penalty policy
    #[serde(default)]
    pub fitness: FitnessConfig,

    /// Base simulation scenarios
    #[serde(default)]
    pub scenarios: ScenarioSet,

    /// Seeded perturbations appended to the base scenarios
    #[serde(default)]
    pub scenario_draws: ScenarioDrawConfig,

    /// Convergence thresholds per controller kind
    #[serde(default)]
    pub convergence: ConvergenceConfig,

    /// Reference plant parameters
    #[serde(default)]
    pub physics: PhysicsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            optimizer: OptimizerConfig::default(),
            controllers: ControllersConfig::default(),
            fitness: FitnessConfig::default(),
            scenarios: ScenarioSet::standard(),
            scenario_draws: ScenarioDrawConfig::default(),
            convergence: ConvergenceConfig::default(),
            physics: PhysicsConfig::default(),
        }
    }
}

impl Config {
    /// Base scenarios plus any configured uncertainty draws.
    pub fn effective_scenarios(&self) -> ScenarioSet {
        let draws = &self.scenario_draws;
        if draws.draws == 0 {
            self.scenarios.clone()
        } else {
            self.scenarios
                .with_uncertainty_draws(draws.draws, draws.spread, draws.seed)
        }
    }
}

// ============================================================================
// Logging
// ============================================================================

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files. Stdout only when unset.
    #[serde(default)]
    pub log_dir: Option<String>,

    /// Rotation policy for file output: daily, hourly or never
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
        }
    }
}

// ============================================================================
// Optimizer
// ============================================================================

/// Particle swarm configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct OptimizerConfig {
    /// Number of particles
    #[serde(default = "default_swarm_size")]
    pub swarm_size: usize,

    /// Maximum number of iterations
    #[serde(default = "default_iterations")]
    pub iterations: usize,

    /// Inertia weight at the first iteration
    #[serde(default = "default_inertia")]
    pub inertia: f64,

    /// Inertia weight at the last iteration (linear schedule)
    #[serde(default = "default_inertia_end")]
    pub inertia_end: f64,

    /// Cognitive coefficient c1
    #[serde(default = "default_acceleration")]
    pub cognitive: f64,

    /// Social coefficient c2
    #[serde(default = "default_acceleration")]
    pub social: f64,

    /// Maximum |velocity| as a fraction of each gain's range
    #[serde(default = "default_velocity_clamp")]
    pub velocity_clamp: f64,

    /// RNG seed. A fixed seed gives bit-identical runs.
    #[serde(default)]
    pub seed: Option<u64>,

    /// Stop as soon as the convergence analyzer reports convergence
    #[serde(default = "default_true")]
    pub early_stopping: bool,

    /// Also stop on stagnation
    #[serde(default)]
    pub stop_on_stagnation: bool,

    /// Place the reference gains in the initial swarm
    #[serde(default)]
    pub seed_with_reference: bool,
}

const fn default_swarm_size() -> usize {
    30
}

const fn default_iterations() -> usize {
    100
}

const fn default_inertia() -> f64 {
    0.9
}

const fn default_inertia_end() -> f64 {
    0.4
}

const fn default_acceleration() -> f64 {
    2.0
}

const fn default_velocity_clamp() -> f64 {
    0.2
}

const fn default_true() -> bool {
    true
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            swarm_size: default_swarm_size(),
            iterations: default_iterations(),
            inertia: default_inertia(),
            inertia_end: default_inertia_end(),
            cognitive: default_acceleration(),
            social: default_acceleration(),
            velocity_clamp: default_velocity_clamp(),
            seed: None,
            early_stopping: true,
            stop_on_stagnation: false,
            seed_with_reference: false,
        }
    }
}

// ============================================================================
// Controllers
// ============================================================================

/// Mode-switching parameters of the hybrid controller
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct HybridConfig {
    /// `|s|` below which the super-twisting mode is preferred
    pub surface_threshold: f64,
    /// Relative hysteresis band around `surface_threshold`
    pub hysteresis: f64,
    /// `min(|cos θ1|, |cos θ2|)` below which the adaptive mode is forced
    pub singularity_cos_threshold: f64,
    /// Super-twisting gains used in that mode, `[K1, K2]`
    pub twisting_gains: [f64; 2],
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            surface_threshold: 0.5,
            hysteresis: 0.2,
            singularity_cos_threshold: 0.2,
            twisting_gains: [12.0, 6.0],
        }
    }
}

/// Settings for one controller kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ControllerSettings {
    /// Per-gain search bounds
    pub bounds: GainBounds,

    /// Known-good gains (used for seeding and validation runs)
    pub reference_gains: GainVector,

    /// Actuator limit (N)
    pub max_force: f64,

    /// Boundary-layer width Φ
    pub boundary_layer: f64,

    /// Growth of Φ with `|s|` (classical only)
    #[serde(default)]
    pub boundary_layer_slope: f64,

    /// Switching function
    #[serde(default)]
    pub switching: SwitchingFunction,

    /// Proportional surface damping `α` (adaptive only)
    #[serde(default = "default_damping")]
    pub damping: f64,

    /// Use model-based equivalent control when a dynamics model is available
    #[serde(default = "default_true")]
    pub equivalent_control: bool,

    /// `|L M⁻¹ B|` below which the equivalent term is dropped
    #[serde(default = "default_controllability_threshold")]
    pub controllability_threshold: f64,

    /// Online adaptation (adaptive and hybrid)
    #[serde(default)]
    pub adaptation: AdaptationConfig,

    /// Disturbance estimator feeding the adaptation (adaptive and hybrid)
    #[serde(default)]
    pub uncertainty: Option<UncertaintyConfig>,

    /// Mode switching (hybrid only)
    #[serde(default)]
    pub hybrid: HybridConfig,

    /// Samples retained per controller instance
    #[serde(default)]
    pub history_capacity: usize,
}

const fn default_controllability_threshold() -> f64 {
    1e-4
}

const fn default_damping() -> f64 {
    2.0
}

const fn default_projection_margin() -> f64 {
    5.0
}

impl ControllerSettings {
    /// Defaults tuned for each controller kind on the reference plant.
    pub fn for_kind(kind: ControllerKind) -> Self {
        let (max_force, boundary_layer, switching) = match kind {
            ControllerKind::Classical => (150.0, 0.3, SwitchingFunction::Saturation),
            ControllerKind::SuperTwisting => (150.0, 0.01, SwitchingFunction::Saturation),
            ControllerKind::Adaptive => (150.0, 0.3, SwitchingFunction::Tanh),
            ControllerKind::Hybrid => (150.0, 0.05, SwitchingFunction::Saturation),
        };
        let adaptation = match kind {
            ControllerKind::Hybrid => AdaptationConfig {
                projection_margin: Some(default_projection_margin()),
                ..AdaptationConfig::default()
            },
            _ => AdaptationConfig::default(),
        };
        Self {
            bounds: kind.default_bounds(),
            reference_gains: kind.reference_gains(),
            max_force,
            boundary_layer,
            boundary_layer_slope: 0.0,
            switching,
            damping: default_damping(),
            equivalent_control: true,
            controllability_threshold: default_controllability_threshold(),
            adaptation,
            uncertainty: None,
            hybrid: HybridConfig::default(),
            history_capacity: 0,
        }
    }
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self::for_kind(ControllerKind::Classical)
    }
}

/// Settings for every controller kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ControllersConfig {
    #[serde(default = "default_classical")]
    pub classical: ControllerSettings,
    #[serde(default = "default_super_twisting")]
    pub super_twisting: ControllerSettings,
    #[serde(default = "default_adaptive")]
    pub adaptive: ControllerSettings,
    #[serde(default = "default_hybrid")]
    pub hybrid: ControllerSettings,
}

fn default_classical() -> ControllerSettings {
    ControllerSettings::for_kind(ControllerKind::Classical)
}

fn default_super_twisting() -> ControllerSettings {
    ControllerSettings::for_kind(ControllerKind::SuperTwisting)
}

fn default_adaptive() -> ControllerSettings {
    ControllerSettings::for_kind(ControllerKind::Adaptive)
}

fn default_hybrid() -> ControllerSettings {
    ControllerSettings::for_kind(ControllerKind::Hybrid)
}

impl ControllersConfig {
    /// Settings for `kind`.
    pub fn get(&self, kind: ControllerKind) -> &ControllerSettings {
        match kind {
            ControllerKind::Classical => &self.classical,
            ControllerKind::SuperTwisting => &self.super_twisting,
            ControllerKind::Adaptive => &self.adaptive,
            ControllerKind::Hybrid => &self.hybrid,
        }
    }
}

impl Default for ControllersConfig {
    fn default() -> Self {
        Self {
            classical: default_classical(),
            super_twisting: default_super_twisting(),
            adaptive: default_adaptive(),
            hybrid: default_hybrid(),
        }
    }
}

// ============================================================================
// Fitness
// ============================================================================

/// Cost weights, normalization and failure policy of the fitness evaluator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct FitnessConfig {
    /// Per-component weights of the state tracking cost `Σ wᵢ xᵢ² dt`
    pub state_weights: [f64; 6],
    /// Weight of the aggregated state cost
    pub state_error: f64,
    /// Weight of `∫u² dt`
    pub control_effort: f64,
    /// Weight of `∫(Δu/dt)² dt`
    pub control_rate: f64,
    /// Weight of `∫s² dt`
    pub sliding_energy: f64,
    /// Divide each term by its normalization constant before weighting
    pub normalize: bool,
    /// Normalization constants for (state, effort, rate, sliding)
    pub normalization: [f64; 4],
    /// Penalty added per scenario that becomes unstable
    pub instability_penalty: f64,
    /// Cost assigned to a candidate that cannot be evaluated at all
    pub failure_penalty: f64,
    /// Any `|xᵢ|` above this marks the run as diverged
    pub divergence_threshold: f64,
    /// Any `|θᵢ|` above this marks the run as failed (rad)
    pub angle_limit: f64,
    /// Per-candidate wall-clock budget in milliseconds (0 disables)
    pub timeout_ms: u64,
    /// Evaluate the candidates of a batch in parallel
    pub parallel: bool,
    /// Settling band as a fraction of the largest initial angle
    pub settling_fraction: f64,
}

impl Default for FitnessConfig {
    fn default() -> Self {
        Self {
            state_weights: [1.0, 10.0, 10.0, 0.1, 1.0, 1.0],
            state_error: 1.0,
            control_effort: 0.01,
            control_rate: 0.0001,
            sliding_energy: 0.1,
            normalize: false,
            normalization: [1.0, 1.0, 1.0, 1.0],
            instability_penalty: 1.0e3,
            failure_penalty: 1.0e6,
            divergence_threshold: 1.0e3,
            angle_limit: std::f64::consts::FRAC_PI_2,
            timeout_ms: 0,
            parallel: true,
            settling_fraction: 0.02,
        }
    }
}

/// Seeded scenario perturbations
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct ScenarioDrawConfig {
    /// Perturbed copies per base scenario (0 disables)
    pub draws: usize,
    /// Absolute angle/rate spread and relative mass spread
    pub spread: f64,
    /// Seed of the perturbation RNG
    pub seed: u64,
}

impl Default for ScenarioDrawConfig {
    fn default() -> Self {
        Self {
            draws: 0,
            spread: 0.05,
            seed: 7,
        }
    }
}

// ============================================================================
// Convergence
// ============================================================================

/// Convergence criteria per controller kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ConvergenceConfig {
    #[serde(default = "criteria_classical")]
    pub classical: ConvergenceCriteria,
    #[serde(default = "criteria_super_twisting")]
    pub super_twisting: ConvergenceCriteria,
    #[serde(default = "criteria_adaptive")]
    pub adaptive: ConvergenceCriteria,
    #[serde(default = "criteria_hybrid")]
    pub hybrid: ConvergenceCriteria,
}

fn criteria_classical() -> ConvergenceCriteria {
    ConvergenceCriteria::for_controller(ControllerKind::Classical)
}

fn criteria_super_twisting() -> ConvergenceCriteria {
    ConvergenceCriteria::for_controller(ControllerKind::SuperTwisting)
}

fn criteria_adaptive() -> ConvergenceCriteria {
    ConvergenceCriteria::for_controller(ControllerKind::Adaptive)
}

fn criteria_hybrid() -> ConvergenceCriteria {
    ConvergenceCriteria::for_controller(ControllerKind::Hybrid)
}

impl ConvergenceConfig {
    /// Criteria for `kind`.
    pub fn get(&self, kind: ControllerKind) -> &ConvergenceCriteria {
        match kind {
            ControllerKind::Classical => &self.classical,
            ControllerKind::SuperTwisting => &self.super_twisting,
            ControllerKind::Adaptive => &self.adaptive,
            ControllerKind::Hybrid => &self.hybrid,
        }
    }
}

impl Default for ConvergenceConfig {
    fn default() -> Self {
        Self {
            classical: criteria_classical(),
            super_twisting: criteria_super_twisting(),
            adaptive: criteria_adaptive(),
            hybrid: criteria_hybrid(),
        }
    }
}

// ============================================================================
// Physics
// ============================================================================

/// One pendulum link
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LinkConfig {
    /// Mass (kg)
    pub mass: f64,
    /// Length (m)
    pub length: f64,
    /// Distance from the pivot to the centre of mass (m)
    pub com: f64,
    /// Moment of inertia about the centre of mass (kg·m²)
    pub inertia: f64,
    /// Viscous joint friction (N·m·s/rad)
    #[serde(default)]
    pub friction: f64,
}

/// Reference cart double-pendulum parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct PhysicsConfig {
    /// Cart mass (kg)
    pub cart_mass: f64,
    /// Viscous cart friction (N·s/m)
    pub cart_friction: f64,
    pub link1: LinkConfig,
    pub link2: LinkConfig,
    /// Gravitational acceleration (m/s²)
    pub gravity: f64,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            cart_mass: 1.5,
            cart_friction: 0.2,
            link1: LinkConfig {
                mass: 0.2,
                length: 0.4,
                com: 0.2,
                inertia: 0.0081,
                friction: 0.005,
            },
            link2: LinkConfig {
                mass: 0.15,
                length: 0.3,
                com: 0.15,
                inertia: 0.0034,
                friction: 0.004,
            },
            gravity: 9.81,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_matches_kind_tables() {
        let config = Config::default();
        for kind in ControllerKind::ALL {
            let settings = config.controllers.get(kind);
            assert_eq!(settings.bounds.dim(), kind.n_gains());
            assert_eq!(settings.reference_gains.len(), kind.n_gains());
            assert!(settings.bounds.contains(settings.reference_gains.as_slice()));
        }
    }

    #[test]
    fn test_penalty_ordering_by_default() {
        let fitness = FitnessConfig::default();
        assert!(fitness.failure_penalty >= fitness.instability_penalty);
        assert!(fitness.instability_penalty > 0.0);
    }

    #[test]
    fn test_effective_scenarios_appends_draws() {
        let mut config = Config::default();
        assert_eq!(config.effective_scenarios().len(), 3);
        config.scenario_draws.draws = 2;
        assert_eq!(config.effective_scenarios().len(), 9);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = "optimizer:\n  swarm_size: 12\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.optimizer.swarm_size, 12);
        assert_eq!(config.optimizer.iterations, 100);
        assert_eq!(config.controllers.hybrid.bounds.dim(), 4);
    }
}
