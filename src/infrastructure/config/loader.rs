use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use thiserror::Error;

use crate::domain::models::config::{Config, ControllerSettings};
use crate::domain::models::ControllerKind;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid swarm_size: {0}. Must be at least 1")]
    InvalidSwarmSize(usize),

    #[error("Invalid iterations: {0}. Must be at least 1")]
    InvalidIterations(usize),

    #[error("Invalid PSO coefficient '{name}': {value}. Must be positive")]
    InvalidCoefficient { name: &'static str, value: f64 },

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidRotation(String),

    #[error("Invalid {kind} controller settings: {reason}")]
    InvalidController { kind: ControllerKind, reason: String },

    #[error("Invalid scenarios: {0}")]
    InvalidScenarios(String),

    #[error(
        "Invalid penalties: failure_penalty ({failure}) must be >= instability_penalty ({instability}) > 0"
    )]
    InvalidPenalties { failure: f64, instability: f64 },

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. smc-tune.yaml in the working directory (optional)
    /// 3. Environment variables (SMC_TUNE_* prefix, `__` for nesting)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file("smc-tune.yaml"))
            .merge(Env::prefixed("SMC_TUNE_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file, still honouring environment
    /// overrides
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .merge(Env::prefixed("SMC_TUNE_").split("__"))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        // Logging
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidRotation(config.logging.rotation.clone()));
        }

        // Optimizer
        let opt = &config.optimizer;
        if opt.swarm_size == 0 {
            return Err(ConfigError::InvalidSwarmSize(opt.swarm_size));
        }
        if opt.iterations == 0 {
            return Err(ConfigError::InvalidIterations(opt.iterations));
        }
        for (name, value) in [
            ("inertia", opt.inertia),
            ("inertia_end", opt.inertia_end),
            ("cognitive", opt.cognitive),
            ("social", opt.social),
            ("velocity_clamp", opt.velocity_clamp),
        ] {
            if !(value > 0.0 && value.is_finite()) {
                return Err(ConfigError::InvalidCoefficient { name, value });
            }
        }

        // Controllers
        for kind in ControllerKind::ALL {
            Self::validate_controller(kind, config.controllers.get(kind)).map_err(|reason| {
                ConfigError::InvalidController { kind, reason }
            })?;
        }

        // Fitness
        let fitness = &config.fitness;
        if !(fitness.instability_penalty > 0.0
            && fitness.failure_penalty >= fitness.instability_penalty
            && fitness.failure_penalty.is_finite())
        {
            return Err(ConfigError::InvalidPenalties {
                failure: fitness.failure_penalty,
                instability: fitness.instability_penalty,
            });
        }
        if !(fitness.divergence_threshold > 0.0 && fitness.angle_limit > 0.0) {
            return Err(ConfigError::ValidationFailed(
                "divergence_threshold and angle_limit must be positive".to_string(),
            ));
        }
        let term_weights = [
            fitness.state_error,
            fitness.control_effort,
            fitness.control_rate,
            fitness.sliding_energy,
        ];
        if fitness
            .state_weights
            .iter()
            .chain(&term_weights)
            .any(|w| *w < 0.0 || !w.is_finite())
        {
            return Err(ConfigError::ValidationFailed(
                "fitness weights must be non-negative".to_string(),
            ));
        }
        if fitness.normalization.iter().any(|n| *n <= 0.0 || !n.is_finite()) {
            return Err(ConfigError::ValidationFailed(
                "fitness normalization constants must be positive".to_string(),
            ));
        }

        // Scenarios
        config
            .scenarios
            .validate()
            .map_err(|e| ConfigError::InvalidScenarios(e.to_string()))?;
        let draws = &config.scenario_draws;
        if draws.draws > 0 && !(draws.spread >= 0.0 && draws.spread < 1.0) {
            return Err(ConfigError::InvalidScenarios(format!(
                "draw spread must be in [0, 1), got {}",
                draws.spread
            )));
        }

        // Convergence
        for kind in ControllerKind::ALL {
            config
                .convergence
                .get(kind)
                .validate()
                .map_err(|e| ConfigError::ValidationFailed(format!("{kind} convergence: {e}")))?;
        }

        // Physics
        let physics = &config.physics;
        for (name, value) in [
            ("cart_mass", physics.cart_mass),
            ("link1.mass", physics.link1.mass),
            ("link1.length", physics.link1.length),
            ("link2.mass", physics.link2.mass),
            ("link2.length", physics.link2.length),
            ("gravity", physics.gravity),
        ] {
            if !(value > 0.0 && value.is_finite()) {
                return Err(ConfigError::ValidationFailed(format!(
                    "physics.{name} must be positive, got {value}"
                )));
            }
        }

        Ok(())
    }

    fn validate_controller(kind: ControllerKind, settings: &ControllerSettings) -> Result<(), String> {
        settings.bounds.validate().map_err(|e| e.to_string())?;
        if settings.bounds.dim() != kind.n_gains() {
            return Err(format!(
                "bounds have {} entries, expected {}",
                settings.bounds.dim(),
                kind.n_gains()
            ));
        }
        settings
            .reference_gains
            .expect_len(kind)
            .map_err(|e| e.to_string())?;
        if !(settings.max_force > 0.0 && settings.max_force.is_finite()) {
            return Err(format!("max_force must be positive, got {}", settings.max_force));
        }
        settings
            .switching
            .check_boundary_layer(settings.boundary_layer)
            .map_err(|e| e.to_string())?;
        if settings.boundary_layer_slope < 0.0 || settings.damping < 0.0 {
            return Err("boundary_layer_slope and damping cannot be negative".to_string());
        }
        if matches!(kind, ControllerKind::Adaptive | ControllerKind::Hybrid) {
            settings.adaptation.validate().map_err(|e| e.to_string())?;
        }
        if let Some(uncertainty) = &settings.uncertainty {
            uncertainty.validate().map_err(|e| e.to_string())?;
        }
        if kind == ControllerKind::Hybrid {
            let hybrid = &settings.hybrid;
            if !(hybrid.surface_threshold > 0.0 && (0.0..1.0).contains(&hybrid.hysteresis)) {
                return Err("hybrid surface_threshold must be positive and hysteresis in [0, 1)".to_string());
            }
            if hybrid.twisting_gains.iter().any(|g| *g <= 0.0 || !g.is_finite()) {
                return Err("hybrid twisting_gains must be positive".to_string());
            }
        }
        Ok(())
    }
}
