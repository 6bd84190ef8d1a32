//! Simulation scenarios scored by the fitness evaluator.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::state::State;

/// One closed-loop simulation setup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Identifier used in logs and reports.
    pub name: String,
    /// State at `t = 0`.
    pub initial_state: State,
    /// Relative weight in the aggregate cost. Normalized across the set.
    #[serde(default = "default_weight")]
    pub weight: f64,
    /// Simulated duration in seconds.
    #[serde(default = "default_horizon")]
    pub horizon: f64,
    /// Control and integration step in seconds.
    #[serde(default = "default_dt")]
    pub dt: f64,
    /// Multiplier applied to the plant's link masses (1.0 = nominal).
    #[serde(default = "default_weight")]
    pub parameter_scale: f64,
}

fn default_weight() -> f64 {
    1.0
}

fn default_horizon() -> f64 {
    5.0
}

fn default_dt() -> f64 {
    0.01
}

impl Scenario {
    /// Scenario with the default horizon, step and unit weight.
    pub fn new(name: impl Into<String>, initial_state: State) -> Self {
        Self {
            name: name.into(),
            initial_state,
            weight: default_weight(),
            horizon: default_horizon(),
            dt: default_dt(),
            parameter_scale: 1.0,
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    /// Set the horizon and integration step (seconds).
    pub fn with_horizon(mut self, horizon: f64, dt: f64) -> Self {
        self.horizon = horizon;
        self.dt = dt;
        self
    }

    /// Scale the plant link masses for this scenario.
    pub fn with_parameter_scale(mut self, scale: f64) -> Self {
        self.parameter_scale = scale;
        self
    }

    /// Number of control steps in the horizon.
    pub fn steps(&self) -> usize {
        (self.horizon / self.dt).round() as usize
    }

    pub fn validate(&self) -> DomainResult<()> {
        let invalid = |reason: String| DomainError::InvalidScenario {
            name: self.name.clone(),
            reason,
        };
        if self.name.is_empty() {
            return Err(invalid("name cannot be empty".to_string()));
        }
        for (label, value) in [
            ("weight", self.weight),
            ("horizon", self.horizon),
            ("dt", self.dt),
            ("parameter_scale", self.parameter_scale),
        ] {
            if !(value > 0.0 && value.is_finite()) {
                return Err(invalid(format!("{label} must be positive, got {value}")));
            }
        }
        if self.dt > self.horizon {
            return Err(invalid(format!(
                "dt {} exceeds horizon {}",
                self.dt, self.horizon
            )));
        }
        if let Some((index, value)) = self.initial_state.first_non_finite() {
            return Err(invalid(format!(
                "initial state component {index} is not finite ({value})"
            )));
        }
        Ok(())
    }
}

/// Ordered, weighted set of scenarios.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScenarioSet {
    scenarios: Vec<Scenario>,
}

impl ScenarioSet {
    pub fn new(scenarios: Vec<Scenario>) -> DomainResult<Self> {
        let set = Self { scenarios };
        set.validate()?;
        Ok(set)
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.scenarios.is_empty() {
            return Err(DomainError::ValidationFailed(
                "scenario set cannot be empty".to_string(),
            ));
        }
        self.scenarios.iter().try_for_each(Scenario::validate)
    }

    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }

    /// Weights scaled to sum to one.
    pub fn normalized_weights(&self) -> Vec<f64> {
        let total: f64 = self.scenarios.iter().map(|s| s.weight).sum();
        self.scenarios.iter().map(|s| s.weight / total).collect()
    }

    /// Nominal, large-angle and cart-offset starts.
    pub fn standard() -> Self {
        Self {
            scenarios: vec![
                Scenario::new("nominal", State::new(0.0, 0.05, -0.03, 0.0, 0.0, 0.0))
                    .with_weight(0.5),
                Scenario::new("large_angle", State::new(0.0, 0.15, 0.10, 0.0, 0.0, 0.0))
                    .with_weight(0.3),
                Scenario::new("cart_offset", State::new(0.3, 0.05, 0.05, 0.0, 0.1, -0.1))
                    .with_weight(0.2),
            ],
        }
    }

    /// Append `draws` seeded perturbations of every base scenario.
    ///
    /// Each draw perturbs the angles and angular rates by up to `spread`
    /// (absolute) and the physics scale by up to `spread` (relative), and
    /// carries the base weight divided by `draws + 1`.
    pub fn with_uncertainty_draws(&self, draws: usize, spread: f64, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut scenarios = Vec::with_capacity(self.scenarios.len() * (draws + 1));
        for base in &self.scenarios {
            let share = base.weight / (draws + 1) as f64;
            scenarios.push(base.clone().with_weight(share));
            for draw in 0..draws {
                let mut state = base.initial_state;
                for index in [1, 2, 4, 5] {
                    state.0[index] += rng.gen_range(-spread..=spread);
                }
                let scale = (1.0 + rng.gen_range(-spread..=spread)).max(0.1);
                scenarios.push(Scenario {
                    name: format!("{}_draw{}", base.name, draw + 1),
                    initial_state: state,
                    weight: share,
                    parameter_scale: base.parameter_scale * scale,
                    ..base.clone()
                });
            }
        }
        Self { scenarios }
    }
}

impl Default for ScenarioSet {
    fn default() -> Self {
        Self::standard()
    }
}
