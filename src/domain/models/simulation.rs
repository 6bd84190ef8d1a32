//! Closed-loop simulation results for a single scenario run.

use serde::{Deserialize, Serialize};

use crate::domain::models::control::ControlSample;
use crate::domain::models::state::State;

/// Why a scenario run stopped before the end of its horizon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "detail")]
pub enum FailureReason {
    /// The controller produced NaN or ±∞.
    NonFiniteControl,
    /// A state component exceeded the divergence threshold.
    StateDivergence { max_abs: f64 },
    /// A pendulum angle left the recoverable region.
    AngleLimit { angle: f64 },
    /// The plant reported an integration failure.
    PlantFailure(String),
    /// The controller reported an error.
    ControllerFailure(String),
    /// The candidate exceeded its wall-clock budget.
    Timeout,
}

/// Where and why a run failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationFailure {
    /// Index of the step at which the run stopped.
    pub step: usize,
    /// `step·dt`.
    pub time: f64,
    pub reason: FailureReason,
}

/// Derived performance metrics of one run.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SimulationMetrics {
    /// First time after which both angles stay inside the settling band.
    /// `None` if the run ends outside the band.
    pub settling_time: Option<f64>,
    /// Largest absolute pendulum angle in the run (rad).
    pub max_overshoot: f64,
    /// `∫u² dt`.
    pub control_energy: f64,
    /// RMS of the sliding surface value.
    pub rms_surface: f64,
}

/// Trajectories of one scenario run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    /// Name of the scenario that was run.
    pub scenario: String,
    pub dt: f64,
    /// States at `t = 0, dt, 2dt, ...`; one more entry than `controls`.
    pub states: Vec<State>,
    /// Applied force per step.
    pub controls: Vec<f64>,
    /// Sliding surface value per step.
    pub surfaces: Vec<f64>,
    pub metrics: SimulationMetrics,
    pub failure: Option<SimulationFailure>,
    /// The last controller samples, bounded by the evaluator's history
    /// capacity. Empty when retention is disabled.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<ControlSample>,
}

impl SimulationResult {
    pub fn is_failed(&self) -> bool {
        self.failure.is_some()
    }

    /// Simulated time actually covered.
    pub fn duration(&self) -> f64 {
        self.controls.len() as f64 * self.dt
    }

    /// Recompute `metrics` from the stored trajectories.
    ///
    /// The settling band is `settling_fraction` of the largest initial angle,
    /// floored at 1 mrad.
    pub fn compute_metrics(&mut self, settling_fraction: f64) {
        self.metrics = compute_metrics(
            &self.states,
            &self.controls,
            &self.surfaces,
            self.dt,
            settling_fraction,
        );
    }
}

fn compute_metrics(
    states: &[State],
    controls: &[f64],
    surfaces: &[f64],
    dt: f64,
    settling_fraction: f64,
) -> SimulationMetrics {
    let Some(first) = states.first() else {
        return SimulationMetrics::default();
    };
    let initial = first.theta1().abs().max(first.theta2().abs());
    let band = (settling_fraction * initial).max(1e-3);

    let angle_mag = |s: &State| s.theta1().abs().max(s.theta2().abs());
    let max_overshoot = states.iter().map(angle_mag).fold(0.0_f64, f64::max);

    let settling_time = match states.iter().rposition(|s| angle_mag(s) > band) {
        None => Some(0.0),
        Some(last) if last + 1 < states.len() => Some((last + 1) as f64 * dt),
        Some(_) => None,
    };

    let control_energy = controls.iter().map(|u| u * u).sum::<f64>() * dt;
    let rms_surface = if surfaces.is_empty() {
        0.0
    } else {
        (surfaces.iter().map(|s| s * s).sum::<f64>() / surfaces.len() as f64).sqrt()
    };

    SimulationMetrics {
        settling_time,
        max_overshoot,
        control_energy,
        rms_surface,
    }
}
