//! Bounded per-controller sample history.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::AdaptationRecord;

/// Sub-mode a hybrid controller was in when a sample was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HybridMode {
    Adaptive,
    SuperTwisting,
}

/// One control step as seen by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlSample {
    /// Sliding surface value `s`.
    pub surface: f64,
    /// `ṡ`, when the controller computed one.
    pub surface_derivative: Option<f64>,
    /// Applied (saturated) force.
    pub force: f64,
    /// Effective switching gain for this step.
    pub gain: f64,
    pub uncertainty: Option<f64>,
    pub mode: Option<HybridMode>,
    /// Gain adaptation performed during this step, if any.
    pub adaptation: Option<AdaptationRecord>,
}

/// Ring buffer of [`ControlSample`]s with a capacity fixed at construction.
///
/// A capacity of zero disables retention; `push` becomes a no-op.
#[derive(Debug, Clone)]
pub struct ControlHistory {
    capacity: usize,
    samples: VecDeque<ControlSample>,
}

impl ControlHistory {
    /// History that keeps the most recent `capacity` samples.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            samples: VecDeque::with_capacity(capacity),
        }
    }

    /// History that retains nothing.
    pub fn disabled() -> Self {
        Self::with_capacity(0)
    }

    /// Append a sample, evicting the oldest one when full.
    pub fn push(&mut self, sample: ControlSample) {
        if self.capacity == 0 {
            return;
        }
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn last(&self) -> Option<&ControlSample> {
        self.samples.back()
    }

    /// Samples from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &ControlSample> {
        self.samples.iter()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

impl Default for ControlHistory {
    fn default() -> Self {
        Self::disabled()
    }
}
