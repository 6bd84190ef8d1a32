//! Controller gain vectors, their per-kind layout, and search bounds.
//!
//! Each controller kind has a fixed gain count and a closed interval for every
//! gain. A [`GainVector`] outside its [`GainBounds`] is a validation failure;
//! only the optimizer clamps positions, and only into the configured bounds.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::errors::{DomainError, DomainResult};

// ---------------------------------------------------------------------------
// ControllerKind
// ---------------------------------------------------------------------------

/// Explicit type tag used to select a controller variant at factory-call time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerKind {
    /// Equivalent control plus boundary-layer switching and derivative damping.
    Classical,
    /// Second-order super-twisting algorithm.
    SuperTwisting,
    /// Switching law with an online-adapted gain.
    Adaptive,
    /// Adaptive / super-twisting hybrid with a reduced gain set.
    Hybrid,
}

impl ControllerKind {
    /// Every kind, in gain-table order.
    pub const ALL: [Self; 4] = [
        Self::Classical,
        Self::SuperTwisting,
        Self::Adaptive,
        Self::Hybrid,
    ];

    /// Config and CLI spelling of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Classical => "classical",
            Self::SuperTwisting => "super_twisting",
            Self::Adaptive => "adaptive",
            Self::Hybrid => "hybrid",
        }
    }

    /// Number of tunable gains for this controller kind.
    pub fn n_gains(&self) -> usize {
        match self {
            Self::Classical | Self::SuperTwisting => 6,
            Self::Adaptive => 5,
            Self::Hybrid => 4,
        }
    }

    /// Names of the gains, in vector order.
    pub fn gain_names(&self) -> &'static [&'static str] {
        match self {
            Self::Classical => &["k1", "k2", "lambda1", "lambda2", "K", "kd"],
            Self::SuperTwisting => &["K1", "K2", "k1", "k2", "lambda1", "lambda2"],
            Self::Adaptive => &["k1", "k2", "lambda1", "lambda2", "gamma"],
            Self::Hybrid => &["c1", "lambda1", "c2", "lambda2"],
        }
    }

    /// Default PSO search bounds.
    pub fn default_bounds(&self) -> GainBounds {
        let (lower, upper) = match self {
            Self::Classical => (
                vec![0.5, 0.5, 1.0, 1.0, 5.0, 0.1],
                vec![30.0, 30.0, 50.0, 50.0, 150.0, 10.0],
            ),
            Self::SuperTwisting => (
                vec![2.0, 1.0, 0.5, 0.5, 1.0, 1.0],
                vec![100.0, 100.0, 30.0, 30.0, 50.0, 50.0],
            ),
            Self::Adaptive => (
                vec![0.5, 0.5, 1.0, 1.0, 0.1],
                vec![30.0, 30.0, 50.0, 50.0, 10.0],
            ),
            Self::Hybrid => (vec![0.5, 1.0, 0.5, 1.0], vec![30.0, 50.0, 30.0, 50.0]),
        };
        GainBounds { lower, upper }
    }

    /// A hand-tuned gain set that lies inside [`Self::default_bounds`] and
    /// balances the reference plant from every standard scenario.
    pub fn reference_gains(&self) -> GainVector {
        GainVector::new(match self {
            Self::Classical => vec![1.0, 3.0, 10.0, 15.0, 20.0, 2.0],
            Self::SuperTwisting => vec![25.0, 15.0, 1.0, 3.0, 10.0, 15.0],
            Self::Adaptive => vec![1.0, 3.0, 10.0, 15.0, 2.0],
            Self::Hybrid => vec![1.0, 10.0, 3.0, 5.0],
        })
    }
}

impl fmt::Display for ControllerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ControllerKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "classical" | "classical_smc" => Ok(Self::Classical),
            "super_twisting" | "sta" | "sta_smc" => Ok(Self::SuperTwisting),
            "adaptive" | "adaptive_smc" => Ok(Self::Adaptive),
            "hybrid" | "hybrid_adaptive_sta" => Ok(Self::Hybrid),
            other => Err(DomainError::ValidationFailed(format!(
                "unknown controller kind '{other}'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// GainVector
// ---------------------------------------------------------------------------

/// Ordered controller gains. Length is controller-kind specific.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GainVector(Vec<f64>);

impl GainVector {
    /// Wrap raw values. Length and bounds are checked by the consumer.
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Gain at `index`, if present.
    pub fn get(&self, index: usize) -> Option<f64> {
        self.0.get(index).copied()
    }

    pub fn into_inner(self) -> Vec<f64> {
        self.0
    }

    /// Multiply every gain by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        Self(self.0.iter().map(|g| g * factor).collect())
    }

    /// Check the length against a controller kind.
    pub fn expect_len(&self, kind: ControllerKind) -> DomainResult<()> {
        if self.0.len() == kind.n_gains() {
            Ok(())
        } else {
            Err(DomainError::InvalidGainLength {
                kind,
                expected: kind.n_gains(),
                actual: self.0.len(),
            })
        }
    }
}

impl From<Vec<f64>> for GainVector {
    fn from(values: Vec<f64>) -> Self {
        Self(values)
    }
}

impl From<&[f64]> for GainVector {
    fn from(values: &[f64]) -> Self {
        Self(values.to_vec())
    }
}

impl std::ops::Index<usize> for GainVector {
    type Output = f64;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

// ---------------------------------------------------------------------------
// GainBounds
// ---------------------------------------------------------------------------

/// Per-gain closed search intervals `lower[i] <= g[i] <= upper[i]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GainBounds {
    /// Inclusive lower bounds.
    pub lower: Vec<f64>,
    /// Inclusive upper bounds.
    pub upper: Vec<f64>,
}

impl GainBounds {
    /// Build bounds, failing fast on mismatched lengths or inverted intervals.
    pub fn new(lower: Vec<f64>, upper: Vec<f64>) -> DomainResult<Self> {
        let bounds = Self { lower, upper };
        bounds.validate()?;
        Ok(bounds)
    }

    /// Identical bounds on every dimension.
    pub fn uniform(dim: usize, lower: f64, upper: f64) -> DomainResult<Self> {
        Self::new(vec![lower; dim], vec![upper; dim])
    }

    /// Number of gains covered.
    pub fn dim(&self) -> usize {
        self.lower.len()
    }

    /// Fails on mismatched or empty vectors, non-finite values or `lower > upper`.
    pub fn validate(&self) -> DomainResult<()> {
        if self.lower.len() != self.upper.len() {
            return Err(DomainError::ValidationFailed(format!(
                "bounds length mismatch: {} lower vs {} upper",
                self.lower.len(),
                self.upper.len()
            )));
        }
        if self.lower.is_empty() {
            return Err(DomainError::ValidationFailed(
                "bounds must have at least one dimension".to_string(),
            ));
        }
        for (index, (&lower, &upper)) in self.lower.iter().zip(&self.upper).enumerate() {
            if !lower.is_finite() || !upper.is_finite() || lower > upper {
                return Err(DomainError::InvalidBounds {
                    index,
                    lower,
                    upper,
                });
            }
        }
        Ok(())
    }

    /// Width of every interval.
    pub fn ranges(&self) -> Vec<f64> {
        self.lower
            .iter()
            .zip(&self.upper)
            .map(|(l, u)| u - l)
            .collect()
    }

    /// Validate a gain vector against these bounds (no clamping).
    pub fn check(&self, gains: &[f64]) -> DomainResult<()> {
        if gains.len() != self.dim() {
            return Err(DomainError::ValidationFailed(format!(
                "gain vector has {} entries, bounds have {}",
                gains.len(),
                self.dim()
            )));
        }
        for (index, &value) in gains.iter().enumerate() {
            let (lower, upper) = (self.lower[index], self.upper[index]);
            if !value.is_finite() || value < lower || value > upper {
                return Err(DomainError::GainOutOfBounds {
                    index,
                    value,
                    lower,
                    upper,
                });
            }
        }
        Ok(())
    }

    /// Whether every component lies inside its interval.
    pub fn contains(&self, gains: &[f64]) -> bool {
        self.check(gains).is_ok()
    }

    /// Clamp a position in place. Used only by the optimizer.
    pub fn clamp_in_place(&self, position: &mut [f64]) {
        for (value, (&lower, &upper)) in position
            .iter_mut()
            .zip(self.lower.iter().zip(&self.upper))
        {
            *value = value.clamp(lower, upper);
        }
    }
}
