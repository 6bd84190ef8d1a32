//! Switching functions mapping a surface value to a bounded corrective term.
//!
//! Hard sign switching guarantees finite-time reaching but chatters. The
//! saturation and hyperbolic-tangent variants smooth the switch inside a
//! boundary layer of width Φ, leaving a steady-state error of order Φ.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::errors::{DomainError, DomainResult};

/// Switching function variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwitchingFunction {
    /// Discontinuous `sign(s)`; the boundary layer is ignored.
    Sign,
    /// `clip(s/Φ, -1, 1)`.
    #[default]
    Saturation,
    /// `tanh(s/Φ)`.
    Tanh,
}

impl SwitchingFunction {
    /// Evaluate the switching term in `[-1, 1]`.
    ///
    /// Fails for a non-positive (or non-finite) boundary layer on the smooth
    /// variants.
    pub fn compute(&self, surface: f64, boundary_layer: f64) -> DomainResult<f64> {
        match self {
            Self::Sign => Ok(sign(surface)),
            Self::Saturation | Self::Tanh => {
                self.check_boundary_layer(boundary_layer)?;
                Ok(self.apply(surface, boundary_layer))
            }
        }
    }

    /// Validate a boundary layer width for this variant.
    pub fn check_boundary_layer(&self, boundary_layer: f64) -> DomainResult<()> {
        match self {
            Self::Sign => Ok(()),
            Self::Saturation | Self::Tanh => {
                if boundary_layer > 0.0 && boundary_layer.is_finite() {
                    Ok(())
                } else {
                    Err(DomainError::InvalidBoundaryLayer {
                        switching: self.to_string(),
                        value: boundary_layer,
                    })
                }
            }
        }
    }

    /// Evaluate without the boundary-layer check. Callers validate Φ once at
    /// construction and use this on the hot path.
    pub(crate) fn apply(&self, surface: f64, boundary_layer: f64) -> f64 {
        match self {
            Self::Sign => sign(surface),
            Self::Saturation => (surface / boundary_layer).clamp(-1.0, 1.0),
            Self::Tanh => (surface / boundary_layer).tanh(),
        }
    }
}

impl fmt::Display for SwitchingFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Sign => "sign",
            Self::Saturation => "saturation",
            Self::Tanh => "tanh",
        })
    }
}

impl FromStr for SwitchingFunction {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sign" => Ok(Self::Sign),
            "sat" | "saturation" | "linear" => Ok(Self::Saturation),
            "tanh" | "smooth" => Ok(Self::Tanh),
            other => Err(DomainError::ValidationFailed(format!(
                "unknown switching function '{other}'"
            ))),
        }
    }
}

/// Sign with `sign(0) = 0`.
pub fn sign(value: f64) -> f64 {
    if value > 0.0 {
        1.0
    } else if value < 0.0 {
        -1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_boundary_layer_rejected_for_smooth_variants() {
        for f in [SwitchingFunction::Saturation, SwitchingFunction::Tanh] {
            assert!(matches!(
                f.compute(0.5, 0.0),
                Err(DomainError::InvalidBoundaryLayer { .. })
            ));
        }
        assert_eq!(SwitchingFunction::Sign.compute(0.5, 0.0).unwrap(), 1.0);
    }

    #[test]
    fn test_zero_surface_maps_to_zero() {
        for f in [
            SwitchingFunction::Sign,
            SwitchingFunction::Saturation,
            SwitchingFunction::Tanh,
        ] {
            assert_eq!(f.compute(0.0, 0.1).unwrap(), 0.0);
        }
    }

    #[test]
    fn test_saturation_is_linear_inside_layer() {
        let f = SwitchingFunction::Saturation;
        assert!((f.compute(0.05, 0.1).unwrap() - 0.5).abs() < 1e-12);
        assert_eq!(f.compute(3.0, 0.1).unwrap(), 1.0);
        assert_eq!(f.compute(-3.0, 0.1).unwrap(), -1.0);
    }

    #[test]
    fn test_parse() {
        assert_eq!("tanh".parse::<SwitchingFunction>().unwrap(), SwitchingFunction::Tanh);
        assert_eq!("sat".parse::<SwitchingFunction>().unwrap(), SwitchingFunction::Saturation);
        assert!("cubic".parse::<SwitchingFunction>().is_err());
    }
}
