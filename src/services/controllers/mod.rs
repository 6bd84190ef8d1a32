//! Sliding-mode control laws.
//!
//! Every variant implements [`SlidingModeController`] and is selected once,
//! at factory-call time, through [`ControllerBuilder`]. The pieces shared by
//! the variants live here: the model-based equivalent control, output
//! saturation and the non-finite guards.
//!
//! | Variant | Gains | Surface derivative |
//! |---------|-------|--------------------|
//! | Classical | `[k1, k2, λ1, λ2, K, kd]` | not used |
//! | Super-Twisting | `[K1, K2, k1, k2, λ1, λ2]` | not used |
//! | Adaptive | `[k1, k2, λ1, λ2, γ]` | finite difference |
//! | Hybrid | `[c1, λ1, c2, λ2]` | model-based, finite difference without a model |

pub mod adaptive;
pub mod classical;
pub mod factory;
pub mod hybrid;
pub mod super_twisting;

use std::sync::Arc;

use crate::domain::errors::ControlError;
use crate::domain::models::control::SlidingSurface;
use crate::domain::models::State;
use crate::domain::ports::{ControlOutput, DynamicsModel, InternalState};

pub use adaptive::AdaptiveSmc;
pub use classical::ClassicalSmc;
pub use factory::ControllerBuilder;
pub use hybrid::HybridAdaptiveSta;
pub use super_twisting::{validate_sta_gains, StaFeasibility, SuperTwistingSmc};

/// Equivalent control term and the controllability scalar it was divided by.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EquivalentTerm {
    /// `u_eq`, or zero when the term is dropped.
    pub force: f64,
    /// `L·M⁻¹·B`. `None` when no model is available or `M` is singular.
    pub controllability: Option<f64>,
}

impl EquivalentTerm {
    const NONE: Self = Self {
        force: 0.0,
        controllability: None,
    };
}

/// Model-based equivalent control `u_eq = (L M⁻¹ B)⁻¹ (L M⁻¹ h − Λ q̇)`.
///
/// The force that keeps `ṡ = 0` under the nominal model. The term is dropped
/// (zero) when `|L M⁻¹ B|` falls below `threshold`, where dividing by it
/// would amplify model error without bound.
#[derive(Clone)]
pub struct EquivalentControl {
    model: Option<Arc<dyn DynamicsModel>>,
    threshold: f64,
}

impl EquivalentControl {
    /// Equivalent control over `model`, dropped below `threshold`.
    pub fn new(model: Option<Arc<dyn DynamicsModel>>, threshold: f64) -> Self {
        Self { model, threshold }
    }

    /// Equivalent control that always returns zero.
    pub fn disabled() -> Self {
        Self::new(None, 0.0)
    }

    pub fn is_enabled(&self) -> bool {
        self.model.is_some()
    }

    /// Evaluate `u_eq` for `state`.
    pub fn compute(&self, surface: &SlidingSurface, state: &State) -> EquivalentTerm {
        let Some(model) = &self.model else {
            return EquivalentTerm::NONE;
        };
        let lu = model.mass_matrix(state).lu();
        let (Some(m_inv_b), Some(m_inv_h)) = (
            lu.solve(&model.input_vector()),
            lu.solve(&model.bias_forces(state)),
        ) else {
            return EquivalentTerm::NONE;
        };

        let l = surface.velocity_weights();
        let lambda = surface.position_weights();
        let q_dot = state.velocities();
        let dot = |w: &[f64; 3], v: &[f64]| w[0] * v[0] + w[1] * v[1] + w[2] * v[2];

        let controllability = dot(&l, m_inv_b.as_slice());
        if !controllability.is_finite() || controllability.abs() < self.threshold {
            return EquivalentTerm {
                force: 0.0,
                controllability: Some(controllability),
            };
        }
        let force = (dot(&l, m_inv_h.as_slice()) - dot(&lambda, &q_dot)) / controllability;
        EquivalentTerm {
            force: if force.is_finite() { force } else { 0.0 },
            controllability: Some(controllability),
        }
    }

    /// Model-based `ṡ = Λ q̇ + L M⁻¹ (B u − h)` for the force `control`.
    pub fn surface_derivative(
        &self,
        surface: &SlidingSurface,
        state: &State,
        control: f64,
    ) -> Option<f64> {
        let model = self.model.as_ref()?;
        let qdd = model.accelerations(state, control)?;
        Some(surface.derivative(state, &[qdd[0], qdd[1], qdd[2]]))
    }
}

/// Reject states with NaN or infinite components before any arithmetic.
pub(crate) fn check_state(state: &State) -> Result<(), ControlError> {
    match state.first_non_finite() {
        Some((index, value)) => Err(ControlError::NonFiniteState { index, value }),
        None => Ok(()),
    }
}

/// Saturate to `[-max_force, max_force]`, failing on a non-finite force.
pub(crate) fn saturate(
    unsaturated: f64,
    surface: f64,
    max_force: f64,
    internal: InternalState,
) -> Result<ControlOutput, ControlError> {
    if !unsaturated.is_finite() {
        return Err(ControlError::NonFiniteControl {
            value: unsaturated,
            surface,
        });
    }
    Ok(ControlOutput {
        force: unsaturated.clamp(-max_force, max_force),
        unsaturated,
        surface,
        internal,
    })
}
