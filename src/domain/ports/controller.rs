use serde::{Deserialize, Serialize};

use crate::domain::errors::{ControlError, DomainResult};
use crate::domain::models::control::{ControlHistory, HybridMode};
use crate::domain::models::{ControllerKind, GainVector, State};

/// Snapshot of a controller's internal state after a step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "variant")]
pub enum InternalState {
    /// The classical law keeps no state between steps.
    Stateless,
    SuperTwisting {
        /// Integral term `z` of the twisting law.
        integral: f64,
    },
    Adaptive {
        gain: f64,
        uncertainty: f64,
    },
    Hybrid {
        mode: HybridMode,
        gain: f64,
        integral: f64,
    },
}

/// Result of one control computation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlOutput {
    /// Force applied to the cart, saturated to `[-max_force, max_force]`.
    pub force: f64,
    /// Force before saturation.
    pub unsaturated: f64,
    /// Surface value the force was computed from.
    pub surface: f64,
    /// Variant-specific internal state after the step.
    pub internal: InternalState,
}

impl ControlOutput {
    /// Whether the actuator limit clipped the force.
    pub fn is_saturated(&self) -> bool {
        self.force != self.unsaturated
    }
}

/// Port implemented by every sliding-mode controller variant.
///
/// A controller owns all of its mutable state (adaptive gain, twisting
/// integral, uncertainty estimate). Instances are never shared between
/// concurrent evaluations; each candidate builds its own.
pub trait SlidingModeController: Send {
    /// The variant tag this controller was built from.
    fn kind(&self) -> ControllerKind;

    /// The (read-only) gain vector.
    fn gains(&self) -> &GainVector;

    /// Number of tunable gains. Used by the optimizer to size candidates.
    fn n_gains(&self) -> usize {
        self.kind().n_gains()
    }

    /// Actuator limit.
    fn max_force(&self) -> f64;

    /// Compute the control force for `state`, advancing internal state by
    /// `dt` and appending one sample to `history`.
    fn compute_control(
        &mut self,
        state: &State,
        dt: f64,
        history: &mut ControlHistory,
    ) -> Result<ControlOutput, ControlError>;

    /// Restore the state the controller had right after construction.
    fn reset(&mut self);
}

/// Builds a controller from a candidate gain vector.
///
/// The optimizer and evaluator never construct controllers directly.
pub trait ControllerFactory: Send + Sync {
    fn create(&self, gains: &GainVector) -> DomainResult<Box<dyn SlidingModeController>>;
}

impl<F> ControllerFactory for F
where
    F: Fn(&GainVector) -> DomainResult<Box<dyn SlidingModeController>> + Send + Sync,
{
    fn create(&self, gains: &GainVector) -> DomainResult<Box<dyn SlidingModeController>> {
        self(gains)
    }
}
