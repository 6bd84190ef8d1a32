//! Controller construction from a kind tag, settings and a gain vector.

use std::sync::Arc;

use tracing::trace;

use super::{AdaptiveSmc, ClassicalSmc, HybridAdaptiveSta, SuperTwistingSmc};
use crate::domain::errors::DomainResult;
use crate::domain::models::{ControllerKind, ControllerSettings, GainVector};
use crate::domain::ports::{ControllerFactory, DynamicsModel, SlidingModeController};

/// Builds controllers of one kind.
///
/// Gain vectors are checked against the configured bounds before
/// construction, so an out-of-bounds candidate fails here rather than
/// producing a controller the optimizer never meant to try.
#[derive(Clone)]
pub struct ControllerBuilder {
    kind: ControllerKind,
    settings: ControllerSettings,
    model: Option<Arc<dyn DynamicsModel>>,
}

impl ControllerBuilder {
    /// Builder without a dynamics model; equivalent control is off.
    pub fn new(kind: ControllerKind, settings: ControllerSettings) -> Self {
        Self {
            kind,
            settings,
            model: None,
        }
    }

    /// Attach the nominal dynamics model used for equivalent control and
    /// model-based surface derivatives.
    pub fn with_model(mut self, model: Arc<dyn DynamicsModel>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn kind(&self) -> ControllerKind {
        self.kind
    }

    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    /// Check `gains` against the kind and bounds, then construct.
    pub fn build(&self, gains: &GainVector) -> DomainResult<Box<dyn SlidingModeController>> {
        gains.expect_len(self.kind)?;
        self.settings.bounds.check(gains.as_slice())?;
        trace!(kind = %self.kind, gains = ?gains.as_slice(), "building controller");

        let gains = gains.clone();
        let model = self.model.clone();
        Ok(match self.kind {
            ControllerKind::Classical => Box::new(ClassicalSmc::new(gains, &self.settings, model)?),
            ControllerKind::SuperTwisting => {
                Box::new(SuperTwistingSmc::new(gains, &self.settings, model)?)
            }
            ControllerKind::Adaptive => Box::new(AdaptiveSmc::new(gains, &self.settings)?),
            ControllerKind::Hybrid => {
                Box::new(HybridAdaptiveSta::new(gains, &self.settings, model)?)
            }
        })
    }
}

impl ControllerFactory for ControllerBuilder {
    fn create(&self, gains: &GainVector) -> DomainResult<Box<dyn SlidingModeController>> {
        self.build(gains)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::DomainError;
    use crate::infrastructure::plant::DoublePendulum;

    #[test]
    fn test_builds_every_kind_from_reference_gains() {
        for kind in ControllerKind::ALL {
            let builder = ControllerBuilder::new(kind, ControllerSettings::for_kind(kind))
                .with_model(Arc::new(DoublePendulum::default()));
            let controller = builder.build(&kind.reference_gains()).unwrap();
            assert_eq!(controller.kind(), kind);
            assert_eq!(controller.n_gains(), kind.n_gains());
        }
    }

    #[test]
    fn test_out_of_bounds_gains_rejected() {
        let kind = ControllerKind::Classical;
        let builder = ControllerBuilder::new(kind, ControllerSettings::for_kind(kind));
        let mut gains = kind.reference_gains().into_inner();
        gains[4] = 1e6;
        assert!(matches!(
            builder.build(&GainVector::new(gains)).err(),
            Some(DomainError::GainOutOfBounds { index: 4, .. })
        ));
    }

    #[test]
    fn test_wrong_length_rejected_before_bounds() {
        let kind = ControllerKind::Hybrid;
        let builder = ControllerBuilder::new(kind, ControllerSettings::for_kind(kind));
        assert!(matches!(
            builder.create(&GainVector::new(vec![1.0; 6])).err(),
            Some(DomainError::InvalidGainLength { expected: 4, actual: 6, .. })
        ));
    }
}
