//! Sliding-mode control building blocks.
//!
//! These are the leaf components composed by every controller variant:
//! surface → switching → (adaptation ← uncertainty estimation).

pub mod adaptation;
pub mod history;
pub mod surface;
pub mod switching;
pub mod uncertainty;

pub use adaptation::{AdaptationConfig, AdaptationLaw, AdaptationRecord};
pub use history::{ControlHistory, ControlSample, HybridMode};
pub use surface::SlidingSurface;
pub use switching::{sign, SwitchingFunction};
pub use uncertainty::{ConfidenceInterval, UncertaintyConfig, UncertaintyEstimator};
