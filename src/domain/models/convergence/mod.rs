//! Convergence classification domain models.

pub mod metrics;
pub mod status;

pub use metrics::*;
pub use status::*;
