//! Domain errors for the smc-tune controller tuning system.
//!
//! Errors are split by where they surface:
//!
//! - [`DomainError`] -- configuration errors. Raised at construction time and
//!   never silently corrected.
//! - [`ControlError`] -- a single control step could not produce a usable force.
//! - [`PlantError`] -- the plant collaborator failed to advance the state.
//! - [`OptimizationError`] -- the optimization run as a whole could not produce
//!   a meaningful result.
//!
//! Control and plant errors are caught at the scenario level by the fitness
//! evaluator and converted into penalty costs; they never abort a batch.

use thiserror::Error;

use crate::domain::models::ControllerKind;

/// Configuration-level errors that can occur while building domain objects.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DomainError {
    #[error("Invalid gain vector length for {kind}: expected {expected}, got {actual}")]
    InvalidGainLength {
        kind: ControllerKind,
        expected: usize,
        actual: usize,
    },

    #[error("Gain {index} = {value} is outside [{lower}, {upper}]")]
    GainOutOfBounds {
        index: usize,
        value: f64,
        lower: f64,
        upper: f64,
    },

    #[error("Invalid bounds at index {index}: lower {lower} must be <= upper {upper}")]
    InvalidBounds { index: usize, lower: f64, upper: f64 },

    #[error("Parameter '{name}' must be positive, got {value}")]
    NonPositiveParameter { name: String, value: f64 },

    #[error("Boundary layer width must be positive for {switching} switching, got {value}")]
    InvalidBoundaryLayer { switching: String, value: f64 },

    #[error("State dimension mismatch: expected {expected}, got {actual}")]
    StateDimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid scenario '{name}': {reason}")]
    InvalidScenario { name: String, reason: String },

    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}

/// Result alias for configuration and construction errors.
pub type DomainResult<T> = Result<T, DomainError>;

/// Errors produced by a single control-law evaluation.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ControlError {
    #[error("Non-finite control output {value} at surface value {surface}")]
    NonFiniteControl { value: f64, surface: f64 },

    #[error("Non-finite state component {index} = {value}")]
    NonFiniteState { index: usize, value: f64 },

    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// Errors reported by the plant collaborator.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PlantError {
    #[error("Plant produced a non-finite state component {index} = {value}")]
    NonFiniteState { index: usize, value: f64 },

    #[error("Mass matrix is singular at the current configuration")]
    SingularMassMatrix,

    #[error("Integration failed: {0}")]
    IntegrationFailed(String),
}

/// Errors that affect an entire optimization run.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum OptimizationError {
    #[error("All {candidates} candidates failed at iteration {iteration}")]
    AllCandidatesFailed { iteration: usize, candidates: usize },

    #[error("Invalid optimizer configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Dimension mismatch: bounds have {expected} entries, candidate has {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error(transparent)]
    Domain(#[from] DomainError),
}
