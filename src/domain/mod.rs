//! Domain layer for the smc-tune controller tuning system
//!
//! This module contains the control-law building blocks, the data model of
//! an optimization run, and the port traits the services are written against.

pub mod errors;
pub mod models;
pub mod ports;

// Re-export error types for convenient access
pub use errors::{ControlError, DomainError, DomainResult, OptimizationError, PlantError};
