//! Infrastructure layer module
//!
//! Concrete adapters behind the domain ports and the process-level plumbing:
//! - Configuration loading (figment: defaults, YAML file, environment)
//! - Logging setup (tracing-subscriber, tracing-appender)
//! - The cart double-pendulum plant and dynamics model

pub mod config;
pub mod logging;
pub mod plant;
