//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines the seams between the optimization core and its
//! collaborators:
//! - Plant / PlantFactory: closed-loop simulation target
//! - DynamicsModel: rigid-body model used for equivalent control
//! - SlidingModeController / ControllerFactory: control-law variants
//! - FitnessFunction: batch cost evaluation consumed by the optimizer

pub mod controller;
pub mod fitness;
pub mod plant;

pub use controller::{ControlOutput, ControllerFactory, InternalState, SlidingModeController};
pub use fitness::FitnessFunction;
pub use plant::{DynamicsModel, Plant, PlantFactory};
