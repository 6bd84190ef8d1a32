//! Simulated plants.

pub mod double_pendulum;

pub use double_pendulum::{DoublePendulum, DoublePendulumFactory};
