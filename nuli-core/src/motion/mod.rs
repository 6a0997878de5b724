//! Plunger motion
//!
//! Per-actuator velocity integration and step timing.

pub mod motor;

pub use motor::{FixedPointMotor, MotionLimits};
