//! Board-agnostic core logic for the Nuli pump and heater appliance
//!
//! This crate contains all application logic that does not depend on
//! specific hardware implementations:
//!
//! - Hardware abstraction traits (actuator, heater gate, timers, ADC)
//! - Fixed-point plunger motion and the step scheduler
//! - Flow-balancing policy for the rotating pump group
//! - Zero-cross phase-cut heater driver
//! - Slow control loop (flow pot, thermistors, heater feedback)
//! - Configuration types, parser and validation

#![no_std]
#![deny(unsafe_code)]

pub mod command;
pub mod config;
pub mod context;
pub mod control;
pub mod fixed;
pub mod heater;
pub mod motion;
pub mod scheduler;
pub mod traits;

pub use command::SharedState;
pub use context::{PumpContext, PumpParts, Readiness};
pub use fixed::Fixed32;
