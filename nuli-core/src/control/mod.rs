//! Slow control loop: analog inputs to flow and heater commands
//!
//! Floating point is confined to this module; nothing here runs in the
//! step tick.

pub mod diagnostics;
pub mod divider;
pub mod feedback;
pub mod setpoint;
pub mod thermistor;

pub use diagnostics::{DiagnosticLog, DiagnosticRecord};
pub use divider::DividerModel;
pub use feedback::{compute_delay, requested_power, FeedbackGains, FeedbackInputs};
pub use setpoint::{SetpointController, DIAGNOSTIC_CAPACITY};
pub use thermistor::Thermistor;
