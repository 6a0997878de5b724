//! Hardware abstraction traits
//!
//! These traits define the seams between the control core and the
//! board-specific code: pins, timers and the ADC. The core never touches
//! a register directly.

pub mod actuator;
pub mod heater;
pub mod sensor;
pub mod timer;

pub use actuator::{Actuator, Direction};
pub use heater::GateOutput;
pub use sensor::{AnalogInput, SensorError};
pub use timer::{OneShotTimer, StepTimers};
