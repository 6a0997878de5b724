//! Embassy async tasks
//!
//! Each task owns exactly one component of the pump context and talks to
//! the others only through the shared command words.

pub mod control;
pub mod heater;
pub mod step;

pub use control::control_task;
pub use heater::heater_task;
pub use step::{log_motion_event, step_task};
