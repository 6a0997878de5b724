//! Step scheduling
//!
//! The fixed-frequency step tick, the flow-balancing policy it runs and
//! the event hooks it raises.

pub mod balance;
pub mod hooks;
pub mod mask;
pub mod step;

pub use balance::PumpGroup;
pub use hooks::{HookError, HookTable, MotionEvent};
pub use mask::StepMask;
pub use step::{PumpState, RegisterError, StepScheduler, TimingError, MAX_HOOKS};
