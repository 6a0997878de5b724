//! AC heater phase control

pub mod phase;

pub use phase::{HeaterState, PhaseHeaterDriver};
