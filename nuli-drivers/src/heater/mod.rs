//! Heater gate outputs

pub mod gate;

pub use gate::GpioGate;
