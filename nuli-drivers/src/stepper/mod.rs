//! Stepper output stages

pub mod step_dir;

pub use step_dir::StepDirActuator;
