//! Step/dir/enable stepper stage
//!
//! Works with any discrete driver (A4988, DRV8825, TMC2209 in standalone
//! mode). Each pin has its own active level from the configuration.

use core::convert::Infallible;

use embedded_hal::digital::OutputPin;
use nuli_core::config::{ActuatorHwConfig, PinConfig};
use nuli_core::traits::{Actuator, Direction};

/// A driver pin and its active level
struct Line<P> {
    pin: P,
    config: PinConfig,
}

impl<P: OutputPin<Error = Infallible>> Line<P> {
    fn drive(&mut self, active: bool) {
        let _ = self.pin.set_state(self.config.level_for(active).into());
    }
}

/// Step/dir actuator over GPIO outputs
pub struct StepDirActuator<P> {
    step: Line<P>,
    dir: Line<P>,
    enable: Option<Line<P>>,
    direction: Direction,
    enabled: bool,
}

impl<P: OutputPin<Error = Infallible>> StepDirActuator<P> {
    /// Wrap the pins; outputs start with step low and the driver disabled
    ///
    /// The dir pin is active while moving in reverse.
    pub fn new(
        step: P,
        step_config: PinConfig,
        dir: P,
        dir_config: PinConfig,
        enable: Option<(P, PinConfig)>,
    ) -> Self {
        let mut actuator = Self {
            step: Line {
                pin: step,
                config: step_config,
            },
            dir: Line {
                pin: dir,
                config: dir_config,
            },
            enable: enable.map(|(pin, config)| Line { pin, config }),
            direction: Direction::Forward,
            enabled: false,
        };
        actuator.step.drive(false);
        actuator.dir.drive(false);
        actuator.enable(false);
        actuator
    }

    /// Build from an actuator's configuration
    ///
    /// Returns `None` when the step or dir pin is unassigned (or not
    /// supplied). `enable` is only used when an enable pin is configured.
    pub fn from_config(
        config: &ActuatorHwConfig,
        step: Option<P>,
        dir: Option<P>,
        enable: Option<P>,
    ) -> Option<Self> {
        let step_config = config.step_pin?;
        let dir_config = config.dir_pin?;
        let enable = config.enable_pin.zip(enable).map(|(cfg, pin)| (pin, cfg));
        Some(Self::new(step?, step_config, dir?, dir_config, enable))
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl<P: OutputPin<Error = Infallible>> Actuator for StepDirActuator<P> {
    fn step(&mut self) {
        self.step.drive(true);
    }

    fn unstep(&mut self) {
        self.step.drive(false);
    }

    fn set_direction(&mut self, direction: Direction) {
        self.direction = direction;
        self.dir.drive(direction == Direction::Reverse);
    }

    fn enable(&mut self, enabled: bool) {
        self.enabled = enabled;
        if let Some(line) = self.enable.as_mut() {
            line.drive(enabled);
        }
    }
}
