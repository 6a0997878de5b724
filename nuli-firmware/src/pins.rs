//! Dynamic pin allocation for config-driven hardware setup
//!
//! GPIO numbers come from `pump.toml`, so pins are handed out by number at
//! run time. GPIO26-29 are kept back for the ADC.

use embassy_rp::gpio::{AnyPin, Input, Level, Output, Pull};
use embassy_rp::Peri;

use nuli_core::config::PinConfig;

/// GPIOs available for digital I/O
pub const GPIO_COUNT: usize = 26;

/// Error when requesting a pin
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum PinError {
    /// Pin number out of range or reserved for the ADC
    InvalidPin(u8),
    /// Pin already handed out
    AlreadyTaken(u8),
}

/// Pin bank that holds the GPIOs and allows taking them by number
pub struct PinBank {
    pins: [Option<Peri<'static, AnyPin>>; GPIO_COUNT],
}

impl PinBank {
    pub fn new(pins: [Peri<'static, AnyPin>; GPIO_COUNT]) -> Self {
        Self {
            pins: pins.map(Some),
        }
    }

    /// Take a pin by number
    pub fn take(&mut self, pin: u8) -> Result<Peri<'static, AnyPin>, PinError> {
        self.pins
            .get_mut(pin as usize)
            .ok_or(PinError::InvalidPin(pin))?
            .take()
            .ok_or(PinError::AlreadyTaken(pin))
    }

    /// Output for a configured pin, starting at its inactive level
    pub fn output(&mut self, config: &PinConfig) -> Result<Output<'static>, PinError> {
        let pin = self.take(config.pin)?;
        Ok(Output::new(pin, Level::from(config.level_for(false))))
    }

    /// Input for a configured pin with its pull-up setting
    pub fn input(&mut self, config: &PinConfig) -> Result<Input<'static>, PinError> {
        let pin = self.take(config.pin)?;
        let pull = if config.pull_up { Pull::Up } else { Pull::None };
        Ok(Input::new(pin, pull))
    }

    /// Output for an optional pin; unassigned and failed pins give `None`
    pub fn optional_output(&mut self, config: Option<PinConfig>) -> Option<Output<'static>> {
        let config = config?;
        match self.output(&config) {
            Ok(output) => Some(output),
            Err(e) => {
                defmt::error!("Pin unavailable: {}", e);
                None
            }
        }
    }
}
