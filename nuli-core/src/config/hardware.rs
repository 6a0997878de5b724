//! Hardware configuration types
//!
//! Pin assignments for the plunger drivers and the heater.

use heapless::String;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::types::MAX_LABEL_LEN;

/// Pin configuration with optional inversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PinConfig {
    /// GPIO pin number (0-29 for RP2040)
    pub pin: u8,
    /// Pin is active-low (inverted)
    pub inverted: bool,
    /// Enable internal pull-up
    pub pull_up: bool,
}

impl PinConfig {
    pub const fn new(pin: u8) -> Self {
        Self {
            pin,
            inverted: false,
            pull_up: false,
        }
    }

    /// Active-low pin
    pub const fn inverted(pin: u8) -> Self {
        Self {
            pin,
            inverted: true,
            pull_up: false,
        }
    }

    /// Electrical level that represents the logical state `active`
    pub const fn level_for(&self, active: bool) -> bool {
        active != self.inverted
    }
}

/// One plunger's driver pins
///
/// Step and dir are required; a missing one leaves the whole motion
/// subsystem inert at boot.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ActuatorHwConfig {
    /// Axis name (e.g., "alpha", "beta", "gamma")
    pub name: String<MAX_LABEL_LEN>,
    pub step_pin: Option<PinConfig>,
    pub dir_pin: Option<PinConfig>,
    /// Driver enable, typically active-low
    pub enable_pin: Option<PinConfig>,
}

impl ActuatorHwConfig {
    /// Both required pins are assigned
    pub fn is_complete(&self) -> bool {
        self.step_pin.is_some() && self.dir_pin.is_some()
    }
}

/// Heater I/O
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HeaterHwConfig {
    /// Mains zero-cross detector input
    pub zero_cross_pin: Option<PinConfig>,
    /// Triac/SSR gate output
    pub gate_pin: Option<PinConfig>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_for() {
        let normal = PinConfig::new(3);
        assert!(normal.level_for(true));
        assert!(!normal.level_for(false));

        let inverted = PinConfig::inverted(4);
        assert!(!inverted.level_for(true));
        assert!(inverted.level_for(false));
    }

    #[test]
    fn test_actuator_complete() {
        let mut actuator = ActuatorHwConfig::default();
        assert!(!actuator.is_complete());
        actuator.step_pin = Some(PinConfig::new(11));
        assert!(!actuator.is_complete());
        actuator.dir_pin = Some(PinConfig::new(10));
        assert!(actuator.is_complete());
    }
}
