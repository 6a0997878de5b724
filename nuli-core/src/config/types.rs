//! Configuration type definitions
//!
//! These types represent the appliance configuration. Values are read once
//! at start-up from `pump.toml` and never reloaded.

use heapless::{String, Vec};

use super::hardware::{ActuatorHwConfig, HeaterHwConfig};
use crate::control::DividerModel;
use crate::fixed::Fixed32;
use crate::motion::MotionLimits;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Maximum label length
pub const MAX_LABEL_LEN: usize = 16;

/// Actuator slots (`k_max_actuators`)
pub const MAX_ACTUATORS: usize = 6;

/// Thermistor channels
pub const MAX_THERMISTORS: usize = 4;

/// Step tick and pulse timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SteppingConfig {
    /// Base tick frequency in Hz
    pub frequency_hz: u32,
    /// Step pulse width in microseconds
    pub pulse_width_us: u32,
}

impl SteppingConfig {
    /// Tick period in microseconds (zero for a zero frequency)
    pub fn period_us(&self) -> u32 {
        1_000_000u32.checked_div(self.frequency_hz).unwrap_or(0)
    }
}

impl Default for SteppingConfig {
    fn default() -> Self {
        Self {
            frequency_hz: 1000,
            pulse_width_us: 100,
        }
    }
}

/// Plunger motion limits in physical units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MotionConfig {
    /// Top speed in steps/s (`QVmax` once converted)
    pub max_rate: i32,
    /// Acceleration in steps/s^2 (`QAmax` once converted)
    pub acceleration: i32,
    /// Plunger travel in steps (`Xmax`)
    pub travel: i32,
    /// Manual forward speed in steps/s
    pub feed_rate: i32,
    /// Manual reverse speed in steps/s
    pub seek_rate: i32,
}

impl MotionConfig {
    /// Convert to tick-domain fixed-point limits
    pub fn limits(&self, frequency_hz: u32) -> MotionLimits {
        MotionLimits {
            v_max: Fixed32::from_rate(self.max_rate, frequency_hz),
            a_max: Fixed32::from_acceleration(self.acceleration, frequency_hz),
            x_max: self.travel,
        }
    }
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            max_rate: 500,
            acceleration: 8000,
            travel: 3200,
            feed_rate: 100,
            seek_rate: 100,
        }
    }
}

/// Rotation group layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PumpConfig {
    /// Actuators taking part in the rotation (`NUM_PUMPING`)
    pub pumps: u8,
    /// Actuators delivering at any instant (`NUM_FORWARD`)
    pub forward: u8,
    /// Flow change per encoder detent in steps/s (`QVDELTA`)
    pub nudge_rate: i32,
}

impl Default for PumpConfig {
    fn default() -> Self {
        Self {
            pumps: 3,
            forward: 1,
            nudge_rate: 10,
        }
    }
}

/// Flow potentiometer
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FlowPotConfig {
    pub channel: u8,
    pub divider: DividerModel,
    /// Fraction of `QVmax` reached at full scale
    pub derate: f32,
}

impl Default for FlowPotConfig {
    fn default() -> Self {
        Self {
            channel: 0,
            divider: DividerModel::default(),
            derate: 1.0,
        }
    }
}

/// Optional temperature set point potentiometer
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SetpointPotConfig {
    pub channel: u8,
    pub divider: DividerModel,
    /// Set point at the low end of travel (°C)
    pub min_temp: f32,
    /// Set point at the high end of travel (°C)
    pub max_temp: f32,
}

impl Default for SetpointPotConfig {
    fn default() -> Self {
        Self {
            channel: 1,
            divider: DividerModel::default(),
            min_temp: 20.0,
            max_temp: 80.0,
        }
    }
}

/// Beta-equation thermistor channel
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ThermistorConfig {
    pub name: String<MAX_LABEL_LEN>,
    pub channel: u8,
    /// Reference temperature `T0` (°C)
    pub t0: f32,
    /// Resistance at `T0` (`TR`, ohms)
    pub tr: f32,
    /// Beta constant (K)
    pub beta: f32,
    /// Divider pull-up between supply and the ADC node (ohms)
    pub pullup: f32,
}

impl Default for ThermistorConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            channel: 2,
            t0: 25.0,
            tr: 100_000.0,
            beta: 3950.0,
            pullup: 4700.0,
        }
    }
}

/// Heater feedback calibration
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HeaterControlConfig {
    /// Heat from power-on, before any operator command
    pub enabled: bool,
    /// Set point when no set point pot is fitted (°C)
    pub target_temp: f32,
    /// Primary temperature that trips the cutoff (°C)
    pub max_temp: f32,
    /// Power per °C of set point error
    pub k_error: f32,
    /// Power per °C of channel differential at full flow
    pub k_coupling: f32,
    /// Power that corresponds to full conduction
    pub full_power: f32,
    /// Mains half cycle in microseconds
    pub half_cycle_us: f32,
    /// Buffer diagnostic records
    pub logging: bool,
}

impl Default for HeaterControlConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            target_temp: 60.0,
            max_temp: 95.0,
            k_error: 50.0,
            k_coupling: 30.0,
            full_power: 1000.0,
            half_cycle_us: 8333.0,
            logging: false,
        }
    }
}

/// Complete appliance configuration
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MachineConfig {
    pub stepping: SteppingConfig,
    pub motion: MotionConfig,
    pub pump: PumpConfig,
    pub actuators: Vec<ActuatorHwConfig, MAX_ACTUATORS>,
    pub flow_pot: FlowPotConfig,
    pub setpoint_pot: Option<SetpointPotConfig>,
    pub thermistors: Vec<ThermistorConfig, MAX_THERMISTORS>,
    pub heater_hw: HeaterHwConfig,
    pub heater: HeaterControlConfig,
}

impl MachineConfig {
    /// Motion limits at the configured tick rate
    pub fn limits(&self) -> MotionLimits {
        self.motion.limits(self.stepping.frequency_hz)
    }

    /// Find an actuator by name
    pub fn find_actuator(&self, name: &str) -> Option<&ActuatorHwConfig> {
        self.actuators.iter().find(|a| a.name.as_str() == name)
    }

    /// Find a thermistor channel by name
    pub fn find_thermistor(&self, name: &str) -> Option<&ThermistorConfig> {
        self.thermistors.iter().find(|t| t.name.as_str() == name)
    }
}
