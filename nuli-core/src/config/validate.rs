//! Start-up validation
//!
//! Motion and heater items are checked separately: a bad motion item leaves
//! the plungers unregistered, a bad heater item leaves the heater disabled,
//! and the appliance still boots for manual recovery.

use super::types::{MachineConfig, MAX_ACTUATORS};
use crate::fixed::Fixed32;

/// Configuration validation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Tick frequency is zero or above 1 MHz
    InvalidFrequency,
    /// Step pulse does not end before the next tick
    PulseWidthTooLong,
    /// Top speed not in `(0, 1]` step per tick
    InvalidMaxRate,
    /// Acceleration converts to zero or exceeds top speed per tick
    InvalidAcceleration,
    /// Travel must be at least two steps
    InvalidTravel,
    /// Pump group larger than the registered actuators or `k_max_actuators`
    TooManyPumps,
    /// Forward count must be at least one and below the pump count
    InvalidForwardCount,
    /// Actuator at this index has no step or dir pin
    MissingActuatorPin(u8),
    /// Divider resistances must be positive
    InvalidDivider,
    /// Thermistor at this index has a non-physical parameter
    InvalidThermistor(u8),
    /// Zero-cross or gate pin unassigned
    MissingHeaterPin,
    /// Half cycle or full power not positive
    InvalidHeaterCalibration,
}

impl MachineConfig {
    /// Check everything the step scheduler depends on
    pub fn validate_motion(&self) -> Result<(), ConfigError> {
        let stepping = &self.stepping;
        if stepping.frequency_hz == 0 || stepping.frequency_hz > 1_000_000 {
            return Err(ConfigError::InvalidFrequency);
        }
        if stepping.pulse_width_us >= stepping.period_us() {
            return Err(ConfigError::PulseWidthTooLong);
        }

        let limits = self.limits();
        if limits.v_max <= Fixed32::ZERO || limits.v_max > Fixed32::ONE {
            return Err(ConfigError::InvalidMaxRate);
        }
        if limits.a_max <= Fixed32::ZERO || limits.a_max > limits.v_max {
            return Err(ConfigError::InvalidAcceleration);
        }
        if limits.x_max < 2 {
            return Err(ConfigError::InvalidTravel);
        }

        let pumps = self.pump.pumps as usize;
        if pumps > MAX_ACTUATORS || pumps > self.actuators.len() {
            return Err(ConfigError::TooManyPumps);
        }
        if self.pump.forward == 0 || self.pump.forward >= self.pump.pumps {
            return Err(ConfigError::InvalidForwardCount);
        }

        for (index, actuator) in self.actuators.iter().enumerate() {
            if !actuator.is_complete() {
                return Err(ConfigError::MissingActuatorPin(index as u8));
            }
        }
        Ok(())
    }

    /// Check everything the heater and the slow loop depend on
    pub fn validate_heater(&self) -> Result<(), ConfigError> {
        if !self.flow_pot.divider.is_valid()
            || self
                .setpoint_pot
                .as_ref()
                .is_some_and(|pot| !pot.divider.is_valid())
        {
            return Err(ConfigError::InvalidDivider);
        }

        for (index, thermistor) in self.thermistors.iter().enumerate() {
            let physical = thermistor.tr > 0.0
                && thermistor.beta > 0.0
                && thermistor.pullup > 0.0
                && thermistor.t0 > -273.15;
            if !physical {
                return Err(ConfigError::InvalidThermistor(index as u8));
            }
        }

        if self.heater_hw.zero_cross_pin.is_none() || self.heater_hw.gate_pin.is_none() {
            return Err(ConfigError::MissingHeaterPin);
        }
        if !(self.heater.half_cycle_us > 0.0 && self.heater.full_power > 0.0) {
            return Err(ConfigError::InvalidHeaterCalibration);
        }
        Ok(())
    }
}
