//! Beta-equation thermistor conversion
//!
//! Circuit: VCC -- pullup -- ADC_PIN -- NTC -- GND

use crate::config::ThermistorConfig;
use crate::traits::SensorError;

const KELVIN_OFFSET: f32 = 273.15;

/// One thermistor channel's conversion parameters
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Thermistor {
    /// Reference temperature in kelvin
    t0_k: f32,
    /// Resistance at the reference temperature (ohms)
    tr: f32,
    beta: f32,
    pullup: f32,
}

impl Thermistor {
    pub fn new(config: &ThermistorConfig) -> Self {
        Self {
            t0_k: config.t0 + KELVIN_OFFSET,
            tr: config.tr,
            beta: config.beta,
            pullup: config.pullup,
        }
    }

    /// Thermistor resistance for an ADC ratio
    ///
    /// R = pullup * ratio / (1 - ratio). Only positive, finite results are
    /// physical; anything else is reported instead of returned.
    pub fn resistance(&self, ratio: f32) -> Result<f32, SensorError> {
        let resistance = self.pullup * ratio / (1.0 - ratio);
        if resistance.is_finite() && resistance > 0.0 {
            Ok(resistance)
        } else {
            Err(SensorError::InvalidResistance)
        }
    }

    /// Temperature in °C for a resistance in ohms
    ///
    /// 1/T = 1/T0 + ln(R/TR)/beta
    pub fn temperature(&self, resistance: f32) -> Result<f32, SensorError> {
        if !(resistance.is_finite() && resistance > 0.0) {
            return Err(SensorError::InvalidResistance);
        }
        let inv_t = 1.0 / self.t0_k + libm::logf(resistance / self.tr) / self.beta;
        let celsius = 1.0 / inv_t - KELVIN_OFFSET;
        if celsius.is_finite() {
            Ok(celsius)
        } else {
            Err(SensorError::InvalidResistance)
        }
    }

    /// Ratio straight to °C
    pub fn convert(&self, ratio: f32) -> Result<f32, SensorError> {
        self.resistance(ratio).and_then(|r| self.temperature(r))
    }
}
