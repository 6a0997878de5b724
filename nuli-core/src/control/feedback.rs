//! Heater feedback law
//!
//! Requested power blends the set point error with a flow-coupled term
//! proportional to the temperature rise across the heated section. The
//! power fraction is mapped to a phase delay through an inverse square
//! root, since the power delivered past delay `d` in a half cycle grows
//! roughly with the square of the conducting share.

use crate::command::{MAX_DELAY_US, MIN_DELAY_US};
use crate::config::HeaterControlConfig;

/// Calibration constants of the feedback law
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FeedbackGains {
    pub k_error: f32,
    pub k_coupling: f32,
    pub full_power: f32,
    pub half_cycle_us: f32,
}

impl From<&HeaterControlConfig> for FeedbackGains {
    fn from(config: &HeaterControlConfig) -> Self {
        Self {
            k_error: config.k_error,
            k_coupling: config.k_coupling,
            full_power: config.full_power,
            half_cycle_us: config.half_cycle_us,
        }
    }
}

impl Default for FeedbackGains {
    fn default() -> Self {
        Self::from(&HeaterControlConfig::default())
    }
}

/// One evaluation's measurements
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FeedbackInputs {
    /// Desired primary temperature (°C)
    pub setpoint: f32,
    /// Measured primary temperature (°C)
    pub primary: f32,
    /// Measured coupling channel (°C), if fitted
    pub secondary: Option<f32>,
    /// Current flow as a fraction of `QVmax`
    pub flow_fraction: f32,
}

/// Requested power in calibration units
pub fn requested_power(inputs: &FeedbackInputs, gains: &FeedbackGains) -> f32 {
    let error = inputs.setpoint - inputs.primary;
    let coupling = match inputs.secondary {
        Some(secondary) => inputs.flow_fraction * (inputs.primary - secondary),
        None => 0.0,
    };
    gains.k_error * error + gains.k_coupling * coupling
}

/// Phase delay in microseconds, always within `[MIN_DELAY_US, MAX_DELAY_US]`
pub fn compute_delay(inputs: &FeedbackInputs, gains: &FeedbackGains) -> u32 {
    let power = requested_power(inputs, gains);
    let fraction = power / gains.full_power;
    // NaN from any input or a zero full_power means no power
    let fraction = if fraction.is_finite() {
        fraction.clamp(0.0, 1.0)
    } else if fraction == f32::INFINITY {
        1.0
    } else {
        0.0
    };

    let delay = gains.half_cycle_us * (1.0 - libm::sqrtf(fraction));
    if !delay.is_finite() {
        return MAX_DELAY_US;
    }
    // `as` saturates, the clamp does the rest
    (delay as u32).clamp(MIN_DELAY_US, MAX_DELAY_US)
}
