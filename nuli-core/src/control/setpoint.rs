//! Slow control loop
//!
//! Runs at about 20 Hz, outside interrupt context. Each update reads the
//! analog inputs, commits `flux_hat` and the heater delay through the
//! shared command words, and optionally records a diagnostic sample.

use heapless::Vec;

use super::diagnostics::{DiagnosticLog, DiagnosticRecord};
use super::feedback::{compute_delay, FeedbackGains, FeedbackInputs};
use super::thermistor::Thermistor;
use crate::command::{SharedState, MAX_DELAY_US};
use crate::config::{FlowPotConfig, MachineConfig, SetpointPotConfig, MAX_THERMISTORS};
use crate::fixed::Fixed32;
use crate::traits::AnalogInput;

/// Records kept between two drains
pub const DIAGNOSTIC_CAPACITY: usize = 16;

struct Channel {
    input: u8,
    thermistor: Thermistor,
    /// Last good reading
    last: Option<f32>,
}

/// Flow and heater set point controller
pub struct SetpointController<'a> {
    shared: &'a SharedState,
    flow_pot: FlowPotConfig,
    setpoint_pot: Option<SetpointPotConfig>,
    channels: Vec<Channel, MAX_THERMISTORS>,
    gains: FeedbackGains,
    /// `QVmax`
    v_max: Fixed32,
    /// `QVDELTA`
    nudge_step: Fixed32,
    flux: i32,
    flow_override: Option<i32>,
    heater_override: Option<u32>,
    target_temp: f32,
    max_temp: f32,
    /// Heater may run at all (heater configuration is valid)
    heater_available: bool,
    /// Operator heat request
    heating: bool,
    /// Over-temperature latch
    fault: bool,
    samples: u32,
    logging: bool,
    diagnostics: DiagnosticLog<DIAGNOSTIC_CAPACITY>,
}

impl<'a> SetpointController<'a> {
    /// Build the controller from the start-up configuration
    ///
    /// `heater_available` is false when the heater section failed
    /// validation; the heater then stays disabled whatever is requested.
    pub fn new(shared: &'a SharedState, config: &MachineConfig, heater_available: bool) -> Self {
        let channels = config
            .thermistors
            .iter()
            .map(|t| Channel {
                input: t.channel,
                thermistor: Thermistor::new(t),
                last: None,
            })
            .collect();
        let frequency = config.stepping.frequency_hz;

        Self {
            shared,
            flow_pot: config.flow_pot,
            setpoint_pot: config.setpoint_pot,
            channels,
            gains: FeedbackGains::from(&config.heater),
            v_max: config.limits().v_max,
            nudge_step: Fixed32::from_rate(config.pump.nudge_rate, frequency),
            flux: 0,
            flow_override: None,
            heater_override: None,
            target_temp: config.heater.target_temp,
            max_temp: config.heater.max_temp,
            heater_available,
            heating: heater_available && config.heater.enabled,
            fault: false,
            samples: 0,
            logging: config.heater.logging,
            diagnostics: DiagnosticLog::new(),
        }
    }

    /// One slow-loop iteration
    pub fn update<A: AnalogInput>(&mut self, adc: &mut A, timestamp_ms: u64) {
        self.samples = self.samples.wrapping_add(1);
        self.update_flow(adc);
        self.update_temperatures(adc);
        self.update_setpoint(adc);
        self.update_heater();
        if self.logging {
            self.record(timestamp_ms);
        }
    }

    fn update_flow<A: AnalogInput>(&mut self, adc: &mut A) {
        if let Some(speed) = self.flow_override {
            self.flux = speed;
        } else if let Ok(ratio) = adc.ratio(self.flow_pot.channel) {
            let fraction = self.flow_pot.divider.fraction(ratio) * self.flow_pot.derate;
            let v_max = self.v_max.raw() as f32;
            self.flux = (fraction * v_max).clamp(0.0, v_max) as i32;
        }
        // A failed read keeps the previous flow
        self.shared.flow.set_flux(self.flux);
    }

    fn update_temperatures<A: AnalogInput>(&mut self, adc: &mut A) {
        for channel in self.channels.iter_mut() {
            let reading = adc
                .ratio(channel.input)
                .and_then(|ratio| channel.thermistor.convert(ratio));
            if let Ok(celsius) = reading {
                channel.last = Some(celsius);
            }
        }
    }

    fn update_setpoint<A: AnalogInput>(&mut self, adc: &mut A) {
        let Some(pot) = self.setpoint_pot else {
            return;
        };
        if let Ok(ratio) = adc.ratio(pot.channel) {
            let fraction = pot.divider.fraction(ratio);
            self.target_temp = pot.min_temp + fraction * (pot.max_temp - pot.min_temp);
        }
    }

    fn update_heater(&mut self) {
        let primary = self.temperature(0);
        if primary.is_some_and(|t| t > self.max_temp) {
            self.fault = true;
        }

        let heater = &self.shared.heater;
        if !(self.heating && !self.fault) {
            heater.enable(false);
            return;
        }

        let delay = match (self.heater_override, primary) {
            (Some(delay), _) => delay,
            (None, Some(primary)) => compute_delay(
                &FeedbackInputs {
                    setpoint: self.target_temp,
                    primary,
                    secondary: self.temperature(1),
                    flow_fraction: self.flow_fraction(),
                },
                &self.gains,
            ),
            // No feedback yet
            (None, None) => {
                heater.set_delay_us(MAX_DELAY_US);
                heater.enable(false);
                return;
            }
        };
        heater.set_delay_us(delay);
        heater.enable(true);
    }

    fn record(&mut self, timestamp_ms: u64) {
        let telemetry = &self.shared.telemetry;
        let temperatures = self.channels.iter().map(|c| c.last).collect();
        let positions = (0..telemetry.count())
            .filter_map(|i| telemetry.position(i))
            .collect();
        self.diagnostics.push(DiagnosticRecord {
            count: self.samples,
            speed: self.flux,
            delay_us: self.shared.heater.delay_us(),
            temperatures,
            positions,
            timestamp_ms,
        });
    }

    /// Use `speed` (raw Q16.16) as `flux_hat` instead of the flow pot
    ///
    /// Stays in force until replaced or cleared with `None`.
    pub fn set_flow_override(&mut self, speed: Option<i32>) {
        self.flow_override = speed;
    }

    /// Use `delay_us` instead of the feedback law
    pub fn set_heater_override(&mut self, delay_us: Option<u32>) {
        self.heater_override = delay_us;
    }

    /// Adjust the flow by `QVDELTA` per detent, clamped to `[0, QVmax]`
    ///
    /// Starts from the current flow and leaves the result as the override.
    pub fn nudge_flow(&mut self, detents: i32) -> i32 {
        let base = self.flow_override.unwrap_or(self.flux) as i64;
        let delta = detents as i64 * self.nudge_step.raw() as i64;
        let speed = (base + delta).clamp(0, self.v_max.raw() as i64) as i32;
        self.flow_override = Some(speed);
        speed
    }

    /// Operator heat request; returns whether heating is now requested
    pub fn set_heating(&mut self, on: bool) -> bool {
        self.heating = on && self.heater_available;
        self.heating
    }

    pub fn set_target_temp(&mut self, celsius: f32) {
        if celsius.is_finite() {
            self.target_temp = celsius;
        }
    }

    /// Release the over-temperature latch
    pub fn clear_fault(&mut self) {
        self.fault = false;
    }

    pub fn set_diagnostics(&mut self, on: bool) {
        self.logging = on;
    }

    /// Buffered diagnostic records
    pub fn diagnostics(&mut self) -> &mut DiagnosticLog<DIAGNOSTIC_CAPACITY> {
        &mut self.diagnostics
    }

    /// Last committed `flux_hat`
    pub fn flux(&self) -> i32 {
        self.flux
    }

    /// Committed flow as a fraction of `QVmax`
    pub fn flow_fraction(&self) -> f32 {
        if self.v_max.is_zero() {
            return 0.0;
        }
        (self.flux as f32 / self.v_max.raw() as f32).clamp(0.0, 1.0)
    }

    /// Last good temperature of a thermistor channel
    pub fn temperature(&self, index: usize) -> Option<f32> {
        self.channels.get(index).and_then(|c| c.last)
    }

    pub fn target_temp(&self) -> f32 {
        self.target_temp
    }

    pub fn is_heating(&self) -> bool {
        self.heating
    }

    pub fn is_faulted(&self) -> bool {
        self.fault
    }

    pub fn samples(&self) -> u32 {
        self.samples
    }
}
