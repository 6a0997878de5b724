//! Top-level pump context
//!
//! Owns the three components and hands each interrupt-level source its own
//! `&mut` part. The components only talk to each other through
//! [`SharedState`].

use crate::command::SharedState;
use crate::config::{ConfigError, MachineConfig};
use crate::control::SetpointController;
use crate::heater::PhaseHeaterDriver;
use crate::scheduler::StepScheduler;
use crate::traits::{Actuator, AnalogInput, GateOutput, OneShotTimer, StepTimers};

/// Outcome of start-up validation
///
/// A failed half leaves its subsystem inert; the other still runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Readiness {
    pub motion: Result<(), ConfigError>,
    pub heater: Result<(), ConfigError>,
}

impl Readiness {
    pub fn check(config: &MachineConfig) -> Self {
        Self {
            motion: config.validate_motion(),
            heater: config.validate_heater(),
        }
    }

    pub fn motion_ok(&self) -> bool {
        self.motion.is_ok()
    }

    pub fn heater_ok(&self) -> bool {
        self.heater.is_ok()
    }
}

/// Scheduler, heater driver and slow-loop controller
pub struct PumpContext<'a, A, T, G, H>
where
    A: Actuator,
    T: StepTimers,
    G: GateOutput,
    H: OneShotTimer,
{
    pub scheduler: StepScheduler<'a, A, T>,
    pub heater: PhaseHeaterDriver<'a, G, H>,
    pub controller: SetpointController<'a>,
    readiness: Readiness,
}

/// Disjoint mutable views of a [`PumpContext`]
pub struct PumpParts<'c, 'a, A, T, G, H>
where
    A: Actuator,
    T: StepTimers,
    G: GateOutput,
    H: OneShotTimer,
{
    pub scheduler: &'c mut StepScheduler<'a, A, T>,
    pub heater: &'c mut PhaseHeaterDriver<'a, G, H>,
    pub controller: &'c mut SetpointController<'a>,
}

impl<'a, A, T, G, H> PumpContext<'a, A, T, G, H>
where
    A: Actuator,
    T: StepTimers,
    G: GateOutput,
    H: OneShotTimer,
{
    /// Build every component from the start-up configuration
    ///
    /// Actuators are registered afterwards through [`Self::register_actuator`],
    /// and only when the motion half of the configuration validated.
    pub fn new(
        shared: &'a SharedState,
        config: &MachineConfig,
        step_timers: T,
        gate: G,
        heater_timer: H,
    ) -> Self {
        let readiness = Readiness::check(config);
        Self {
            scheduler: StepScheduler::new(shared, step_timers, config),
            heater: PhaseHeaterDriver::new(&shared.heater, gate, heater_timer),
            controller: SetpointController::new(shared, config, readiness.heater_ok()),
            readiness,
        }
    }

    pub fn readiness(&self) -> Readiness {
        self.readiness
    }

    /// Register an actuator unless motion is inert
    ///
    /// Returns the slot index, or `None` when motion failed validation or
    /// the scheduler refused the actuator.
    pub fn register_actuator(&mut self, actuator: A) -> Option<usize> {
        if !self.readiness.motion_ok() {
            return None;
        }
        self.scheduler.register_actuator(actuator).ok()
    }

    pub fn split(&mut self) -> PumpParts<'_, 'a, A, T, G, H> {
        PumpParts {
            scheduler: &mut self.scheduler,
            heater: &mut self.heater,
            controller: &mut self.controller,
        }
    }

    /// Periodic step tick
    pub fn on_step_tick(&mut self) {
        self.scheduler.tick();
    }

    /// Pulse-reset one-shot
    pub fn on_unstep(&mut self) {
        self.scheduler.unstep_tick();
    }

    /// Zero-cross rising edge
    pub fn on_zero_cross(&mut self) {
        self.heater.on_zero_cross();
    }

    /// Heater delay one-shot
    pub fn on_heater_timer(&mut self) {
        self.heater.on_timer_expired();
    }

    /// Slow control loop iteration
    pub fn on_control_tick<I: AnalogInput>(&mut self, adc: &mut I, timestamp_ms: u64) {
        self.controller.update(adc, timestamp_ms);
    }
}
