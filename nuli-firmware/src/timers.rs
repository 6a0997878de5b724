//! Timer adapters for the step and heater tasks
//!
//! The core only asks for a timer to be (re)armed; the owning task picks
//! the request up after the call and awaits the matching embassy timer.

use nuli_core::traits::{OneShotTimer, StepTimers};

/// Step tick period and pulse-reset requests
#[derive(Debug, Default)]
pub struct TickTimers {
    period_us: Option<u32>,
    unstep_us: Option<u32>,
}

impl TickTimers {
    pub const fn new() -> Self {
        Self {
            period_us: None,
            unstep_us: None,
        }
    }

    /// New tick period, if one was programmed since the last call
    pub fn take_period(&mut self) -> Option<u32> {
        self.period_us.take()
    }

    /// Pending pulse width, if steps were raised this tick
    pub fn take_unstep(&mut self) -> Option<u32> {
        self.unstep_us.take()
    }
}

impl StepTimers for TickTimers {
    fn set_tick_period_us(&mut self, period_us: u32) {
        self.period_us = Some(period_us);
    }

    fn arm_unstep(&mut self, width_us: u32) {
        self.unstep_us = Some(width_us);
    }
}

/// Heater delay one-shot request
#[derive(Debug, Default)]
pub struct PhaseTimer {
    delay_us: Option<u32>,
}

impl PhaseTimer {
    pub fn take(&mut self) -> Option<u32> {
        self.delay_us.take()
    }
}

impl OneShotTimer for PhaseTimer {
    fn arm(&mut self, delay_us: u32) {
        self.delay_us = Some(delay_us);
    }
}
