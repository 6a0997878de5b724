//! Zero-cross synchronised phase-cut heater driver
//!
//! Every mains half cycle starts at a zero crossing with the gate off. A
//! one-shot then counts down the committed phase delay and fires the gate
//! for the rest of the half cycle. A longer delay cuts more of the cycle
//! away and delivers less power.

use crate::command::HeaterCommand;
use crate::traits::{GateOutput, OneShotTimer};

/// Driver state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HeaterState {
    /// Waiting for the next zero crossing
    Idle,
    /// Delay one-shot counting toward gate assertion
    Armed,
}

/// Phase-cut heater driver
///
/// Delay and enable live in the shared [`HeaterCommand`], so the slow loop
/// can change them at any time; a new delay is only picked up at the next
/// zero crossing, never by a countdown already in flight.
pub struct PhaseHeaterDriver<'a, G: GateOutput, T: OneShotTimer> {
    command: &'a HeaterCommand,
    gate: G,
    timer: T,
    state: HeaterState,
    /// Delay the running countdown was armed with
    armed_delay_us: u32,
    zero_crossings: u32,
    firings: u32,
}

impl<'a, G: GateOutput, T: OneShotTimer> PhaseHeaterDriver<'a, G, T> {
    /// Create a driver with the gate released
    pub fn new(command: &'a HeaterCommand, mut gate: G, timer: T) -> Self {
        gate.set_on(false);
        Self {
            command,
            gate,
            timer,
            state: HeaterState::Idle,
            armed_delay_us: 0,
            zero_crossings: 0,
            firings: 0,
        }
    }

    /// Rising edge on the zero-cross input
    pub fn on_zero_cross(&mut self) {
        self.zero_crossings = self.zero_crossings.wrapping_add(1);
        self.gate.set_on(false);
        self.armed_delay_us = self.command.delay_us();
        self.timer.arm(self.armed_delay_us);
        self.state = HeaterState::Armed;
    }

    /// Delay one-shot expired
    pub fn on_timer_expired(&mut self) {
        if self.state == HeaterState::Armed && self.command.is_enabled() {
            self.gate.set_on(true);
            self.firings = self.firings.wrapping_add(1);
        }
        self.state = HeaterState::Idle;
        self.enforce_cutoff();
    }

    /// Release the gate if heating is disabled; returns whether it is off
    ///
    /// The enable flag may be cleared from another context at any point of
    /// the half cycle, so a gate that already fired has to be dropped here
    /// rather than at the next zero crossing.
    pub fn enforce_cutoff(&mut self) -> bool {
        if !self.command.is_enabled() && self.gate.is_on() {
            self.gate.set_on(false);
        }
        !self.gate.is_on()
    }

    /// No zero crossing arrived in time
    ///
    /// Without an edge nothing would ever release a fired gate, so drop it
    /// and wait idle for the input to come back.
    pub fn on_zero_cross_lost(&mut self) {
        self.gate.set_on(false);
        self.state = HeaterState::Idle;
    }

    /// Commit a new delay for the next half cycle; returns the clamped value
    pub fn set_delay_us(&mut self, us: u32) -> u32 {
        self.command.set_delay_us(us)
    }

    /// Committed delay
    pub fn delay_us(&self) -> u32 {
        self.command.delay_us()
    }

    /// Hard cutoff, independent of phase timing
    ///
    /// Disabling releases a gate that is already conducting.
    pub fn enable(&mut self, enabled: bool) {
        self.command.enable(enabled);
        self.enforce_cutoff();
    }

    pub fn is_enabled(&self) -> bool {
        self.command.is_enabled()
    }

    pub fn state(&self) -> HeaterState {
        self.state
    }

    pub fn is_gate_on(&self) -> bool {
        self.gate.is_on()
    }

    /// Delay of the countdown in flight (or the last one)
    pub fn armed_delay_us(&self) -> u32 {
        self.armed_delay_us
    }

    pub fn zero_crossings(&self) -> u32 {
        self.zero_crossings
    }

    /// Half cycles in which the gate actually fired
    pub fn firings(&self) -> u32 {
        self.firings
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }

    pub fn timer_mut(&mut self) -> &mut T {
        &mut self.timer
    }
}
