//! Command words shared between the slow loop and the fast paths
//!
//! Each value is a single machine word behind a relaxed atomic. The slow
//! loop writes, the interrupt-level components read; no read-modify-write
//! is ever needed, so no lock is taken in interrupt context.

use portable_atomic::{AtomicBool, AtomicI32, AtomicU32, Ordering};

use crate::config::MAX_ACTUATORS;

/// Shortest committed phase delay in microseconds
pub const MIN_DELAY_US: u32 = 300;

/// Longest committed phase delay in microseconds
pub const MAX_DELAY_US: u32 = 8000;

/// Aggregate flow target (`flux_hat`) plus a stop request
///
/// Written by the setpoint controller (or an external command), consumed by
/// the step scheduler at the start of every tick.
pub struct FlowCommand {
    flux: AtomicI32,
    stop: AtomicBool,
}

impl FlowCommand {
    pub const fn new() -> Self {
        Self {
            flux: AtomicI32::new(0),
            stop: AtomicBool::new(false),
        }
    }

    /// Set the aggregate flow in raw Q16.16 steps per tick
    ///
    /// Zero or negative means retract all and idle.
    pub fn set_flux(&self, flux: i32) {
        self.flux.store(flux, Ordering::Relaxed);
    }

    pub fn flux(&self) -> i32 {
        self.flux.load(Ordering::Relaxed)
    }

    /// Ask the scheduler to halt pumping on its next tick
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    /// Consume a pending stop request
    pub fn take_stop(&self) -> bool {
        // Single consumer: a load followed by a store is enough
        if self.stop.load(Ordering::Relaxed) {
            self.stop.store(false, Ordering::Relaxed);
            true
        } else {
            false
        }
    }
}

impl Default for FlowCommand {
    fn default() -> Self {
        Self::new()
    }
}

/// Phase delay and hard enable of the AC heater
pub struct HeaterCommand {
    delay_us: AtomicU32,
    enabled: AtomicBool,
}

impl HeaterCommand {
    /// Starts disabled at the longest delay (least power)
    pub const fn new() -> Self {
        Self {
            delay_us: AtomicU32::new(MAX_DELAY_US),
            enabled: AtomicBool::new(false),
        }
    }

    /// Commit a new delay, clamped to `[MIN_DELAY_US, MAX_DELAY_US]`
    ///
    /// Returns the value actually committed.
    pub fn set_delay_us(&self, us: u32) -> u32 {
        let us = us.clamp(MIN_DELAY_US, MAX_DELAY_US);
        self.delay_us.store(us, Ordering::Relaxed);
        us
    }

    pub fn delay_us(&self) -> u32 {
        self.delay_us.load(Ordering::Relaxed)
    }

    pub fn enable(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }
}

impl Default for HeaterCommand {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only mirror of the scheduler's actuator state for the slow loop
///
/// Each word is published independently; a reader may see positions from
/// two adjacent ticks, which is fine for diagnostics.
pub struct MotionTelemetry {
    positions: [AtomicI32; MAX_ACTUATORS],
    count: AtomicU32,
    pumping: AtomicBool,
}

impl MotionTelemetry {
    pub const fn new() -> Self {
        Self {
            positions: [const { AtomicI32::new(0) }; MAX_ACTUATORS],
            count: AtomicU32::new(0),
            pumping: AtomicBool::new(false),
        }
    }

    pub(crate) fn publish_position(&self, index: usize, position: i32) {
        if let Some(slot) = self.positions.get(index) {
            slot.store(position, Ordering::Relaxed);
        }
    }

    pub(crate) fn publish_count(&self, count: usize) {
        self.count.store(count as u32, Ordering::Relaxed);
    }

    pub(crate) fn publish_pumping(&self, pumping: bool) {
        self.pumping.store(pumping, Ordering::Relaxed);
    }

    /// Number of registered actuators
    pub fn count(&self) -> usize {
        (self.count.load(Ordering::Relaxed) as usize).min(MAX_ACTUATORS)
    }

    pub fn position(&self, index: usize) -> Option<i32> {
        if index < self.count() {
            Some(self.positions[index].load(Ordering::Relaxed))
        } else {
            None
        }
    }

    pub fn is_pumping(&self) -> bool {
        self.pumping.load(Ordering::Relaxed)
    }
}

impl Default for MotionTelemetry {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything the components share, meant to live in a `static`
pub struct SharedState {
    pub flow: FlowCommand,
    pub heater: HeaterCommand,
    pub telemetry: MotionTelemetry,
}

impl SharedState {
    pub const fn new() -> Self {
        Self {
            flow: FlowCommand::new(),
            heater: HeaterCommand::new(),
            telemetry: MotionTelemetry::new(),
        }
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}
