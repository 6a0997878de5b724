//! Diagnostic records and their ring buffer
//!
//! Records are produced by the slow loop and drained by a reporting path
//! with no timing requirement. When the ring is full the oldest record is
//! dropped; the producer never waits.

use core::fmt;

use heapless::{Deque, Vec};

use crate::config::{MAX_ACTUATORS, MAX_THERMISTORS};

/// One slow-loop sample
#[derive(Debug, Clone, PartialEq)]
pub struct DiagnosticRecord {
    /// Sample counter
    pub count: u32,
    /// Commanded aggregate flow, raw Q16.16 steps per tick
    pub speed: i32,
    /// Committed heater delay in microseconds
    pub delay_us: u32,
    /// Per-channel temperatures, `None` before the first good reading
    pub temperatures: Vec<Option<f32>, MAX_THERMISTORS>,
    /// Actuator positions in steps
    pub positions: Vec<i32, MAX_ACTUATORS>,
    /// Milliseconds since boot
    pub timestamp_ms: u64,
}

/// `TEMPOUT <count> <speed> <delay> <temp...> <position...> <timestamp>`
impl fmt::Display for DiagnosticRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TEMPOUT {} {} {}", self.count, self.speed, self.delay_us)?;
        for temp in &self.temperatures {
            match temp {
                Some(t) => write!(f, " {:.2}", t)?,
                None => f.write_str(" -")?,
            }
        }
        for position in &self.positions {
            write!(f, " {}", position)?;
        }
        write!(f, " {}", self.timestamp_ms)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for DiagnosticRecord {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "TEMPOUT {} {} {}", self.count, self.speed, self.delay_us);
        for temp in &self.temperatures {
            match temp {
                Some(t) => defmt::write!(f, " {}", t),
                None => defmt::write!(f, " -"),
            }
        }
        for position in &self.positions {
            defmt::write!(f, " {}", position);
        }
        defmt::write!(f, " {}", self.timestamp_ms);
    }
}

/// Fixed-capacity ring of diagnostic records
pub struct DiagnosticLog<const N: usize> {
    records: Deque<DiagnosticRecord, N>,
    dropped: u32,
}

impl<const N: usize> DiagnosticLog<N> {
    pub const fn new() -> Self {
        Self {
            records: Deque::new(),
            dropped: 0,
        }
    }

    /// Append a record, evicting the oldest one when full
    pub fn push(&mut self, record: DiagnosticRecord) {
        if self.records.is_full() {
            self.records.pop_front();
            self.dropped = self.dropped.wrapping_add(1);
        }
        // Cannot fail: a slot was just freed
        let _ = self.records.push_back(record);
    }

    /// Oldest buffered record
    pub fn pop(&mut self) -> Option<DiagnosticRecord> {
        self.records.pop_front()
    }

    /// Write every buffered record as one line each, oldest first
    ///
    /// A record is only removed once it has been written.
    pub fn drain_into<W: fmt::Write>(&mut self, out: &mut W) -> fmt::Result {
        while let Some(record) = self.records.front() {
            writeln!(out, "{}", record)?;
            self.records.pop_front();
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records evicted because the ring was full
    pub fn dropped(&self) -> u32 {
        self.dropped
    }
}

impl<const N: usize> Default for DiagnosticLog<N> {
    fn default() -> Self {
        Self::new()
    }
}
