//! Plunger actuator trait
//!
//! One actuator is one step/dir/enable driver stage moving a plunger.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Plunger travel direction
///
/// `Forward` increments the step position and pushes fluid out,
/// `Reverse` decrements it and draws the chamber full again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Direction {
    #[default]
    Forward,
    Reverse,
}

impl Direction {
    /// Get the opposite direction
    pub fn opposite(self) -> Self {
        match self {
            Direction::Forward => Direction::Reverse,
            Direction::Reverse => Direction::Forward,
        }
    }

    /// Direction of a signed displacement (zero counts as forward)
    pub fn from_sign(value: i64) -> Self {
        if value < 0 {
            Direction::Reverse
        } else {
            Direction::Forward
        }
    }

    /// Position increment for one step in this direction
    pub fn delta(self) -> i32 {
        match self {
            Direction::Forward => 1,
            Direction::Reverse => -1,
        }
    }
}

/// Step/dir/enable output stage of one actuator
///
/// Called from the step tick, so every method must be non-blocking and
/// infallible from the caller's point of view. Active levels are the
/// implementation's business.
pub trait Actuator {
    /// Assert the step output (leading edge of the pulse)
    fn step(&mut self);

    /// Deassert the step output
    fn unstep(&mut self);

    /// Drive the direction output
    fn set_direction(&mut self, direction: Direction);

    /// Enable or release the driver stage
    fn enable(&mut self, enabled: bool);
}
