//! Per-plunger velocity integrator and step generator
//!
//! A digital differential analyser: the committed velocity is accumulated
//! every tick and a step is due whenever the accumulated displacement
//! crosses one full step quantum [`Q`]. The velocity itself follows the
//! target through an acceleration-limited ramp.
//!
//! Integer arithmetic only; this runs inside the step tick.

use crate::fixed::{Fixed32, Q};
use crate::traits::Direction;

/// Tick-domain motion limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MotionLimits {
    /// Largest velocity magnitude (`QVmax`)
    pub v_max: Fixed32,
    /// Largest velocity change per tick (`QAmax`)
    pub a_max: Fixed32,
    /// Far end of travel in steps (`Xmax`)
    pub x_max: i32,
}

impl Default for MotionLimits {
    /// 500 steps/s, 8000 steps/s^2 and 3200 steps of travel at 1 kHz
    fn default() -> Self {
        Self {
            v_max: Fixed32(1 << 15),
            a_max: Fixed32(524),
            x_max: 3200,
        }
    }
}

/// State of one actuator's motion
///
/// `velocity` is the committed velocity the accumulator integrates. It is
/// latched from the ramp only at step boundaries and while at rest, so the
/// step timing of an interval in progress never changes under it.
#[derive(Debug, Clone)]
pub struct FixedPointMotor {
    limits: MotionLimits,
    position: i32,
    /// Committed velocity (`QV`)
    velocity: Fixed32,
    /// Acceleration-limited ramp toward the target (`QV1`)
    ramp: Fixed32,
    /// Commanded velocity (`QVt`)
    target: Fixed32,
    /// Per-tick ramp increment (`QA`)
    acceleration: Fixed32,
    /// Ticks since the last step (`s`)
    ticks: i64,
    /// Displacement at the previous tick (`L`)
    previous: i64,
    /// Displacement at this tick (`L1`)
    displacement: i64,
    /// Sub-step overshoot carried past the last step
    carry: i64,
    direction: Direction,
    moving: bool,
}

impl FixedPointMotor {
    pub fn new(limits: MotionLimits) -> Self {
        Self {
            limits,
            position: 0,
            velocity: Fixed32::ZERO,
            ramp: Fixed32::ZERO,
            target: Fixed32::ZERO,
            acceleration: Fixed32::ZERO,
            ticks: 0,
            previous: 0,
            displacement: 0,
            carry: 0,
            direction: Direction::Forward,
            moving: false,
        }
    }

    pub fn limits(&self) -> &MotionLimits {
        &self.limits
    }

    pub fn position(&self) -> i32 {
        self.position
    }

    /// Committed velocity used for step timing
    pub fn velocity(&self) -> Fixed32 {
        self.velocity
    }

    /// Ramp velocity, converging on the target
    pub fn ramp_velocity(&self) -> Fixed32 {
        self.ramp
    }

    pub fn target(&self) -> Fixed32 {
        self.target
    }

    pub fn acceleration(&self) -> Fixed32 {
        self.acceleration
    }

    /// Direction of the last emitted step
    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn is_moving(&self) -> bool {
        self.moving
    }

    /// Commanded to push fluid out
    pub fn is_delivering(&self) -> bool {
        self.target.is_positive()
    }

    /// Commanded to draw the chamber full
    pub fn is_refilling(&self) -> bool {
        self.target.is_negative()
    }

    /// Target, ramp and committed velocity are all zero
    pub fn is_settled(&self) -> bool {
        self.target.is_zero() && self.ramp.is_zero() && self.velocity.is_zero()
    }

    /// Command a new target velocity, clamped to `[-QVmax, QVmax]`
    pub fn set_velocity(&mut self, velocity: Fixed32) {
        self.target = velocity.clamp_abs(self.limits.v_max);
        self.moving = true;
        self.update_acceleration();
    }

    /// Stop dead: all velocities zero, accumulator cleared, not moving
    pub fn halt(&mut self) {
        self.target = Fixed32::ZERO;
        self.ramp = Fixed32::ZERO;
        self.velocity = Fixed32::ZERO;
        self.acceleration = Fixed32::ZERO;
        self.reset_accumulator();
        self.moving = false;
    }

    /// Declare the current position the home reference
    pub fn zero_position(&mut self) {
        self.position = 0;
    }

    /// At (or one step short of) the end of travel in the commanded direction
    ///
    /// Delivering plungers look one step ahead so the rotation can hand
    /// over before the far end is reached.
    pub fn will_crash(&self) -> bool {
        if self.is_delivering() {
            self.position >= self.limits.x_max - 1
        } else if self.is_refilling() {
            self.position <= 0
        } else {
            false
        }
    }

    /// Advance one tick; returns whether a step is due
    ///
    /// A step is emitted iff `|L1| >= Q` while `|L| < Q`. A step that would
    /// leave `[0, Xmax]` is swallowed and the accumulator cleared.
    pub fn advance(&mut self) -> bool {
        if !self.moving {
            return false;
        }

        self.ramp = self.ramp + self.acceleration;
        self.update_acceleration();

        if self.velocity.is_zero() {
            self.velocity = self.ramp;
            self.reset_accumulator();
            if self.velocity.is_zero() {
                if self.target.is_zero() {
                    self.moving = false;
                }
                return false;
            }
        }

        self.ticks += 1;
        self.previous = self.displacement;
        self.displacement = self.carry + self.ticks * self.velocity.raw() as i64;
        if self.previous.abs() >= Q || self.displacement.abs() < Q {
            return false;
        }

        let direction = Direction::from_sign(self.displacement);
        let overshoot = self.displacement - direction.delta() as i64 * Q;

        // Step boundary: commit the ramp for the next interval
        self.velocity = self.ramp;
        self.ticks = 0;
        self.carry = if Direction::from_sign(self.velocity.raw() as i64) == direction {
            overshoot
        } else {
            0
        };
        self.displacement = self.carry;

        let next = self.position + direction.delta();
        if next < 0 || next > self.limits.x_max {
            self.carry = 0;
            self.displacement = 0;
            return false;
        }

        self.direction = direction;
        self.position = next;
        true
    }

    fn update_acceleration(&mut self) {
        self.acceleration = (self.target - self.ramp).clamp_abs(self.limits.a_max);
    }

    fn reset_accumulator(&mut self) {
        self.ticks = 0;
        self.previous = 0;
        self.displacement = 0;
        self.carry = 0;
    }
}
