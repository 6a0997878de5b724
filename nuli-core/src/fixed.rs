//! Q16.16 fixed-point velocity units
//!
//! Everything on the step-tick path is integer arithmetic. Velocities are
//! expressed in steps per tick with 16 fractional bits, so [`Fixed32::ONE`]
//! is exactly one step quantum (`Q`). Accelerations use the same scale, in
//! steps per tick per tick.

use core::ops::{Add, Neg, Sub};

/// Q16.16 fixed-point number
///
/// Range: approximately -32768.0 to +32767.99998
/// Resolution: approximately 0.000015
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Fixed32(pub i32);

/// One full step, as a raw accumulator quantity
pub const Q: i64 = Fixed32::ONE.0 as i64;

impl Fixed32 {
    /// Zero value
    pub const ZERO: Self = Self(0);

    /// One (1.0), one step per tick
    pub const ONE: Self = Self(1 << 16);

    /// Fractional bits (16)
    pub const FRAC_BITS: u32 = 16;

    /// Velocity for `steps_per_sec` at a tick rate of `tick_hz`
    ///
    /// Saturates instead of overflowing; a zero tick rate yields zero.
    ///
    /// # Example
    /// ```
    /// use nuli_core::fixed::Fixed32;
    /// // 250 steps/s at 1 kHz is a quarter step per tick
    /// assert_eq!(Fixed32::from_rate(250, 1000), Fixed32(1 << 14));
    /// ```
    pub const fn from_rate(steps_per_sec: i32, tick_hz: u32) -> Self {
        if tick_hz == 0 {
            return Self::ZERO;
        }
        let raw = ((steps_per_sec as i64) << Self::FRAC_BITS) / tick_hz as i64;
        Self(saturate(raw))
    }

    /// Per-tick velocity change for `steps_per_sec2` at `tick_hz`
    pub const fn from_acceleration(steps_per_sec2: i32, tick_hz: u32) -> Self {
        if tick_hz == 0 {
            return Self::ZERO;
        }
        let hz = tick_hz as i64;
        let raw = ((steps_per_sec2 as i64) << Self::FRAC_BITS) / (hz * hz);
        Self(saturate(raw))
    }

    /// Steps per second this velocity represents at `tick_hz`
    pub const fn to_rate(self, tick_hz: u32) -> i32 {
        saturate((self.0 as i64 * tick_hz as i64) >> Self::FRAC_BITS)
    }

    /// Divide by an integer
    ///
    /// Returns ZERO if divisor is zero.
    #[inline]
    pub fn div_int(self, divisor: i32) -> Self {
        if divisor == 0 {
            return Self::ZERO;
        }
        Self(self.0 / divisor)
    }

    /// Multiply by an integer
    #[inline]
    pub fn mul_int(self, n: i32) -> Self {
        Self(self.0.saturating_mul(n))
    }

    /// Saturating addition (clamps on overflow)
    #[inline]
    pub fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    /// Saturating subtraction (clamps on underflow)
    #[inline]
    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// Clamp to a symmetric band `[-limit, +limit]`
    #[inline]
    pub fn clamp_abs(self, limit: Self) -> Self {
        let limit = limit.0.saturating_abs();
        Self(self.0.clamp(-limit, limit))
    }

    /// Absolute value
    #[inline]
    pub fn abs(self) -> Self {
        Self(self.0.saturating_abs())
    }

    #[inline]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    #[inline]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Raw Q16.16 value
    #[inline]
    pub const fn raw(self) -> i32 {
        self.0
    }
}

const fn saturate(raw: i64) -> i32 {
    if raw > i32::MAX as i64 {
        i32::MAX
    } else if raw < i32::MIN as i64 {
        i32::MIN
    } else {
        raw as i32
    }
}

impl Add for Fixed32 {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        self.saturating_add(other)
    }
}

impl Sub for Fixed32 {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        self.saturating_sub(other)
    }
}

impl Neg for Fixed32 {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self(self.0.saturating_neg())
    }
}
