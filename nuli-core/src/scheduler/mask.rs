//! Fixed-width set of actuator indices

/// Bit set of actuator slots, one bit per index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StepMask(u32);

impl StepMask {
    /// Number of representable slots
    pub const BITS: usize = 32;

    pub const fn empty() -> Self {
        Self(0)
    }

    #[inline]
    pub fn set(&mut self, index: usize) {
        if index < Self::BITS {
            self.0 |= 1 << index;
        }
    }

    #[inline]
    pub fn contains(&self, index: usize) -> bool {
        index < Self::BITS && self.0 & (1 << index) != 0
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn clear(&mut self) {
        self.0 = 0;
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Set indices in ascending order
    pub fn iter(&self) -> impl Iterator<Item = usize> {
        let bits = self.0;
        (0..Self::BITS).filter(move |i| bits & (1 << i) != 0)
    }
}
