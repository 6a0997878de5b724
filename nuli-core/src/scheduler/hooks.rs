//! Fixed-capacity event hook table
//!
//! Hooks are plain function pointers registered at start-up and called
//! from the step tick, exactly once per fired event, in registration order.
//! They must be short and must not block.

use heapless::Vec;

/// Events raised by the step scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MotionEvent {
    /// The group went from idle to pumping
    Started,
    /// The plunger at this index handed over delivery and started refilling
    Reversed(u8),
    /// Every group plunger came to rest after a retract
    Settled,
}

/// Hook registration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HookError {
    /// No free slot left
    Full,
}

/// Registration table of `fn(E)` hooks
pub struct HookTable<E: Copy, const N: usize> {
    hooks: Vec<fn(E), N>,
}

impl<E: Copy, const N: usize> HookTable<E, N> {
    pub const fn new() -> Self {
        Self { hooks: Vec::new() }
    }

    /// Register a hook
    pub fn attach(&mut self, hook: fn(E)) -> Result<(), HookError> {
        self.hooks.push(hook).map_err(|_| HookError::Full)
    }

    /// Call every registered hook once with `event`
    pub fn fire(&self, event: E) {
        for hook in &self.hooks {
            hook(event);
        }
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

impl<E: Copy, const N: usize> Default for HookTable<E, N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portable_atomic::{AtomicU32, Ordering};

    static FIRST: AtomicU32 = AtomicU32::new(0);
    static SECOND: AtomicU32 = AtomicU32::new(0);

    fn count_first(event: u32) {
        FIRST.fetch_add(event, Ordering::Relaxed);
    }

    fn count_second(event: u32) {
        SECOND.fetch_add(event, Ordering::Relaxed);
    }

    #[test]
    fn test_fire_calls_each_hook_once() {
        let mut table: HookTable<u32, 2> = HookTable::new();
        assert!(table.is_empty());
        table.attach(count_first).unwrap();
        table.attach(count_second).unwrap();
        assert_eq!(table.attach(count_first), Err(HookError::Full));
        assert_eq!(table.len(), 2);

        table.fire(3);
        assert_eq!(FIRST.load(Ordering::Relaxed), 3);
        assert_eq!(SECOND.load(Ordering::Relaxed), 3);
    }
}
