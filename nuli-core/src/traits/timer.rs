//! Timer seams for the two fast interrupt sources

/// Periodic step tick plus the one-shot that ends each step pulse
pub trait StepTimers {
    /// Reprogram the periodic tick to fire every `period_us`
    fn set_tick_period_us(&mut self, period_us: u32);

    /// (Re)arm the pulse-reset one-shot to fire after `width_us`
    ///
    /// Rearming an armed timer restarts it.
    fn arm_unstep(&mut self, width_us: u32);
}

/// Self-cancelling one-shot timer
pub trait OneShotTimer {
    /// Start counting toward expiry after `delay_us`, restarting any
    /// countdown already in flight
    fn arm(&mut self, delay_us: u32);
}
