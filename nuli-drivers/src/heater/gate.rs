//! Triac / SSR gate output
//!
//! Drives the phase-cut heater gate through a GPIO pin, directly or via an
//! opto-triac. The pin can be active-high (default) or active-low.

use core::convert::Infallible;

use embedded_hal::digital::OutputPin;
use nuli_core::config::PinConfig;
use nuli_core::traits::GateOutput;

/// GPIO heater gate
pub struct GpioGate<P> {
    pin: P,
    /// If true, gate ON = pin LOW
    inverted: bool,
    /// Current logical state (true = conducting)
    on: bool,
}

impl<P: OutputPin<Error = Infallible>> GpioGate<P> {
    /// Create a gate output, released
    ///
    /// # Arguments
    /// - `pin`: The GPIO pin to control
    /// - `inverted`: If true, the gate conducts when the pin is LOW
    pub fn new(pin: P, inverted: bool) -> Self {
        let mut gate = Self {
            pin,
            inverted,
            on: false,
        };
        // Gate starts released
        gate.set_on(false);
        gate
    }

    /// Create a gate with the active level of a configured pin
    pub fn from_config(pin: P, config: &PinConfig) -> Self {
        Self::new(pin, config.inverted)
    }

    /// Release the pin
    pub fn into_inner(self) -> P {
        self.pin
    }
}

impl<P: OutputPin<Error = Infallible>> GateOutput for GpioGate<P> {
    fn set_on(&mut self, on: bool) {
        self.on = on;
        // Normal: on=true, inverted=false → high
        // Inverted: on=true, inverted=true → low
        let _ = self.pin.set_state((on != self.inverted).into());
    }

    fn is_on(&self) -> bool {
        self.on
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::digital::ErrorType;

    /// Mock GPIO pin for testing
    struct MockPin {
        high: bool,
        writes: u32,
    }

    impl MockPin {
        fn new() -> Self {
            Self {
                high: false,
                writes: 0,
            }
        }
    }

    impl ErrorType for MockPin {
        type Error = Infallible;
    }

    impl OutputPin for MockPin {
        fn set_high(&mut self) -> Result<(), Infallible> {
            self.high = true;
            self.writes += 1;
            Ok(())
        }

        fn set_low(&mut self) -> Result<(), Infallible> {
            self.high = false;
            self.writes += 1;
            Ok(())
        }
    }

    #[test]
    fn test_active_high_gate() {
        let mut gate = GpioGate::new(MockPin::new(), false);

        // Initially released
        assert!(!gate.is_on());
        assert!(!gate.pin.high);
        assert_eq!(gate.pin.writes, 1);

        gate.set_on(true);
        assert!(gate.is_on());
        assert!(gate.pin.high);

        gate.set_on(false);
        assert!(!gate.is_on());
        assert!(!gate.pin.high);
    }

    #[test]
    fn test_active_low_gate() {
        let mut gate = GpioGate::from_config(MockPin::new(), &PinConfig::inverted(21));

        // Released means the pin idles high
        assert!(!gate.is_on());
        assert!(gate.pin.high);

        gate.set_on(true);
        assert!(gate.is_on());
        assert!(!gate.into_inner().high);
    }

    #[test]
    fn test_drives_phase_heater() {
        use nuli_core::command::HeaterCommand;
        use nuli_core::heater::PhaseHeaterDriver;
        use nuli_core::traits::OneShotTimer;

        struct Timer;
        impl OneShotTimer for Timer {
            fn arm(&mut self, _delay_us: u32) {}
        }

        let command = HeaterCommand::new();
        command.enable(true);
        let gate = GpioGate::new(MockPin::new(), false);
        let mut heater = PhaseHeaterDriver::new(&command, gate, Timer);
        heater.on_zero_cross();
        heater.on_timer_expired();
        assert!(heater.is_gate_on());
    }
}
