//! Heater gate output trait

/// Gate drive of a phase-cut AC heater (triac or SSR gate)
///
/// Implementations control the gate via GPIO. Active level is the
/// implementation's business.
pub trait GateOutput {
    /// Assert or release the gate
    fn set_on(&mut self, on: bool);

    /// Check if the gate is currently asserted
    fn is_on(&self) -> bool;
}

/// An unassigned gate: never conducts
impl<G: GateOutput> GateOutput for Option<G> {
    fn set_on(&mut self, on: bool) {
        if let Some(gate) = self {
            gate.set_on(on);
        }
    }

    fn is_on(&self) -> bool {
        self.as_ref().is_some_and(|gate| gate.is_on())
    }
}
