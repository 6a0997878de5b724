//! Analog input abstraction for potentiometers and thermistors

/// Errors that can occur while converting an analog reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorError {
    /// ADC reported a zero full-scale value
    NotReady,
    /// Raw reading above the reported full scale
    OutOfRange,
    /// Computed resistance is zero, negative or not finite
    InvalidResistance,
}

/// ADC collaborator consumed by the slow control loop
///
/// Only the ratio `read / max_value` is ever used, so the resolution of the
/// converter does not matter. Takes `&mut self` because starting a
/// conversion usually needs mutable access to the peripheral.
pub trait AnalogInput {
    /// Sample `channel` and return the raw conversion result
    fn read(&mut self, channel: u8) -> u16;

    /// Full-scale raw value
    fn max_value(&self) -> u16;

    /// Reading of `channel` as a ratio of full scale
    fn ratio(&mut self, channel: u8) -> Result<f32, SensorError> {
        let max = self.max_value();
        if max == 0 {
            return Err(SensorError::NotReady);
        }
        let raw = self.read(channel);
        if raw > max {
            return Err(SensorError::OutOfRange);
        }
        Ok(raw as f32 / max as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedAdc {
        raw: u16,
        max: u16,
    }

    impl AnalogInput for FixedAdc {
        fn read(&mut self, _channel: u8) -> u16 {
            self.raw
        }

        fn max_value(&self) -> u16 {
            self.max
        }
    }

    #[test]
    fn test_ratio() {
        let mut adc = FixedAdc { raw: 1024, max: 4096 };
        assert_eq!(adc.ratio(0), Ok(0.25));
    }

    #[test]
    fn test_ratio_rejects_bad_scale() {
        let mut adc = FixedAdc { raw: 10, max: 0 };
        assert_eq!(adc.ratio(0), Err(SensorError::NotReady));

        let mut adc = FixedAdc { raw: 5000, max: 4095 };
        assert_eq!(adc.ratio(0), Err(SensorError::OutOfRange));
    }
}
