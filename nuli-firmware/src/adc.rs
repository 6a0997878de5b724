//! RP2040 ADC as the slow loop's analog input
//!
//! Config channel `n` is ADC input `n`, i.e. GPIO26 + n.

use embassy_rp::adc::{Adc, Blocking, Channel, Config};
use embassy_rp::gpio::Pull;
use embassy_rp::peripherals::{ADC, PIN_26, PIN_27, PIN_28, PIN_29};
use embassy_rp::Peri;

use nuli_core::traits::AnalogInput;

/// 12-bit full scale
const FULL_SCALE: u16 = 4095;

/// Reported for a failed conversion; above full scale, so it reads as
/// out of range
const CONVERSION_FAILED: u16 = FULL_SCALE + 1;

pub struct BoardAdc {
    adc: Adc<'static, Blocking>,
    channels: [Channel<'static>; 4],
}

impl BoardAdc {
    pub fn new(
        adc: Peri<'static, ADC>,
        a0: Peri<'static, PIN_26>,
        a1: Peri<'static, PIN_27>,
        a2: Peri<'static, PIN_28>,
        a3: Peri<'static, PIN_29>,
    ) -> Self {
        Self {
            adc: Adc::new_blocking(adc, Config::default()),
            channels: [
                Channel::new_pin(a0, Pull::None),
                Channel::new_pin(a1, Pull::None),
                Channel::new_pin(a2, Pull::None),
                Channel::new_pin(a3, Pull::None),
            ],
        }
    }
}

impl AnalogInput for BoardAdc {
    fn read(&mut self, channel: u8) -> u16 {
        let Some(channel) = self.channels.get_mut(channel as usize) else {
            return CONVERSION_FAILED;
        };
        self.adc.blocking_read(channel).unwrap_or(CONVERSION_FAILED)
    }

    fn max_value(&self) -> u16 {
        FULL_SCALE
    }
}
