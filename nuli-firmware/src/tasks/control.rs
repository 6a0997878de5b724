//! Slow control loop task
//!
//! Samples the analog inputs at 20 Hz and reports buffered diagnostic
//! records twice a second.

use defmt::*;
use embassy_time::{Duration, Instant, Ticker};

use nuli_core::control::SetpointController;

use crate::adc::BoardAdc;

/// Control interval in milliseconds
pub const CONTROL_INTERVAL_MS: u64 = 50;

/// Control ticks between diagnostic reports
const REPORT_EVERY: u32 = 10;

#[embassy_executor::task]
pub async fn control_task(controller: &'static mut SetpointController<'static>, mut adc: BoardAdc) {
    info!("Control task started");

    let mut ticker = Ticker::every(Duration::from_millis(CONTROL_INTERVAL_MS));
    let start = Instant::now();
    let mut was_faulted = false;

    loop {
        ticker.next().await;
        controller.update(&mut adc, start.elapsed().as_millis());

        let faulted = controller.is_faulted();
        if faulted && !was_faulted {
            error!(
                "Over-temperature: heater cut off at {} C",
                controller.temperature(0).unwrap_or(f32::NAN)
            );
        }
        was_faulted = faulted;

        if controller.samples() % REPORT_EVERY == 0 {
            let log = controller.diagnostics();
            if log.dropped() > 0 {
                trace!("{} diagnostic records dropped so far", log.dropped());
            }
            while let Some(record) = log.pop() {
                info!("{}", record);
            }
        }
    }
}
