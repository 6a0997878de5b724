//! Step tick task
//!
//! Runs the scheduler at the configured base frequency. When a tick raised
//! step outputs, the pulse-reset one-shot is awaited right after it; the
//! width is always shorter than the tick period.

use defmt::*;
use embassy_time::{Duration, Ticker, Timer};

use nuli_core::scheduler::MotionEvent;

use crate::Scheduler;

/// Step tick task
#[embassy_executor::task]
pub async fn step_task(scheduler: &'static mut Scheduler) {
    let period_us = scheduler
        .timers_mut()
        .take_period()
        .unwrap_or(scheduler.period_us());
    info!(
        "Step task started: {} actuators, {} us period",
        scheduler.len(),
        period_us
    );

    let mut ticker = Ticker::every(Duration::from_micros(period_us as u64));

    loop {
        ticker.next().await;
        scheduler.tick();

        if let Some(width_us) = scheduler.timers_mut().take_unstep() {
            Timer::after_micros(width_us as u64).await;
            scheduler.unstep_tick();
        }

        if let Some(period_us) = scheduler.timers_mut().take_period() {
            debug!("Step period now {} us", period_us);
            ticker = Ticker::every(Duration::from_micros(period_us as u64));
        }
    }
}

/// Hook attached to the scheduler at boot
pub fn log_motion_event(event: MotionEvent) {
    match event {
        MotionEvent::Started => info!("Pumping started"),
        MotionEvent::Reversed(index) => debug!("Plunger {} refilling", index),
        MotionEvent::Settled => info!("Plungers settled"),
    }
}
