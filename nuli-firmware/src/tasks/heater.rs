//! Phase-cut heater task
//!
//! Waits for the zero-cross edge, then races the delay one-shot against
//! the next edge. If the edge wins (delay longer than the half cycle) the
//! gate simply stays off for that half cycle. A zero-cross input that
//! stays quiet for two half cycles releases the gate.

use defmt::*;
use embassy_futures::select::{select, Either};
use embassy_rp::gpio::Input;
use embassy_time::{Duration, Timer};

use crate::Heater;

/// Half cycles without an edge before the gate is dropped
const LOST_EDGE_HALF_CYCLES: u64 = 2;

#[embassy_executor::task]
pub async fn heater_task(
    heater: &'static mut Heater,
    mut zero_cross: Input<'static>,
    half_cycle_us: u64,
) {
    info!("Heater task started");

    let edge_timeout = Duration::from_micros(half_cycle_us.max(1) * LOST_EDGE_HALF_CYCLES);
    let mut edge_seen = false;
    let mut edge_lost = false;

    loop {
        if !edge_seen {
            match select(zero_cross.wait_for_rising_edge(), Timer::after(edge_timeout)).await {
                Either::First(()) => {
                    if edge_lost {
                        info!("Zero cross restored");
                        edge_lost = false;
                    }
                }
                Either::Second(()) => {
                    if !edge_lost {
                        warn!("Zero cross lost, gate released");
                        edge_lost = true;
                    }
                    heater.on_zero_cross_lost();
                    continue;
                }
            }
        }
        edge_seen = false;
        heater.on_zero_cross();

        let Some(delay_us) = heater.timer_mut().take() else {
            continue;
        };

        match select(
            Timer::after_micros(delay_us as u64),
            zero_cross.wait_for_rising_edge(),
        )
        .await
        {
            Either::First(()) => heater.on_timer_expired(),
            Either::Second(()) => {
                trace!("Zero cross before gate delay expired");
                edge_seen = true;
            }
        }
    }
}
