//! Nuli - Pump/Heater Appliance Firmware
//!
//! Main firmware binary for RP2040-based boards. A rotating group of
//! stepper-driven plungers delivers a continuous flow while a phase-cut
//! AC heater holds the outlet temperature.
//!
//! Configuration is read once from the embedded `pump.toml`. A section that
//! fails validation leaves its subsystem inert; the board still boots so
//! the appliance can be recovered by hand.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::gpio::Output;
use embassy_time::Timer;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use nuli_core::command::SharedState;
use nuli_core::config::{parse_config, MachineConfig};
use nuli_core::context::{PumpContext, PumpParts};
use nuli_core::control::SetpointController;
use nuli_core::heater::PhaseHeaterDriver;
use nuli_core::scheduler::StepScheduler;
use nuli_drivers::heater::GpioGate;
use nuli_drivers::stepper::StepDirActuator;

use crate::adc::BoardAdc;
use crate::pins::PinBank;
use crate::timers::{PhaseTimer, TickTimers};

mod adc;
mod pins;
mod tasks;
mod timers;

/// Embedded configuration (compiled into firmware)
/// Edit pump.toml and rebuild to customize
const EMBEDDED_CONFIG: &str = include_str!("../pump.toml");

pub type PumpActuator = StepDirActuator<Output<'static>>;
pub type HeaterGate = Option<GpioGate<Output<'static>>>;
pub type Scheduler = StepScheduler<'static, PumpActuator, TickTimers>;
pub type Heater = PhaseHeaterDriver<'static, HeaterGate, PhaseTimer>;
type Context = PumpContext<'static, PumpActuator, TickTimers, HeaterGate, PhaseTimer>;

/// Command words shared by every task
static SHARED: SharedState = SharedState::new();

static CONFIG: StaticCell<MachineConfig> = StaticCell::new();
static CONTEXT: StaticCell<Context> = StaticCell::new();

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Nuli firmware starting...");

    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    let config: &'static MachineConfig = CONFIG.init(load_config());

    let mut pins = PinBank::new([
        p.PIN_0.into(),
        p.PIN_1.into(),
        p.PIN_2.into(),
        p.PIN_3.into(),
        p.PIN_4.into(),
        p.PIN_5.into(),
        p.PIN_6.into(),
        p.PIN_7.into(),
        p.PIN_8.into(),
        p.PIN_9.into(),
        p.PIN_10.into(),
        p.PIN_11.into(),
        p.PIN_12.into(),
        p.PIN_13.into(),
        p.PIN_14.into(),
        p.PIN_15.into(),
        p.PIN_16.into(),
        p.PIN_17.into(),
        p.PIN_18.into(),
        p.PIN_19.into(),
        p.PIN_20.into(),
        p.PIN_21.into(),
        p.PIN_22.into(),
        p.PIN_23.into(),
        p.PIN_24.into(),
        p.PIN_25.into(),
    ]);
    let adc = BoardAdc::new(p.ADC, p.PIN_26, p.PIN_27, p.PIN_28, p.PIN_29);

    let readiness = nuli_core::Readiness::check(config);
    if let Err(e) = readiness.motion {
        error!("Motion disabled: {}", e);
    }
    if let Err(e) = readiness.heater {
        error!("Heater disabled: {}", e);
    }

    // Heater I/O, only for a valid heater section
    let mut zero_cross = None;
    let mut gate: HeaterGate = None;
    if readiness.heater_ok() {
        let hw = &config.heater_hw;
        if let (Some(zc_cfg), Some(gate_cfg)) = (hw.zero_cross_pin, hw.gate_pin) {
            match (pins.input(&zc_cfg), pins.output(&gate_cfg)) {
                (Ok(input), Ok(output)) => {
                    zero_cross = Some(input);
                    gate = Some(GpioGate::from_config(output, &gate_cfg));
                }
                (Err(e), _) | (_, Err(e)) => error!("Heater disabled: {}", e),
            }
        }
    }

    let context = CONTEXT.init(PumpContext::new(
        &SHARED,
        config,
        TickTimers::new(),
        gate,
        PhaseTimer::default(),
    ));

    if readiness.motion_ok() {
        register_actuators(context, config, &mut pins);
    }
    if context.scheduler.attach_hook(tasks::log_motion_event).is_err() {
        warn!("No hook slot for motion event logging");
    }

    info!(
        "Pump group: {} of {} plungers, {} forward",
        config.pump.pumps,
        context.scheduler.len(),
        config.pump.forward
    );

    let PumpParts {
        scheduler,
        heater,
        controller,
    } = context.split();
    let controller: &'static mut SetpointController<'static> = controller;

    // Spawn tasks
    if !scheduler.is_empty() {
        spawner.spawn(tasks::step_task(scheduler)).unwrap();
    }
    match zero_cross {
        Some(input) => spawner
            .spawn(tasks::heater_task(
                heater,
                input,
                config.heater.half_cycle_us as u64,
            ))
            .unwrap(),
        None => warn!("Heater task not started"),
    }
    spawner.spawn(tasks::control_task(controller, adc)).unwrap();

    info!("All tasks spawned, firmware running");

    loop {
        Timer::after_secs(60).await;
        trace!(
            "Heartbeat: pumping={} delay={} us",
            SHARED.telemetry.is_pumping(),
            SHARED.heater.delay_us()
        );
    }
}

/// Parse the embedded configuration
///
/// A broken `pump.toml` falls back to defaults, which leave every
/// subsystem inert.
fn load_config() -> MachineConfig {
    match parse_config(EMBEDDED_CONFIG) {
        Ok(config) => {
            info!(
                "Parsed pump.toml: {} actuators, {} thermistors",
                config.actuators.len(),
                config.thermistors.len()
            );
            config
        }
        Err(e) => {
            error!("Failed to parse pump.toml line {}: {}", e.line, e.kind);
            MachineConfig::default()
        }
    }
}

/// Build and register one actuator per configured axis
///
/// Stops at the first failure; the plungers registered so far stay usable.
fn register_actuators(context: &mut Context, config: &MachineConfig, pins: &mut PinBank) {
    for (index, hw) in config.actuators.iter().enumerate() {
        let actuator = StepDirActuator::from_config(
            hw,
            pins.optional_output(hw.step_pin),
            pins.optional_output(hw.dir_pin),
            pins.optional_output(hw.enable_pin),
        );
        match actuator.and_then(|a| context.register_actuator(a)) {
            Some(slot) => info!("Actuator '{}' in slot {}", hw.name.as_str(), slot),
            None => {
                error!("Actuator {} '{}' not registered", index, hw.name.as_str());
                break;
            }
        }
    }
}
