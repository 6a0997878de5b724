use nuli_core::command::{HeaterCommand, SharedState, MAX_DELAY_US, MIN_DELAY_US};
use nuli_core::config::{ActuatorHwConfig, MachineConfig, PinConfig, ThermistorConfig};
use nuli_core::control::{compute_delay, FeedbackGains, FeedbackInputs, SetpointController, Thermistor};
use nuli_core::motion::{FixedPointMotor, MotionLimits};
use nuli_core::scheduler::StepScheduler;
use nuli_core::traits::{Actuator, AnalogInput, Direction, StepTimers};
use nuli_core::Fixed32;
use proptest::prelude::*;

struct NullActuator;

impl Actuator for NullActuator {
    fn step(&mut self) {}
    fn unstep(&mut self) {}
    fn set_direction(&mut self, _direction: Direction) {}
    fn enable(&mut self, _enabled: bool) {}
}

struct NullTimers;

impl StepTimers for NullTimers {
    fn set_tick_period_us(&mut self, _period_us: u32) {}
    fn arm_unstep(&mut self, _width_us: u32) {}
}

// Channel 0 is the flow pot, channel 2 the thermistor
struct ScriptedAdc {
    thermistor_raw: u16,
}

impl AnalogInput for ScriptedAdc {
    fn read(&mut self, channel: u8) -> u16 {
        match channel {
            2 => self.thermistor_raw,
            _ => 4095,
        }
    }

    fn max_value(&self) -> u16 {
        4095
    }
}

fn pump_config(pumps: u8, forward: u8, travel: i32) -> MachineConfig {
    let mut config = MachineConfig::default();
    config.pump.pumps = pumps;
    config.pump.forward = forward;
    config.motion.travel = travel;
    for i in 0..pumps {
        let actuator = ActuatorHwConfig {
            step_pin: Some(PinConfig::new(2 * i)),
            dir_pin: Some(PinConfig::new(2 * i + 1)),
            ..Default::default()
        };
        config.actuators.push(actuator).unwrap();
    }
    config
}

fn scheduler<'a>(
    shared: &'a SharedState,
    config: &MachineConfig,
) -> StepScheduler<'a, NullActuator, NullTimers> {
    let mut scheduler = StepScheduler::new(shared, NullTimers, config);
    for _ in 0..config.actuators.len() {
        scheduler.register_actuator(NullActuator).unwrap();
    }
    scheduler
}

/// Every tick: exactly `forward` deliverers, their targets summing to the
/// committed flow, and every plunger inside its travel
fn assert_group_balanced(
    sched: &StepScheduler<'_, NullActuator, NullTimers>,
    forward: u8,
    travel: i32,
) -> Result<(), TestCaseError> {
    let delivering = sched.motors().iter().filter(|m| m.is_delivering()).count();
    prop_assert_eq!(delivering, forward as usize, "tick {}", sched.ticks());
    prop_assert_eq!(sched.pump_speed_actual(), Fixed32(sched.flux_hat()), "tick {}", sched.ticks());
    for motor in sched.motors() {
        prop_assert!(
            motor.position() >= 0 && motor.position() <= travel,
            "tick {} position {}",
            sched.ticks(),
            motor.position()
        );
    }
    Ok(())
}

#[test]
fn test_two_forward_of_three_sustains_flow() {
    let shared = SharedState::new();
    let config = pump_config(3, 2, 3200);
    let mut sched = scheduler(&shared, &config);
    sched.pump_speed(49_152);
    for _ in 0..30_000 {
        sched.tick();
        sched.unstep_tick();
        if let Err(e) = assert_group_balanced(&sched, 2, 3200) {
            panic!("{}", e);
        }
    }
    assert!(sched.is_pumping());
}

proptest! {
    #[test]
    fn step_count_tracks_constant_velocity(rate in 1i32..=1000, ticks in 1u32..4000) {
        let frequency = 1000;
        let velocity = Fixed32::from_rate(rate, frequency);
        let limits = MotionLimits { v_max: Fixed32::ONE, a_max: Fixed32::ONE, x_max: i32::MAX };
        let mut motor = FixedPointMotor::new(limits);
        motor.set_velocity(velocity);

        let steps = (0..ticks).filter(|_| motor.advance()).count() as f64;
        let expected = rate as f64 * ticks as f64 / frequency as f64;
        // Truncation of the fixed-point rate adds at most one quantum per tick
        let slack = 1.0 + ticks as f64 / 65536.0;
        prop_assert!((steps - expected).abs() <= slack, "steps {} expected {}", steps, expected);
    }

    #[test]
    fn positions_stay_within_travel(
        commands in prop::collection::vec((-20_000i32..70_000, 1u32..300), 1..12),
        travel in 4i32..60,
    ) {
        let shared = SharedState::new();
        let config = pump_config(3, 1, travel);
        let mut sched = scheduler(&shared, &config);
        for (flux, ticks) in commands {
            sched.pump_speed(flux);
            for _ in 0..ticks {
                sched.tick();
                sched.unstep_tick();
                for motor in sched.motors() {
                    prop_assert!(motor.position() >= 0 && motor.position() <= travel);
                }
            }
        }
    }

    #[test]
    fn delivered_flow_matches_command(
        pumps in 2u8..=6,
        forward_seed in 0u8..5,
        first in 6i32..=32_768,
        second in 6i32..=32_768,
    ) {
        let forward = 1 + forward_seed % (pumps - 1);
        let shared = SharedState::new();
        let config = pump_config(pumps, forward, 3200);
        let mut sched = scheduler(&shared, &config);
        let capacity = sched.limits().v_max.raw() * forward as i32;

        let first = first.min(capacity);
        sched.pump_speed(first);
        prop_assert_eq!(sched.pump_speed_actual(), Fixed32(first));

        let second = second.min(capacity);
        sched.pump_speed(second);
        prop_assert_eq!(sched.pump_speed_actual(), Fixed32(second));
        let delivering = sched.motors().iter().filter(|m| m.is_delivering()).count();
        prop_assert_eq!(delivering, forward as usize);
    }

    #[test]
    fn group_keeps_forward_deliverers(
        pumps in 2u8..=6,
        forward_seed in 0u8..5,
        flux_seed in 1i32..=i32::MAX,
        travel in 8i32..400,
        ticks in 1000u32..5000,
    ) {
        let forward = 1 + forward_seed % (pumps - 1);
        let shared = SharedState::new();
        let config = pump_config(pumps, forward, travel);
        let mut sched = scheduler(&shared, &config);
        let capacity = sched.limits().v_max.raw() * forward as i32;
        let flux = 1 + flux_seed % capacity;

        sched.pump_speed(flux);
        assert_group_balanced(&sched, forward, travel)?;
        for _ in 0..ticks {
            sched.tick();
            sched.unstep_tick();
            assert_group_balanced(&sched, forward, travel)?;
        }
    }

    #[test]
    fn heater_delay_always_clamped(
        setpoint in any::<f32>(),
        primary in any::<f32>(),
        secondary in proptest::option::of(any::<f32>()),
        flow_fraction in any::<f32>(),
        k_error in any::<f32>(),
        half_cycle_us in any::<f32>(),
    ) {
        let gains = FeedbackGains { k_error, half_cycle_us, ..FeedbackGains::default() };
        let inputs = FeedbackInputs { setpoint, primary, secondary, flow_fraction };
        let delay = compute_delay(&inputs, &gains);
        prop_assert!((MIN_DELAY_US..=MAX_DELAY_US).contains(&delay));
    }

    #[test]
    fn non_positive_resistance_never_converts(resistance in -1.0e9f32..=0.0) {
        let thermistor = Thermistor::new(&ThermistorConfig::default());
        prop_assert!(thermistor.temperature(resistance).is_err());
    }

    #[test]
    fn invalid_reading_keeps_previous_temperature(
        good_raw in 200u16..3900,
        bad_raw in prop_oneof![Just(0u16), Just(4095u16)],
    ) {
        let shared = SharedState::new();
        let mut config = MachineConfig::default();
        config.thermistors.push(ThermistorConfig::default()).unwrap();
        let mut controller = SetpointController::new(&shared, &config, false);

        let mut adc = ScriptedAdc { thermistor_raw: good_raw };
        controller.update(&mut adc, 0);
        let before = controller.temperature(0);
        prop_assert!(before.is_some());

        adc.thermistor_raw = bad_raw;
        controller.update(&mut adc, 50);
        prop_assert_eq!(controller.temperature(0), before);
    }

    #[test]
    fn delay_round_trips_in_range(delay in MIN_DELAY_US..=MAX_DELAY_US) {
        let command = HeaterCommand::new();
        prop_assert_eq!(command.set_delay_us(delay), delay);
        prop_assert_eq!(command.delay_us(), delay);
    }
}
