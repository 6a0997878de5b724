//! Build script for nuli-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Validates pump.toml at compile time

use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Mirrors the fixed capacities in nuli-core's config
const MAX_ACTUATORS: usize = 6;
const MAX_THERMISTORS: usize = 4;
const ADC_CHANNELS: i64 = 4;

fn main() {
    setup_linker();
    validate_config();
}

/// Set up linker search paths for memory.x
fn setup_linker() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    println!("cargo:rustc-link-search={}", out_dir.display());

    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Validate pump.toml at compile time
///
/// The firmware parses the same file again at boot; this catches the
/// mistakes that would otherwise only show up as an inert subsystem.
fn validate_config() {
    println!("cargo:rerun-if-changed=pump.toml");

    let config_path = Path::new("pump.toml");
    if !config_path.exists() {
        fail(
            "pump.toml not found",
            &["The firmware embeds pump.toml from the nuli-firmware directory.".into()],
        );
    }

    let content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => fail("Failed to read pump.toml", &[e.to_string()]),
    };

    let config: toml::Value = match toml::from_str(&content) {
        Ok(value) => value,
        Err(e) => fail(
            "Invalid TOML syntax in pump.toml",
            &e.to_string().lines().map(str::to_string).collect::<Vec<_>>(),
        ),
    };

    let mut errors = Vec::new();
    validate_sections(&config, &mut errors);
    validate_stepping(&config, &mut errors);
    validate_pump(&config, &mut errors);
    validate_actuators(&config, &mut errors);
    validate_analog(&config, &mut errors);
    validate_heater(&config, &mut errors);

    if !errors.is_empty() {
        fail("Invalid configuration in pump.toml", &errors);
    }

    println!("cargo:warning=pump.toml validated successfully");
}

/// Abort the build with a boxed error report
fn fail(title: &str, lines: &[String]) -> ! {
    let body = lines
        .iter()
        .map(|line| {
            let truncated = if line.len() > 62 {
                format!("{}...", &line[..59])
            } else {
                line.clone()
            };
            format!("║  • {:<62} ║", truncated)
        })
        .collect::<Vec<_>>()
        .join("\n");
    panic!(
        "\n\
        ╔══════════════════════════════════════════════════════════════════╗\n\
        ║  ERROR: {:<56} ║\n\
        ╠══════════════════════════════════════════════════════════════════╣\n\
        {}\n\
        ╚══════════════════════════════════════════════════════════════════╝\n",
        title, body
    );
}

fn int(table: &toml::Value, key: &str) -> Option<i64> {
    table.get(key).and_then(toml::Value::as_integer)
}

/// Integers are accepted where the firmware expects a float
fn number(table: &toml::Value, key: &str) -> Option<f64> {
    match table.get(key)? {
        toml::Value::Float(f) => Some(*f),
        toml::Value::Integer(i) => Some(*i as f64),
        _ => None,
    }
}

/// Only known top-level sections
fn validate_sections(config: &toml::Value, errors: &mut Vec<String>) {
    const KNOWN: &[&str] = &[
        "stepping",
        "motion",
        "pump",
        "actuator",
        "flow_pot",
        "setpoint_pot",
        "thermistor",
        "heater",
    ];
    let Some(table) = config.as_table() else {
        return;
    };
    for key in table.keys() {
        if !KNOWN.contains(&key.as_str()) {
            errors.push(format!("unknown section [{}]", key));
        }
    }
}

fn validate_stepping(config: &toml::Value, errors: &mut Vec<String>) {
    let Some(stepping) = config.get("stepping") else {
        return;
    };
    let frequency = int(stepping, "frequency_hz").unwrap_or(1000);
    let width = int(stepping, "pulse_width_us").unwrap_or(100);
    if frequency <= 0 || frequency > 1_000_000 {
        errors.push("[stepping] frequency_hz must be 1-1000000".into());
        return;
    }
    if width <= 0 || width >= 1_000_000 / frequency {
        errors.push("[stepping] pulse_width_us must be shorter than the tick".into());
    }
}

fn validate_pump(config: &toml::Value, errors: &mut Vec<String>) {
    let Some(pump) = config.get("pump") else {
        errors.push("missing [pump] section".into());
        return;
    };
    let pumps = int(pump, "pumps").unwrap_or(3);
    let forward = int(pump, "forward").unwrap_or(1);
    if pumps < 1 || pumps as usize > MAX_ACTUATORS {
        errors.push(format!("[pump] pumps must be 1-{}", MAX_ACTUATORS));
    }
    if forward < 1 || forward >= pumps {
        errors.push("[pump] forward must be at least 1 and below pumps".into());
    }

    let actuators = config
        .get("actuator")
        .and_then(toml::Value::as_table)
        .map_or(0, |t| t.len());
    if (actuators as i64) < pumps {
        errors.push(format!(
            "[pump] needs {} actuators, {} configured",
            pumps, actuators
        ));
    }
}

fn validate_actuators(config: &toml::Value, errors: &mut Vec<String>) {
    let Some(actuators) = config.get("actuator").and_then(toml::Value::as_table) else {
        return;
    };
    if actuators.len() > MAX_ACTUATORS {
        errors.push(format!("at most {} [actuator.*] sections", MAX_ACTUATORS));
    }

    for (name, actuator) in actuators {
        for key in ["step_pin", "dir_pin"] {
            match actuator.get(key).and_then(toml::Value::as_str) {
                Some(pin) if pin != "nc" => check_pin(&format!("actuator.{}", name), key, pin, errors),
                _ => errors.push(format!("[actuator.{}] missing '{}'", name, key)),
            }
        }
        if let Some(pin) = actuator.get("enable_pin").and_then(toml::Value::as_str) {
            check_pin(&format!("actuator.{}", name), "enable_pin", pin, errors);
        }
    }
}

fn validate_analog(config: &toml::Value, errors: &mut Vec<String>) {
    for section in ["flow_pot", "setpoint_pot"] {
        if let Some(pot) = config.get(section) {
            check_channel(section, pot, errors);
            if let (Some(top), Some(max)) = (number(pot, "top_r"), number(pot, "max_r")) {
                if top <= 0.0 || max <= 0.0 {
                    errors.push(format!("[{}] top_r and max_r must be positive", section));
                }
            }
        }
    }

    let Some(thermistors) = config.get("thermistor").and_then(toml::Value::as_table) else {
        return;
    };
    if thermistors.len() > MAX_THERMISTORS {
        errors.push(format!("at most {} [thermistor.*] sections", MAX_THERMISTORS));
    }
    for (name, thermistor) in thermistors {
        let section = format!("thermistor.{}", name);
        check_channel(&section, thermistor, errors);
        for key in ["tr", "beta", "pullup"] {
            if number(thermistor, key).is_some_and(|v| v <= 0.0) {
                errors.push(format!("[{}] {} must be positive", section, key));
            }
        }
    }
}

fn validate_heater(config: &toml::Value, errors: &mut Vec<String>) {
    let Some(heater) = config.get("heater") else {
        return;
    };
    for key in ["zero_cross_pin", "gate_pin"] {
        if let Some(pin) = heater.get(key).and_then(toml::Value::as_str) {
            check_pin("heater", key, pin, errors);
        }
    }
    for key in ["full_power", "half_cycle_us"] {
        if number(heater, key).is_some_and(|v| v <= 0.0) {
            errors.push(format!("[heater] {} must be positive", key));
        }
    }
    if let (Some(target), Some(max)) = (number(heater, "target_temp"), number(heater, "max_temp")) {
        if target >= max {
            errors.push("[heater] target_temp must be below max_temp".into());
        }
    }
}

fn check_channel(section: &str, table: &toml::Value, errors: &mut Vec<String>) {
    if let Some(channel) = int(table, "channel") {
        if !(0..ADC_CHANNELS).contains(&channel) {
            errors.push(format!("[{}] channel must be 0-{}", section, ADC_CHANNELS - 1));
        }
    }
}

/// `"gpioN"` with optional `!` and `^` prefixes; GPIO26-29 belong to the ADC
fn check_pin(section: &str, key: &str, pin: &str, errors: &mut Vec<String>) {
    if pin == "nc" {
        return;
    }
    let bare = pin.trim_start_matches(['!', '^']);
    match bare.strip_prefix("gpio").and_then(|n| n.parse::<u8>().ok()) {
        Some(n) if n < 26 => {}
        Some(_) => errors.push(format!("[{}] {} '{}' is reserved for the ADC", section, key, pin)),
        None => errors.push(format!("[{}] {} '{}' is not a pin", section, key, pin)),
    }
}
