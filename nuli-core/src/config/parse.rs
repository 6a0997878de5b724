//! Minimal TOML parser for `pump.toml`
//!
//! Handles only the subset the appliance needs. It does NOT support the
//! full TOML grammar.
//!
//! Supported features:
//! - `key = value` pairs (string, integer, float, boolean)
//! - `[section]` and `[section.name]` headers
//! - Comments (`# ...`), including trailing ones
//! - Pin strings: `"gpio11"`, `"!gpio12"` (active-low), `"^gpio4"` (pull-up),
//!   `"nc"` (not connected)

use heapless::String as HString;

use super::hardware::{ActuatorHwConfig, PinConfig};
use super::types::{MachineConfig, SetpointPotConfig, ThermistorConfig, MAX_LABEL_LEN};

/// What went wrong on a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseErrorKind {
    /// Unknown or malformed section header
    InvalidSection,
    /// Key not valid in the current section
    UnknownKey,
    /// Value does not parse as the expected type
    InvalidValue,
    /// Invalid pin string
    InvalidPin,
    /// Too many actuators or thermistors
    TooManyItems,
}

/// Parse error with its 1-based line number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ParseError {
    pub line: usize,
    pub kind: ParseErrorKind,
}

/// Current parsing context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Root,
    Stepping,
    Motion,
    Pump,
    Actuator,
    FlowPot,
    SetpointPot,
    Thermistor,
    Heater,
}

/// Parse configuration text into a [`MachineConfig`]
///
/// Missing keys keep their defaults; nothing is validated here beyond types.
pub fn parse_config(input: &str) -> Result<MachineConfig, ParseError> {
    let mut config = MachineConfig::default();
    let mut section = Section::Root;

    for (index, line) in input.lines().enumerate() {
        let at = |kind| ParseError {
            line: index + 1,
            kind,
        };
        let line = strip_comment(line).trim();
        if line.is_empty() {
            continue;
        }

        if line.starts_with('[') && line.ends_with(']') {
            section = open_section(&line[1..line.len() - 1], &mut config).map_err(at)?;
            continue;
        }

        let (key, value) = parse_key_value(line).ok_or(at(ParseErrorKind::InvalidValue))?;
        apply_value(section, key, value, &mut config).map_err(at)?;
    }

    Ok(config)
}

/// Drop a trailing comment that is not inside a string
fn strip_comment(line: &str) -> &str {
    let mut in_string = false;
    for (i, c) in line.char_indices() {
        match c {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..i],
            _ => {}
        }
    }
    line
}

/// Enter a section, creating list entries for named ones
fn open_section(header: &str, config: &mut MachineConfig) -> Result<Section, ParseErrorKind> {
    let header = header.trim();

    if let Some((kind, name)) = header.split_once('.') {
        let name: HString<MAX_LABEL_LEN> =
            HString::try_from(name.trim()).map_err(|_| ParseErrorKind::InvalidSection)?;
        if name.is_empty() {
            return Err(ParseErrorKind::InvalidSection);
        }
        return match kind.trim() {
            "actuator" => {
                let actuator = ActuatorHwConfig {
                    name,
                    ..Default::default()
                };
                config
                    .actuators
                    .push(actuator)
                    .map_err(|_| ParseErrorKind::TooManyItems)?;
                Ok(Section::Actuator)
            }
            "thermistor" => {
                let thermistor = ThermistorConfig {
                    name,
                    ..Default::default()
                };
                config
                    .thermistors
                    .push(thermistor)
                    .map_err(|_| ParseErrorKind::TooManyItems)?;
                Ok(Section::Thermistor)
            }
            _ => Err(ParseErrorKind::InvalidSection),
        };
    }

    match header {
        "stepping" => Ok(Section::Stepping),
        "motion" => Ok(Section::Motion),
        "pump" => Ok(Section::Pump),
        "flow_pot" => Ok(Section::FlowPot),
        "setpoint_pot" => {
            config.setpoint_pot.get_or_insert_with(SetpointPotConfig::default);
            Ok(Section::SetpointPot)
        }
        "heater" => Ok(Section::Heater),
        _ => Err(ParseErrorKind::InvalidSection),
    }
}

/// Parse "key = value" line
fn parse_key_value(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    let value = value.trim();
    if key.is_empty() || value.is_empty() {
        return None;
    }
    Some((key, value))
}

/// Remove surrounding quotes; bare words are accepted as-is
fn parse_string(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

fn parse_int<T: core::str::FromStr>(value: &str) -> Result<T, ParseErrorKind> {
    value.parse().map_err(|_| ParseErrorKind::InvalidValue)
}

fn parse_float(value: &str) -> Result<f32, ParseErrorKind> {
    let parsed: f32 = value.parse().map_err(|_| ParseErrorKind::InvalidValue)?;
    if parsed.is_finite() {
        Ok(parsed)
    } else {
        Err(ParseErrorKind::InvalidValue)
    }
}

fn parse_bool(value: &str) -> Result<bool, ParseErrorKind> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ParseErrorKind::InvalidValue),
    }
}

/// Parse a pin string; `"nc"` leaves the pin unassigned
fn parse_pin(value: &str) -> Result<Option<PinConfig>, ParseErrorKind> {
    let mut s = parse_string(value);
    if s == "nc" {
        return Ok(None);
    }

    let mut pin = PinConfig::default();
    loop {
        if let Some(rest) = s.strip_prefix('!') {
            pin.inverted = true;
            s = rest;
        } else if let Some(rest) = s.strip_prefix('^') {
            pin.pull_up = true;
            s = rest;
        } else {
            break;
        }
    }

    let number = s.strip_prefix("gpio").ok_or(ParseErrorKind::InvalidPin)?;
    pin.pin = number.parse().map_err(|_| ParseErrorKind::InvalidPin)?;
    if pin.pin > 29 {
        return Err(ParseErrorKind::InvalidPin);
    }
    Ok(Some(pin))
}

/// Apply a parsed value to the appropriate config field
fn apply_value(
    section: Section,
    key: &str,
    value: &str,
    config: &mut MachineConfig,
) -> Result<(), ParseErrorKind> {
    match section {
        Section::Root => return Err(ParseErrorKind::UnknownKey),
        Section::Stepping => {
            let s = &mut config.stepping;
            match key {
                "frequency_hz" => s.frequency_hz = parse_int(value)?,
                "pulse_width_us" => s.pulse_width_us = parse_int(value)?,
                _ => return Err(ParseErrorKind::UnknownKey),
            }
        }
        Section::Motion => {
            let m = &mut config.motion;
            match key {
                "max_rate" => m.max_rate = parse_int(value)?,
                "acceleration" => m.acceleration = parse_int(value)?,
                "travel" => m.travel = parse_int(value)?,
                "feed_rate" => m.feed_rate = parse_int(value)?,
                "seek_rate" => m.seek_rate = parse_int(value)?,
                _ => return Err(ParseErrorKind::UnknownKey),
            }
        }
        Section::Pump => {
            let p = &mut config.pump;
            match key {
                "pumps" => p.pumps = parse_int(value)?,
                "forward" => p.forward = parse_int(value)?,
                "nudge_rate" => p.nudge_rate = parse_int(value)?,
                _ => return Err(ParseErrorKind::UnknownKey),
            }
        }
        Section::Actuator => {
            let a = config
                .actuators
                .last_mut()
                .ok_or(ParseErrorKind::InvalidSection)?;
            match key {
                "step_pin" => a.step_pin = parse_pin(value)?,
                "dir_pin" => a.dir_pin = parse_pin(value)?,
                "enable_pin" => a.enable_pin = parse_pin(value)?,
                _ => return Err(ParseErrorKind::UnknownKey),
            }
        }
        Section::FlowPot => {
            let f = &mut config.flow_pot;
            match key {
                "channel" => f.channel = parse_int(value)?,
                "top_r" => f.divider.top_r = parse_float(value)?,
                "max_r" => f.divider.max_r = parse_float(value)?,
                "derate" => f.derate = parse_float(value)?,
                _ => return Err(ParseErrorKind::UnknownKey),
            }
        }
        Section::SetpointPot => {
            let s = config
                .setpoint_pot
                .as_mut()
                .ok_or(ParseErrorKind::InvalidSection)?;
            match key {
                "channel" => s.channel = parse_int(value)?,
                "top_r" => s.divider.top_r = parse_float(value)?,
                "max_r" => s.divider.max_r = parse_float(value)?,
                "min_temp" => s.min_temp = parse_float(value)?,
                "max_temp" => s.max_temp = parse_float(value)?,
                _ => return Err(ParseErrorKind::UnknownKey),
            }
        }
        Section::Thermistor => {
            let t = config
                .thermistors
                .last_mut()
                .ok_or(ParseErrorKind::InvalidSection)?;
            match key {
                "channel" => t.channel = parse_int(value)?,
                "t0" => t.t0 = parse_float(value)?,
                "tr" => t.tr = parse_float(value)?,
                "beta" => t.beta = parse_float(value)?,
                "pullup" => t.pullup = parse_float(value)?,
                _ => return Err(ParseErrorKind::UnknownKey),
            }
        }
        Section::Heater => match key {
            "zero_cross_pin" => config.heater_hw.zero_cross_pin = parse_pin(value)?,
            "gate_pin" => config.heater_hw.gate_pin = parse_pin(value)?,
            "enabled" => config.heater.enabled = parse_bool(value)?,
            "target_temp" => config.heater.target_temp = parse_float(value)?,
            "max_temp" => config.heater.max_temp = parse_float(value)?,
            "k_error" => config.heater.k_error = parse_float(value)?,
            "k_coupling" => config.heater.k_coupling = parse_float(value)?,
            "full_power" => config.heater.full_power = parse_float(value)?,
            "half_cycle_us" => config.heater.half_cycle_us = parse_float(value)?,
            "logging" => config.heater.logging = parse_bool(value)?,
            _ => return Err(ParseErrorKind::UnknownKey),
        },
    }
    Ok(())
}
