//! Configuration types
//!
//! Board-agnostic configuration read once at start-up: the types, the
//! `pump.toml` parser and the validation that decides which subsystems are
//! allowed to run.

pub mod hardware;
pub mod parse;
pub mod types;
pub mod validate;

pub use hardware::*;
pub use parse::{parse_config, ParseError, ParseErrorKind};
pub use types::*;
pub use validate::ConfigError;
