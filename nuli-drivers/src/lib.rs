//! Hardware driver implementations
//!
//! This crate provides concrete implementations of the traits defined
//! in nuli-core on top of `embedded-hal` digital outputs:
//!
//! - Step/dir/enable plunger stages
//! - Phase-cut heater gate

#![no_std]
#![deny(unsafe_code)]

pub mod heater;
pub mod stepper;
