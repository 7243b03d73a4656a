//! RF diode power meter built from an AD7791 ADC and an AD7415 temperature sensor.
//!
//! The drivers live in their own crates; this crate composes them into
//! [`sensor::RfDiodeSensor`], loads [`config::Config`] from the environment and
//! drives everything from the line oriented [`cli::Cli`].

pub mod cli;
pub mod config;
pub mod sensor;
