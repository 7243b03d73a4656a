//! Provides a driver for the Analog Devices AD7790/AD7791 24-bit sigma-delta ADC via the `embedded-hal` ecosystem.
//!
//! The converter is accessed through its communications register: every
//! transaction starts with a [`ControlByte`] that selects the target register,
//! the direction and the input channel. Conversion results are announced on
//! the shared DOUT/RDY line, which the driver samples through a separate
//! [`InputPin`](embedded_hal::digital::InputPin) without touching the bus.
//!
//! ```ignore
//! let mut adc = Ad7791::new(spi, ready_pin, delay);
//!
//! adc.reset()?;
//! adc.set_filter(ClockDivider::Div1, UpdateRate::Sps16_6)?;
//! adc.start_single_unipolar_conversion()?;
//!
//! let volts = adc.read_voltage()?;
//! ```

#![cfg_attr(not(test), no_std)]
#![forbid(unsafe_code)]

mod device;
pub mod diagnostics;
pub mod registers;

#[cfg(test)]
mod mock;

pub use device::{Ad7791, ConversionMode, DeviceError, Polling};
pub use diagnostics::{FilterReport, ModeReport, StatusReport, Variant};
pub use registers::{
    Channel, ClockDivider, Coding, ControlByte, Direction, FilterConfig, ModeConfig, Operation,
    Register, UpdateRate,
};

/// Lowest accepted reference voltage.
pub const MIN_REFERENCE_VOLTAGE: f64 = 0.1;

/// Highest accepted reference voltage.
pub const MAX_REFERENCE_VOLTAGE: f64 = 5.0;

/// A parameter outside its closed set of values. Raised before any bus activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid argument: {0}")]
pub struct InvalidArgument(pub &'static str);

/// Errors raised by [`Ad7791`].
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum Error<SpiE, PinE> {
    /// The SPI transport failed.
    #[error("SPI transfer failed: {0:?}")]
    Spi(SpiE),

    /// The ready line could not be sampled.
    #[error("ready pin read failed: {0:?}")]
    Pin(PinE),

    /// A parameter was rejected before reaching the bus.
    #[error(transparent)]
    InvalidArgument(#[from] InvalidArgument),

    /// Payload width does not match the register, or the register is read only.
    #[error("{register:?} register takes {expected} byte(s) on write, got {actual}")]
    Protocol {
        register: Register,
        expected: usize,
        actual: usize,
    },

    /// The ready line never went low within the attempt budget.
    #[error("conversion not ready after {attempts} attempts")]
    Timeout { attempts: u32 },

    /// A sample was requested while the converter is powered down.
    #[error("converter is powered down")]
    NotConverting,

    /// The status register after reset matches no known variant.
    #[error("unexpected status {0:#04x} after reset")]
    UnexpectedStatus(u8),
}

impl<SpiE, PinE> Error<SpiE, PinE> {
    /// Whether retrying the read may succeed.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
