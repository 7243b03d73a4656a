//! Provides a driver for the Analog Devices AD7415 10-bit temperature sensor via the `embedded-hal` ecosystem.

#![no_std]
#![forbid(unsafe_code)]

use embedded_hal::i2c::I2c;

/// Address of an AD7415-0 with AS tied to GND.
pub const DEFAULT_ADDRESS: u8 = 0x49;

/// Temperature value register.
const TEMPERATURE: u8 = 0x00;

/// Degrees Celsius per LSB.
const RESOLUTION: f32 = 0.25;

/// AD7415 driver
pub struct Ad7415<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C: I2c> Ad7415<I2C> {
    /// Creates a new driver at [`DEFAULT_ADDRESS`].
    pub fn new(i2c: I2C) -> Self {
        Self::with_address(i2c, DEFAULT_ADDRESS)
    }

    /// Creates a new driver at `address`.
    ///
    /// AD7415-0 answers on 0x48 (AS floating), 0x49 (GND) or 0x4A (VDD);
    /// AD7415-1 on 0x4C, 0x4D or 0x4E.
    pub fn with_address(i2c: I2C, address: u8) -> Self {
        Self { i2c, address }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    /// Reads the temperature in degrees Celsius.
    pub fn read_temperature(&mut self) -> Result<f32, I2C::Error> {
        let mut buffer = [0; 2];

        self.i2c
            .write_read(self.address, &[TEMPERATURE], &mut buffer)?;

        let celsius = raw_to_celsius(buffer);

        log::trace!("Temperature register {buffer:02x?}: {celsius} C");

        Ok(celsius)
    }

    pub fn release(self) -> I2C {
        self.i2c
    }
}

/// Converts the temperature register, MSB first, to degrees Celsius.
///
/// The value is a 10-bit two's complement number in bits 15..6.
pub fn raw_to_celsius(bytes: [u8; 2]) -> f32 {
    let value = i16::from_be_bytes(bytes) >> 6;

    f32::from(value) * RESOLUTION
}
