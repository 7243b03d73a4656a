use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{self, InputPin};
use embedded_hal::spi::{self, Operation, SpiDevice};

use crate::diagnostics::{FilterReport, ModeReport, StatusReport, Variant};
use crate::registers::{
    Channel, ClockDivider, Coding, ControlByte, Direction, FilterConfig, ModeConfig, Operation as Op,
    Register, UpdateRate,
};
use crate::{Error, InvalidArgument, MAX_REFERENCE_VOLTAGE, MIN_REFERENCE_VOLTAGE};

/// Error type of an [`Ad7791`] built from `SPI` and `RDY`.
pub type DeviceError<SPI, RDY> =
    Error<<SPI as spi::ErrorType>::Error, <RDY as digital::ErrorType>::Error>;

/// 32 ones return every register to its power-on value.
const RESET_SEQUENCE: [u8; 4] = [0xFF; 4];

/// Registers must not be accessed for 500 us after a reset.
const RESET_SETTLE_US: u32 = 500;

/// Conversion mode the driver believes the converter to be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConversionMode {
    /// Data may be clocked out without a preceding control byte.
    #[default]
    Continuous,
    /// Every data read is requested through the communications register.
    Single,
    PowerDown,
}

/// Attempt budget for the ready poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Polling {
    pub max_attempts: u32,
    pub interval_ms: u32,
}

impl Default for Polling {
    fn default() -> Self {
        Self {
            max_attempts: 2000,
            interval_ms: 1,
        }
    }
}

/// AD7790/AD7791 driver
pub struct Ad7791<SPI, RDY, D> {
    spi: SPI,
    ready: RDY,
    delay: D,
    reference: f64,
    polling: Polling,
    mode: ConversionMode,
    coding: Coding,
}

impl<SPI, RDY, D> Ad7791<SPI, RDY, D>
where
    SPI: SpiDevice,
    RDY: InputPin,
    D: DelayNs,
{
    /// Creates a new driver with a 2.5 V reference.
    ///
    /// The SPI device must run in mode 3 (CPOL = 1, CPHA = 1), MSB first. `ready`
    /// samples the DOUT/RDY line; it is never driven.
    pub fn new(spi: SPI, ready: RDY, delay: D) -> Self {
        Self {
            spi,
            ready,
            delay,
            reference: 2.5,
            polling: Polling::default(),
            mode: ConversionMode::default(),
            coding: Coding::default(),
        }
    }

    /// Releases the SPI device, ready pin and delay.
    pub fn release(self) -> (SPI, RDY, D) {
        (self.spi, self.ready, self.delay)
    }

    pub fn reference_voltage(&self) -> f64 {
        self.reference
    }

    /// Sets the reference voltage used to scale samples.
    ///
    /// Values outside 0.1 V..=5.0 V are rejected and the previous value is kept.
    pub fn set_reference_voltage(&mut self, volts: f64) -> Result<(), DeviceError<SPI, RDY>> {
        if !(MIN_REFERENCE_VOLTAGE..=MAX_REFERENCE_VOLTAGE).contains(&volts) {
            log::warn!("Rejected reference voltage {volts} V");
            return Err(InvalidArgument("reference voltage must be within 0.1 V..=5.0 V").into());
        }

        self.reference = volts;

        Ok(())
    }

    pub fn polling(&self) -> Polling {
        self.polling
    }

    /// Sets the budget used by [`read_voltage`](Self::read_voltage).
    pub fn set_polling(&mut self, polling: Polling) {
        self.polling = polling;
    }

    pub fn conversion_mode(&self) -> ConversionMode {
        self.mode
    }

    pub fn coding(&self) -> Coding {
        self.coding
    }

    /// Clocks out 32 ones, returning every register to its power-on value.
    ///
    /// The tracked conversion mode is left untouched.
    pub fn reset(&mut self) -> Result<(), DeviceError<SPI, RDY>> {
        self.spi.write(&RESET_SEQUENCE).map_err(Error::Spi)?;
        self.delay.delay_us(RESET_SETTLE_US);

        log::debug!("Reset issued");

        Ok(())
    }

    /// Resets the converter and identifies it from the power-on status.
    pub fn probe(&mut self) -> Result<Variant, DeviceError<SPI, RDY>> {
        self.reset()?;

        let status = self.read_status()?;

        let variant = match status {
            0x8C => Variant::Ad7791,
            0x88 => Variant::Ad7790,
            other => return Err(Error::UnexpectedStatus(other)),
        };

        log::info!("Detected {variant}");

        Ok(variant)
    }

    fn read_into(&mut self, register: Register, buffer: &mut [u8]) -> Result<(), DeviceError<SPI, RDY>> {
        let control = ControlByte::read(register).bits();

        self.spi
            .transaction(&mut [Operation::Write(&[control]), Operation::Read(buffer)])
            .map_err(Error::Spi)
    }

    fn read_byte(&mut self, register: Register) -> Result<u8, DeviceError<SPI, RDY>> {
        let mut buffer = [0];
        self.read_into(register, &mut buffer)?;
        Ok(buffer[0])
    }

    pub fn read_status(&mut self) -> Result<u8, DeviceError<SPI, RDY>> {
        self.read_byte(Register::Status)
    }

    pub fn read_mode(&mut self) -> Result<u8, DeviceError<SPI, RDY>> {
        self.read_byte(Register::Mode)
    }

    pub fn read_filter(&mut self) -> Result<u8, DeviceError<SPI, RDY>> {
        self.read_byte(Register::Filter)
    }

    /// Reads the data register through the communications register, without
    /// waiting for the ready line.
    pub fn read_data(&mut self) -> Result<[u8; 3], DeviceError<SPI, RDY>> {
        let mut buffer = [0; 3];
        self.read_into(Register::Data, &mut buffer)?;
        Ok(buffer)
    }

    /// Writes `payload` to a writable register in a single transaction.
    ///
    /// This bypasses the conversion mode tracking. Prefer
    /// [`set_filter`](Self::set_filter) and the conversion methods.
    pub fn write_register(
        &mut self,
        register: Register,
        payload: &[u8],
    ) -> Result<(), DeviceError<SPI, RDY>> {
        let expected = if register.is_writable() { register.width() } else { 0 };

        if payload.len() != expected || expected == 0 {
            return Err(Error::Protocol {
                register,
                expected,
                actual: payload.len(),
            });
        }

        let control = ControlByte::write(register).bits();

        log::debug!("Writing {register:?} register: {payload:02x?}");

        self.spi
            .transaction(&mut [Operation::Write(&[control]), Operation::Write(payload)])
            .map_err(Error::Spi)
    }

    fn write_mode(&mut self, config: ModeConfig) -> Result<(), DeviceError<SPI, RDY>> {
        self.write_register(Register::Mode, &[config.bits()])
    }

    /// Writes the filter register.
    pub fn set_filter(
        &mut self,
        divider: ClockDivider,
        rate: UpdateRate,
    ) -> Result<(), DeviceError<SPI, RDY>> {
        let config = FilterConfig::new(divider, rate);

        self.write_register(Register::Filter, &[config.bits()])
    }

    /// Starts one buffered, unipolar conversion of AIN(+) - AIN(-).
    ///
    /// Poll with [`read_raw_sample`](Self::read_raw_sample) or
    /// [`read_voltage`](Self::read_voltage) afterwards.
    pub fn start_single_unipolar_conversion(&mut self) -> Result<(), DeviceError<SPI, RDY>> {
        self.write_mode(ModeConfig::new(Op::Single, Coding::Unipolar))?;

        self.mode = ConversionMode::Single;
        self.coding = Coding::Unipolar;

        Ok(())
    }

    /// Selects continuous conversion with the given coding.
    ///
    /// The data register still has to be requested per sample until
    /// [`start_continuous_conversion`](Self::start_continuous_conversion) is called.
    pub fn set_coding(&mut self, coding: Coding) -> Result<(), DeviceError<SPI, RDY>> {
        self.write_mode(ModeConfig::new(Op::Continuous, coding))?;

        self.mode = ConversionMode::Continuous;
        self.coding = coding;

        Ok(())
    }

    /// Puts the interface into continuous read, after which every conversion
    /// can be clocked out without a control byte.
    pub fn start_continuous_conversion(&mut self) -> Result<(), DeviceError<SPI, RDY>> {
        let control =
            ControlByte::new(Register::Data, Direction::Read, true, Channel::Differential).bits();

        self.spi.write(&[control]).map_err(Error::Spi)?;

        log::debug!("Continuous read started");

        self.mode = ConversionMode::Continuous;

        Ok(())
    }

    /// Stops conversions, keeping the current coding.
    pub fn power_down(&mut self) -> Result<(), DeviceError<SPI, RDY>> {
        self.write_mode(ModeConfig::new(Op::PowerDown, self.coding))?;

        self.mode = ConversionMode::PowerDown;

        Ok(())
    }

    /// Waits for the ready line to go low. Returns the attempt it went low on.
    fn wait_ready(&mut self, max_attempts: u32, interval_ms: u32) -> Result<u32, DeviceError<SPI, RDY>> {
        for attempt in 1..=max_attempts {
            self.delay.delay_ms(interval_ms);

            let ready = self.ready.is_low().map_err(Error::Pin)?;

            log::trace!("Ready poll {attempt}/{max_attempts}: {ready}");

            if ready {
                return Ok(attempt);
            }
        }

        log::warn!("No conversion after {max_attempts} polls of {interval_ms} ms");

        Err(Error::Timeout {
            attempts: max_attempts,
        })
    }

    /// Waits for a conversion and clocks out the 24-bit result, MSB first.
    ///
    /// In single conversion mode the data register is requested before
    /// polling; in continuous mode the interface is expected to be in
    /// continuous read already. Nothing is read on timeout.
    pub fn read_raw_sample(
        &mut self,
        max_attempts: u32,
        interval_ms: u32,
    ) -> Result<[u8; 3], DeviceError<SPI, RDY>> {
        match self.mode {
            ConversionMode::PowerDown => return Err(Error::NotConverting),
            ConversionMode::Single => {
                let control = ControlByte::read(Register::Data).bits();
                self.spi.write(&[control]).map_err(Error::Spi)?;
            }
            ConversionMode::Continuous => {}
        }

        let attempt = self.wait_ready(max_attempts, interval_ms)?;

        let mut sample = [0; 3];
        self.spi.read(&mut sample).map_err(Error::Spi)?;

        log::debug!("Sample {sample:02x?} after {attempt} polls");

        Ok(sample)
    }

    /// Reads a sample with the configured [`Polling`] and scales it with the
    /// coding selected by the last conversion command.
    pub fn read_voltage(&mut self) -> Result<f64, DeviceError<SPI, RDY>> {
        self.read_voltage_with(self.coding)
    }

    /// Reads a sample with the configured [`Polling`] and scales it with `coding`.
    pub fn read_voltage_with(&mut self, coding: Coding) -> Result<f64, DeviceError<SPI, RDY>> {
        let Polling {
            max_attempts,
            interval_ms,
        } = self.polling;

        let [high, mid, low] = self.read_raw_sample(max_attempts, interval_ms)?;
        let raw = u32::from_be_bytes([0, high, mid, low]);

        Ok(coding.to_volts(raw, self.reference))
    }

    pub fn status_report(&mut self) -> Result<StatusReport, DeviceError<SPI, RDY>> {
        self.read_status().map(StatusReport::decode)
    }

    pub fn mode_report(&mut self) -> Result<ModeReport, DeviceError<SPI, RDY>> {
        self.read_mode().map(ModeReport::decode)
    }

    pub fn filter_report(&mut self) -> Result<FilterReport, DeviceError<SPI, RDY>> {
        self.read_filter().map(FilterReport::decode)
    }
}
