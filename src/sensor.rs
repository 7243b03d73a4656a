//! Voltage and temperature sources, and the RF diode composition built on them.

use ad7415::Ad7415;
use ad7791::{Ad7791, FilterConfig};
use anyhow::Context;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::InputPin;
use embedded_hal::i2c::I2c;
use embedded_hal::spi::SpiDevice;

/// Temperature at which the diode response is taken as nominal.
pub const NOMINAL_TEMPERATURE: f64 = 25.0;

/// Relative change of the diode response per degree Celsius.
pub const TEMPERATURE_COEFFICIENT: f64 = 0.01;

/// Something that measures a voltage.
pub trait VoltageSource {
    fn read_voltage(&mut self) -> anyhow::Result<f64>;

    /// Human readable register dump, if the source has one.
    fn registers(&mut self) -> anyhow::Result<Option<String>> {
        Ok(None)
    }
}

/// Something that measures a temperature in degrees Celsius.
pub trait TemperatureSource {
    fn read_temperature(&mut self) -> anyhow::Result<f64>;
}

/// Diode voltage measured with single unipolar conversions of an AD7791.
pub struct VoltageSensor<SPI, RDY, D> {
    adc: Ad7791<SPI, RDY, D>,
    filter: FilterConfig,
}

impl<SPI, RDY, D> VoltageSensor<SPI, RDY, D>
where
    SPI: SpiDevice,
    SPI::Error: Send + Sync + 'static,
    RDY: InputPin,
    RDY::Error: Send + Sync + 'static,
    D: DelayNs,
{
    /// Resets the converter and programs `filter`.
    pub fn new(mut adc: Ad7791<SPI, RDY, D>, filter: FilterConfig) -> anyhow::Result<Self> {
        adc.reset().context("Failed to reset the ADC")?;
        adc.set_filter(filter.divider, filter.rate)
            .context("Failed to write the ADC filter register")?;

        tracing::info!(
            divider = filter.divider.factor(),
            rate = filter.rate.label(),
            reference = adc.reference_voltage(),
            "Voltage sensor ready"
        );

        Ok(Self { adc, filter })
    }

    /// Brings the interface back to a known state after a timed out read.
    ///
    /// The data request sent before polling is still open on the chip and
    /// would swallow the next register write.
    fn resync(&mut self) -> anyhow::Result<()> {
        tracing::debug!("Resetting the ADC after a timeout");

        self.adc.reset().context("Failed to reset the ADC")?;
        self.adc
            .set_filter(self.filter.divider, self.filter.rate)
            .context("Failed to write the ADC filter register")?;

        Ok(())
    }
}

impl<SPI, RDY, D> VoltageSource for VoltageSensor<SPI, RDY, D>
where
    SPI: SpiDevice,
    SPI::Error: Send + Sync + 'static,
    RDY: InputPin,
    RDY::Error: Send + Sync + 'static,
    D: DelayNs,
{
    fn read_voltage(&mut self) -> anyhow::Result<f64> {
        self.adc.start_single_unipolar_conversion()?;

        match self.adc.read_voltage() {
            Err(error) if error.is_timeout() => {
                self.resync()?;
                Err(error.into())
            }
            result => Ok(result?),
        }
    }

    fn registers(&mut self) -> anyhow::Result<Option<String>> {
        let status = self.adc.status_report()?;
        let mode = self.adc.mode_report()?;
        let filter = self.adc.filter_report()?;

        Ok(Some(format!("{status}\n{mode}\n{filter}")))
    }
}

/// Board temperature from an AD7415.
pub struct TemperatureSensor<I2C> {
    sensor: Ad7415<I2C>,
}

impl<I2C> TemperatureSensor<I2C>
where
    I2C: I2c,
{
    pub fn new(sensor: Ad7415<I2C>) -> Self {
        Self { sensor }
    }
}

impl<I2C> TemperatureSource for TemperatureSensor<I2C>
where
    I2C: I2c,
{
    fn read_temperature(&mut self) -> anyhow::Result<f64> {
        self.sensor
            .read_temperature()
            .map(f64::from)
            .map_err(|error| anyhow::anyhow!("I2C read of AD7415 failed: {error:?}"))
    }
}

/// One set of measurements.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub voltage: f64,
    pub temperature: f64,
    pub power: f64,
}

/// Temperature compensated diode power estimate.
pub fn power(voltage: f64, temperature: f64) -> f64 {
    voltage * (1.0 + TEMPERATURE_COEFFICIENT * (temperature - NOMINAL_TEMPERATURE))
}

/// RF detector diode read through a voltage source, compensated with a
/// temperature source.
pub struct RfDiodeSensor<V, T> {
    voltage: V,
    temperature: T,
}

impl<V: VoltageSource, T: TemperatureSource> RfDiodeSensor<V, T> {
    pub fn new(voltage: V, temperature: T) -> Self {
        Self {
            voltage,
            temperature,
        }
    }

    pub fn read_voltage(&mut self) -> anyhow::Result<f64> {
        self.voltage.read_voltage()
    }

    pub fn read_temperature(&mut self) -> anyhow::Result<f64> {
        self.temperature.read_temperature()
    }

    pub fn read_power(&mut self) -> anyhow::Result<f64> {
        Ok(self.read_all()?.power)
    }

    /// Reads voltage and temperature once each and derives the power from them.
    pub fn read_all(&mut self) -> anyhow::Result<Reading> {
        let voltage = self.read_voltage()?;
        let temperature = self.read_temperature()?;

        Ok(Reading {
            voltage,
            temperature,
            power: power(voltage, temperature),
        })
    }

    pub fn registers(&mut self) -> anyhow::Result<Option<String>> {
        self.voltage.registers()
    }
}
