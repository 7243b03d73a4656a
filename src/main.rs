//! RF power meter on a Raspberry Pi.
//!
//! The AD7791 hangs off SPI with DOUT/RDY also wired to `RFMETER_READY_PIN`;
//! the AD7415 sits on I2C. See [`rfmeter::config`] for the environment variables.

use std::io;

use ad7415::Ad7415;
use ad7791::Ad7791;
use anyhow::{bail, Context};
use embedded_hal_bus::spi::ExclusiveDevice;
use rfmeter::cli::Cli;
use rfmeter::config::Config;
use rfmeter::sensor::{RfDiodeSensor, TemperatureSensor, VoltageSensor};
use rppal::gpio::Gpio;
use rppal::hal::Delay;
use rppal::i2c::I2c;
use rppal::spi::{Bus, Mode, SlaveSelect, Spi};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn spi_bus(index: u8) -> anyhow::Result<Bus> {
    Ok(match index {
        0 => Bus::Spi0,
        1 => Bus::Spi1,
        2 => Bus::Spi2,
        3 => Bus::Spi3,
        4 => Bus::Spi4,
        5 => Bus::Spi5,
        6 => Bus::Spi6,
        _ => bail!("There is no SPI bus {index}"),
    })
}

fn slave_select(index: u8) -> anyhow::Result<SlaveSelect> {
    Ok(match index {
        0 => SlaveSelect::Ss0,
        1 => SlaveSelect::Ss1,
        2 => SlaveSelect::Ss2,
        _ => bail!("There is no slave select {index}"),
    })
}

fn main() -> Result<(), anyhow::Error> {
    // Logs go to stderr so stdout stays parseable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rfmeter=info,ad7791=info,ad7415=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let config = Config::from_env()?;

    let gpio = Gpio::new().context("Failed to open GPIO")?;

    // AD7791 samples on the rising edge with SCLK idling high
    let spi = Spi::new(
        spi_bus(config.spi_bus)?,
        slave_select(config.spi_slave)?,
        config.spi_clock_hz,
        Mode::Mode3,
    )
    .context("Failed to open SPI")?;

    let cs = gpio.get(config.cs_pin)?.into_output_high();
    let ready = gpio.get(config.ready_pin)?.into_input();

    let spi = ExclusiveDevice::new_no_delay(spi, cs);

    let mut adc = Ad7791::new(spi, ready, Delay::new());

    adc.set_reference_voltage(config.reference_voltage)
        .context("Failed to set the reference voltage")?;
    adc.set_polling(config.polling);

    match adc.probe() {
        Ok(variant) => tracing::info!(%variant, "ADC found"),
        Err(error) => tracing::warn!("ADC probe failed: {error}"),
    }

    let voltage = VoltageSensor::new(adc, config.filter)?;

    let i2c = I2c::with_bus(config.i2c_bus).context("Failed to open I2C")?;
    let temperature = TemperatureSensor::new(Ad7415::with_address(i2c, config.temperature_address));

    let sensor = RfDiodeSensor::new(voltage, temperature);

    let mut cli = Cli::new(sensor, io::stdout().lock(), config.loop_interval);

    cli.run(io::stdin().lock())?;

    Ok(())
}
