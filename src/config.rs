//! Runtime configuration, read from `RFMETER_*` environment variables.
//!
//! | variable | default |
//! |---|---|
//! | `RFMETER_SPI_BUS` | `0` |
//! | `RFMETER_SPI_SLAVE` | `0` |
//! | `RFMETER_SPI_CLOCK_HZ` | `100000` |
//! | `RFMETER_CS_PIN` | `24` |
//! | `RFMETER_READY_PIN` | `25` |
//! | `RFMETER_I2C_BUS` | `1` |
//! | `RFMETER_TEMPERATURE_ADDRESS` | `0x49` |
//! | `RFMETER_REFERENCE_VOLTAGE` | `2.5` |
//! | `RFMETER_CLOCK_DIVIDER` | `CDIV1` |
//! | `RFMETER_UPDATE_RATE` | `16.6sps` |
//! | `RFMETER_POLL_ATTEMPTS` | `2000` |
//! | `RFMETER_POLL_INTERVAL_MS` | `1` |
//! | `RFMETER_LOOP_INTERVAL_MS` | `200` |

use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use ad7791::{ClockDivider, FilterConfig, Polling, UpdateRate};
use anyhow::{anyhow, ensure};

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub spi_bus: u8,
    pub spi_slave: u8,
    pub spi_clock_hz: u32,
    /// GPIO toggled as chip select around every transaction.
    ///
    /// DOUT/RDY floats while CS is high, so the ready poll only sees the
    /// converter if CS stays low. Tie the AD7791 CS low and point this at a
    /// spare GPIO.
    pub cs_pin: u8,
    /// GPIO wired to DOUT/RDY.
    pub ready_pin: u8,
    pub i2c_bus: u8,
    pub temperature_address: u8,
    pub reference_voltage: f64,
    pub filter: FilterConfig,
    pub polling: Polling,
    /// Pause between readings of the `l` command.
    pub loop_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            spi_bus: 0,
            spi_slave: 0,
            spi_clock_hz: 100_000,
            cs_pin: 24,
            ready_pin: 25,
            i2c_bus: 1,
            temperature_address: ad7415::DEFAULT_ADDRESS,
            reference_voltage: 2.5,
            filter: FilterConfig::new(ClockDivider::Div1, UpdateRate::Sps16_6),
            polling: Polling::default(),
            loop_interval: Duration::from_millis(200),
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds a configuration from `lookup`, falling back to the defaults for
    /// unset variables.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();

        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let reference_voltage = parse(&var, "RFMETER_REFERENCE_VOLTAGE", defaults.reference_voltage)?;
        ensure!(
            (ad7791::MIN_REFERENCE_VOLTAGE..=ad7791::MAX_REFERENCE_VOLTAGE).contains(&reference_voltage),
            "RFMETER_REFERENCE_VOLTAGE must be within {} V..={} V, got {reference_voltage}",
            ad7791::MIN_REFERENCE_VOLTAGE,
            ad7791::MAX_REFERENCE_VOLTAGE,
        );

        let polling = Polling {
            max_attempts: parse(&var, "RFMETER_POLL_ATTEMPTS", defaults.polling.max_attempts)?,
            interval_ms: parse(&var, "RFMETER_POLL_INTERVAL_MS", defaults.polling.interval_ms)?,
        };
        ensure!(polling.max_attempts > 0, "RFMETER_POLL_ATTEMPTS must be at least 1");

        let config = Self {
            spi_bus: parse(&var, "RFMETER_SPI_BUS", defaults.spi_bus)?,
            spi_slave: parse(&var, "RFMETER_SPI_SLAVE", defaults.spi_slave)?,
            spi_clock_hz: parse(&var, "RFMETER_SPI_CLOCK_HZ", defaults.spi_clock_hz)?,
            cs_pin: parse(&var, "RFMETER_CS_PIN", defaults.cs_pin)?,
            ready_pin: parse(&var, "RFMETER_READY_PIN", defaults.ready_pin)?,
            i2c_bus: parse(&var, "RFMETER_I2C_BUS", defaults.i2c_bus)?,
            temperature_address: match var("RFMETER_TEMPERATURE_ADDRESS") {
                Some(value) => parse_address(&value)?,
                None => defaults.temperature_address,
            },
            reference_voltage,
            filter: FilterConfig::new(
                parse(&var, "RFMETER_CLOCK_DIVIDER", defaults.filter.divider)?,
                parse(&var, "RFMETER_UPDATE_RATE", defaults.filter.rate)?,
            ),
            polling,
            loop_interval: Duration::from_millis(parse(
                &var,
                "RFMETER_LOOP_INTERVAL_MS",
                defaults.loop_interval.as_millis() as u64,
            )?),
        };

        tracing::debug!(?config, "Configuration loaded");

        Ok(config)
    }
}

fn parse<T>(var: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match var(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|error| anyhow!("{name}={value:?} is invalid: {error}")),
        None => Ok(default),
    }
}

/// Accepts `0x`-prefixed hex or decimal 7-bit addresses.
fn parse_address(value: &str) -> anyhow::Result<u8> {
    let value = value.trim();

    let address = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => value.parse(),
    }
    .map_err(|error| anyhow!("RFMETER_TEMPERATURE_ADDRESS={value:?} is invalid: {error}"))?;

    ensure!(
        address < 0x80,
        "RFMETER_TEMPERATURE_ADDRESS must be a 7-bit address, got {address:#04x}"
    );

    Ok(address)
}
