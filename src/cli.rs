//! Line oriented command interpreter with parse friendly output.
//!
//! Every response line starts with a `key:` or with `OK:`/`ERR:`, so the
//! output can be consumed by scripts as well as read by a person.

use std::io::{self, BufRead, Write};
use std::str::FromStr;
use std::thread;
use std::time::Duration;

use crate::sensor::{RfDiodeSensor, TemperatureSource, VoltageSource};

/// Readings taken by `l` without a count.
pub const DEFAULT_LOOP_COUNT: u32 = 10;

const HELP: &str = "\
OK: Commands: ? (help),       v (read voltage), t (read temperature),
              p (read power), a (read all),     l <count> (loop),
              r (dump ADC registers),           x (exit)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Help,
    Voltage,
    Temperature,
    Power,
    All,
    Loop(u32),
    Registers,
    Exit,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("Unknown command")]
    Unknown,
    #[error("Invalid count {0:?}")]
    InvalidCount(String),
    #[error("Unexpected argument {0:?}")]
    UnexpectedArgument(String),
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();

        let command = match words.next().ok_or(CommandError::Unknown)? {
            "?" => Self::Help,
            "v" => Self::Voltage,
            "t" => Self::Temperature,
            "p" => Self::Power,
            "a" => Self::All,
            "r" => Self::Registers,
            "x" => Self::Exit,
            "l" => match words.next() {
                Some(count) => Self::Loop(
                    count
                        .parse()
                        .map_err(|_| CommandError::InvalidCount(count.to_string()))?,
                ),
                None => Self::Loop(DEFAULT_LOOP_COUNT),
            },
            _ => return Err(CommandError::Unknown),
        };

        match words.next() {
            Some(extra) => Err(CommandError::UnexpectedArgument(extra.to_string())),
            None => Ok(command),
        }
    }
}

/// Interpreter for one session.
pub struct Cli<V, T, W> {
    sensor: RfDiodeSensor<V, T>,
    out: W,
    loop_interval: Duration,
    running: bool,
}

impl<V, T, W> Cli<V, T, W>
where
    V: VoltageSource,
    T: TemperatureSource,
    W: Write,
{
    pub fn new(sensor: RfDiodeSensor<V, T>, out: W, loop_interval: Duration) -> Self {
        Self {
            sensor,
            out,
            loop_interval,
            running: true,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Reads commands from `input` until `x` or end of input.
    pub fn run(&mut self, input: impl BufRead) -> io::Result<()> {
        writeln!(self.out, "RF Power Sensor CLI. Type ? for commands.")?;

        let mut lines = input.lines();

        while self.running {
            write!(self.out, "> ")?;
            self.out.flush()?;

            let Some(line) = lines.next() else {
                break;
            };

            self.handle_line(&line?)?;
        }

        Ok(())
    }

    /// Parses and executes one line. Blank lines are ignored.
    pub fn handle_line(&mut self, line: &str) -> io::Result<()> {
        if line.trim().is_empty() {
            return Ok(());
        }

        match line.parse() {
            Ok(command) => self.execute(command),
            Err(error) => writeln!(self.out, "ERR: {error}"),
        }
    }

    pub fn execute(&mut self, command: Command) -> io::Result<()> {
        tracing::debug!(?command, "Executing");

        match command {
            Command::Help => writeln!(self.out, "{HELP}"),
            Command::Voltage => match self.sensor.read_voltage() {
                Ok(voltage) => writeln!(self.out, "voltage: {voltage:.6}"),
                Err(error) => self.report(error),
            },
            Command::Temperature => match self.sensor.read_temperature() {
                Ok(temperature) => writeln!(self.out, "temperature: {temperature:.2}"),
                Err(error) => self.report(error),
            },
            Command::Power => match self.sensor.read_power() {
                Ok(power) => writeln!(self.out, "power: {power:.6}"),
                Err(error) => self.report(error),
            },
            Command::All => self.read_all(),
            Command::Loop(count) => self.run_loop(count),
            Command::Registers => match self.sensor.registers() {
                Ok(Some(dump)) => writeln!(self.out, "{dump}"),
                Ok(None) => writeln!(self.out, "ERR: No registers to dump"),
                Err(error) => self.report(error),
            },
            Command::Exit => {
                self.running = false;
                writeln!(self.out, "OK: Exiting CLI")
            }
        }
    }

    fn read_all(&mut self) -> io::Result<()> {
        match self.sensor.read_all() {
            Ok(reading) => writeln!(
                self.out,
                "voltage: {:.6} temperature: {:.2} power: {:.6}",
                reading.voltage, reading.temperature, reading.power
            ),
            Err(error) => self.report(error),
        }
    }

    fn run_loop(&mut self, count: u32) -> io::Result<()> {
        writeln!(self.out, "OK: Starting loop, Ctrl-C to interrupt")?;

        for index in 0..count {
            write!(self.out, "index: {index} ")?;
            self.read_all()?;
            self.out.flush()?;

            if index + 1 < count {
                thread::sleep(self.loop_interval);
            }
        }

        Ok(())
    }

    fn report(&mut self, error: anyhow::Error) -> io::Result<()> {
        tracing::warn!("{error:#}");
        writeln!(self.out, "ERR: {error:#}")
    }

    pub fn into_output(self) -> W {
        self.out
    }
}
