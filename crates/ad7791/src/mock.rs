//! Simulated AD7791 behind `embedded-hal` traits, for tests only.

use std::cell::RefCell;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital;
use embedded_hal::spi::{self, ErrorKind, Operation, SpiDevice};

use crate::registers::Register;

pub const POWER_ON_STATUS: u8 = 0x8C;
pub const POWER_ON_MODE: u8 = 0x02;
pub const POWER_ON_FILTER: u8 = 0x04;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A byte accepted by the communications register.
    Control(u8),
    /// A completed register write.
    Payload(Register, Vec<u8>),
    /// A register clocked out to the host.
    Read(Register),
    /// A register clocked out while the host was writing.
    Swallowed(Register),
    /// A read with nothing selected; DOUT idles high.
    StrayRead,
    Reset,
    /// The ready line was sampled.
    Poll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    Comms,
    Read(Register),
    Write(Register),
}

#[derive(Debug)]
pub struct Chip {
    pub status: u8,
    pub mode: u8,
    pub filter: u8,
    pub sample: [u8; 3],
    pub continuous_read: bool,
    /// Polls until the ready line goes low. `None` never becomes ready.
    pub ready_after: Option<u32>,
    pub spi_fails: bool,
    pub pin_fails: bool,
    pub elapsed_ns: u64,
    pub events: Vec<Event>,
    pending: Pending,
    payload: Vec<u8>,
    clocked: usize,
    ones: usize,
}

impl Chip {
    fn power_on(&mut self) {
        self.status = POWER_ON_STATUS;
        self.mode = POWER_ON_MODE;
        self.filter = POWER_ON_FILTER;
        self.continuous_read = false;
        self.pending = Pending::Comms;
        self.payload.clear();
        self.clocked = 0;
    }

    fn register(&self, register: Register) -> Vec<u8> {
        match register {
            Register::Status => vec![self.status],
            Register::Mode => vec![self.mode],
            Register::Filter => vec![self.filter],
            Register::Data => self.sample.to_vec(),
        }
    }

    /// One byte on DIN. 32 consecutive ones reset the chip from any state.
    fn write_byte(&mut self, byte: u8) {
        if byte == 0xFF {
            self.ones += 1;
        } else {
            self.ones = 0;
        }

        if self.ones == 4 {
            self.ones = 0;
            self.power_on();
            self.events.push(Event::Reset);
            return;
        }

        match self.pending {
            Pending::Write(register) => {
                self.payload.push(byte);

                if self.payload.len() == register.width() {
                    match register {
                        Register::Mode => self.mode = byte,
                        Register::Filter => self.filter = byte,
                        _ => {}
                    }

                    let payload = std::mem::take(&mut self.payload);
                    self.events.push(Event::Payload(register, payload));
                    self.pending = Pending::Comms;
                }

                return;
            }
            // DIN is ignored while a register is being clocked out
            Pending::Read(register) => {
                self.clocked += 1;

                if self.clocked == register.width() {
                    self.clocked = 0;
                    self.events.push(Event::Swallowed(register));
                    self.pending = Pending::Comms;
                }

                return;
            }
            Pending::Comms => {}
        }

        // WEN set, the communications register ignores it
        if byte & 0x80 != 0 {
            return;
        }

        self.events.push(Event::Control(byte));

        let register = match byte & 0x30 {
            0x00 => Register::Status,
            0x10 => Register::Mode,
            0x20 => Register::Filter,
            _ => Register::Data,
        };

        let read = byte & 0x08 != 0;
        let cread = byte & 0x04 != 0;

        self.continuous_read = read && cread && register == Register::Data;

        self.pending = match (read, self.continuous_read) {
            (true, true) => Pending::Comms,
            (true, false) => Pending::Read(register),
            (false, _) => Pending::Write(register),
        };
    }

    fn read_into(&mut self, words: &mut [u8]) {
        let source = match self.pending {
            Pending::Read(register) => {
                self.pending = Pending::Comms;
                self.clocked = 0;
                self.events.push(Event::Read(register));
                self.register(register)
            }
            Pending::Comms if self.continuous_read => {
                self.events.push(Event::Read(Register::Data));
                self.sample.to_vec()
            }
            _ => {
                self.events.push(Event::StrayRead);
                vec![0xFF; words.len()]
            }
        };

        for (word, value) in words.iter_mut().zip(source.into_iter().chain(std::iter::repeat(0xFF))) {
            *word = value;
        }
    }

    /// Everything but the ready line polls.
    pub fn bus_events(&self) -> Vec<Event> {
        self.events
            .iter()
            .filter(|event| !matches!(event, Event::Poll))
            .cloned()
            .collect()
    }

    pub fn polls(&self) -> usize {
        self.events.iter().filter(|event| **event == Event::Poll).count()
    }
}

#[derive(Debug, PartialEq)]
pub struct MockError;

impl spi::Error for MockError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

pub struct FakeBus(Rc<RefCell<Chip>>);

impl spi::ErrorType for FakeBus {
    type Error = MockError;
}

impl SpiDevice for FakeBus {
    fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), Self::Error> {
        let mut chip = self.0.borrow_mut();

        if chip.spi_fails {
            return Err(MockError);
        }

        for operation in operations {
            match operation {
                Operation::Write(words) => words.iter().for_each(|byte| chip.write_byte(*byte)),
                Operation::Read(words) => chip.read_into(words),
                _ => panic!("Not an expected operation"),
            }
        }

        Ok(())
    }
}

#[derive(Debug, PartialEq)]
pub struct PinError;

impl digital::Error for PinError {
    fn kind(&self) -> digital::ErrorKind {
        digital::ErrorKind::Other
    }
}

pub struct FakeReady(Rc<RefCell<Chip>>);

impl digital::ErrorType for FakeReady {
    type Error = PinError;
}

impl digital::InputPin for FakeReady {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        self.is_low().map(|low| !low)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        let mut chip = self.0.borrow_mut();

        if chip.pin_fails {
            return Err(PinError);
        }

        chip.events.push(Event::Poll);

        match chip.ready_after.as_mut() {
            Some(0) => Ok(true),
            Some(remaining) => {
                *remaining -= 1;
                Ok(*remaining == 0)
            }
            None => Ok(false),
        }
    }
}

pub struct FakeDelay(Rc<RefCell<Chip>>);

impl DelayNs for FakeDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.0.borrow_mut().elapsed_ns += u64::from(ns);
    }
}

/// A freshly powered chip plus the three peripherals wired to it.
pub fn wire() -> (Rc<RefCell<Chip>>, FakeBus, FakeReady, FakeDelay) {
    let mut chip = Chip {
        status: 0,
        mode: 0,
        filter: 0,
        sample: [0; 3],
        continuous_read: false,
        ready_after: Some(1),
        spi_fails: false,
        pin_fails: false,
        elapsed_ns: 0,
        events: Vec::new(),
        pending: Pending::Comms,
        payload: Vec::new(),
        clocked: 0,
        ones: 0,
    };

    chip.power_on();

    let chip = Rc::new(RefCell::new(chip));

    (
        chip.clone(),
        FakeBus(chip.clone()),
        FakeReady(chip.clone()),
        FakeDelay(chip),
    )
}
