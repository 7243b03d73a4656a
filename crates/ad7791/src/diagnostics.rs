//! Human readable decoding of the status, mode and filter registers.
//!
//! Decoding never fails: reserved encodings and reserved bits that read back
//! set are reported as part of the description.

use core::fmt;

use crate::registers::{Channel, ClockDivider, Coding, Operation, UpdateRate};

/// Converter variant, from bit 2 of the status register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// 16-bit part.
    Ad7790,
    /// 24-bit part.
    Ad7791,
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ad7790 => f.write_str("AD7790"),
            Self::Ad7791 => f.write_str("AD7791"),
        }
    }
}

fn channel_name(channel: Option<Channel>) -> &'static str {
    match channel {
        Some(Channel::Differential) => "AIN(+)-AIN(-)",
        Some(Channel::Short) => "AIN(-)-AIN(-) short",
        Some(Channel::SupplyMonitor) => "VDD monitor",
        None => "reserved",
    }
}

/// Decoded status register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusReport {
    pub raw: u8,
    /// A conversion result is waiting (RDY bit clear).
    pub ready: bool,
    /// Overrange, underrange or reference detect error.
    pub error: bool,
    pub variant: Variant,
    /// `None` for the reserved encoding `0b01`.
    pub channel: Option<Channel>,
}

impl StatusReport {
    pub fn decode(raw: u8) -> Self {
        let channel = match raw & 0x03 {
            0b00 => Some(Channel::Differential),
            0b10 => Some(Channel::Short),
            0b11 => Some(Channel::SupplyMonitor),
            _ => None,
        };

        Self {
            raw,
            ready: raw & 0x80 == 0,
            error: raw & 0x40 != 0,
            variant: if raw & 0x04 != 0 {
                Variant::Ad7791
            } else {
                Variant::Ad7790
            },
            channel,
        }
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "status register: {:#04x}", self.raw)?;
        writeln!(f, "{}", if self.ready { "ready" } else { "not ready" })?;
        writeln!(f, "{}", if self.error { "ADC error" } else { "ADC OK" })?;
        writeln!(f, "variant {}", self.variant)?;
        write!(f, "channel {}", channel_name(self.channel))
    }
}

/// Decoded mode register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeReport {
    pub raw: u8,
    /// `None` for the reserved encoding `0b01`.
    pub operation: Option<Operation>,
    /// MR5 or MR4 read back set.
    pub mr5_mr4_set: bool,
    /// MR0 read back set.
    pub mr0_set: bool,
    pub burnout: bool,
    pub coding: Coding,
    pub buffer: bool,
}

impl ModeReport {
    pub fn decode(raw: u8) -> Self {
        let operation = match raw & 0xC0 {
            0x00 => Some(Operation::Continuous),
            0x80 => Some(Operation::Single),
            0xC0 => Some(Operation::PowerDown),
            _ => None,
        };

        Self {
            raw,
            operation,
            mr5_mr4_set: raw & 0x30 != 0,
            mr0_set: raw & 0x01 != 0,
            burnout: raw & 0x08 != 0,
            coding: if raw & 0x04 != 0 {
                Coding::Unipolar
            } else {
                Coding::Bipolar
            },
            buffer: raw & 0x02 != 0,
        }
    }

    /// Whether any bit that must be zero is set, including the reserved operation.
    pub fn reserved_violation(&self) -> bool {
        self.operation.is_none() || self.mr5_mr4_set || self.mr0_set
    }
}

impl fmt::Display for ModeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "mode register: {:#04x}", self.raw)?;

        let operation = match self.operation {
            Some(Operation::Continuous) => "continuous conversion mode",
            Some(Operation::Single) => "single conversion mode",
            Some(Operation::PowerDown) => "power down mode",
            None => "reserved mode",
        };
        writeln!(f, "{operation}")?;

        if self.mr5_mr4_set {
            writeln!(f, "!!! MR5, MR4 must be 0")?;
        }

        writeln!(
            f,
            "burnout current {}",
            if self.burnout { "enabled" } else { "disabled" }
        )?;

        match self.coding {
            Coding::Unipolar => writeln!(f, "unipolar coding")?,
            Coding::Bipolar => writeln!(f, "bipolar coding")?,
        }

        write!(f, "buffer {}", if self.buffer { "enabled" } else { "disabled" })?;

        if self.mr0_set {
            write!(f, "\n!!! MR0 must be 0")?;
        }

        Ok(())
    }
}

/// Decoded filter register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterReport {
    pub raw: u8,
    /// FR7 or FR6 read back set.
    pub fr7_fr6_set: bool,
    /// FR3 read back set.
    pub fr3_set: bool,
    pub divider: ClockDivider,
    pub rate: UpdateRate,
}

impl FilterReport {
    pub fn decode(raw: u8) -> Self {
        Self {
            raw,
            fr7_fr6_set: raw & 0xC0 != 0,
            fr3_set: raw & 0x08 != 0,
            divider: ClockDivider::from_bits(raw),
            rate: UpdateRate::from_bits(raw),
        }
    }

    pub fn reserved_violation(&self) -> bool {
        self.fr7_fr6_set || self.fr3_set
    }
}

impl fmt::Display for FilterReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "filter register: {:#04x}", self.raw)?;

        if self.fr7_fr6_set {
            writeln!(f, "!!! FR7, FR6 must be 0")?;
        }

        match self.divider {
            ClockDivider::Div1 => writeln!(f, "normal mode")?,
            divider => writeln!(f, "clock divided by {}", divider.factor())?,
        }

        if self.fr3_set {
            writeln!(f, "!!! FR3 must be 0")?;
        }

        write!(f, "update rate {} sps", self.rate.label())
    }
}
