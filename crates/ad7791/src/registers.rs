//! Communications register codec and the bit layouts of the mode and filter registers.

use core::str::FromStr;

use crate::InvalidArgument;

/// On-chip register selected by the RS1/RS0 bits of the communications register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Register {
    /// Status register, read only.
    Status = 0x00,
    /// Mode register.
    Mode = 0x10,
    /// Filter register.
    Filter = 0x20,
    /// Conversion result, read only.
    Data = 0x30,
}

impl Register {
    /// Payload width in bytes.
    pub const fn width(self) -> usize {
        match self {
            Self::Data => 3,
            Self::Status | Self::Mode | Self::Filter => 1,
        }
    }

    /// Whether the register accepts writes.
    pub const fn is_writable(self) -> bool {
        matches!(self, Self::Mode | Self::Filter)
    }
}

/// Direction of the operation following the communications byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Read,
    Write,
}

/// Analog input routed to the modulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Channel {
    /// AIN(+) - AIN(-)
    #[default]
    Differential = 0b00,
    /// AIN(-) - AIN(-), used for offset checks.
    Short = 0b10,
    /// VDD/5 against the internal 1.17 V reference.
    SupplyMonitor = 0b11,
}

/// A single byte written to the communications register.
///
/// Layout, MSB first: `WEN(0) 0 RS1 RS0 R/W CREAD CH1 CH0`.
///
/// Bit 7 is the write enable and must be zero, otherwise the chip ignores the
/// byte. Direction lives in bit 3 and continuous read in bit 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlByte(u8);

impl ControlByte {
    const READ: u8 = 0x08;
    const CREAD: u8 = 0x04;

    /// Encode a communications byte. `continuous_read` is only honoured for
    /// reads of the data register.
    pub const fn new(
        register: Register,
        direction: Direction,
        continuous_read: bool,
        channel: Channel,
    ) -> Self {
        let mut bits = register as u8 | channel as u8;

        if let Direction::Read = direction {
            bits |= Self::READ;

            if continuous_read && matches!(register, Register::Data) {
                bits |= Self::CREAD;
            }
        }

        Self(bits)
    }

    /// Plain read of `register` on the differential channel.
    pub const fn read(register: Register) -> Self {
        Self::new(register, Direction::Read, false, Channel::Differential)
    }

    /// Plain write of `register` on the differential channel.
    pub const fn write(register: Register) -> Self {
        Self::new(register, Direction::Write, false, Channel::Differential)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }
}

impl From<ControlByte> for u8 {
    fn from(byte: ControlByte) -> Self {
        byte.bits()
    }
}

/// Operating mode, bits 7..6 of the mode register.
///
/// The reserved encoding `0b01` has no variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Operation {
    Continuous = 0x00,
    Single = 0x80,
    PowerDown = 0xC0,
}

/// Output coding, bit 2 of the mode register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Coding {
    /// `0x000000` is negative full scale, `0x800000` is zero.
    #[default]
    Bipolar = 0x00,
    /// `0x000000` is zero, `0xFFFFFF` is just under full scale.
    Unipolar = 0x04,
}

impl Coding {
    /// Apply the datasheet transfer function to a 24-bit sample.
    pub fn to_volts(self, raw: u32, reference: f64) -> f64 {
        let raw = f64::from(raw & 0x00FF_FFFF);

        match self {
            Self::Unipolar => raw / 16_777_216.0 * reference,
            Self::Bipolar => (raw / 8_388_608.0 - 1.0) * reference,
        }
    }
}

/// Contents of the mode register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeConfig {
    pub operation: Operation,
    pub burnout: bool,
    pub coding: Coding,
    pub buffer: bool,
}

impl ModeConfig {
    const BURNOUT: u8 = 0x08;
    const BUFFER: u8 = 0x02;

    /// Buffered, burnout current off.
    pub const fn new(operation: Operation, coding: Coding) -> Self {
        Self {
            operation,
            burnout: false,
            coding,
            buffer: true,
        }
    }

    /// Encoded register byte. MR5, MR4 and MR0 are always zero.
    pub const fn bits(self) -> u8 {
        let mut bits = self.operation as u8 | self.coding as u8;

        if self.burnout {
            bits |= Self::BURNOUT;
        }

        if self.buffer {
            bits |= Self::BUFFER;
        }

        bits
    }
}

/// Modulator clock divider, bits 5..4 of the filter register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ClockDivider {
    #[default]
    Div1 = 0x00,
    Div2 = 0x10,
    Div4 = 0x20,
    Div8 = 0x30,
}

impl ClockDivider {
    pub const fn factor(self) -> u8 {
        match self {
            Self::Div1 => 1,
            Self::Div2 => 2,
            Self::Div4 => 4,
            Self::Div8 => 8,
        }
    }

    pub(crate) const fn from_bits(bits: u8) -> Self {
        match bits & 0x30 {
            0x00 => Self::Div1,
            0x10 => Self::Div2,
            0x20 => Self::Div4,
            _ => Self::Div8,
        }
    }

    /// Iterate over all dividers.
    pub fn all() -> impl Iterator<Item = Self> {
        [Self::Div1, Self::Div2, Self::Div4, Self::Div8].into_iter()
    }
}

impl TryFrom<u8> for ClockDivider {
    type Error = InvalidArgument;

    fn try_from(factor: u8) -> Result<Self, Self::Error> {
        match factor {
            1 => Ok(Self::Div1),
            2 => Ok(Self::Div2),
            4 => Ok(Self::Div4),
            8 => Ok(Self::Div8),
            _ => Err(InvalidArgument("clock divider must be 1, 2, 4 or 8")),
        }
    }
}

impl FromStr for ClockDivider {
    type Err = InvalidArgument;

    /// Accepts `CDIV1`..`CDIV8` (any case) or the bare factor.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        let factor = match s.get(..4) {
            Some(prefix) if prefix.eq_ignore_ascii_case("cdiv") => &s[4..],
            _ => s,
        };

        factor
            .parse::<u8>()
            .map_err(|_| InvalidArgument("unknown clock divider"))
            .and_then(Self::try_from)
    }
}

/// Output update rate, FS2..FS0 of the filter register.
///
/// The rates are those of the undivided clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum UpdateRate {
    Sps120 = 0,
    Sps100 = 1,
    Sps33_3 = 2,
    Sps20 = 3,
    /// 65 dB rejection of both 50 Hz and 60 Hz.
    #[default]
    Sps16_6 = 4,
    Sps16_7 = 5,
    Sps13_3 = 6,
    Sps9_5 = 7,
}

impl UpdateRate {
    const ALL: [Self; 8] = [
        Self::Sps120,
        Self::Sps100,
        Self::Sps33_3,
        Self::Sps20,
        Self::Sps16_6,
        Self::Sps16_7,
        Self::Sps13_3,
        Self::Sps9_5,
    ];

    /// Label as printed on the datasheet, without the unit.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Sps120 => "120",
            Self::Sps100 => "100",
            Self::Sps33_3 => "33.3",
            Self::Sps20 => "20",
            Self::Sps16_6 => "16.6",
            Self::Sps16_7 => "16.7",
            Self::Sps13_3 => "13.3",
            Self::Sps9_5 => "9.5",
        }
    }

    pub(crate) const fn from_bits(bits: u8) -> Self {
        Self::ALL[(bits & 0x07) as usize]
    }

    /// Iterate over all rates.
    pub fn all() -> impl Iterator<Item = Self> {
        Self::ALL.into_iter()
    }
}

impl FromStr for UpdateRate {
    type Err = InvalidArgument;

    /// Accepts the datasheet label with or without an `sps` suffix, e.g. `16.6sps`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let s = s.strip_suffix("sps").unwrap_or(s).trim_end();

        Self::all()
            .find(|rate| rate.label() == s)
            .ok_or(InvalidArgument("unknown update rate"))
    }
}

/// Contents of the filter register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FilterConfig {
    pub divider: ClockDivider,
    pub rate: UpdateRate,
}

impl FilterConfig {
    pub const fn new(divider: ClockDivider, rate: UpdateRate) -> Self {
        Self { divider, rate }
    }

    /// Encoded register byte. FR7, FR6 and FR3 are always zero.
    pub const fn bits(self) -> u8 {
        self.divider as u8 | self.rate as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_bytes() {
        assert_eq!(ControlByte::read(Register::Status).bits(), 0x08);
        assert_eq!(ControlByte::read(Register::Mode).bits(), 0x18);
        assert_eq!(ControlByte::write(Register::Mode).bits(), 0x10);
        assert_eq!(ControlByte::write(Register::Filter).bits(), 0x20);
        assert_eq!(ControlByte::read(Register::Data).bits(), 0x38);

        let cread = ControlByte::new(Register::Data, Direction::Read, true, Channel::Differential);
        assert_eq!(cread.bits(), 0x3C);

        let vdd = ControlByte::new(Register::Mode, Direction::Write, false, Channel::SupplyMonitor);
        assert_eq!(vdd.bits(), 0x13);
    }

    #[test]
    fn continuous_flag_only_for_data_reads() {
        let status = ControlByte::new(Register::Status, Direction::Read, true, Channel::Short);
        assert_eq!(status.bits(), 0x0A);

        let write = ControlByte::new(Register::Data, Direction::Write, true, Channel::Differential);
        assert_eq!(write.bits() & 0x04, 0);
    }

    #[test]
    fn write_enable_bit_is_never_set() {
        for register in [Register::Status, Register::Mode, Register::Filter, Register::Data] {
            for direction in [Direction::Read, Direction::Write] {
                for channel in [Channel::Differential, Channel::Short, Channel::SupplyMonitor] {
                    let byte = ControlByte::new(register, direction, true, channel).bits();
                    assert_eq!(byte & 0xC0, 0, "{byte:#04x}");
                }
            }
        }
    }

    #[test]
    fn mode_bits() {
        let single = ModeConfig::new(Operation::Single, Coding::Unipolar);
        assert_eq!(single.bits(), 0x86);

        let continuous = ModeConfig::new(Operation::Continuous, Coding::Bipolar);
        assert_eq!(continuous.bits(), 0x02);

        let mut everything = ModeConfig::new(Operation::PowerDown, Coding::Unipolar);
        everything.burnout = true;
        assert_eq!(everything.bits(), 0xCE);
        assert_eq!(everything.bits() & 0x31, 0);
    }

    #[test]
    fn filter_bits_leave_reserved_clear() {
        for divider in ClockDivider::all() {
            for rate in UpdateRate::all() {
                let bits = FilterConfig::new(divider, rate).bits();

                assert_eq!(bits & 0xC8, 0);
                assert_eq!(ClockDivider::from_bits(bits), divider);
                assert_eq!(UpdateRate::from_bits(bits), rate);
            }
        }

        assert_eq!(FilterConfig::default().bits(), 0x04);
        assert_eq!(FilterConfig::new(ClockDivider::Div8, UpdateRate::Sps9_5).bits(), 0x37);
    }

    #[test]
    fn parse_divider() {
        assert_eq!("CDIV1".parse(), Ok(ClockDivider::Div1));
        assert_eq!("cdiv4".parse(), Ok(ClockDivider::Div4));
        assert_eq!(" 8 ".parse(), Ok(ClockDivider::Div8));
        assert!("CDIV3".parse::<ClockDivider>().is_err());
        assert!("fast".parse::<ClockDivider>().is_err());
        assert!(ClockDivider::try_from(16).is_err());
    }

    #[test]
    fn parse_rate() {
        assert_eq!("16.6sps".parse(), Ok(UpdateRate::Sps16_6));
        assert_eq!("16.7".parse(), Ok(UpdateRate::Sps16_7));
        assert_eq!("9.5 sps".parse(), Ok(UpdateRate::Sps9_5));
        assert_eq!("120sps".parse(), Ok(UpdateRate::Sps120));
        assert!("50sps".parse::<UpdateRate>().is_err());
        assert!("".parse::<UpdateRate>().is_err());
    }

    #[test]
    fn unipolar_transfer_function() {
        let vref = 2.5;

        assert_eq!(Coding::Unipolar.to_volts(0x000000, vref), 0.0);
        assert_eq!(Coding::Unipolar.to_volts(0x800000, vref), vref / 2.0);

        let top = Coding::Unipolar.to_volts(0xFFFFFF, vref);
        let expected = vref * (16_777_215.0 / 16_777_216.0);
        assert!((top - expected).abs() < 1e-6);
        assert!(top < vref);
    }

    #[test]
    fn adjacent_codes_stay_distinct() {
        let vref = 2.5;

        for coding in [Coding::Unipolar, Coding::Bipolar] {
            let below = coding.to_volts(0xFFFFFE, vref);
            let top = coding.to_volts(0xFFFFFF, vref);

            assert!(top > below, "{coding:?}: {below} vs {top}");
        }

        assert_eq!(Coding::Unipolar.to_volts(0xFFFFFF, vref), 2.499_999_850_988_388);
        assert_eq!(Coding::Unipolar.to_volts(0x000001, vref), 2.5 / 16_777_216.0);
    }

    #[test]
    fn bipolar_transfer_function() {
        let vref = 1.2;

        assert_eq!(Coding::Bipolar.to_volts(0x000000, vref), -vref);
        assert_eq!(Coding::Bipolar.to_volts(0x800000, vref), 0.0);

        let top = Coding::Bipolar.to_volts(0xFFFFFF, vref);
        assert!(top > 0.0 && top < vref);
        assert!((top - vref).abs() < 1e-6);
    }
}
