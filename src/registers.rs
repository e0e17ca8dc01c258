//! MCP23S17 register map, I/O configuration bits and the fixture's chip layout.
//!
//! All offsets assume the chip is in `BANK = 0` addressing mode, which is the
//! power-on default and is never changed by this crate.

use std::fmt;

/// Register offsets on the MCP23S17
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Register {
    /// I/O direction A (1 = input, 0 = output)
    IoDirA = 0x00,
    /// I/O direction B
    IoDirB = 0x01,
    /// Input polarity A
    IPolA = 0x02,
    /// Input polarity B
    IPolB = 0x03,
    /// Interrupt-on-change enable A
    GpIntEnA = 0x04,
    /// Interrupt-on-change enable B
    GpIntEnB = 0x05,
    /// Interrupt default compare value A
    DefValA = 0x06,
    /// Interrupt default compare value B
    DefValB = 0x07,
    /// Interrupt control A
    IntConA = 0x08,
    /// Interrupt control B
    IntConB = 0x09,
    /// I/O configuration
    IoCon = 0x0A,
    /// I/O configuration (mirror of 0x0A)
    IoConAlt = 0x0B,
    /// Pull-up enable A
    GpPuA = 0x0C,
    /// Pull-up enable B
    GpPuB = 0x0D,
    /// Interrupt flag A
    IntFA = 0x0E,
    /// Interrupt flag B
    IntFB = 0x0F,
    /// Interrupt capture A
    IntCapA = 0x10,
    /// Interrupt capture B
    IntCapB = 0x11,
    /// Port A
    GpIoA = 0x12,
    /// Port B
    GpIoB = 0x13,
    /// Output latch A
    OLatA = 0x14,
    /// Output latch B
    OLatB = 0x15,
}

impl Register {
    pub const fn offset(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}(0x{:02x})", self, self.offset())
    }
}

/// IOCON bit encodings, both states of every bit. OR one of each pair
/// together to build a configuration byte. SEQOP is active low.
pub mod iocon {
    pub const BANK_OFF: u8 = 0x00;
    pub const BANK_ON: u8 = 0x80;
    pub const MIRROR_OFF: u8 = 0x00;
    pub const MIRROR_ON: u8 = 0x40;
    /// Sequential operation enabled (address pointer increments)
    pub const SEQOP_ON: u8 = 0x00;
    /// Sequential operation disabled
    pub const SEQOP_OFF: u8 = 0x20;
    pub const DISSLW_OFF: u8 = 0x00;
    pub const DISSLW_ON: u8 = 0x10;
    pub const HAEN_OFF: u8 = 0x00;
    /// Hardware address pins enabled
    pub const HAEN_ON: u8 = 0x08;
    /// INT pin driven push-pull
    pub const ODR_OFF: u8 = 0x00;
    /// INT pin configured as open drain
    pub const ODR_ON: u8 = 0x04;
    pub const INTPOL_LOW: u8 = 0x00;
    pub const INTPOL_HIGH: u8 = 0x02;

    /// Applied to every chip on the fixture: hardware addressing + open-drain INT.
    pub const FIXTURE: u8 = HAEN_ON | ODR_ON;
}

/// Direction register value meaning "all eight pins are outputs".
pub const ALL_OUTPUTS: u8 = 0x00;

/// Fixed `0100` prefix of the SPI control byte.
const ADDRESS_PREFIX: u8 = 0x40;

/// Address of one expander on the shared bus.
///
/// Is of the format `0 1 0 0 A2 A1 A0 0`; the R/W bit is only ever set while
/// encoding a read frame.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ChipAddress(u8);

impl ChipAddress {
    /// Build from the 3-bit value strapped on the A2..A0 pins.
    pub const fn from_pins(hardware_address: u8) -> Self {
        ChipAddress(ADDRESS_PREFIX | ((hardware_address & 0x07) << 1))
    }

    pub const fn raw(self) -> u8 {
        self.0
    }
}

impl fmt::Display for ChipAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02x}", self.0)
    }
}

pub const U1: ChipAddress = ChipAddress::from_pins(0); // Matrix 1 - Bank 1
pub const U2: ChipAddress = ChipAddress::from_pins(1); // Matrix 1 - Bank 2
pub const U3: ChipAddress = ChipAddress::from_pins(2); // Matrix 1 - Bank 3
pub const U4: ChipAddress = ChipAddress::from_pins(4); // Matrix 2 - Bank 1
pub const U5: ChipAddress = ChipAddress::from_pins(5); // Matrix 2 - Bank 2
pub const U6: ChipAddress = ChipAddress::from_pins(6); // Matrix 2 - Bank 3

/// Every chip on the bus, in configuration order.
pub const BANK_ADDRESSES: [ChipAddress; 6] = [U1, U2, U3, U4, U5, U6];

/// Chip exercised by the fixture self-test.
pub const FIXTURE_CHIP: ChipAddress = U6;

pub const PINS_PER_CHIP: u8 = 16;

/// One 8-pin half of a chip.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Half {
    A,
    B,
}

impl Half {
    pub const fn direction(self) -> Register {
        match self {
            Half::A => Register::IoDirA,
            Half::B => Register::IoDirB,
        }
    }

    pub const fn latch(self) -> Register {
        match self {
            Half::A => Register::OLatA,
            Half::B => Register::OLatB,
        }
    }
}

/// Split a logical pin 0..=15 into its half and bit offset 0..=7.
pub const fn locate(pin: u8) -> Option<(Half, u8)> {
    match pin {
        0..=7 => Some((Half::A, pin)),
        8..=15 => Some((Half::B, pin % 8)),
        _ => None,
    }
}

/// Requested level for a relay output.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PinState {
    /// Relay released
    Off,
    /// Relay latched
    On,
}

impl fmt::Display for PinState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PinState::Off => f.write_str("off"),
            PinState::On => f.write_str("on"),
        }
    }
}
