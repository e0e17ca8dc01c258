//! 3-byte SPI frames for single register access.
//!
//! Write: `[address | W, register, value]`, the reply is ignored.
//! Read:  `[address | R, register, dummy]`, the value comes back in byte 2.

use crate::registers::{ChipAddress, Register};

pub const FRAME_LEN: usize = 3;

pub const WRITE_CMD: u8 = 0x00;
pub const READ_CMD: u8 = 0x01;

/// Clocked out while the chip shifts the register value back.
pub const DUMMY_BYTE: u8 = 0xDB;

pub type Frame = [u8; FRAME_LEN];

pub fn write_frame(address: ChipAddress, register: Register, value: u8) -> Frame {
    [address.raw() | WRITE_CMD, register.offset(), value]
}

pub fn read_frame(address: ChipAddress, register: Register) -> Frame {
    [address.raw() | READ_CMD, register.offset(), DUMMY_BYTE]
}

pub fn read_value(response: &Frame) -> u8 {
    response[2]
}

/// Is this request a read?
#[cfg(test)]
pub(crate) fn is_read(request: &[u8]) -> bool {
    request.first().map_or(false, |b| b & READ_CMD != 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registers::U1;

    #[test]
    fn test_read_frame() {
        assert_eq!(read_frame(U1, Register::OLatA), [0x41, 0x14, 0xDB]);
    }

    #[test]
    fn test_write_frame() {
        assert_eq!(write_frame(U1, Register::OLatA, 0x08), [0x40, 0x14, 0x08]);
    }

    #[test]
    fn test_read_value_is_third_byte() {
        assert_eq!(read_value(&[0xFF, 0xFF, 0x5A]), 0x5A);
    }

    #[test]
    fn test_is_read() {
        assert!(is_read(&read_frame(U1, Register::IoDirB)));
        assert!(!is_read(&write_frame(U1, Register::IoDirB, 0)));
        assert!(!is_read(&[]));
    }
}
