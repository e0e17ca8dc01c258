use thiserror::Error;

use crate::registers::{ChipAddress, Register};

/// Failure of a single driver operation. `E` is the transport's error type.
#[derive(Debug, Error)]
pub enum DriverError<E: std::error::Error + 'static> {
    #[error("bus transfer failed")]
    Transport(#[source] E),

    #[error("pin {pin} on chip {address} is out of range, expected 0-15")]
    InvalidPin { address: ChipAddress, pin: u8 },

    #[error("chip {address} {register} reads 0x{value:02x}, not configured for output")]
    DirectionMismatch {
        address: ChipAddress,
        register: Register,
        value: u8,
    },
}

/// One write that failed during a bank configuration pass.
#[derive(Debug)]
pub struct WriteFailure<E> {
    pub address: ChipAddress,
    pub register: Register,
    pub error: E,
}

/// A configuration pass ran to the end but some writes failed.
#[derive(Debug, Error)]
#[error("{} of {attempted} configuration writes failed", failures.len())]
pub struct ConfigureError<E: std::error::Error + 'static> {
    pub attempted: usize,
    pub failures: Vec<WriteFailure<E>>,
}
