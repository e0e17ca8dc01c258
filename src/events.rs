//! Structured progress events emitted by the driver, bank and fixture.
//!
//! The core never formats output itself; a sink decides what to do with each
//! event. `LogSink` forwards to the `log` facade, `Vec<Event>` captures them.

use log::{debug, info, warn};

use crate::registers::{ChipAddress, PinState, Register};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    RegisterWritten {
        address: ChipAddress,
        register: Register,
        value: u8,
    },
    RegisterRead {
        address: ChipAddress,
        register: Register,
        value: u8,
    },
    OutputChanged {
        address: ChipAddress,
        pin: u8,
        state: PinState,
        register: Register,
        previous: u8,
        written: u8,
        confirmed: Option<u8>,
    },
    InvalidPin {
        address: ChipAddress,
        pin: u8,
    },
    DirectionMismatch {
        address: ChipAddress,
        register: Register,
        value: u8,
    },
    /// A configuration pass over the bank started.
    ConfigurePass {
        pass: &'static str,
        chips: usize,
    },
}

pub trait EventSink {
    fn emit(&mut self, event: Event);
}

impl EventSink for Vec<Event> {
    fn emit(&mut self, event: Event) {
        self.push(event);
    }
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn emit(&mut self, event: Event) {
        (**self).emit(event)
    }
}

/// Sends every event to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&mut self, event: Event) {
        match event {
            Event::RegisterWritten { address, register, value } => {
                debug!("Wrote 0x{:02x} to chip {} register {}", value, address, register);
            }
            Event::RegisterRead { address, register, value } => {
                debug!("Read 0x{:02x} from chip {} register {}", value, address, register);
            }
            Event::OutputChanged { address, pin, state, register, previous, written, confirmed } => {
                info!(
                    "Chip {} pin {} -> {}: {} 0x{:02x} -> 0x{:02x}",
                    address, pin, state, register, previous, written
                );
                match confirmed {
                    Some(value) if value != written => warn!(
                        "Chip {} {} reads back 0x{:02x}, expected 0x{:02x}",
                        address, register, value, written
                    ),
                    Some(value) => debug!("Chip {} {} confirmed 0x{:02x}", address, register, value),
                    None => {}
                }
            }
            Event::InvalidPin { address, pin } => {
                warn!("Pin number is incorrect for chip {}. Wanting 0-15, received {}", address, pin);
            }
            Event::DirectionMismatch { address, register, value } => {
                warn!(
                    "Chip {} direction register {} not set for output, value: 0x{:02x}",
                    address, register, value
                );
            }
            Event::ConfigurePass { pass, chips } => {
                info!("Configuring {} chips: {}", chips, pass);
            }
        }
    }
}
