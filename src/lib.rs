//! Relay bank controller - drives banks of MCP23S17 GPIO expanders over a
//! shared SPI bus to latch and release fixture relays.
//!
//! The library holds the register map, frame codec, chip driver and bank
//! configuration; `fixture` sequences the power-on self-test over any
//! `embedded-hal` bus, delay and pins, and `hal` opens the Linux spidev
//! device and the `rppal` GPIO lines.

pub mod bank;
pub mod config;
pub mod error;
pub mod events;
pub mod fixture;
pub mod frame;
pub mod hal;
pub mod registers;
pub mod spi;
pub mod transport;

// Re-export main types for convenience
pub use bank::BankController;
pub use error::{ConfigureError, DriverError};
pub use events::{Event, EventSink, LogSink};
pub use fixture::{Fixture, FixtureTiming, RunSummary};
pub use registers::{ChipAddress, PinState, Register};
pub use spi::{ChipDriver, OutputChange};
