use embedded_hal::delay::DelayNs;
use embedded_hal::spi::SpiDevice;
use log::debug;
use std::time::Duration;

use crate::error::DriverError;
use crate::events::{Event, EventSink};
use crate::frame::{self, FRAME_LEN};
use crate::registers::{self, ChipAddress, PinState, Register, ALL_OUTPUTS};
use crate::transport;

/// Pause after every transfer before the bus is used again.
pub const DEFAULT_SETTLE: Duration = Duration::from_millis(1);

/// Result of a successful `set_output`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputChange {
    pub address: ChipAddress,
    pub register: Register,
    /// Bit offset within the register, 0-7
    pub bit: u8,
    pub previous: u8,
    pub written: u8,
    /// Latch value read back after the write, when verification is enabled
    /// and the read succeeded.
    pub confirmed: Option<u8>,
}

/// New latch byte with only `bit` (0-7, from `registers::locate`) changed.
fn apply_pin_state(previous: u8, bit: u8, state: PinState) -> u8 {
    let set_mask: u8 = 1 << bit;
    let clear_mask: u8 = !set_mask;
    match state {
        PinState::Off => previous & clear_mask,
        PinState::On => previous | set_mask,
    }
}

/// Register-level access to every MCP23S17 sharing one SPI bus.
///
/// Owns the bus for its whole lifetime; nothing is cached, every read goes to
/// the chip. The bus is an `embedded-hal` `SpiDevice`, so chip select is
/// asserted for exactly one 3-byte frame per transfer.
pub struct ChipDriver<B, D, S> {
    bus: B,
    delay: D,
    sink: S,
    settle: Duration,
    verify: bool,
}

impl<B, D, S> ChipDriver<B, D, S>
where
    B: SpiDevice,
    B::Error: std::error::Error + Send + Sync + 'static,
    D: DelayNs,
    S: EventSink,
{
    pub fn new(bus: B, delay: D, sink: S) -> Self {
        ChipDriver {
            bus,
            delay,
            sink,
            settle: DEFAULT_SETTLE,
            verify: true,
        }
    }

    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// Re-read the output latch after each `set_output`.
    pub fn with_verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    fn transfer(&mut self, request: &frame::Frame) -> Result<frame::Frame, DriverError<B::Error>> {
        let mut response = [0u8; FRAME_LEN];
        self.bus
            .transfer(&mut response, request)
            .map_err(DriverError::Transport)?;
        transport::pause(&mut self.delay, self.settle);
        Ok(response)
    }

    pub fn write_register(
        &mut self,
        address: ChipAddress,
        register: Register,
        value: u8,
    ) -> Result<(), DriverError<B::Error>> {
        self.transfer(&frame::write_frame(address, register, value))?;
        self.sink.emit(Event::RegisterWritten { address, register, value });
        Ok(())
    }

    pub fn read_register(
        &mut self,
        address: ChipAddress,
        register: Register,
    ) -> Result<u8, DriverError<B::Error>> {
        let response = self.transfer(&frame::read_frame(address, register))?;
        let value = frame::read_value(&response);
        self.sink.emit(Event::RegisterRead { address, register, value });
        Ok(value)
    }

    /// Drive one relay output, leaving every other bit of the latch untouched.
    ///
    /// Refuses to write unless the half's direction register reads all-outputs.
    pub fn set_output(
        &mut self,
        address: ChipAddress,
        pin: u8,
        state: PinState,
    ) -> Result<OutputChange, DriverError<B::Error>> {
        let (half, bit) = match registers::locate(pin) {
            Some(found) => found,
            None => {
                self.sink.emit(Event::InvalidPin { address, pin });
                return Err(DriverError::InvalidPin { address, pin });
            }
        };

        let direction = half.direction();
        let value = self.read_register(address, direction)?;
        if value != ALL_OUTPUTS {
            self.sink.emit(Event::DirectionMismatch {
                address,
                register: direction,
                value,
            });
            return Err(DriverError::DirectionMismatch {
                address,
                register: direction,
                value,
            });
        }

        let latch = half.latch();
        let previous = self.read_register(address, latch)?;
        let written = apply_pin_state(previous, bit, state);
        self.write_register(address, latch, written)?;

        // The write is committed; a failed read-back only loses the diagnostic.
        let confirmed = if self.verify {
            match self.read_register(address, latch) {
                Ok(value) => Some(value),
                Err(e) => {
                    debug!("Read-back of chip {} {} failed: {}", address, latch, e);
                    None
                }
            }
        } else {
            None
        };

        self.sink.emit(Event::OutputChanged {
            address,
            pin,
            state,
            register: latch,
            previous,
            written,
            confirmed,
        });

        Ok(OutputChange {
            address,
            register: latch,
            bit,
            previous,
            written,
            confirmed,
        })
    }

    /// Blocking pause through the driver's delay source.
    pub fn pause(&mut self, duration: Duration) {
        transport::pause(&mut self.delay, duration);
    }

    pub fn delay_mut(&mut self) -> &mut D {
        &mut self.delay
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Give up the bus. Consuming the driver means this happens once.
    pub fn into_inner(self) -> B {
        self.bus
    }
}
