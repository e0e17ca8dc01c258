use embedded_hal::delay::DelayNs;
use embedded_hal::spi::SpiDevice;
use log::{info, warn};

use crate::error::{ConfigureError, DriverError, WriteFailure};
use crate::events::{Event, EventSink};
use crate::registers::{iocon, ChipAddress, Register, ALL_OUTPUTS, BANK_ADDRESSES};
use crate::spi::ChipDriver;

/// Applies the common configuration to every chip on the bus.
pub struct BankController<'a> {
    addresses: &'a [ChipAddress],
    iocon: u8,
}

impl Default for BankController<'static> {
    fn default() -> Self {
        BankController::new(&BANK_ADDRESSES, iocon::FIXTURE)
    }
}

impl<'a> BankController<'a> {
    pub fn new(addresses: &'a [ChipAddress], iocon: u8) -> Self {
        BankController { addresses, iocon }
    }

    /// Write IOCON to every chip, then set both direction registers of every
    /// chip to all-outputs.
    ///
    /// IOCON.HAEN must reach all chips before any other addressed write, so the
    /// two passes are never merged. A failed write does not stop the pass; the
    /// failures are returned together once both passes are done.
    pub fn configure<B, D, S>(
        &self,
        driver: &mut ChipDriver<B, D, S>,
    ) -> Result<(), ConfigureError<B::Error>>
    where
        B: SpiDevice,
        B::Error: std::error::Error + Send + Sync + 'static,
        D: DelayNs,
        S: EventSink,
    {
        let mut attempted = 0;
        let mut failures = Vec::new();

        driver.sink_mut().emit(Event::ConfigurePass {
            pass: "IOCON",
            chips: self.addresses.len(),
        });
        for &address in self.addresses {
            attempted += 1;
            let result = driver.write_register(address, Register::IoCon, self.iocon);
            record(&mut failures, address, Register::IoCon, result);
        }

        driver.sink_mut().emit(Event::ConfigurePass {
            pass: "IODIRA/IODIRB outputs",
            chips: self.addresses.len(),
        });
        for &address in self.addresses {
            for register in [Register::IoDirA, Register::IoDirB] {
                attempted += 1;
                let result = driver.write_register(address, register, ALL_OUTPUTS);
                record(&mut failures, address, register, result);
            }
        }

        if failures.is_empty() {
            info!("Configured {} chips", self.addresses.len());
            Ok(())
        } else {
            Err(ConfigureError { attempted, failures })
        }
    }
}

fn record<E: std::error::Error + 'static>(
    failures: &mut Vec<WriteFailure<E>>,
    address: ChipAddress,
    register: Register,
    result: Result<(), DriverError<E>>,
) {
    match result {
        Ok(()) => {}
        Err(DriverError::Transport(error)) => {
            warn!("Configuration write to chip {} {} failed: {}", address, register, error);
            failures.push(WriteFailure { address, register, error });
        }
        // write_register only fails on the transport
        Err(other) => warn!(
            "Configuration write to chip {} {} rejected: {}",
            address, register, other
        ),
    }
}
