//! Glue between the core and the `embedded-hal` bus, delay and pin traits.

use embedded_hal::delay::DelayNs;
use std::time::Duration;

/// Block for `duration` through an `embedded-hal` delay, at microsecond
/// resolution. Zero returns immediately.
pub fn pause<D: DelayNs + ?Sized>(delay: &mut D, duration: Duration) {
    let micros = u32::try_from(duration.as_micros()).unwrap_or(u32::MAX);
    if micros > 0 {
        delay.delay_us(micros);
    }
}

#[cfg(test)]
pub(crate) mod mock {
    //! Register-file model of a bank of chips for driver and sequencer tests.

    use crate::frame::{self, FRAME_LEN};
    use embedded_hal::delay::DelayNs;
    use embedded_hal::digital::{self, OutputPin};
    use embedded_hal::spi::{self, Operation, SpiDevice};
    use std::collections::HashMap;
    use std::convert::Infallible;
    use std::time::Duration;
    use thiserror::Error;

    #[derive(Debug, Error, Clone, PartialEq, Eq)]
    #[error("mock bus failure on frame {0:02x?}")]
    pub struct MockBusError(pub Vec<u8>);

    impl spi::Error for MockBusError {
        fn kind(&self) -> spi::ErrorKind {
            spi::ErrorKind::Other
        }
    }

    #[derive(Debug, Default)]
    pub struct MockBus {
        /// (address, register) -> value; missing entries read as 0x00
        pub registers: HashMap<(u8, u8), u8>,
        /// Every frame clocked out, in order
        pub frames: Vec<Vec<u8>>,
        /// Frames whose first two bytes match fail with a transport error
        pub fail_on: Vec<(u8, u8)>,
        /// Frames at or after this index fail with a transport error
        pub fail_from_frame: Option<usize>,
        pub close_count: u32,
    }

    impl MockBus {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set(&mut self, address: u8, register: u8, value: u8) {
            self.registers.insert((address, register), value);
        }

        pub fn get(&self, address: u8, register: u8) -> u8 {
            self.registers.get(&(address, register)).copied().unwrap_or(0)
        }

        pub fn writes(&self) -> Vec<Vec<u8>> {
            self.frames.iter().filter(|f| !frame::is_read(f)).cloned().collect()
        }

        fn exchange(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), MockBusError> {
            assert_eq!(write.len(), FRAME_LEN);
            assert_eq!(write.len(), read.len());
            let index = self.frames.len();
            self.frames.push(write.to_vec());
            let address = write[0] & !frame::READ_CMD;
            if self.fail_on.contains(&(address, write[1]))
                || self.fail_from_frame.map_or(false, |n| index >= n)
            {
                return Err(MockBusError(write.to_vec()));
            }
            if frame::is_read(write) {
                read.copy_from_slice(&[0x00, 0x00, self.get(address, write[1])]);
            } else {
                self.set(address, write[1], write[2]);
                read.fill(0x00);
            }
            Ok(())
        }
    }

    impl spi::ErrorType for MockBus {
        type Error = MockBusError;
    }

    impl SpiDevice for MockBus {
        fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), Self::Error> {
            for operation in operations {
                match operation {
                    Operation::Transfer(read, write) => self.exchange(read, write)?,
                    other => panic!("unexpected SPI operation: {:?}", other),
                }
            }
            Ok(())
        }
    }

    /// Returns immediately.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct NoDelay;

    impl DelayNs for NoDelay {
        fn delay_ns(&mut self, _ns: u32) {}
    }

    /// Records every requested pause.
    #[derive(Debug, Default)]
    pub struct RecordingDelay(pub Vec<Duration>);

    impl DelayNs for RecordingDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.0.push(Duration::from_nanos(u64::from(ns)));
        }
    }

    /// Records levels driven on a line; `true` is high.
    #[derive(Debug, Default)]
    pub struct MockLine(pub Vec<bool>);

    impl digital::ErrorType for MockLine {
        type Error = Infallible;
    }

    impl OutputPin for MockLine {
        fn set_high(&mut self) -> Result<(), Self::Error> {
            self.0.push(true);
            Ok(())
        }

        fn set_low(&mut self) -> Result<(), Self::Error> {
            self.0.push(false);
            Ok(())
        }
    }

    #[derive(Debug, Error)]
    #[error("line driver fault")]
    pub struct LineFault;

    impl digital::Error for LineFault {
        fn kind(&self) -> digital::ErrorKind {
            digital::ErrorKind::Other
        }
    }

    /// Line whose every write fails.
    #[derive(Debug, Default)]
    pub struct FaultyLine;

    impl digital::ErrorType for FaultyLine {
        type Error = LineFault;
    }

    impl OutputPin for FaultyLine {
        fn set_high(&mut self) -> Result<(), Self::Error> {
            Err(LineFault)
        }

        fn set_low(&mut self) -> Result<(), Self::Error> {
            Err(LineFault)
        }
    }
}
