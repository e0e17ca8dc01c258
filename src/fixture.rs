//! Fixture self-test: reset pulse, bank configuration, then every relay on one
//! chip latched and released in turn.

use anyhow::{Context, Result};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiDevice;
use log::{debug, error, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::bank::BankController;
use crate::error::DriverError;
use crate::events::EventSink;
use crate::registers::{ChipAddress, PinState, FIXTURE_CHIP, PINS_PER_CHIP};
use crate::spi::ChipDriver;
use crate::transport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Reset,
    Configuring,
    Driving { pin: u8, state: PinState },
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixtureTiming {
    /// How long reset and health are held low
    pub reset_hold: Duration,
    /// Pause after every relay step
    pub step: Duration,
}

impl Default for FixtureTiming {
    fn default() -> Self {
        Self {
            reset_hold: Duration::from_millis(500),
            step: Duration::from_millis(100),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub latched: usize,
    pub released: usize,
    /// Latch steps not attempted, after a stop request or a bus failure
    pub skipped: usize,
    pub invalid_pins: usize,
    pub mismatches: usize,
    pub bus_failures: usize,
    pub interrupted: bool,
}

pub struct Fixture<R, H> {
    reset: R,
    health: H,
    chip: ChipAddress,
    timing: FixtureTiming,
    stop: Arc<AtomicBool>,
    phase: Phase,
}

impl<R, H> Fixture<R, H>
where
    R: OutputPin,
    R::Error: std::error::Error + Send + Sync + 'static,
    H: OutputPin,
    H::Error: std::error::Error + Send + Sync + 'static,
{
    pub fn new(reset: R, health: H, timing: FixtureTiming) -> Self {
        Fixture {
            reset,
            health,
            chip: FIXTURE_CHIP,
            timing,
            stop: Arc::new(AtomicBool::new(false)),
            phase: Phase::Idle,
        }
    }

    /// Exercise a different chip than the default U6.
    pub fn with_chip(mut self, chip: ChipAddress) -> Self {
        self.chip = chip;
        self
    }

    /// Flag that, once set, skips the remaining latch steps. Release steps
    /// always run so no relay is left latched.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    fn enter(&mut self, phase: Phase) {
        match phase {
            Phase::Driving { pin, state } => {
                debug!("Fixture phase: chip {} pin {} {}", self.chip, pin, state)
            }
            _ => info!("Fixture phase: {:?}", phase),
        }
        self.phase = phase;
    }

    /// Pulse reset and the health LED low, hold, then release both.
    pub fn pulse_reset<D: DelayNs>(&mut self, delay: &mut D) -> Result<()> {
        self.reset.set_low().context("Failed to drive reset line low")?;
        self.health.set_low().context("Failed to drive health line low")?;
        transport::pause(delay, self.timing.reset_hold);
        self.reset.set_high().context("Failed to drive reset line high")?;
        self.health.set_high().context("Failed to drive health line high")?;
        Ok(())
    }

    /// Run the whole sequence, then hand the bus to `close`. `close` is called
    /// exactly once, even when an earlier phase failed; its error is logged.
    pub fn run<B, D, S, C>(
        &mut self,
        mut driver: ChipDriver<B, D, S>,
        bank: &BankController<'_>,
        close: C,
    ) -> Result<RunSummary>
    where
        B: SpiDevice,
        B::Error: std::error::Error + Send + Sync + 'static,
        D: DelayNs,
        S: EventSink,
        C: FnOnce(B) -> Result<()>,
    {
        let outcome = self.sequence(&mut driver, bank);

        self.enter(Phase::Closed);
        if let Err(e) = close(driver.into_inner()) {
            error!("Failed to close SPI bus: {:#}", e);
        }

        let summary = outcome?;
        info!(
            "Fixture run complete: {} latched, {} released, {} skipped, {} invalid, {} mismatched",
            summary.latched,
            summary.released,
            summary.skipped,
            summary.invalid_pins,
            summary.mismatches
        );
        Ok(summary)
    }

    fn sequence<B, D, S>(
        &mut self,
        driver: &mut ChipDriver<B, D, S>,
        bank: &BankController<'_>,
    ) -> Result<RunSummary>
    where
        B: SpiDevice,
        B::Error: std::error::Error + Send + Sync + 'static,
        D: DelayNs,
        S: EventSink,
    {
        let mut summary = RunSummary::default();

        self.enter(Phase::Reset);
        self.pulse_reset(driver.delay_mut())
            .context("Reset pulse failed")?;

        self.enter(Phase::Configuring);
        bank.configure(driver).context("Chip configuration failed")?;

        // First bus failure while driving. Latching stops, releasing still runs.
        let mut failure: Option<anyhow::Error> = None;

        for state in [PinState::On, PinState::Off] {
            info!("Setting chip {} relays {}", self.chip, state);
            for pin in 0..PINS_PER_CHIP {
                if state == PinState::On {
                    if failure.is_some() {
                        summary.skipped += 1;
                        continue;
                    }
                    if self.stop.load(Ordering::SeqCst) {
                        if !summary.interrupted {
                            warn!("Stop requested, skipping remaining latch steps");
                        }
                        summary.interrupted = true;
                        summary.skipped += 1;
                        continue;
                    }
                }

                self.enter(Phase::Driving { pin, state });
                match driver.set_output(self.chip, pin, state) {
                    Ok(_) if state == PinState::On => summary.latched += 1,
                    Ok(_) => summary.released += 1,
                    Err(DriverError::InvalidPin { .. }) => summary.invalid_pins += 1,
                    Err(DriverError::DirectionMismatch { .. }) => summary.mismatches += 1,
                    Err(e) => {
                        summary.bus_failures += 1;
                        let e = anyhow::Error::new(e).context(format!(
                            "Setting chip {} pin {} {} failed",
                            self.chip, pin, state
                        ));
                        if failure.is_none() {
                            error!("{:#}, releasing relays before stopping", e);
                            failure = Some(e);
                        } else {
                            warn!("{:#}", e);
                        }
                    }
                }
                driver.pause(self.timing.step);
            }
        }

        match failure {
            Some(e) => {
                warn!(
                    "Release pass finished after bus failure: {} released, {} bus failures",
                    summary.released, summary.bus_failures
                );
                Err(e)
            }
            None => Ok(summary),
        }
    }
}
