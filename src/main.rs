use anyhow::{anyhow, Context, Result};
use linux_embedded_hal::Delay;
use log::{error, info, warn, LevelFilter};
use signal_hook::consts::{SIGINT, SIGTERM};
use std::path::PathBuf;
use std::sync::Arc;

use relay_bank_controller::config::{Config, LoggingConfig, DEFAULT_CONFIG_PATH};
use relay_bank_controller::{
    hal, BankController, ChipDriver, Fixture, FixtureTiming, LogSink,
};

fn main() -> Result<()> {
    // Parse command line arguments
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    let (config, from_file) = Config::load(&config_path)?;
    init_logger(&config.logging)?;

    info!("Relay fixture starting...");
    if from_file {
        info!("Configuration loaded from: {}", config_path);
    } else {
        info!("No configuration at {}, using built-in defaults", config_path);
    }

    // Validate SPI device
    let spi_device_path = &config.spi.device;
    if !PathBuf::from(spi_device_path).exists() {
        error!("SPI device not found: {}", spi_device_path);
        return Err(anyhow!("SPI device not found: {}", spi_device_path));
    }

    let (reset, health) = hal::open_control_lines(&config.gpio)?;
    let mut fixture = Fixture::new(
        reset,
        health,
        FixtureTiming {
            reset_hold: config.timing.reset_hold(),
            step: config.timing.step(),
        },
    );

    // First signal stops latching and lets the release pass finish, a second one exits.
    let stop = fixture.stop_flag();
    for signal in [SIGINT, SIGTERM] {
        signal_hook::flag::register_conditional_shutdown(signal, 1, Arc::clone(&stop))
            .context(format!("Failed to setup handler for signal {}", signal))?;
        signal_hook::flag::register(signal, Arc::clone(&stop))
            .context(format!("Failed to setup handler for signal {}", signal))?;
    }

    let spi = hal::open_spi(&config.spi)?;
    let driver = ChipDriver::new(spi, Delay, LogSink)
        .with_settle(config.timing.settle())
        .with_verify(config.driver.verify);

    let summary = fixture.run(driver, &BankController::default(), hal::close_spi)?;
    if summary.interrupted {
        warn!("Fixture run was interrupted, {} latch steps skipped", summary.skipped);
    }
    if summary.mismatches > 0 || summary.invalid_pins > 0 {
        warn!(
            "{} steps skipped for direction mismatch, {} for invalid pins",
            summary.mismatches, summary.invalid_pins
        );
    }

    info!("Relay fixture shutdown complete");
    Ok(())
}

fn init_logger(config: &LoggingConfig) -> Result<()> {
    if config.syslog {
        return syslog::init(
            syslog::Facility::LOG_USER,
            LevelFilter::Info,
            Some("relay-fixture"),
        )
        .map_err(|e| anyhow!("Failed to connect to syslog: {}", e));
    }

    // Use `env_logger` for logging. Systemd/journald will capture stdout/stderr.
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();
    Ok(())
}
