//! Linux platform bindings: the spidev bus through `linux-embedded-hal` and the
//! reset and health lines through `rppal`.

use anyhow::{anyhow, Context, Result};
use linux_embedded_hal::spidev::{SpiModeFlags, SpidevOptions};
use linux_embedded_hal::SpidevDevice;
use log::info;
use rppal::gpio::{Gpio, OutputPin};

use crate::config::{GpioConfig, SpiConfig};

fn mode(number: u8) -> Result<SpiModeFlags> {
    Ok(match number {
        0 => SpiModeFlags::SPI_MODE_0,
        1 => SpiModeFlags::SPI_MODE_1,
        2 => SpiModeFlags::SPI_MODE_2,
        3 => SpiModeFlags::SPI_MODE_3,
        n => return Err(anyhow!("Unsupported SPI mode: {}", n)),
    })
}

fn options(config: &SpiConfig) -> Result<SpidevOptions> {
    Ok(SpidevOptions::new()
        .bits_per_word(8)
        .max_speed_hz(config.speed_hz)
        .mode(mode(config.mode)?)
        .build())
}

/// Open the spidev node with 8-bit words at the configured speed and mode.
pub fn open_spi(config: &SpiConfig) -> Result<SpidevDevice> {
    let mut spi = SpidevDevice::open(&config.device)
        .context(format!("Failed to open SPI device: {}", config.device))?;
    spi.0
        .configure(&options(config)?)
        .context(format!("Failed to configure SPI device: {}", config.device))?;

    info!(
        "SPI device initialized: {} at {} Hz, mode {}",
        config.device, config.speed_hz, config.mode
    );
    Ok(spi)
}

/// Release the bus handed back by the fixture. spidev is closed when the
/// handle drops.
pub fn close_spi(spi: SpidevDevice) -> Result<()> {
    drop(spi);
    info!("SPI bus closed");
    Ok(())
}

/// Claim the reset and health lines as outputs. They keep their level when
/// the process exits.
pub fn open_control_lines(config: &GpioConfig) -> Result<(OutputPin, OutputPin)> {
    let gpio = Gpio::new().context("Failed to access GPIO")?;

    let claim = |line: u8, name: &str| -> Result<OutputPin> {
        let mut pin = gpio
            .get(line)
            .context(format!("Failed to claim GPIO{} ({})", line, name))?
            .into_output_high();
        pin.set_reset_on_drop(false);
        Ok(pin)
    };

    let reset = claim(config.reset_line, "reset")?;
    let health = claim(config.health_line, "health LED")?;
    info!(
        "Control lines: reset GPIO{}, health GPIO{}",
        config.reset_line, config.health_line
    );
    Ok((reset, health))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_mapping() {
        assert_eq!(mode(0).unwrap(), SpiModeFlags::SPI_MODE_0);
        assert_eq!(mode(1).unwrap(), SpiModeFlags::SPI_MODE_1);
        assert_eq!(mode(3).unwrap(), SpiModeFlags::SPI_MODE_3);
        assert!(mode(4).is_err());
    }

    #[test]
    fn test_options_reject_bad_mode() {
        let mut config = SpiConfig::default();
        assert!(options(&config).is_ok());
        config.mode = 7;
        assert!(options(&config).is_err());
    }

    #[test]
    fn test_open_missing_device_names_path() {
        let config = SpiConfig {
            device: "/nonexistent/spidev9.9".to_string(),
            ..SpiConfig::default()
        };
        let err = open_spi(&config).err().unwrap();
        assert!(err.to_string().contains("/nonexistent/spidev9.9"));
    }
}
