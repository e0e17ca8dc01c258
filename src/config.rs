use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "/etc/relay-fixture/config.yaml";

/// Platform settings for the fixture. The chip layout itself is fixed in
/// `registers` and is not configurable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub spi: SpiConfig,
    pub gpio: GpioConfig,
    pub timing: TimingConfig,
    pub driver: DriverConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpiConfig {
    /// spidev node the expanders share
    pub device: String,
    pub speed_hz: u32,
    pub mode: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpioConfig {
    /// BCM line wired to the expanders' power-cycle reset
    pub reset_line: u8,
    /// BCM line driving the fixture health LED
    pub health_line: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingConfig {
    pub settle_ms: u64,
    pub reset_hold_ms: u64,
    pub step_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverConfig {
    /// Read the output latch back after every write
    pub verify: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log to the local syslog daemon instead of stderr
    pub syslog: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            spi: SpiConfig::default(),
            gpio: GpioConfig::default(),
            timing: TimingConfig::default(),
            driver: DriverConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for SpiConfig {
    fn default() -> Self {
        Self {
            device: "/dev/spidev0.0".to_string(),
            speed_hz: 100_000,
            mode: 1,
        }
    }
}

impl Default for GpioConfig {
    fn default() -> Self {
        Self {
            reset_line: 2,
            health_line: 5,
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            settle_ms: 1,
            reset_hold_ms: 500,
            step_ms: 100,
        }
    }
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self { verify: true }
    }
}

impl TimingConfig {
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn reset_hold(&self) -> Duration {
        Duration::from_millis(self.reset_hold_ms)
    }

    pub fn step(&self) -> Duration {
        Duration::from_millis(self.step_ms)
    }
}

impl Config {
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Config =
            serde_yaml::from_str(content).context("Failed to parse configuration file")?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path`. A missing file is only tolerated for the default path,
    /// in which case the built-in layout is used.
    pub fn load(path: &str) -> Result<(Self, bool)> {
        if path == DEFAULT_CONFIG_PATH && !Path::new(path).exists() {
            return Ok((Config::default(), false));
        }
        let content = fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path))?;
        Ok((Config::from_yaml(&content)?, true))
    }

    pub fn validate(&self) -> Result<()> {
        if self.spi.mode > 3 {
            return Err(anyhow!("SPI mode must be 0-3, got {}", self.spi.mode));
        }
        if self.spi.speed_hz == 0 {
            return Err(anyhow!("SPI speed_hz must be non-zero"));
        }
        if self.spi.device.is_empty() {
            return Err(anyhow!("SPI device path must not be empty"));
        }
        if self.gpio.reset_line == self.gpio.health_line {
            return Err(anyhow!(
                "reset_line and health_line must differ, both are {}",
                self.gpio.reset_line
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_fixture_wiring() {
        let config = Config::default();
        assert_eq!(config.spi.device, "/dev/spidev0.0");
        assert_eq!(config.spi.speed_hz, 100_000);
        assert_eq!(config.spi.mode, 1);
        assert_eq!((config.gpio.reset_line, config.gpio.health_line), (2, 5));
        assert_eq!(config.timing.settle(), Duration::from_millis(1));
        assert_eq!(config.timing.reset_hold(), Duration::from_millis(500));
        assert_eq!(config.timing.step(), Duration::from_millis(100));
        assert!(config.driver.verify);
        assert!(!config.logging.syslog);
        config.validate().unwrap();
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = Config::from_yaml("timing:\n  settle_ms: 2\n  reset_hold_ms: 250\n  step_ms: 0\nlogging:\n  syslog: true\n").unwrap();
        assert_eq!(config.timing.settle_ms, 2);
        assert_eq!(config.timing.step_ms, 0);
        assert!(config.logging.syslog);
        assert_eq!(config.spi, SpiConfig::default());
    }

    #[test]
    fn test_rejects_bad_mode() {
        let err = Config::from_yaml("spi:\n  device: /dev/spidev0.0\n  speed_hz: 100000\n  mode: 4\n").unwrap_err();
        assert!(err.to_string().contains("mode"));
    }

    #[test]
    fn test_rejects_empty_device() {
        let err = Config::from_yaml("spi:\n  device: ''\n  speed_hz: 100000\n  mode: 1\n").unwrap_err();
        assert!(err.to_string().contains("device"));
    }

    #[test]
    fn test_rejects_shared_gpio_line() {
        let mut config = Config::default();
        config.gpio.health_line = config.gpio.reset_line;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_explicit_path_is_an_error() {
        assert!(Config::load("/nonexistent/relay-fixture.yaml").is_err());
    }
}
