//! Device configuration
//!
//! A session is driven by one [`DeviceConfig`], either loaded from a JSON
//! document or assembled with [`ConfigBuilder`]. There is no implicit
//! default location: callers always say where the configuration comes from.
//!
//! ```json
//! {
//!   "device": {
//!     "binary_path": "build/firmware.bin",
//!     "programmer_path": "/opt/st/STM32CubeProgrammer/bin/STM32_Programmer_CLI"
//!   },
//!   "communication": {
//!     "serial_port": "/dev/ttyUSB0",
//!     "baudrate": 115200,
//!     "timeout": 1,
//!     "command_delay": 0.5
//!   },
//!   "retry": { "count": 3, "delay": 0.5 }
//! }
//! ```
//!
//! The camelCase spellings (`binaryPath`, `serialPort`, `baudRate`,
//! `timeoutSeconds`, `commandDelaySeconds`, `delaySeconds`, ...) are accepted
//! as aliases.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{ConfigError, Result};

/// Default UART baud rate
pub const DEFAULT_BAUD_RATE: u32 = 115_200;
/// Default serial read timeout
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);
/// Default wait between writing a command and reading the reply
pub const DEFAULT_COMMAND_DELAY: Duration = Duration::from_millis(500);
/// Default number of attempts per command
pub const DEFAULT_RETRY_COUNT: u32 = 3;
/// Default wait between attempts
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Serial link parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSettings {
    /// Port identifier (e.g. "/dev/ttyUSB0" or "COM3")
    pub port: String,
    pub baud_rate: u32,
    /// Upper bound for a single blocking read
    pub read_timeout: Duration,
}

/// Fixed-delay retry policy for UART commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub count: u32,
    /// Wait between two attempts
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            count: DEFAULT_RETRY_COUNT,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// Complete parameter set for one device session
///
/// Values are fixed once built; the `with_*` methods return modified copies.
/// Paths are not checked here. They are checked right before they are used,
/// and may be left empty for sessions that never flash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    binary_path: PathBuf,
    programmer_path: PathBuf,
    link: LinkSettings,
    command_delay: Duration,
    retry: RetryPolicy,
}

impl DeviceConfig {
    /// Start an explicit configuration with the library defaults
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Load a configuration from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::Io {
                    path: path.to_path_buf(),
                    source: e,
                }
            }
        })?;

        let config = Self::from_json_str(&content)?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse a configuration from a JSON string
    ///
    /// Every key of the document is required.
    pub fn from_json_str(content: &str) -> Result<Self> {
        let doc: RawDocument = serde_json::from_str(content)?;

        let device = require(doc.device, "device")?;
        let comm = require(doc.communication, "communication")?;
        let retry = require(doc.retry, "retry")?;

        ConfigBuilder {
            binary_path: Some(require(device.binary_path, "device.binary_path")?),
            programmer_path: Some(require(
                device.programmer_path,
                "device.programmer_path",
            )?),
            serial_port: Some(require(comm.serial_port, "communication.serial_port")?),
            baud_rate: Some(require(comm.baudrate, "communication.baudrate")?),
            read_timeout: Some(seconds(
                "communication.timeout",
                require(comm.timeout, "communication.timeout")?,
            )?),
            command_delay: Some(seconds(
                "communication.command_delay",
                require(comm.command_delay, "communication.command_delay")?,
            )?),
            retry_count: Some(require(retry.count, "retry.count")?),
            retry_delay: Some(seconds(
                "retry.delay",
                require(retry.delay, "retry.delay")?,
            )?),
        }
        .build()
    }

    /// Firmware image to write
    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }

    /// STM32CubeProgrammer CLI executable
    pub fn programmer_path(&self) -> &Path {
        &self.programmer_path
    }

    pub fn link(&self) -> &LinkSettings {
        &self.link
    }

    pub fn command_delay(&self) -> Duration {
        self.command_delay
    }

    pub fn retry(&self) -> RetryPolicy {
        self.retry
    }

    /// Copy with a different firmware image
    pub fn with_binary_path(&self, path: impl Into<PathBuf>) -> Self {
        Self {
            binary_path: path.into(),
            ..self.clone()
        }
    }

    /// Copy with a different programmer executable
    pub fn with_programmer_path(&self, path: impl Into<PathBuf>) -> Self {
        Self {
            programmer_path: path.into(),
            ..self.clone()
        }
    }

    /// Copy with a different serial port
    pub fn with_serial_port(&self, port: impl Into<String>) -> Self {
        let mut config = self.clone();
        config.link.port = port.into();
        config
    }

    /// Copy with different baud rate, read timeout and command delay
    pub fn with_serial_parameters(
        &self,
        baud_rate: u32,
        read_timeout: Duration,
        command_delay: Duration,
    ) -> Result<Self> {
        check_baud_rate(baud_rate)?;
        let mut config = self.clone();
        config.link.baud_rate = baud_rate;
        config.link.read_timeout = read_timeout;
        config.command_delay = command_delay;
        Ok(config)
    }
}

/// Explicit construction of a [`DeviceConfig`]
///
/// Unset numeric fields fall back to the library defaults. The serial port
/// has no default.
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    binary_path: Option<PathBuf>,
    programmer_path: Option<PathBuf>,
    serial_port: Option<String>,
    baud_rate: Option<u32>,
    read_timeout: Option<Duration>,
    command_delay: Option<Duration>,
    retry_count: Option<u32>,
    retry_delay: Option<Duration>,
}

impl ConfigBuilder {
    pub fn binary_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.binary_path = Some(path.into());
        self
    }

    pub fn programmer_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.programmer_path = Some(path.into());
        self
    }

    pub fn serial_port(mut self, port: impl Into<String>) -> Self {
        self.serial_port = Some(port.into());
        self
    }

    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = Some(baud_rate);
        self
    }

    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    pub fn command_delay(mut self, delay: Duration) -> Self {
        self.command_delay = Some(delay);
        self
    }

    pub fn retry_count(mut self, count: u32) -> Self {
        self.retry_count = Some(count);
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = Some(delay);
        self
    }

    /// Validate and produce the configuration
    pub fn build(self) -> Result<DeviceConfig> {
        let port = self
            .serial_port
            .ok_or_else(|| ConfigError::MissingKey("communication.serial_port".into()))?;
        if port.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "communication.serial_port".into(),
                reason: "must not be empty".into(),
            });
        }

        let baud_rate = self.baud_rate.unwrap_or(DEFAULT_BAUD_RATE);
        check_baud_rate(baud_rate)?;

        let retry_count = self.retry_count.unwrap_or(DEFAULT_RETRY_COUNT);
        if retry_count == 0 {
            return Err(ConfigError::Invalid {
                key: "retry.count".into(),
                reason: "at least one attempt is required".into(),
            });
        }

        Ok(DeviceConfig {
            binary_path: self.binary_path.unwrap_or_default(),
            programmer_path: self.programmer_path.unwrap_or_default(),
            link: LinkSettings {
                port,
                baud_rate,
                read_timeout: self.read_timeout.unwrap_or(DEFAULT_READ_TIMEOUT),
            },
            command_delay: self.command_delay.unwrap_or(DEFAULT_COMMAND_DELAY),
            retry: RetryPolicy {
                count: retry_count,
                delay: self.retry_delay.unwrap_or(DEFAULT_RETRY_DELAY),
            },
        })
    }
}

impl From<&DeviceConfig> for ConfigBuilder {
    fn from(config: &DeviceConfig) -> Self {
        Self {
            binary_path: Some(config.binary_path.clone()),
            programmer_path: Some(config.programmer_path.clone()),
            serial_port: Some(config.link.port.clone()),
            baud_rate: Some(config.link.baud_rate),
            read_timeout: Some(config.link.read_timeout),
            command_delay: Some(config.command_delay),
            retry_count: Some(config.retry.count),
            retry_delay: Some(config.retry.delay),
        }
    }
}

/// Convert fractional seconds from the document into a duration
pub fn seconds(key: &str, value: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(value).map_err(|_| ConfigError::Invalid {
        key: key.to_string(),
        reason: format!("{} is not a valid number of seconds", value),
    })
}

fn check_baud_rate(baud_rate: u32) -> Result<()> {
    if baud_rate == 0 {
        return Err(ConfigError::Invalid {
            key: "communication.baudrate".into(),
            reason: "baud rate must be non-zero".into(),
        });
    }
    Ok(())
}

fn require<T>(value: Option<T>, key: &str) -> Result<T> {
    value.ok_or_else(|| ConfigError::MissingKey(key.to_string()))
}

/// JSON document as written on disk
#[derive(Debug, Deserialize)]
struct RawDocument {
    device: Option<RawDevice>,
    communication: Option<RawCommunication>,
    retry: Option<RawRetry>,
}

#[derive(Debug, Deserialize)]
struct RawDevice {
    #[serde(alias = "binaryPath")]
    binary_path: Option<PathBuf>,
    #[serde(alias = "programmerPath")]
    programmer_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct RawCommunication {
    #[serde(alias = "serialPort")]
    serial_port: Option<String>,
    #[serde(alias = "baudRate", alias = "baud_rate")]
    baudrate: Option<u32>,
    #[serde(alias = "timeoutSeconds")]
    timeout: Option<f64>,
    #[serde(alias = "commandDelaySeconds")]
    command_delay: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawRetry {
    count: Option<u32>,
    #[serde(alias = "delaySeconds")]
    delay: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
{
    "device": {
        "binary_path": "firmware/led.bin",
        "programmer_path": "/opt/st/bin/STM32_Programmer_CLI"
    },
    "communication": {
        "serial_port": "/dev/ttyUSB0",
        "baudrate": 9600,
        "timeout": 2,
        "command_delay": 0.25
    },
    "retry": {
        "count": 5,
        "delay": 1.5
    }
}
"#;

    #[test]
    fn test_parse_full_document() {
        let config = DeviceConfig::from_json_str(FULL).unwrap();
        assert_eq!(config.binary_path(), Path::new("firmware/led.bin"));
        assert_eq!(
            config.programmer_path(),
            Path::new("/opt/st/bin/STM32_Programmer_CLI")
        );
        assert_eq!(config.link().port, "/dev/ttyUSB0");
        assert_eq!(config.link().baud_rate, 9600);
        assert_eq!(config.link().read_timeout, Duration::from_secs(2));
        assert_eq!(config.command_delay(), Duration::from_millis(250));
        assert_eq!(config.retry().count, 5);
        assert_eq!(config.retry().delay, Duration::from_millis(1500));
    }

    #[test]
    fn test_parse_camel_case_aliases() {
        let json = r#"{
            "device": { "binaryPath": "a.bin", "programmerPath": "cli" },
            "communication": {
                "serialPort": "COM3", "baudRate": 115200,
                "timeoutSeconds": 1, "commandDelaySeconds": 0.5
            },
            "retry": { "count": 3, "delaySeconds": 0.5 }
        }"#;
        let config = DeviceConfig::from_json_str(json).unwrap();
        assert_eq!(config.link().port, "COM3");
        assert_eq!(config.retry().delay, Duration::from_millis(500));
    }

    #[test]
    fn test_missing_key() {
        let json = FULL.replace("\"baudrate\": 9600,", "");
        match DeviceConfig::from_json_str(&json) {
            Err(ConfigError::MissingKey(key)) => assert_eq!(key, "communication.baudrate"),
            other => panic!("expected MissingKey, got {:?}", other),
        }

        let json = r#"{ "device": { "binary_path": "a", "programmer_path": "b" } }"#;
        match DeviceConfig::from_json_str(json) {
            Err(ConfigError::MissingKey(key)) => assert_eq!(key, "communication"),
            other => panic!("expected MissingKey, got {:?}", other),
        }
    }

    #[test]
    fn test_unparseable_document() {
        assert!(matches!(
            DeviceConfig::from_json_str("{ \"device\": "),
            Err(ConfigError::Parse(_))
        ));
        let json = FULL.replace("\"count\": 5", "\"count\": \"five\"");
        assert!(matches!(
            DeviceConfig::from_json_str(&json),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_invalid_values() {
        let json = FULL.replace("\"count\": 5", "\"count\": 0");
        assert!(matches!(
            DeviceConfig::from_json_str(&json),
            Err(ConfigError::Invalid { .. })
        ));

        let json = FULL.replace("\"delay\": 1.5", "\"delay\": -1");
        match DeviceConfig::from_json_str(&json) {
            Err(ConfigError::Invalid { key, .. }) => assert_eq!(key, "retry.delay"),
            other => panic!("expected Invalid, got {:?}", other),
        }
    }

    #[test]
    fn test_load_missing_file() {
        let path = Path::new("/nonexistent/stm32_config.json");
        match DeviceConfig::load(path) {
            Err(ConfigError::NotFound(p)) => assert_eq!(p, path),
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_builder_defaults() {
        let config = DeviceConfig::builder()
            .serial_port("/dev/ttyACM0")
            .build()
            .unwrap();
        assert_eq!(config.link().baud_rate, DEFAULT_BAUD_RATE);
        assert_eq!(config.link().read_timeout, DEFAULT_READ_TIMEOUT);
        assert_eq!(config.command_delay(), DEFAULT_COMMAND_DELAY);
        assert_eq!(config.retry(), RetryPolicy::default());
        assert!(config.binary_path().as_os_str().is_empty());
    }

    #[test]
    fn test_builder_requires_port() {
        assert!(matches!(
            DeviceConfig::builder().build(),
            Err(ConfigError::MissingKey(_))
        ));
        assert!(matches!(
            DeviceConfig::builder().serial_port("  ").build(),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn test_setters_return_copies() {
        let config = DeviceConfig::from_json_str(FULL).unwrap();
        let updated = config
            .with_serial_port("COM7")
            .with_serial_parameters(57600, Duration::from_secs(3), Duration::ZERO)
            .unwrap();

        assert_eq!(config.link().port, "/dev/ttyUSB0");
        assert_eq!(updated.link().port, "COM7");
        assert_eq!(updated.link().baud_rate, 57600);
        assert_eq!(updated.command_delay(), Duration::ZERO);
        assert_eq!(updated.retry(), config.retry());

        assert!(config
            .with_serial_parameters(0, Duration::from_secs(1), Duration::ZERO)
            .is_err());
    }

    #[test]
    fn test_builder_round_trip_from_config() {
        let config = DeviceConfig::from_json_str(FULL).unwrap();
        let rebuilt = ConfigBuilder::from(&config).baud_rate(19200).build().unwrap();
        assert_eq!(rebuilt.link().baud_rate, 19200);
        assert_eq!(rebuilt.binary_path(), config.binary_path());
    }
}
