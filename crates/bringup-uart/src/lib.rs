//! bringup-uart - Line-oriented UART command channel
//!
//! The LED firmware on the board reads one ASCII command per line and
//! answers with a single line. `OK` means the command was carried out;
//! anything else (including silence) means it was not.
//!
//! # Example
//!
//! ```no_run
//! use bringup_core::DeviceConfig;
//! use bringup_uart::{CommandPolicy, Connector, SerialConnector, UartChannel};
//!
//! let config = DeviceConfig::builder().serial_port("/dev/ttyUSB0").build()?;
//! let transport = SerialConnector.connect(config.link())?;
//! let mut channel = UartChannel::new(
//!     transport,
//!     CommandPolicy::new(config.command_delay(), config.retry()),
//! );
//!
//! if channel.send_command("LED_ON orange")? {
//!     println!("orange LED is on");
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod channel;
pub mod error;
pub mod protocol;
pub mod transport;

// Re-exports
pub use channel::{CommandPolicy, UartChannel};
pub use error::{Result, UartError};
pub use transport::serial::SerialTransport;
pub use transport::{Connector, SerialConnector, Transport};

/// List serial port names present on this machine
pub fn available_ports() -> Result<Vec<String>> {
    Ok(serialport::available_ports()?
        .into_iter()
        .map(|p| p.port_name)
        .collect())
}
