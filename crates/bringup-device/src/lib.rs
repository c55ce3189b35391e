//! bringup-device - Device facade and test keywords
//!
//! [`Device`] composes the configuration, the UART command channel and the
//! flash programmer into the operations a bring-up session needs. The
//! [`Library`] exposes those operations as named keywords with string
//! arguments.
//!
//! # Example
//!
//! ```no_run
//! use bringup_core::DeviceConfig;
//! use bringup_device::{Device, Library};
//!
//! let config = DeviceConfig::load("config/stm32_config.json")?;
//! let mut library = Library::new(Device::from_config(config));
//!
//! library.run("Flash Device Firmware", &[])?;
//! library.run("Initialize Device", &[])?;
//! library.run("Turn LED blue ON", &[])?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod device;
pub mod error;
pub mod keywords;

// Re-exports
pub use device::Device;
pub use error::{DeviceError, KeywordError, Result};
pub use keywords::{Keyword, Library};
