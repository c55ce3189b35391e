//! bringup-core - Shared types for STM32 bring-up automation
//!
//! This crate holds what every other bringup crate agrees on:
//!
//! - [`config`]: the session configuration ([`DeviceConfig`]) and its JSON form
//! - [`led`]: the LED command model spoken over UART
//! - [`error`]: configuration errors

pub mod config;
pub mod error;
pub mod led;

pub use config::{ConfigBuilder, DeviceConfig, LinkSettings, RetryPolicy};
pub use error::{ConfigError, Result};
pub use led::{LedAction, LedTarget, LED_TEST_SEQUENCE};
