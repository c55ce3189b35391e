//! Error types for the device facade and keyword layer

use bringup_core::ConfigError;
use bringup_cubeprog::ProgrammerError;
use bringup_uart::UartError;
use thiserror::Error;

/// Errors from device operations
///
/// Lower-level errors are wrapped transparently so the root cause shows up
/// unchanged in logs.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Uart(#[from] UartError),

    #[error(transparent)]
    Programmer(#[from] ProgrammerError),

    /// Session state required by the operation is missing
    #[error("{0}")]
    Precondition(String),
}

/// Errors reported to the test runner by a keyword
#[derive(Debug, Error)]
pub enum KeywordError {
    /// The operation ran but did not succeed
    #[error("{0}")]
    Failed(String),

    /// No keyword matches the invocation
    #[error("No keyword with name '{0}' found")]
    UnknownKeyword(String),

    /// Wrong number of arguments
    #[error("Keyword '{keyword}' expected {expected} arguments, got {got}")]
    Arguments {
        keyword: String,
        expected: String,
        got: usize,
    },

    /// An argument could not be interpreted
    #[error("Invalid argument for '{keyword}': {reason}")]
    InvalidArgument { keyword: String, reason: String },

    #[error(transparent)]
    Device(#[from] DeviceError),
}

impl From<UartError> for KeywordError {
    fn from(e: UartError) -> Self {
        KeywordError::Device(e.into())
    }
}

impl From<ProgrammerError> for KeywordError {
    fn from(e: ProgrammerError) -> Self {
        KeywordError::Device(e.into())
    }
}

impl From<ConfigError> for KeywordError {
    fn from(e: ConfigError) -> Self {
        KeywordError::Device(e.into())
    }
}

/// Result type for device operations
pub type Result<T> = std::result::Result<T, DeviceError>;
