//! Error types for UART operations

use thiserror::Error;

/// UART-specific errors
#[derive(Debug, Error)]
pub enum UartError {
    /// The serial port could not be opened or claimed
    #[error("Failed to open serial port {port}: {reason}")]
    ConnectionFailed { port: String, reason: String },

    /// Command text would not fit on a single line
    #[error("Invalid command {0:?}: commands must be a single line")]
    InvalidCommand(String),

    /// I/O error while talking to the device
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serial port error while talking to the device
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),
}

impl UartError {
    /// Whether this error came from the transport mid-exchange
    ///
    /// Only these are absorbed by the retry loop.
    pub fn is_transport(&self) -> bool {
        matches!(self, UartError::Io(_) | UartError::Serial(_))
    }
}

/// Result type for UART operations
pub type Result<T> = std::result::Result<T, UartError>;
