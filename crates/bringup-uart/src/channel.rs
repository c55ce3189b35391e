//! Retrying command channel
//!
//! Each attempt clears both directions, writes the command, waits a fixed
//! delay and reads one line back. The board's UART handler drops bytes under
//! load, so the channel makes a bounded number of blind attempts with fixed
//! delays in between. The delays follow the board's processing cadence.

use std::time::Duration;

use bringup_core::config::{DEFAULT_COMMAND_DELAY, DEFAULT_RETRY_COUNT, DEFAULT_RETRY_DELAY};
use bringup_core::RetryPolicy;

use crate::error::Result;
use crate::protocol::{
    decode_response, encode_command, is_ok, read_line, PROBE_COMMAND, PROBE_WINDOW,
};
use crate::transport::Transport;

/// Timing and retry parameters for one command exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandPolicy {
    /// Wait between writing the command and reading the reply
    pub command_delay: Duration,
    /// Total attempts, including the first one
    pub retry_count: u32,
    /// Wait between two attempts
    pub retry_delay: Duration,
}

impl CommandPolicy {
    pub fn new(command_delay: Duration, retry: RetryPolicy) -> Self {
        Self {
            command_delay,
            retry_count: retry.count,
            retry_delay: retry.delay,
        }
    }
}

impl Default for CommandPolicy {
    fn default() -> Self {
        Self {
            command_delay: DEFAULT_COMMAND_DELAY,
            retry_count: DEFAULT_RETRY_COUNT,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// Command channel over an open transport
pub struct UartChannel<T: Transport> {
    transport: T,
    policy: CommandPolicy,
}

impl<T: Transport> UartChannel<T> {
    pub fn new(transport: T, policy: CommandPolicy) -> Self {
        Self { transport, policy }
    }

    pub fn policy(&self) -> &CommandPolicy {
        &self.policy
    }

    /// Send a command using the channel's own policy
    pub fn send_command(&mut self, command: &str) -> Result<bool> {
        let policy = self.policy;
        self.send_command_with(command, &policy)
    }

    /// Send a command and wait for an `OK` reply
    ///
    /// Returns `Ok(true)` on the first `OK`, `Ok(false)` once every attempt
    /// got something else (or nothing). A transport error is retried like a
    /// wrong reply, except on the last attempt where it is returned.
    pub fn send_command_with(&mut self, command: &str, policy: &CommandPolicy) -> Result<bool> {
        let frame = encode_command(command)?;

        for attempt in 1..=policy.retry_count {
            if attempt > 1 {
                self.transport.delay(policy.retry_delay);
            }

            log::debug!(
                "Sending command (attempt {}/{}): {}",
                attempt,
                policy.retry_count,
                command
            );

            match self.exchange(&frame, policy.command_delay) {
                Ok(response) if is_ok(&response) => {
                    log::debug!("Command '{}' acknowledged", command);
                    return Ok(true);
                }
                Ok(response) => {
                    log::warn!("Unexpected response to '{}': '{}'", command, response);
                }
                Err(e) if attempt == policy.retry_count || !e.is_transport() => {
                    log::error!(
                        "Serial communication error on attempt {}: {}",
                        attempt,
                        e
                    );
                    return Err(e);
                }
                Err(e) => {
                    log::error!(
                        "Serial communication error on attempt {}: {}",
                        attempt,
                        e
                    );
                }
            }
        }

        Ok(false)
    }

    /// Check that the device is talking at all
    ///
    /// Sends `TEST` and succeeds if any bytes arrive within a fixed window.
    /// Unlike [`send_command`](Self::send_command) the reply does not have to
    /// be `OK`.
    pub fn probe(&mut self) -> Result<bool> {
        log::info!("Testing UART connection...");
        self.transport.write(&encode_command(PROBE_COMMAND)?)?;
        self.transport.flush()?;
        self.transport.delay(PROBE_WINDOW);

        if self.transport.bytes_to_read()? == 0 {
            log::error!("No response from device");
            return Ok(false);
        }

        let response = decode_response(&read_line(&mut self.transport)?);
        log::info!("UART test response: {}", response);
        Ok(true)
    }

    /// Get a mutable reference to the transport
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Give back the transport
    pub fn into_inner(self) -> T {
        self.transport
    }

    /// One attempt: clear, write, wait, read a line
    fn exchange(&mut self, frame: &[u8], command_delay: Duration) -> Result<String> {
        self.transport.clear_buffers()?;
        self.transport.write(frame)?;
        self.transport.flush()?;
        self.transport.delay(command_delay);

        let response = decode_response(&read_line(&mut self.transport)?);
        log::debug!("Received response: '{}'", response);

        let pending = self.transport.bytes_to_read()?;
        if pending > 0 {
            let mut extra = vec![0u8; pending];
            let n = self.transport.read(&mut extra)?;
            log::debug!(
                "Additional data received: {:?}",
                String::from_utf8_lossy(&extra[..n])
            );
        }

        Ok(response)
    }
}
