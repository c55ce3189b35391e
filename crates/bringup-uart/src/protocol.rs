//! Wire protocol constants and framing
//!
//! Commands are ASCII lines terminated by `\n`. The board answers each
//! command with one line; only the exact text `OK` counts as success.

use std::time::Duration;

use crate::error::{Result, UartError};
use crate::transport::Transport;

/// Line terminator appended to every command
pub const LINE_TERMINATOR: u8 = b'\n';

/// The only response accepted as success
pub const OK_RESPONSE: &str = "OK";

/// Connectivity probe command
pub const PROBE_COMMAND: &str = "TEST";

/// How long the probe waits for any reply
pub const PROBE_WINDOW: Duration = Duration::from_millis(500);

/// Longest response line kept; anything beyond is cut off
pub const MAX_LINE_LEN: usize = 256;

/// Frame a command for the wire
pub fn encode_command(command: &str) -> Result<Vec<u8>> {
    if command.contains(|c: char| c == '\n' || c == '\r') {
        return Err(UartError::InvalidCommand(command.to_string()));
    }
    let mut frame = Vec::with_capacity(command.len() + 1);
    frame.extend_from_slice(command.as_bytes());
    frame.push(LINE_TERMINATOR);
    Ok(frame)
}

/// Read one line, up to and including the terminator
///
/// Stops early when the read timeout expires, so the result may be a partial
/// line or empty.
pub fn read_line<T: Transport + ?Sized>(transport: &mut T) -> Result<Vec<u8>> {
    let mut line = Vec::new();
    let mut byte = [0u8; 1];

    while line.len() < MAX_LINE_LEN {
        if transport.read(&mut byte)? == 0 {
            break;
        }
        line.push(byte[0]);
        if byte[0] == LINE_TERMINATOR {
            break;
        }
    }

    Ok(line)
}

/// Decode a raw response line into trimmed text
///
/// Invalid UTF-8 is replaced rather than rejected; such a line can never
/// equal `OK` anyway.
pub fn decode_response(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).trim().to_string()
}

/// Whether a decoded response means success
pub fn is_ok(response: &str) -> bool {
    response == OK_RESPONSE
}
