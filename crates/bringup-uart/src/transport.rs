//! Transport layer abstraction for UART communication
//!
//! The channel only needs a handful of byte-level primitives. Real hardware
//! goes through [`serial::SerialTransport`]; tests and the dummy board
//! implement the same trait in memory.

use std::time::Duration;

use bringup_core::LinkSettings;

use crate::error::Result;

/// Transport trait for reading and writing bytes
pub trait Transport {
    /// Write all bytes to the transport
    fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Read up to `buf.len()` bytes
    ///
    /// Blocks for at most the configured read timeout and returns 0 if
    /// nothing arrived in that time.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Number of received bytes waiting to be read
    fn bytes_to_read(&mut self) -> Result<usize>;

    /// Discard pending input and output
    fn clear_buffers(&mut self) -> Result<()>;

    /// Flush any buffered output
    fn flush(&mut self) -> Result<()>;

    /// Wait for the given duration
    fn delay(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        (**self).write(data)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read(buf)
    }

    fn bytes_to_read(&mut self) -> Result<usize> {
        (**self).bytes_to_read()
    }

    fn clear_buffers(&mut self) -> Result<()> {
        (**self).clear_buffers()
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }

    fn delay(&mut self, duration: Duration) {
        (**self).delay(duration)
    }
}

/// Opens a fresh transport for one transaction
///
/// The returned transport is released when dropped, so each logical
/// exchange holds the port only for as long as it runs.
pub trait Connector {
    fn connect(&self, link: &LinkSettings) -> Result<Box<dyn Transport>>;
}

/// Connector for real serial ports
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialConnector;

impl Connector for SerialConnector {
    fn connect(&self, link: &LinkSettings) -> Result<Box<dyn Transport>> {
        Ok(Box::new(serial::SerialTransport::open(link)?))
    }
}

pub mod serial {
    //! Serial port transport implementation

    use super::*;
    use crate::error::UartError;
    use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};
    use std::io::{Read, Write};

    /// Serial port transport
    pub struct SerialTransport {
        port: Box<dyn SerialPort>,
        name: String,
    }

    impl SerialTransport {
        /// Open a serial port as 8N1 without flow control
        pub fn open(link: &LinkSettings) -> Result<Self> {
            let port = serialport::new(&link.port, link.baud_rate)
                .data_bits(DataBits::Eight)
                .parity(Parity::None)
                .stop_bits(StopBits::One)
                .flow_control(FlowControl::None)
                .timeout(link.read_timeout)
                .open()
                .map_err(|e| UartError::ConnectionFailed {
                    port: link.port.clone(),
                    reason: e.to_string(),
                })?;

            log::info!("Opened serial port {} at {} baud", link.port, link.baud_rate);

            Ok(Self {
                port,
                name: link.port.clone(),
            })
        }
    }

    impl Transport for SerialTransport {
        fn write(&mut self, data: &[u8]) -> Result<()> {
            self.port.write_all(data)?;
            Ok(())
        }

        fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
            match self.port.read(buf) {
                Ok(n) => Ok(n),
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(0),
                Err(e) => Err(UartError::from(e)),
            }
        }

        fn bytes_to_read(&mut self) -> Result<usize> {
            Ok(self.port.bytes_to_read()? as usize)
        }

        fn clear_buffers(&mut self) -> Result<()> {
            self.port.clear(ClearBuffer::All)?;
            Ok(())
        }

        fn flush(&mut self) -> Result<()> {
            self.port.flush()?;
            Ok(())
        }
    }

    impl Drop for SerialTransport {
        fn drop(&mut self) {
            log::debug!("Closed serial port {}", self.name);
        }
    }
}
