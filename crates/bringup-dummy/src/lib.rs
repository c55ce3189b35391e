//! bringup-dummy - In-memory STM32 LED board emulator
//!
//! This crate emulates the LED firmware on the board well enough to drive
//! the whole stack without hardware: UART commands are parsed the way the
//! firmware parses them, flashing resets the board, and faults can be
//! injected to exercise the retry paths.

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::path::Path;
use std::rc::Rc;

use bringup_core::LinkSettings;
use bringup_cubeprog::{FlashOutput, Flasher, Missing, ProgrammerError};
use bringup_uart::{Connector, Transport, UartError};

/// Firmware receive buffer size (one byte is kept for the terminator)
pub const COMMAND_BUFFER_LEN: usize = 100;

/// Reply for a command the firmware carried out
pub const REPLY_OK: &str = "OK\n";

/// Reply for anything the firmware does not recognise
pub const REPLY_UNKNOWN: &str = "UNKNOWN COMMAND\n";

/// Configuration for the dummy board
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// LEDs the firmware answers to
    pub colors: Vec<String>,
    /// Number of upcoming commands whose reply is lost on the wire
    pub lost_replies: usize,
    /// Number of upcoming writes that fail at the transport level
    pub transport_faults: usize,
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            // The shipped firmware only handles these two
            colors: vec!["orange".into(), "blue".into()],
            lost_replies: 0,
            transport_faults: 0,
        }
    }
}

/// Dummy board
///
/// Holds LED state and the two directions of the UART.
#[derive(Debug)]
pub struct DummyBoard {
    config: DummyConfig,
    leds: BTreeMap<String, bool>,
    /// Partially received command
    rx_line: Vec<u8>,
    /// Bytes waiting to be read by the host
    tx: VecDeque<u8>,
    /// Every command the firmware processed, in order
    history: Vec<String>,
    flash_count: usize,
}

impl DummyBoard {
    /// Create a new dummy board with the given configuration
    pub fn new(config: DummyConfig) -> Self {
        let leds = config.colors.iter().map(|c| (c.clone(), false)).collect();
        Self {
            config,
            leds,
            rx_line: Vec::new(),
            tx: VecDeque::new(),
            history: Vec::new(),
            flash_count: 0,
        }
    }

    /// Create a new dummy board running the shipped LED firmware
    pub fn new_default() -> Self {
        Self::new(DummyConfig::default())
    }

    /// Wrap the board for sharing between a connector and a flasher
    pub fn shared(self) -> Rc<RefCell<DummyBoard>> {
        Rc::new(RefCell::new(self))
    }

    /// State of one LED, `None` if the board has no LED of that color
    pub fn led(&self, color: &str) -> Option<bool> {
        self.leds.get(color).copied()
    }

    /// Commands processed so far
    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// Number of times the board was flashed
    pub fn flash_count(&self) -> usize {
        self.flash_count
    }

    /// Lose the replies to the next `n` commands
    pub fn lose_replies(&mut self, n: usize) {
        self.config.lost_replies = n;
    }

    /// Fail the next `n` host writes
    pub fn inject_transport_faults(&mut self, n: usize) {
        self.config.transport_faults = n;
    }

    /// Bytes arriving from the host
    fn receive(&mut self, data: &[u8]) -> std::io::Result<()> {
        if self.config.transport_faults > 0 {
            self.config.transport_faults -= 1;
            return Err(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "dummy: injected transport fault",
            ));
        }

        for &byte in data {
            // The firmware ends a command at either terminator, so "\r\n"
            // yields an extra empty command.
            if byte == b'\n' || byte == b'\r' || self.rx_line.len() == COMMAND_BUFFER_LEN - 1 {
                let line = std::mem::take(&mut self.rx_line);
                self.process(&String::from_utf8_lossy(&line));
                if byte != b'\n' && byte != b'\r' {
                    self.rx_line.push(byte);
                }
            } else {
                self.rx_line.push(byte);
            }
        }
        Ok(())
    }

    fn process(&mut self, command: &str) {
        let reply = self.execute(command);
        log::trace!("dummy: '{}' -> {:?}", command, reply);
        self.history.push(command.to_string());

        if self.config.lost_replies > 0 {
            self.config.lost_replies -= 1;
            return;
        }
        self.tx.extend(reply.bytes());
    }

    fn execute(&mut self, command: &str) -> &'static str {
        let (state, color) = if let Some(color) = command.strip_prefix("LED_ON ") {
            (true, color)
        } else if let Some(color) = command.strip_prefix("LED_OFF ") {
            (false, color)
        } else {
            return REPLY_UNKNOWN;
        };

        match self.leds.get_mut(color) {
            Some(led) => {
                *led = state;
                REPLY_OK
            }
            None => REPLY_UNKNOWN,
        }
    }

    /// Power-on state after a flash: LEDs off, UART buffers empty
    fn reset(&mut self) {
        for led in self.leds.values_mut() {
            *led = false;
        }
        self.rx_line.clear();
        self.tx.clear();
    }
}

/// Transport connected to a dummy board
pub struct DummyTransport {
    board: Rc<RefCell<DummyBoard>>,
}

impl DummyTransport {
    pub fn new(board: Rc<RefCell<DummyBoard>>) -> Self {
        Self { board }
    }
}

impl Transport for DummyTransport {
    fn write(&mut self, data: &[u8]) -> bringup_uart::Result<()> {
        self.board.borrow_mut().receive(data)?;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> bringup_uart::Result<usize> {
        let mut board = self.board.borrow_mut();
        let n = buf.len().min(board.tx.len());
        for (slot, byte) in buf.iter_mut().zip(board.tx.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn bytes_to_read(&mut self) -> bringup_uart::Result<usize> {
        Ok(self.board.borrow().tx.len())
    }

    fn clear_buffers(&mut self) -> bringup_uart::Result<()> {
        let mut board = self.board.borrow_mut();
        board.tx.clear();
        Ok(())
    }

    fn flush(&mut self) -> bringup_uart::Result<()> {
        Ok(())
    }

    fn delay(&mut self, _duration: std::time::Duration) {
        // The emulated firmware answers instantly
    }
}

/// Connector handing out transports to one shared dummy board
#[derive(Clone)]
pub struct DummyConnector {
    board: Rc<RefCell<DummyBoard>>,
}

impl DummyConnector {
    pub fn new(board: Rc<RefCell<DummyBoard>>) -> Self {
        Self { board }
    }

    /// The board behind this connector
    pub fn board(&self) -> Rc<RefCell<DummyBoard>> {
        Rc::clone(&self.board)
    }
}

impl Connector for DummyConnector {
    fn connect(&self, link: &LinkSettings) -> bringup_uart::Result<Box<dyn Transport>> {
        if link.port.is_empty() {
            return Err(UartError::ConnectionFailed {
                port: link.port.clone(),
                reason: "no port given".into(),
            });
        }
        log::debug!("dummy: connected as {} at {} baud", link.port, link.baud_rate);
        Ok(Box::new(DummyTransport::new(self.board())))
    }
}

/// Flasher that "programs" a dummy board
///
/// Only the firmware image has to exist; the programmer path is ignored.
pub struct DummyFlasher {
    board: Rc<RefCell<DummyBoard>>,
}

impl DummyFlasher {
    pub fn new(board: Rc<RefCell<DummyBoard>>) -> Self {
        Self { board }
    }
}

impl Flasher for DummyFlasher {
    fn flash(&self, _programmer: &Path, binary: &Path) -> bringup_cubeprog::Result<FlashOutput> {
        let size = std::fs::metadata(binary)
            .map_err(|_| ProgrammerError::NotFound {
                what: Missing::Binary,
                path: binary.to_path_buf(),
            })?
            .len();

        let mut board = self.board.borrow_mut();
        board.reset();
        board.flash_count += 1;
        log::info!("dummy: flashed {} bytes from {}", size, binary.display());

        Ok(FlashOutput {
            stdout: format!(
                concat!(
                    "Size : {} Bytes\n",
                    "Download verified successfully\n",
                    "Start operation achieved successfully\n",
                ),
                size
            ),
            stderr: String::new(),
        })
    }

    fn settle(&self, duration: std::time::Duration) {
        log::debug!("dummy: skipping {:?} settle delay", duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bringup_uart::{CommandPolicy, UartChannel};
    use std::time::Duration;

    fn link() -> LinkSettings {
        LinkSettings {
            port: "dummy".into(),
            baud_rate: 115200,
            read_timeout: Duration::from_secs(1),
        }
    }

    fn channel(board: &Rc<RefCell<DummyBoard>>) -> UartChannel<Box<dyn Transport>> {
        let transport = DummyConnector::new(Rc::clone(board)).connect(&link()).unwrap();
        UartChannel::new(transport, CommandPolicy::default())
    }

    #[test]
    fn test_led_commands() {
        let board = DummyBoard::new_default().shared();
        let mut ch = channel(&board);

        assert!(ch.send_command("LED_ON orange").unwrap());
        assert_eq!(board.borrow().led("orange"), Some(true));

        assert!(ch.send_command("LED_OFF orange").unwrap());
        assert_eq!(board.borrow().led("orange"), Some(false));
    }

    #[test]
    fn test_unknown_led_is_rejected() {
        let board = DummyBoard::new_default().shared();
        let mut ch = channel(&board);

        assert!(!ch.send_command("LED_ON green").unwrap());
        assert_eq!(board.borrow().led("green"), None);
        // Every attempt reached the firmware
        assert_eq!(board.borrow().history().len(), 3);
    }

    #[test]
    fn test_probe_gets_unknown_command() {
        let board = DummyBoard::new_default().shared();
        assert!(channel(&board).probe().unwrap());
        assert_eq!(board.borrow().history(), ["TEST"]);
    }

    #[test]
    fn test_crlf_splits_commands() {
        let mut board = DummyBoard::new_default();
        board.receive(b"LED_ON blue\r\n").unwrap();
        assert_eq!(board.history(), ["LED_ON blue", ""]);
        assert_eq!(board.tx.iter().copied().collect::<Vec<_>>(), b"OK\nUNKNOWN COMMAND\n");
    }

    #[test]
    fn test_overlong_command_is_split() {
        let mut board = DummyBoard::new_default();
        let long = "X".repeat(COMMAND_BUFFER_LEN + 5);
        board.receive(format!("{}\n", long).as_bytes()).unwrap();
        assert_eq!(board.history().len(), 2);
        assert_eq!(board.history()[0].len(), COMMAND_BUFFER_LEN - 1);
    }

    #[test]
    fn test_lost_replies_are_retried() {
        let board = DummyBoard::new_default().shared();
        board.borrow_mut().lose_replies(2);
        assert!(channel(&board).send_command("LED_ON blue").unwrap());
        assert_eq!(board.borrow().history().len(), 3);
    }

    #[test]
    fn test_transport_faults() {
        let board = DummyBoard::new_default().shared();
        board.borrow_mut().inject_transport_faults(3);
        assert!(matches!(
            channel(&board).send_command("LED_ON blue"),
            Err(UartError::Io(_))
        ));
        assert!(board.borrow().history().is_empty());
    }

    #[test]
    fn test_flash_resets_board() {
        let board = DummyBoard::new_default().shared();
        assert!(channel(&board).send_command("LED_ON blue").unwrap());

        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("led.bin");
        std::fs::write(&image, [0xAAu8; 64]).unwrap();

        let output = DummyFlasher::new(Rc::clone(&board))
            .flash(Path::new("STM32_Programmer_CLI"), &image)
            .unwrap();
        assert!(output.stdout.contains("Size : 64 Bytes"));
        assert_eq!(board.borrow().led("blue"), Some(false));
        assert_eq!(board.borrow().flash_count(), 1);
    }

    #[test]
    fn test_flash_missing_image() {
        let board = DummyBoard::new_default().shared();
        let result =
            DummyFlasher::new(board).flash(Path::new(""), Path::new("/nonexistent/led.bin"));
        assert!(matches!(
            result,
            Err(ProgrammerError::NotFound {
                what: Missing::Binary,
                ..
            })
        ));
    }

    #[test]
    fn test_connect_without_port() {
        let board = DummyBoard::new_default().shared();
        let link = LinkSettings {
            port: String::new(),
            ..link()
        };

        match DummyConnector::new(Rc::clone(&board)).connect(&link) {
            Err(UartError::ConnectionFailed { port, .. }) => assert!(port.is_empty()),
            Err(e) => panic!("expected ConnectionFailed, got {:?}", e),
            Ok(_) => panic!("connected without a port"),
        }
        assert!(board.borrow().history().is_empty());
    }
}
