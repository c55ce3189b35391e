//! Device facade
//!
//! [`Device`] ties the configuration to a [`Connector`] for the UART and a
//! [`Flasher`] for the programmer. Every UART operation opens its own
//! connection and releases it before returning.

use bringup_core::{DeviceConfig, LedTarget};
use bringup_cubeprog::{CubeFlasher, FlashOutput, Flasher, SETTLE_DELAY};
use bringup_uart::{CommandPolicy, Connector, SerialConnector, Transport, UartChannel};

use crate::error::{DeviceError, Result};

/// An STM32 board reachable over UART and SWD
pub struct Device {
    config: DeviceConfig,
    connector: Box<dyn Connector>,
    flasher: Box<dyn Flasher>,
}

impl Device {
    /// Create a device from explicit collaborators
    pub fn new(
        config: DeviceConfig,
        connector: Box<dyn Connector>,
        flasher: Box<dyn Flasher>,
    ) -> Self {
        Self {
            config,
            connector,
            flasher,
        }
    }

    /// Create a device talking to real hardware
    ///
    /// UART goes through the serial port named in the configuration and
    /// flashing through STM32CubeProgrammer.
    pub fn from_config(config: DeviceConfig) -> Self {
        Self::new(config, Box::new(SerialConnector), Box::new(CubeFlasher))
    }

    /// Create a device backed by an emulated board
    #[cfg(feature = "dummy")]
    pub fn dummy(
        config: DeviceConfig,
        board: std::rc::Rc<std::cell::RefCell<bringup_dummy::DummyBoard>>,
    ) -> Self {
        Self::new(
            config,
            Box::new(bringup_dummy::DummyConnector::new(std::rc::Rc::clone(&board))),
            Box::new(bringup_dummy::DummyFlasher::new(board)),
        )
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Replace the configuration used by subsequent operations
    pub fn set_config(&mut self, config: DeviceConfig) {
        self.config = config;
    }

    /// Check that the board answers on the UART
    pub fn verify_connection(&self) -> Result<bool> {
        let mut channel = self.open_channel()?;
        Ok(channel.probe()?)
    }

    /// Switch one LED, e.g. `control_led("Blue", "on")` sends `LED_ON blue`
    pub fn control_led(&self, color: &str, action: &str) -> Result<bool> {
        let target = LedTarget::parse(color, action);
        self.set_led(&target)
    }

    /// Switch one LED from an already parsed target
    pub fn set_led(&self, target: &LedTarget) -> Result<bool> {
        let ok = self.send_command(&target.command())?;
        if ok {
            log::info!("Successfully turned {} LED {}", target.color, target.action);
        } else {
            log::error!("Failed to turn {} LED {}", target.color, target.action);
        }
        Ok(ok)
    }

    /// Send a raw command line and wait for `OK`
    pub fn send_command(&self, command: &str) -> Result<bool> {
        let mut channel = self.open_channel()?;
        Ok(channel.send_command(command)?)
    }

    /// Write the configured firmware image, then wait for the board to boot
    pub fn flash(&self) -> Result<FlashOutput> {
        let binary = self.config.binary_path();
        let programmer = self.config.programmer_path();
        if binary.as_os_str().is_empty() {
            return Err(DeviceError::Precondition("Binary path not set".into()));
        }
        if programmer.as_os_str().is_empty() {
            return Err(DeviceError::Precondition("Programmer path not set".into()));
        }

        let output = self.flasher.flash(programmer, binary)?;
        self.flasher.settle(SETTLE_DELAY);
        Ok(output)
    }

    fn open_channel(&self) -> Result<UartChannel<Box<dyn Transport>>> {
        let link = self.config.link();
        if link.port.trim().is_empty() {
            return Err(DeviceError::Precondition("Serial port not set".into()));
        }
        let transport = self.connector.connect(link)?;
        Ok(UartChannel::new(
            transport,
            CommandPolicy::new(self.config.command_delay(), self.config.retry()),
        ))
    }
}
