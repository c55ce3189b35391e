//! CLI argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "stm32-bringup")]
#[command(
    author,
    version,
    about = "STM32 board bring-up: flash firmware and drive LEDs over UART",
    long_about = None
)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// JSON configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Serial port connected to the board UART (overrides the config file)
    #[arg(short, long, global = true)]
    pub port: Option<String>,

    /// Baud rate (overrides the config file)
    #[arg(short, long, global = true)]
    pub baud: Option<u32>,

    /// Firmware image to flash (overrides the config file)
    #[arg(long, global = true)]
    pub binary: Option<PathBuf>,

    /// STM32_Programmer_CLI executable (overrides the config file)
    #[arg(long, global = true)]
    pub programmer: Option<PathBuf>,

    /// Talk to an emulated board instead of hardware
    #[cfg(feature = "dummy")]
    #[arg(long, global = true)]
    pub dummy: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write the firmware image to the board and start it
    Flash,

    /// Check that the board answers on the UART
    Verify,

    /// Switch one LED
    Led {
        /// LED color (orange, blue, ...)
        color: String,

        /// ON or OFF
        action: String,
    },

    /// Cycle the orange and blue LEDs on and off
    TestLeds,

    /// Run a test keyword by name
    Run {
        /// Keyword name, e.g. "Initialize Device" or "Turn LED blue ON"
        keyword: String,

        /// Keyword arguments
        args: Vec<String>,
    },

    /// List the available test keywords
    ListKeywords,

    /// List serial ports present on this machine
    ListPorts,

    /// Print the effective configuration
    ShowConfig,
}
