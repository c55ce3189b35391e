//! stm32-bringup - STM32 board bring-up tool
//!
//! Flashes firmware through STM32CubeProgrammer and drives the board's LED
//! firmware over UART.
//!
//! # Architecture
//!
//! Every command goes through the keyword [`Library`], the same surface a
//! test runner uses:
//! - **Flashing** shells out to `STM32_Programmer_CLI` over SWD
//! - **UART commands** are single lines answered with `OK`, retried a fixed
//!   number of times
//!
//! With `--dummy` the board is replaced by an in-memory emulator of the LED
//! firmware.

mod cli;
mod commands;

use bringup_core::{ConfigBuilder, DeviceConfig};
use bringup_device::{Device, Library};
use clap::Parser;
use cli::{Cli, Commands};

fn main() {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    // These two never touch the board
    match cli.command {
        Commands::ListKeywords => {
            commands::list_keywords();
            return Ok(());
        }
        Commands::ListPorts => return commands::list_ports(),
        _ => {}
    }

    let config = load_config(&cli)?;
    let mut library = open_library(&cli, config);

    match cli.command {
        Commands::Flash => commands::flash::run_flash(&mut library),
        Commands::Verify => {
            library.run("Initialize Device", &[])?;
            println!(
                "Device is responding on {}",
                library.device().config().link().port
            );
            Ok(())
        }
        Commands::Led { color, action } => {
            library.run("Test Single LED", &[color.as_str(), action.as_str()])?;
            println!("{} LED {}", color.to_lowercase(), action.to_uppercase());
            Ok(())
        }
        Commands::TestLeds => {
            library.run("Test All LEDs", &[])?;
            println!("All LEDs OK");
            Ok(())
        }
        Commands::Run { keyword, args } => {
            let args: Vec<&str> = args.iter().map(String::as_str).collect();
            library.run(&keyword, &args)?;
            println!("PASS: {}", keyword);
            Ok(())
        }
        Commands::ShowConfig => {
            commands::show_config(library.device().config());
            Ok(())
        }
        Commands::ListKeywords | Commands::ListPorts => Ok(()),
    }
}

/// Build the session configuration from `--config` and the override flags
fn load_config(cli: &Cli) -> Result<DeviceConfig, Box<dyn std::error::Error>> {
    let mut builder = match &cli.config {
        Some(path) => {
            let config = DeviceConfig::load(path)?;
            log::info!("Loaded configuration from {}", path.display());
            ConfigBuilder::from(&config)
        }
        None => DeviceConfig::builder(),
    };

    if let Some(port) = &cli.port {
        builder = builder.serial_port(port.as_str());
    } else if cli.config.is_none() && is_dummy(cli) {
        builder = builder.serial_port("dummy");
    }
    if let Some(baud) = cli.baud {
        builder = builder.baud_rate(baud);
    }
    if let Some(binary) = &cli.binary {
        builder = builder.binary_path(binary);
    }
    if let Some(programmer) = &cli.programmer {
        builder = builder.programmer_path(programmer);
    }

    Ok(builder.build()?)
}

#[cfg(feature = "dummy")]
fn is_dummy(cli: &Cli) -> bool {
    cli.dummy
}

#[cfg(not(feature = "dummy"))]
fn is_dummy(_cli: &Cli) -> bool {
    false
}

#[cfg_attr(not(feature = "dummy"), allow(unused_variables))]
fn open_library(cli: &Cli, config: DeviceConfig) -> Library {
    #[cfg(feature = "dummy")]
    {
        if cli.dummy {
            log::info!("Using emulated board on '{}'", config.link().port);
            let board = bringup_dummy::DummyBoard::new_default().shared();
            return Library::new(Device::dummy(config, board));
        }
    }

    log::debug!(
        "Using {} at {} baud",
        config.link().port,
        config.link().baud_rate
    );
    Library::new(Device::from_config(config))
}
