//! List commands implementation

use bringup_core::DeviceConfig;
use bringup_device::Library;

/// List all test keywords
pub fn list_keywords() {
    println!("Available keywords:");
    println!();

    for keyword in Library::keywords() {
        println!("  {:<36} {}", keyword.usage(), keyword.doc);
    }
}

/// List serial ports present on this machine
pub fn list_ports() -> Result<(), Box<dyn std::error::Error>> {
    let ports = bringup_uart::available_ports()?;
    if ports.is_empty() {
        println!("No serial ports found");
        return Ok(());
    }

    println!("Serial ports:");
    println!();
    for port in ports {
        println!("  {}", port);
    }
    Ok(())
}

/// Print the effective configuration
pub fn show_config(config: &DeviceConfig) {
    let link = config.link();
    let retry = config.retry();

    println!("Device Configuration");
    println!("====================");
    println!();
    println!("Binary:        {}", display_path(config.binary_path()));
    println!("Programmer:    {}", display_path(config.programmer_path()));
    println!("Serial port:   {}", link.port);
    println!("Baud rate:     {}", link.baud_rate);
    println!("Read timeout:  {:?}", link.read_timeout);
    println!("Command delay: {:?}", config.command_delay());
    println!("Retries:       {} (delay {:?})", retry.count, retry.delay);
}

fn display_path(path: &std::path::Path) -> String {
    if path.as_os_str().is_empty() {
        "(not set)".to_string()
    } else {
        path.display().to_string()
    }
}
