//! Man page generator for stm32-bringup
//!
//! Writes `stm32-bringup.1` plus one `stm32-bringup-<command>.1` page per
//! subcommand.
//!
//! Usage: cargo run --bin gen-manpage -- [output-dir]

use clap::CommandFactory;
use std::fs;
use std::path::{Path, PathBuf};

#[path = "../cli.rs"]
mod cli;

fn main() -> std::io::Result<()> {
    // Default to ./man directory
    let output_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("man"));

    fs::create_dir_all(&output_dir)?;

    let cmd = cli::Cli::command();
    let name = cmd.get_name().to_string();

    let main_page = render(&output_dir, &name, cmd.clone())?;
    for sub in cmd.get_subcommands() {
        let page_name = format!("{}-{}", name, sub.get_name());
        render(&output_dir, &page_name, sub.clone())?;
    }

    println!("Man pages generated in: {}", output_dir.display());
    println!("\nTo view the main page:");
    println!("  man -l {}", main_page.display());
    println!("\nTo install system-wide (requires sudo):");
    println!(
        "  sudo cp {}/*.1 /usr/local/share/man/man1/",
        output_dir.display()
    );
    println!("  sudo mandb");

    Ok(())
}

fn render(dir: &Path, name: &str, cmd: clap::Command) -> std::io::Result<PathBuf> {
    let mut buffer = Vec::new();
    clap_mangen::Man::new(cmd).render(&mut buffer)?;

    let path = dir.join(format!("{}.1", name));
    fs::write(&path, buffer)?;
    Ok(path)
}
