//! Flash command implementation

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use bringup_device::Library;

/// Run the flash command
///
/// The programmer gives no usable progress, so a spinner covers the whole
/// programmer run plus the settle time.
pub fn run_flash(library: &mut Library) -> Result<(), Box<dyn std::error::Error>> {
    let binary = library.device().config().binary_path().to_path_buf();

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?,
    );
    pb.set_message(format!("Flashing {}", binary.display()));
    pb.enable_steady_tick(Duration::from_millis(100));

    match library.run("Flash Device Firmware", &[]) {
        Ok(()) => {
            pb.finish_with_message("Flash complete");
            println!("Flashed {}", binary.display());
            Ok(())
        }
        Err(e) => {
            pb.abandon_with_message("Flash failed");
            Err(e.into())
        }
    }
}
