//! STM32CubeProgrammer CLI invocation
//!
//! The vendor CLI is treated as an opaque executable. Every flash uses the
//! same argument shape:
//!
//! ```text
//! <programmer> -c port=SWD -w <binary> 0x08000000 -v --start
//! ```

use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use crate::error::{Missing, ProgrammerError, Result};

/// Start of the STM32F4 internal flash
pub const FLASH_ORIGIN: u32 = 0x0800_0000;

/// Debug transport selected on the programmer
pub const SWD_PORT: &str = "port=SWD";

/// Time the target needs to reset and boot after `--start`
pub const SETTLE_DELAY: Duration = Duration::from_secs(3);

/// Output captured from a successful programmer run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlashOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Something that can write a firmware image to the target
///
/// The programmer executable is passed per call so that a session can
/// switch programmers without rebuilding its flasher.
pub trait Flasher {
    /// Write `binary` to flash, verify it and start execution
    fn flash(&self, programmer: &Path, binary: &Path) -> Result<FlashOutput>;

    /// Wait for the target to come back up after flashing
    fn settle(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// STM32CubeProgrammer command line interface
#[derive(Debug, Clone)]
pub struct CubeProgrammer {
    cli: PathBuf,
}

impl CubeProgrammer {
    /// Create an invoker for the given `STM32_Programmer_CLI` executable
    pub fn new(cli: impl Into<PathBuf>) -> Self {
        Self { cli: cli.into() }
    }

    /// Path to the programmer executable
    pub fn cli(&self) -> &Path {
        &self.cli
    }

    /// Arguments passed to the programmer (without the executable itself)
    pub fn command_args(&self, binary: &Path) -> Vec<OsString> {
        vec![
            "-c".into(),
            SWD_PORT.into(),
            "-w".into(),
            binary.as_os_str().to_owned(),
            format!("0x{:08X}", FLASH_ORIGIN).into(),
            "-v".into(),
            "--start".into(),
        ]
    }

    /// Full command line, for logging
    pub fn command_line(&self, binary: &Path) -> String {
        std::iter::once(self.cli.as_os_str().to_owned())
            .chain(self.command_args(binary))
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn check_inputs(&self, binary: &Path) -> Result<()> {
        if !binary.exists() {
            return Err(ProgrammerError::NotFound {
                what: Missing::Binary,
                path: binary.to_path_buf(),
            });
        }
        if !self.cli.exists() {
            return Err(ProgrammerError::NotFound {
                what: Missing::Programmer,
                path: self.cli.clone(),
            });
        }
        Ok(())
    }

    /// Run the programmer against `binary`
    pub fn flash(&self, binary: &Path) -> Result<FlashOutput> {
        self.check_inputs(binary)?;

        log::info!("Attempting to flash firmware: {}", self.command_line(binary));

        let output = Command::new(&self.cli)
            .args(self.command_args(binary))
            .output()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => ProgrammerError::NotFound {
                    what: Missing::Programmer,
                    path: self.cli.clone(),
                },
                _ => ProgrammerError::Permission {
                    path: self.cli.clone(),
                    source: e,
                },
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            log::error!("Flashing failed with {}", output.status);
            log::debug!("stdout: {}", stdout);
            log::debug!("stderr: {}", stderr);
            return Err(ProgrammerError::Failed {
                exit_code: output.status.code(),
                stdout,
                stderr,
            });
        }

        log::info!("Flashing successful!");
        log::debug!("{}", stdout);

        Ok(FlashOutput { stdout, stderr })
    }
}

/// [`Flasher`] backed by the STM32CubeProgrammer CLI
#[derive(Debug, Clone, Copy, Default)]
pub struct CubeFlasher;

impl Flasher for CubeFlasher {
    fn flash(&self, programmer: &Path, binary: &Path) -> Result<FlashOutput> {
        CubeProgrammer::new(programmer).flash(binary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_command_args() {
        let prog = CubeProgrammer::new("STM32_Programmer_CLI");
        let args = prog.command_args(Path::new("build/led.bin"));
        let args: Vec<_> = args.iter().map(|a| a.to_str().unwrap()).collect();
        assert_eq!(
            args,
            ["-c", "port=SWD", "-w", "build/led.bin", "0x08000000", "-v", "--start"]
        );
        assert_eq!(
            prog.command_line(Path::new("build/led.bin")),
            "STM32_Programmer_CLI -c port=SWD -w build/led.bin 0x08000000 -v --start"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_missing_binary_spawns_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path();
        let marker = dir.join("spawned");
        let cli = fake_programmer(dir, &format!("touch {}", marker.display()));

        match CubeProgrammer::new(cli).flash(&dir.join("nope.bin")) {
            Err(ProgrammerError::NotFound { what, .. }) => assert_eq!(what, Missing::Binary),
            other => panic!("expected NotFound, got {:?}", other),
        }
        assert!(!marker.exists());
    }

    #[test]
    fn test_missing_programmer() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path();
        let binary = dir.join("led.bin");
        fs::write(&binary, [0u8; 16]).unwrap();

        let prog = CubeProgrammer::new(dir.join("STM32_Programmer_CLI"));
        match prog.flash(&binary) {
            Err(ProgrammerError::NotFound { what, path }) => {
                assert_eq!(what, Missing::Programmer);
                assert_eq!(path, dir.join("STM32_Programmer_CLI"));
            }
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_cube_flasher_uses_given_programmer() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path();
        let binary = dir.join("led.bin");
        fs::write(&binary, [0u8; 16]).unwrap();

        match CubeFlasher.flash(&dir.join("other_cli"), &binary) {
            Err(ProgrammerError::NotFound { path, .. }) => {
                assert_eq!(path, dir.join("other_cli"))
            }
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[cfg(unix)]
    fn fake_programmer(dir: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("STM32_Programmer_CLI");
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[test]
    fn test_successful_run_captures_output() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path();
        let binary = dir.join("led.bin");
        fs::write(&binary, [0u8; 16]).unwrap();
        let cli = fake_programmer(
            dir,
            &format!(
                "echo \"$@\" > {}\necho 'Download verified successfully'",
                dir.join("args").display()
            ),
        );

        let output = CubeProgrammer::new(cli).flash(&binary).unwrap();
        assert_eq!(output.stdout.trim(), "Download verified successfully");

        let args = fs::read_to_string(dir.join("args")).unwrap();
        assert_eq!(
            args.trim(),
            format!("-c port=SWD -w {} 0x08000000 -v --start", binary.display())
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path();
        let binary = dir.join("led.bin");
        fs::write(&binary, [0u8; 16]).unwrap();
        let cli = fake_programmer(
            dir,
            concat!(
                "echo 'ST-LINK error (DEV_CONNECT_ERR)'\n",
                "echo 'Error: No debug probe detected.' >&2\n",
                "exit 7",
            ),
        );

        match CubeProgrammer::new(cli).flash(&binary) {
            Err(ProgrammerError::Failed {
                exit_code,
                stdout,
                stderr,
            }) => {
                assert_eq!(exit_code, Some(7));
                assert_eq!(stdout, "ST-LINK error (DEV_CONNECT_ERR)\n");
                assert_eq!(stderr, "Error: No debug probe detected.\n");
            }
            other => panic!("expected Failed, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_unexecutable_programmer() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path();
        let binary = dir.join("led.bin");
        fs::write(&binary, [0u8; 16]).unwrap();
        let cli = fake_programmer(dir, "exit 0");
        fs::set_permissions(&cli, fs::Permissions::from_mode(0o644)).unwrap();

        assert!(matches!(
            CubeProgrammer::new(cli).flash(&binary),
            Err(ProgrammerError::Permission { .. })
        ));
    }
}
