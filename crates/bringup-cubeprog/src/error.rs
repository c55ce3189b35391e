//! Error types for programmer invocations

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Which input of a flash invocation is missing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Missing {
    /// Firmware image
    Binary,
    /// Programmer executable
    Programmer,
}

impl fmt::Display for Missing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Missing::Binary => write!(f, "Binary file"),
            Missing::Programmer => write!(f, "STM32CubeProgrammer CLI"),
        }
    }
}

/// Programmer errors
///
/// None of these are retried by this crate.
#[derive(Debug, Error)]
pub enum ProgrammerError {
    /// Binary or programmer does not exist; nothing was spawned
    #[error("{what} not found at {}", .path.display())]
    NotFound { what: Missing, path: PathBuf },

    /// The programmer could not be launched (permission denied or another OS error)
    #[error("Cannot launch {}: {source}", .path.display())]
    Permission {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The programmer ran and reported failure
    #[error("Flashing failed ({}): {}", exit_status(.exit_code), summary(.stdout, .stderr))]
    Failed {
        /// Exit code, `None` if the process was killed by a signal
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
    },
}

fn exit_status(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("return code {}", code),
        None => "terminated by signal".to_string(),
    }
}

/// Last non-empty line of the captured output, preferring stderr
fn summary(stdout: &str, stderr: &str) -> String {
    [stderr, stdout]
        .iter()
        .filter_map(|s| s.lines().rev().find(|l| !l.trim().is_empty()))
        .map(|l| l.trim().to_string())
        .next()
        .unwrap_or_else(|| "no output".to_string())
}

/// Result type for programmer operations
pub type Result<T> = std::result::Result<T, ProgrammerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_display() {
        let err = ProgrammerError::Failed {
            exit_code: Some(1),
            stdout: "ST-LINK SN : 0670FF\nError: No STM32 target found!\n".into(),
            stderr: String::new(),
        };
        assert_eq!(
            err.to_string(),
            "Flashing failed (return code 1): Error: No STM32 target found!"
        );

        let err = ProgrammerError::Failed {
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
        };
        assert_eq!(err.to_string(), "Flashing failed (terminated by signal): no output");
    }

    #[test]
    fn test_not_found_display() {
        let err = ProgrammerError::NotFound {
            what: Missing::Binary,
            path: PathBuf::from("out/led.bin"),
        };
        assert_eq!(err.to_string(), "Binary file not found at out/led.bin");
    }
}
