//! Test keyword table
//!
//! Each keyword is a named operation taking string arguments, the way a
//! keyword-driven test runner calls it. Keywords live in a static
//! registration table; [`Library::run`] looks one up and executes it.
//!
//! Names match ignoring case, spaces and underscores, so `Initialize Device`,
//! `initialize_device` and `INITIALIZEDEVICE` are the same keyword. A name
//! containing `${...}` placeholders takes its arguments from the matching
//! words of the invocation instead (`Turn LED blue ON`).

use std::path::Path;

use bringup_core::config::seconds;
use bringup_core::{LedTarget, LED_TEST_SEQUENCE};
use bringup_cubeprog::{Missing, ProgrammerError};

use crate::device::Device;
use crate::error::KeywordError;

type KeywordFn = fn(&mut Library, &[String]) -> Result<(), KeywordError>;

/// One entry of the keyword table
pub struct Keyword {
    /// Display name, possibly with `${arg}` placeholders
    pub name: &'static str,
    /// Positional arguments; `name=default` marks an optional one
    pub args: &'static [&'static str],
    /// One-line description
    pub doc: &'static str,
    run: KeywordFn,
}

impl Keyword {
    fn is_embedded(&self) -> bool {
        self.name.contains("${")
    }

    fn required_args(&self) -> usize {
        self.args.iter().filter(|a| !a.contains('=')).count()
    }

    /// Usage string, e.g. `Set Serial Parameters [baudrate=115200] ...`
    pub fn usage(&self) -> String {
        let mut usage = self.name.to_string();
        for arg in self.args {
            if arg.contains('=') {
                usage.push_str(&format!(" [{}]", arg));
            } else {
                usage.push_str(&format!(" <{}>", arg));
            }
        }
        usage
    }

    /// Match an invocation against this keyword
    ///
    /// Returns the arguments captured from the name for embedded keywords,
    /// an empty list for plain ones, and `None` if the name does not match.
    fn matches(&self, invocation: &str) -> Option<Vec<String>> {
        if !self.is_embedded() {
            return (normalize(self.name) == normalize(invocation)).then(Vec::new);
        }

        let pattern: Vec<&str> = self.name.split_whitespace().collect();
        let words: Vec<&str> = invocation.split_whitespace().collect();
        if pattern.len() != words.len() {
            return None;
        }

        let mut captured = Vec::new();
        for (expected, word) in pattern.iter().zip(&words) {
            if expected.starts_with("${") && expected.ends_with('}') {
                captured.push(word.to_string());
            } else if !expected.eq_ignore_ascii_case(word) {
                return None;
            }
        }
        Some(captured)
    }

    /// Fill in defaults and check the argument count
    fn bind(&self, args: &[&str]) -> Result<Vec<String>, KeywordError> {
        if args.len() < self.required_args() || args.len() > self.args.len() {
            let expected = if self.required_args() == self.args.len() {
                self.args.len().to_string()
            } else {
                format!("{} to {}", self.required_args(), self.args.len())
            };
            return Err(KeywordError::Arguments {
                keyword: self.name.to_string(),
                expected,
                got: args.len(),
            });
        }

        Ok(self
            .args
            .iter()
            .enumerate()
            .filter_map(|(i, spec)| match args.get(i) {
                Some(given) => Some(given.to_string()),
                None => spec.split_once('=').map(|(_, default)| default.to_string()),
            })
            .collect())
    }
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace() && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

static KEYWORDS: &[Keyword] = &[
    Keyword {
        name: "Initialize Device",
        args: &[],
        doc: "Check that the board answers on the UART",
        run: Library::initialize_device,
    },
    Keyword {
        name: "Flash Device Firmware",
        args: &[],
        doc: "Write the configured firmware image and wait for the board to boot",
        run: Library::flash_device_firmware,
    },
    Keyword {
        name: "Turn LED ${color} ${action}",
        args: &[],
        doc: "Switch one LED ON or OFF",
        run: Library::turn_led,
    },
    Keyword {
        name: "Test All LEDs",
        args: &[],
        doc: "Cycle the orange and blue LEDs on and off",
        run: Library::test_all_leds,
    },
    Keyword {
        name: "Test Single LED",
        args: &["color", "action=ON"],
        doc: "Switch one LED, ON unless told otherwise",
        run: Library::test_single_led,
    },
    Keyword {
        name: "Set Binary Path",
        args: &["path"],
        doc: "Use another firmware image",
        run: Library::set_binary_path,
    },
    Keyword {
        name: "Set Programmer Path",
        args: &["path"],
        doc: "Use another STM32CubeProgrammer CLI executable",
        run: Library::set_programmer_path,
    },
    Keyword {
        name: "Set Serial Port",
        args: &["port"],
        doc: "Talk to the board on another serial port",
        run: Library::set_serial_port,
    },
    Keyword {
        name: "Set Serial Parameters",
        args: &["baudrate=115200", "timeout=1", "command_delay=0.5"],
        doc: "Change baud rate, read timeout and command delay (seconds)",
        run: Library::set_serial_parameters,
    },
];

/// Keyword library bound to one device
pub struct Library {
    device: Device,
}

impl Library {
    pub fn new(device: Device) -> Self {
        Self { device }
    }

    /// All registered keywords
    pub fn keywords() -> &'static [Keyword] {
        KEYWORDS
    }

    /// Look up a keyword by invocation name
    pub fn find(invocation: &str) -> Option<&'static Keyword> {
        KEYWORDS.iter().find(|k| k.matches(invocation).is_some())
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Run a keyword
    ///
    /// A keyword that ran but did not succeed returns
    /// [`KeywordError::Failed`]; errors from below are returned unchanged
    /// inside [`KeywordError::Device`].
    pub fn run(&mut self, invocation: &str, args: &[&str]) -> Result<(), KeywordError> {
        let (keyword, captured) = KEYWORDS
            .iter()
            .find_map(|k| k.matches(invocation).map(|captured| (k, captured)))
            .ok_or_else(|| KeywordError::UnknownKeyword(invocation.to_string()))?;

        let args = if keyword.is_embedded() {
            if !args.is_empty() {
                return Err(KeywordError::Arguments {
                    keyword: keyword.name.to_string(),
                    expected: "0".into(),
                    got: args.len(),
                });
            }
            captured
        } else {
            keyword.bind(args)?
        };

        log::debug!("Running keyword '{}' with {:?}", keyword.name, args);
        match (keyword.run)(self, &args) {
            Ok(()) => {
                log::info!("PASS: {}", invocation);
                Ok(())
            }
            Err(e) => {
                log::error!("FAIL: {}: {}", invocation, e);
                Err(e)
            }
        }
    }

    fn initialize_device(&mut self, _args: &[String]) -> Result<(), KeywordError> {
        if !self.device.verify_connection()? {
            return Err(KeywordError::Failed(
                "Failed to establish UART connection with device".into(),
            ));
        }
        Ok(())
    }

    fn flash_device_firmware(&mut self, _args: &[String]) -> Result<(), KeywordError> {
        self.device.flash()?;
        Ok(())
    }

    fn turn_led(&mut self, args: &[String]) -> Result<(), KeywordError> {
        self.switch_led(&args[0], &args[1])
    }

    fn test_single_led(&mut self, args: &[String]) -> Result<(), KeywordError> {
        self.switch_led(&args[0], &args[1])
    }

    fn test_all_leds(&mut self, _args: &[String]) -> Result<(), KeywordError> {
        for (color, action) in LED_TEST_SEQUENCE {
            let target = LedTarget::new(color, action.clone());
            if !self.device.set_led(&target)? {
                return Err(KeywordError::Failed(format!(
                    "Failed to turn {} LED {}",
                    target.color, target.action
                )));
            }
        }
        Ok(())
    }

    fn set_binary_path(&mut self, args: &[String]) -> Result<(), KeywordError> {
        let path = existing(&args[0], Missing::Binary)?;
        let config = self.device.config().with_binary_path(path);
        self.device.set_config(config);
        Ok(())
    }

    fn set_programmer_path(&mut self, args: &[String]) -> Result<(), KeywordError> {
        let path = existing(&args[0], Missing::Programmer)?;
        let config = self.device.config().with_programmer_path(path);
        self.device.set_config(config);
        Ok(())
    }

    fn set_serial_port(&mut self, args: &[String]) -> Result<(), KeywordError> {
        let config = self.device.config().with_serial_port(args[0].as_str());
        self.device.set_config(config);
        Ok(())
    }

    fn set_serial_parameters(&mut self, args: &[String]) -> Result<(), KeywordError> {
        let baud_rate = parse_number::<u32>("Set Serial Parameters", "baudrate", &args[0])?;
        let timeout = seconds(
            "timeout",
            parse_number("Set Serial Parameters", "timeout", &args[1])?,
        )?;
        let command_delay = seconds(
            "command_delay",
            parse_number("Set Serial Parameters", "command_delay", &args[2])?,
        )?;

        let config = self
            .device
            .config()
            .with_serial_parameters(baud_rate, timeout, command_delay)?;
        log::debug!(
            "Serial parameters: {} baud, timeout {:?}, command delay {:?}",
            baud_rate,
            timeout,
            command_delay
        );
        self.device.set_config(config);
        Ok(())
    }

    fn switch_led(&mut self, color: &str, action: &str) -> Result<(), KeywordError> {
        if !self.device.control_led(color, action)? {
            return Err(KeywordError::Failed(format!(
                "Failed to turn {} LED {}",
                color, action
            )));
        }
        Ok(())
    }
}

fn existing(path: &str, what: Missing) -> Result<&Path, KeywordError> {
    let path = Path::new(path);
    if !path.exists() {
        return Err(ProgrammerError::NotFound {
            what,
            path: path.to_path_buf(),
        }
        .into());
    }
    Ok(path)
}

fn parse_number<T: std::str::FromStr>(
    keyword: &str,
    name: &str,
    value: &str,
) -> Result<T, KeywordError> {
    value
        .trim()
        .parse()
        .map_err(|_| KeywordError::InvalidArgument {
            keyword: keyword.to_string(),
            reason: format!("{} '{}' is not a number", name, value),
        })
}
