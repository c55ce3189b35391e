//! LED command model
//!
//! The board firmware understands `LED_ON <color>` and `LED_OFF <color>`.
//! Neither part is checked here: the action is upper-cased, the color
//! lower-cased, and the firmware decides whether it knows the result.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Switch action for a single LED
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LedAction {
    On,
    Off,
    /// Any other action, kept upper-cased and sent as is
    Other(String),
}

impl LedAction {
    /// Upper-case token used in the wire command
    pub fn as_str(&self) -> &str {
        match self {
            LedAction::On => "ON",
            LedAction::Off => "OFF",
            LedAction::Other(action) => action,
        }
    }
}

impl fmt::Display for LedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LedAction {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let action = s.to_uppercase();
        Ok(match action.as_str() {
            "ON" => LedAction::On,
            "OFF" => LedAction::Off,
            _ => LedAction::Other(action),
        })
    }
}

/// One LED and what to do with it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedTarget {
    /// Color name, stored lower-cased
    pub color: String,
    pub action: LedAction,
}

impl LedTarget {
    pub fn new(color: &str, action: LedAction) -> Self {
        Self {
            color: color.to_lowercase(),
            action,
        }
    }

    /// Build a target from free-form color and action text
    pub fn parse(color: &str, action: &str) -> Self {
        let action = match action.parse() {
            Ok(action) => action,
            Err(never) => match never {},
        };
        Self::new(color, action)
    }

    /// Command text without the line terminator, e.g. `LED_ON blue`
    pub fn command(&self) -> String {
        format!("LED_{} {}", self.action, self.color)
    }
}

impl fmt::Display for LedTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.color, self.action)
    }
}

/// Sequence run by the all-LEDs check, each step gated on the previous one
pub static LED_TEST_SEQUENCE: &[(&str, LedAction)] = &[
    ("orange", LedAction::On),
    ("orange", LedAction::Off),
    ("blue", LedAction::On),
    ("blue", LedAction::Off),
];
