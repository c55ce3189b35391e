//! bringup-cubeprog - STM32CubeProgrammer CLI support
//!
//! Writes a firmware image to the target over SWD by running the vendor's
//! `STM32_Programmer_CLI` as a blocking subprocess. Success is exit status 0;
//! anything else comes back as [`ProgrammerError::Failed`] with the captured
//! output attached.
//!
//! Retrying and the post-flash settle wait are left to the caller.

pub mod error;
pub mod programmer;

pub use error::{Missing, ProgrammerError, Result};
pub use programmer::{
    CubeFlasher, CubeProgrammer, FlashOutput, Flasher, FLASH_ORIGIN, SETTLE_DELAY,
};
