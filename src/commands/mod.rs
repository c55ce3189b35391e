//! CLI command implementations
//!
//! Board commands go through the keyword library; the listing commands here
//! only print.

pub mod flash;
mod list;

pub use list::{list_keywords, list_ports, show_config};
