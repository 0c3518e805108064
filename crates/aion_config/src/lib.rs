//! Parsing and validation of `aion.toml` project configuration files.
//!
//! `aion.toml` is optional: the CLI's primary contract is a bare `.v` file
//! path (spec §6.2). When present, this crate reads the project's name,
//! version, and default top module.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str};
pub use types::*;
