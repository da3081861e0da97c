//! YAML Loader module
//!
//! Parse tail configurations from YAML files.
//!
//! # Overview
//!
//! The loader module provides:
//! - `load_config` / `load_config_from_str` - YAML parsing
//! - `validate_config` - range and consistency checks applied on load

mod parser;

pub use parser::{load_config, load_config_from_str, validate_config};

#[cfg(test)]
mod tests;
