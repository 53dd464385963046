// src/config/loader.rs

use std::fs;
use std::path::Path;

use crate::config::model::{ExecuteOptions, RawOptionsFile};
use crate::errors::Result;

/// Read an options file and return the raw, unvalidated model.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawOptionsFile> {
    let contents = fs::read_to_string(path.as_ref())?;
    let raw: RawOptionsFile = toml::from_str(&contents)?;
    Ok(raw)
}

/// Read, parse and validate an options file.
///
/// This is the recommended entry point: TOML errors surface as
/// `DagError::TomlError`, invalid values as `DagError::ConfigError`.
pub fn load_options(path: impl AsRef<Path>) -> Result<ExecuteOptions> {
    let raw = load_from_path(path)?;
    ExecuteOptions::try_from(raw)
}

impl ExecuteOptions {
    /// Parse and validate options from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let raw: RawOptionsFile = toml::from_str(contents)?;
        Self::try_from(raw)
    }
}
