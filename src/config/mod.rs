// src/config/mod.rs

//! Execution options: typed model, TOML loading and validation.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_from_path, load_options};
pub use model::{ExecuteOptions, ExecutionSection, RawOptionsFile};
pub use validate::validate_options;
