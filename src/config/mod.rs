// src/config/mod.rs

//! Configuration loading and validation for cmddag.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate references between commands (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path};
pub use model::{CommandConfig, ConfigFile};
pub use validate::validate_config;
