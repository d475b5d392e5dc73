// src/config/mod.rs

//! Configuration loading and validation for elmdev.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk, or fall back to defaults (`loader.rs`).
//! - Validate paths, compiler, server and watch settings, and the task
//!   graph shape (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, load_or_default};
pub use model::{
    CompilerSection, ConfigFile, PathsSection, RawConfigFile, ServerSection, WatchSection,
};
pub use validate::validate_task_specs;
