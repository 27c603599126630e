// src/config/mod.rs

//! Configuration loading and validation for contractgen.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk and overlay the environment (`loader.rs`).
//! - Validate basic invariants (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{apply_env_overrides, load_and_validate, load_from_path};
pub use model::{
    ConfigFile, GenerationSection, JobsSection, LlmSection, RawConfigFile, ServerSection,
    StreamSection,
};
pub use validate::validate_config;
