// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

use crate::llm::LlmError;

#[derive(Error, Debug)]
pub enum ContractgenError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Malformed model output: {0}")]
    MalformedOutput(String),

    #[error("Generation cancelled")]
    Cancelled,

    #[error("Job already registered: {0}")]
    JobExists(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ContractgenError {
    /// True for the cooperative-cancellation outcome, which is reported to
    /// clients differently from a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ContractgenError::Cancelled)
    }
}

impl From<serde_json::Error> for ContractgenError {
    fn from(err: serde_json::Error) -> Self {
        ContractgenError::MalformedOutput(err.to_string())
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, ContractgenError>;
