// src/config/validate.rs

use std::net::SocketAddr;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{ContractgenError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::ContractgenError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

/// Run every semantic check on a raw config.
pub fn validate_config(cfg: &RawConfigFile) -> Result<()> {
    validate_server(cfg)?;
    validate_llm(cfg)?;
    validate_generation(cfg)?;
    validate_stream(cfg)?;
    Ok(())
}

fn validate_server(cfg: &RawConfigFile) -> Result<()> {
    if cfg.server.listen.parse::<SocketAddr>().is_err() {
        return Err(ContractgenError::ConfigError(format!(
            "[server].listen must be a socket address like 127.0.0.1:8000 (got {:?})",
            cfg.server.listen
        )));
    }
    Ok(())
}

fn validate_llm(cfg: &RawConfigFile) -> Result<()> {
    if cfg.llm.model.trim().is_empty() {
        return Err(ContractgenError::ConfigError(
            "[llm].model must not be empty".to_string(),
        ));
    }
    if cfg.llm.json_attempts == 0 {
        return Err(ContractgenError::ConfigError(
            "[llm].json_attempts must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_generation(cfg: &RawConfigFile) -> Result<()> {
    if cfg.generation.max_parallel_sections == 0 {
        return Err(ContractgenError::ConfigError(
            "[generation].max_parallel_sections must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_stream(cfg: &RawConfigFile) -> Result<()> {
    if cfg.stream.chars_per_event == 0 {
        return Err(ContractgenError::ConfigError(
            "[stream].chars_per_event must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.stream.keep_alive_ms == 0 {
        return Err(ContractgenError::ConfigError(
            "[stream].keep_alive_ms must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}
