// src/config/loader.rs

use std::fs;
use std::path::Path;
use std::str::FromStr;

use tracing::{debug, info};

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{ContractgenError, Result};

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load configuration the way the server does at startup:
///
/// - Reads TOML if `path` exists, otherwise starts from defaults.
/// - Applies environment overrides (see [`apply_env_overrides`]).
/// - Validates the result.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    load_and_validate_with(path, |key| std::env::var(key).ok())
}

/// [`load_and_validate`] with an injected environment lookup.
pub fn load_and_validate_with<F>(path: impl AsRef<Path>, lookup: F) -> Result<ConfigFile>
where
    F: Fn(&str) -> Option<String>,
{
    let path = path.as_ref();
    let mut raw = if path.exists() {
        info!(path = %path.display(), "loading config file");
        load_from_path(path)?
    } else {
        debug!(path = %path.display(), "config file not found; using defaults");
        RawConfigFile::default()
    };

    apply_env_overrides(&mut raw, lookup)?;

    ConfigFile::try_from(raw)
}

/// Overlay environment variables onto a raw config.
///
/// The lookup is injected so tests can supply a fixed map instead of
/// mutating the process environment.
pub fn apply_env_overrides<F>(raw: &mut RawConfigFile, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup("CONTRACTGEN_LISTEN") {
        raw.server.listen = v;
    }
    if let Some(v) = lookup("CORS_ORIGINS") {
        raw.server.cors_origins = v
            .split(',')
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();
    }

    if let Some(v) = lookup("OPENAI_BASE_URL") {
        raw.llm.endpoint = chat_completions_url(&v);
    }
    if let Some(v) = lookup("OPENAI_MODEL") {
        raw.llm.model = v;
    }
    if let Some(v) = lookup("OPENAI_API_KEY") {
        raw.llm.api_key = Some(v);
    }
    override_parsed(&lookup, "LLM_TIMEOUT_SECS", &mut raw.llm.timeout_secs)?;
    override_parsed(&lookup, "LLM_JSON_ATTEMPTS", &mut raw.llm.json_attempts)?;
    override_parsed(&lookup, "LLM_BACKOFF_MS", &mut raw.llm.backoff_ms)?;

    let generation = &mut raw.generation;
    override_parsed(&lookup, "MAX_PARALLEL_SECTIONS", &mut generation.max_parallel_sections)?;
    override_parsed(&lookup, "OUTLINE_MIN_SECTIONS", &mut generation.outline_min_sections)?;
    override_parsed(&lookup, "SECTION_TARGET_WORDS", &mut generation.section_target_words)?;
    override_flag(
        &lookup,
        "INCLUDE_GLOBAL_CONTEXT_IN_WORKERS",
        &mut generation.include_global_context_in_workers,
    );
    override_flag(&lookup, "VALIDATION_ENABLED", &mut generation.validation_enabled);

    override_parsed(&lookup, "JOB_TTL_SECONDS", &mut raw.jobs.ttl_secs)?;

    override_parsed(&lookup, "STREAM_CHARS_PER_EVENT", &mut raw.stream.chars_per_event)?;
    override_parsed(&lookup, "STREAM_DELAY_MS", &mut raw.stream.delay_ms)?;
    override_parsed(&lookup, "STREAM_KEEP_ALIVE_MS", &mut raw.stream.keep_alive_ms)?;
    override_parsed(&lookup, "STREAM_RETRY_MS", &mut raw.stream.retry_ms)?;

    Ok(())
}

fn override_parsed<F, T>(lookup: &F, key: &str, slot: &mut T) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    if let Some(v) = lookup(key) {
        *slot = v.trim().parse().map_err(|_| {
            ContractgenError::ConfigError(format!("environment variable {key}={v:?} is not valid"))
        })?;
    }
    Ok(())
}

/// Boolean toggles follow the deployment convention: only `true`
/// (case-insensitive) enables.
fn override_flag<F>(lookup: &F, key: &str, slot: &mut bool)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup(key) {
        *slot = v.trim().eq_ignore_ascii_case("true");
    }
}

/// `OPENAI_BASE_URL` names the API base (`https://api.openai.com/v1`), as
/// in the OpenAI SDKs. Full completion URLs are accepted unchanged.
fn chat_completions_url(base: &str) -> String {
    const PATH: &str = "/chat/completions";
    let base = base.trim().trim_end_matches('/');
    if base.ends_with(PATH) {
        base.to_string()
    } else {
        format!("{base}{PATH}")
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn env_overrides_replace_file_values() {
        let mut raw = RawConfigFile::default();
        let lookup = lookup_from(&[
            ("MAX_PARALLEL_SECTIONS", "3"),
            ("JOB_TTL_SECONDS", "5"),
            ("CORS_ORIGINS", "https://a.example, https://b.example"),
            ("VALIDATION_ENABLED", "FALSE"),
            ("OPENAI_API_KEY", "sk-test"),
        ]);

        apply_env_overrides(&mut raw, lookup).unwrap();

        assert_eq!(raw.generation.max_parallel_sections, 3);
        assert_eq!(raw.jobs.ttl_secs, 5);
        assert_eq!(
            raw.server.cors_origins,
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
        assert!(!raw.generation.validation_enabled);
        assert_eq!(raw.llm.api_key.as_deref(), Some("sk-test"));
    }

    #[test]
    fn unparsable_number_is_a_config_error() {
        let mut raw = RawConfigFile::default();
        let err = apply_env_overrides(&mut raw, lookup_from(&[("STREAM_DELAY_MS", "soon")]))
            .unwrap_err();
        assert!(matches!(err, ContractgenError::ConfigError(_)));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_and_validate_with(dir.path().join("absent.toml"), lookup_from(&[])).unwrap();
        assert_eq!(cfg.generation.outline_min_sections, 12);
        assert_eq!(cfg.generation.max_parallel_sections, 10);
        assert_eq!(cfg.jobs.ttl_secs, 30);
        assert_eq!(cfg.llm.endpoint, "https://api.openai.com/v1/chat/completions");
    }

    #[test]
    fn env_overrides_apply_on_top_of_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Contractgen.toml");
        fs::write(&path, "[generation]\nmax_parallel_sections = 4\n").unwrap();

        let cfg = load_and_validate_with(&path, lookup_from(&[("MAX_PARALLEL_SECTIONS", "2")])).unwrap();
        assert_eq!(cfg.generation.max_parallel_sections, 2);

        let err = load_and_validate_with(&path, lookup_from(&[("MAX_PARALLEL_SECTIONS", "0")]));
        assert!(err.is_err());
    }

    #[test]
    fn base_url_gets_the_completions_path() {
        for (value, expected) in [
            ("https://api.openai.com/v1", "https://api.openai.com/v1/chat/completions"),
            ("https://proxy.example/v1/", "https://proxy.example/v1/chat/completions"),
            (
                "https://proxy.example/v1/chat/completions",
                "https://proxy.example/v1/chat/completions",
            ),
        ] {
            let mut raw = RawConfigFile::default();
            apply_env_overrides(&mut raw, lookup_from(&[("OPENAI_BASE_URL", value)])).unwrap();
            assert_eq!(raw.llm.endpoint, expected, "for {value}");
        }
    }

    #[test]
    fn file_values_are_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Contractgen.toml");
        fs::write(
            &path,
            "[generation]\nmax_parallel_sections = 4\n\n[stream]\nchars_per_event = 64\n",
        )
        .unwrap();

        let raw = load_from_path(&path).unwrap();
        assert_eq!(raw.generation.max_parallel_sections, 4);
        assert_eq!(raw.stream.chars_per_event, 64);
        assert_eq!(raw.jobs.ttl_secs, 30);
    }
}
