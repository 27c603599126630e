// src/config/model.rs

use serde::{Deserialize, Serialize};

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [server]
/// listen = "0.0.0.0:8000"
/// cors_origins = ["https://drafts.example.com"]
///
/// [llm]
/// model = "gpt-4o-mini"
///
/// [generation]
/// max_parallel_sections = 8
/// outline_min_sections = 12
///
/// [jobs]
/// ttl_secs = 30
///
/// [stream]
/// chars_per_event = 5
/// ```
///
/// All sections are optional and have reasonable defaults. This is the
/// unvalidated form; use [`ConfigFile`] everywhere else.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub llm: LlmSection,

    #[serde(default)]
    pub generation: GenerationSection,

    #[serde(default)]
    pub jobs: JobsSection,

    #[serde(default)]
    pub stream: StreamSection,
}

/// Validated configuration. Only constructible through
/// `ConfigFile::try_from(RawConfigFile)`.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigFile {
    pub server: ServerSection,
    pub llm: LlmSection,
    pub generation: GenerationSection,
    pub jobs: JobsSection,
    pub stream: StreamSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            server: raw.server,
            llm: raw.llm,
            generation: raw.generation,
            jobs: raw.jobs,
            stream: raw.stream,
        }
    }
}

/// `[server]` section.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerSection {
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Allowed CORS origins. `["*"]` allows any origin.
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

fn default_listen() -> String {
    "127.0.0.1:8000".to_string()
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            cors_origins: default_cors_origins(),
        }
    }
}

/// `[llm]` section: the OpenAI-compatible completion endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmSection {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Usually supplied through `OPENAI_API_KEY` rather than the file.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Attempts for JSON-structured calls (transport or parse failures).
    #[serde(default = "default_json_attempts")]
    pub json_attempts: u32,

    /// Linear backoff unit; attempt `k` sleeps `backoff_ms * k`.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

fn default_endpoint() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_json_attempts() -> u32 {
    2
}

fn default_backoff_ms() -> u64 {
    400
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
            json_attempts: default_json_attempts(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

/// `[generation]` section: knobs of the drafting pipeline.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GenerationSection {
    #[serde(default = "default_max_parallel_sections")]
    pub max_parallel_sections: usize,

    #[serde(default = "default_outline_min_sections")]
    pub outline_min_sections: usize,

    #[serde(default = "default_section_target_words")]
    pub section_target_words: u32,

    /// Whether section prompts carry guidance, front matter and the
    /// carry-forward summary.
    #[serde(default = "default_true")]
    pub include_global_context_in_workers: bool,

    /// Whether the local HTML validation pass runs before quality control.
    #[serde(default = "default_true")]
    pub validation_enabled: bool,
}

fn default_max_parallel_sections() -> usize {
    10
}

fn default_outline_min_sections() -> usize {
    12
}

fn default_section_target_words() -> u32 {
    600
}

fn default_true() -> bool {
    true
}

impl Default for GenerationSection {
    fn default() -> Self {
        Self {
            max_parallel_sections: default_max_parallel_sections(),
            outline_min_sections: default_outline_min_sections(),
            section_target_words: default_section_target_words(),
            include_global_context_in_workers: true,
            validation_enabled: true,
        }
    }
}

/// `[jobs]` section.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JobsSection {
    /// Delay between a job reaching a terminal state and its eviction.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

fn default_ttl_secs() -> u64 {
    30
}

impl Default for JobsSection {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
        }
    }
}

/// `[stream]` section: how the final document is relayed to clients.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StreamSection {
    #[serde(default = "default_chars_per_event")]
    pub chars_per_event: usize,

    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,

    /// Idle period after which the attach stream writes a keep-alive comment.
    #[serde(default = "default_keep_alive_ms")]
    pub keep_alive_ms: u64,

    /// Client reconnect delay advertised by the `retry:` directive.
    #[serde(default = "default_retry_ms")]
    pub retry_ms: u64,
}

fn default_chars_per_event() -> usize {
    5
}

fn default_delay_ms() -> u64 {
    1
}

fn default_keep_alive_ms() -> u64 {
    1000
}

fn default_retry_ms() -> u64 {
    60_000
}

impl Default for StreamSection {
    fn default() -> Self {
        Self {
            chars_per_event: default_chars_per_event(),
            delay_ms: default_delay_ms(),
            keep_alive_ms: default_keep_alive_ms(),
            retry_ms: default_retry_ms(),
        }
    }
}
