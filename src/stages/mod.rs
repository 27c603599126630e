// src/stages/mod.rs

//! Stage functions.
//!
//! Each stage wraps one call (or one JSON-structured call) to the completion
//! service with a fixed input/output contract:
//!
//! | stage | input | output |
//! |---|---|---|
//! | `infer` | brief | [`Variables`] |
//! | `guidance` | contract type, jurisdiction | [`Guidance`] |
//! | `outline` | variables, guidance, brief | [`Outline`] ([`outline`]) |
//! | `front_matter` | variables, outline | [`FrontMatter`] |
//! | `draft_section` | shared context, one section | HTML ([`section`]) |
//! | `quality_control` | merged HTML | revised HTML ([`review`]) |
//!
//! Structured stages retry per [`RetryPolicy`]; free-text stages do not.

pub mod outline;
pub mod prompts;
pub mod review;
pub mod section;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::config::ConfigFile;
use crate::errors::{ContractgenError, Result};
use crate::llm::{CompletionRequest, LlmClient, RetryPolicy, complete_json};
use crate::types::{FrontMatter, Guidance, Outline, Variables};

pub use outline::{FALLBACK_SECTIONS, normalize_outline};
pub use section::SectionContext;

/// Knobs the stages need, injected from configuration.
#[derive(Debug, Clone, Copy)]
pub struct StageSettings {
    pub retry: RetryPolicy,
    pub outline_min_sections: usize,
    pub section_target_words: u32,
    pub include_global_context: bool,
}

impl Default for StageSettings {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            outline_min_sections: 12,
            section_target_words: 600,
            include_global_context: true,
        }
    }
}

impl From<&ConfigFile> for StageSettings {
    fn from(cfg: &ConfigFile) -> Self {
        Self {
            retry: RetryPolicy {
                attempts: cfg.llm.json_attempts,
                backoff: Duration::from_millis(cfg.llm.backoff_ms),
            },
            outline_min_sections: cfg.generation.outline_min_sections,
            section_target_words: cfg.generation.section_target_words,
            include_global_context: cfg.generation.include_global_context_in_workers,
        }
    }
}

/// The stage functions bound to one completion client.
#[derive(Clone)]
pub struct Stages {
    client: Arc<dyn LlmClient>,
    settings: StageSettings,
}

impl fmt::Debug for Stages {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stages")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Stages {
    pub fn new(client: Arc<dyn LlmClient>, settings: StageSettings) -> Self {
        Self { client, settings }
    }

    pub fn settings(&self) -> &StageSettings {
        &self.settings
    }

    /// Infer title, contract type, jurisdiction and the two parties.
    ///
    /// Output the service cannot be made to format falls back to defaults;
    /// only a transport failure is raised.
    pub async fn infer(&self, brief: &str) -> Result<Variables> {
        let (system, user) = prompts::infer(brief);
        let request = CompletionRequest::json(system, user)
            .temperature(0.1)
            .max_tokens(400);

        match complete_json(self.client.as_ref(), request, self.settings.retry).await {
            Ok(value) => Ok(Variables::from_json(&value)),
            Err(ContractgenError::MalformedOutput(reason)) => {
                warn!(%reason, "infer output unusable; falling back to default variables");
                Ok(Variables::default())
            }
            Err(e) => Err(e),
        }
    }

    /// Private drafting guidance folded into later prompts.
    pub async fn guidance(&self, vars: &Variables) -> Result<Guidance> {
        let (system, user) = prompts::guidance(vars);
        let request = CompletionRequest::json(system, user)
            .temperature(0.25)
            .max_tokens(1200);
        let value = complete_json(self.client.as_ref(), request, self.settings.retry).await?;
        Ok(Guidance::from_json(&value))
    }

    /// Front matter + definitions, and the carry-forward summary.
    pub async fn front_matter(&self, vars: &Variables, outline: &Outline) -> Result<FrontMatter> {
        let (system, user) = prompts::front_matter(vars, outline);
        let request = CompletionRequest::json(system, user)
            .temperature(0.2)
            .max_tokens(2000);
        let value = complete_json(self.client.as_ref(), request, self.settings.retry).await?;
        Ok(FrontMatter::from_json(&value))
    }
}
