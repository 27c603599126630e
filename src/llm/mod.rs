// src/llm/mod.rs

//! Text-completion service abstraction.
//!
//! The pipeline only ever talks to an [`LlmClient`]; production uses
//! [`HttpLlmClient`] against an OpenAI-compatible chat endpoint, and tests
//! swap in a scripted fake.
//!
//! - [`http`] holds the reqwest-backed client.
//! - [`structured`] wraps a client with the JSON-call retry policy.

pub mod http;
pub mod structured;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

pub use http::{HttpLlmClient, HttpLlmClientConfig};
pub use structured::{RetryPolicy, complete_json, complete_text};

/// Requested shape of the completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    Text,
    /// Ask the service for a single JSON object.
    JsonObject,
}

/// One completion request: a system instruction plus the user message.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub format: ResponseFormat,
}

impl CompletionRequest {
    pub fn text(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            temperature: 0.3,
            max_tokens: None,
            format: ResponseFormat::Text,
        }
    }

    pub fn json(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            format: ResponseFormat::JsonObject,
            ..Self::text(system, user)
        }
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Completion client trait.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError>;
}

#[async_trait]
impl LlmClient for Arc<dyn LlmClient> {
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError> {
        (**self).complete(request).await
    }
}

/// Transport-level failures of the completion service.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("http error: {0}")]
    Http(String),
    #[error("response error: {0}")]
    Response(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("response carried no choices")]
    EmptyResponse,
}
