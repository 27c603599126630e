// src/llm/structured.rs

//! Call helpers shared by every stage.
//!
//! JSON-structured calls are retried with linearly increasing backoff on any
//! failure (transport error or unparsable output). Free-text calls are sent
//! once; their callers decide how failure is handled.

use std::time::Duration;

use serde_json::Value;
use tracing::warn;

use super::{CompletionRequest, LlmClient};
use crate::errors::{ContractgenError, Result};

/// Retry policy for JSON-structured calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, clamped to at least 1.
    pub attempts: u32,
    /// Attempt `k` (1-based) is followed by a sleep of `backoff * k`.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 2,
            backoff: Duration::from_millis(400),
        }
    }
}

/// Send a JSON-object request, returning the parsed object.
///
/// Raises the last error once every attempt has failed.
pub async fn complete_json(
    client: &dyn LlmClient,
    request: CompletionRequest,
    policy: RetryPolicy,
) -> Result<Value> {
    let attempts = policy.attempts.max(1);
    let mut last_err = None;

    for attempt in 1..=attempts {
        let outcome = match client.complete(request.clone()).await {
            Ok(text) => parse_object(&text),
            Err(e) => Err(ContractgenError::from(e)),
        };

        match outcome {
            Ok(value) => return Ok(value),
            Err(err) => {
                warn!(attempt, attempts, error = %err, "stage.retry: structured call failed");
                last_err = Some(err);
                if attempt < attempts {
                    tokio::time::sleep(policy.backoff * attempt).await;
                }
            }
        }
    }

    Err(last_err.unwrap_or_else(|| {
        ContractgenError::MalformedOutput("structured call made no attempts".to_string())
    }))
}

/// Send a free-text request once.
pub async fn complete_text(client: &dyn LlmClient, request: CompletionRequest) -> Result<String> {
    Ok(client.complete(request).await?)
}

/// Parse a completion as a JSON object, tolerating prose or code fences
/// around it.
fn parse_object(text: &str) -> Result<Value> {
    let value: Value = match serde_json::from_str(text.trim()) {
        Ok(v) => v,
        Err(first_err) => match extract_json(text) {
            Some(inner) => serde_json::from_str(inner)?,
            None => return Err(first_err.into()),
        },
    };

    if value.is_object() {
        Ok(value)
    } else {
        Err(ContractgenError::MalformedOutput(format!(
            "expected a JSON object, got {}",
            kind_of(&value)
        )))
    }
}

fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(&text[start..=end])
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
