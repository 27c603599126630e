// src/stages/review.rs

use tracing::{debug, info};

use super::{Stages, prompts};
use crate::errors::Result;
use crate::llm::{CompletionRequest, complete_json, complete_text};
use crate::types::{QcReview, Variables};

impl Stages {
    /// Ask the service whether the merged document needs a fix pass.
    pub async fn review(&self, html: &str, vars: &Variables, known_issues: &[String]) -> Result<QcReview> {
        let (system, user) = prompts::review(html, vars, known_issues);
        let request = CompletionRequest::json(system, user)
            .temperature(0.1)
            .max_tokens(1800);
        let value = complete_json(self.client.as_ref(), request, self.settings.retry).await?;
        Ok(QcReview::from_json(&value))
    }

    /// Review the merged document and, if warranted, run one corrective
    /// rewrite.
    ///
    /// Returns the input unchanged when no fix is needed, and falls back to
    /// the input when the rewrite comes back empty.
    pub async fn quality_control(
        &self,
        html: &str,
        vars: &Variables,
        known_issues: &[String],
    ) -> Result<String> {
        let review = self.review(html, vars, known_issues).await?;
        if !review.should_fix {
            debug!(issues = review.issues.len(), "quality control: no fix needed");
            return Ok(html.to_string());
        }

        info!(issues = review.issues.len(), "quality control: running fix pass");
        let (system, user) = prompts::fix(html, vars, &review.issues);
        let request = CompletionRequest::text(system, user)
            .temperature(0.25)
            .max_tokens(8000);
        let fixed = complete_text(self.client.as_ref(), request).await?;

        if fixed.trim().is_empty() {
            debug!("quality control: fix pass returned nothing; keeping pre-fix text");
            Ok(html.to_string())
        } else {
            Ok(fixed)
        }
    }
}
