// src/stages/section.rs

use super::{Stages, prompts};
use crate::errors::Result;
use crate::llm::{CompletionRequest, complete_text};
use crate::types::{FrontMatter, Guidance, OutlineSection, Variables};

/// Read-only context shared by every section drafting call of one job.
#[derive(Debug, Clone)]
pub struct SectionContext {
    pub variables: Variables,
    pub guidance_html: String,
    pub front_matter_html: String,
    pub carry_forward: String,
    pub include_global_context: bool,
}

impl SectionContext {
    pub fn new(
        variables: Variables,
        guidance: &Guidance,
        front_matter: &FrontMatter,
        include_global_context: bool,
    ) -> Self {
        Self {
            variables,
            guidance_html: guidance.html.clone(),
            front_matter_html: front_matter.html.clone(),
            carry_forward: front_matter.context.clone(),
            include_global_context,
        }
    }
}

impl Stages {
    /// Draft one section as an HTML fragment. Not retried.
    pub async fn draft_section(&self, ctx: &SectionContext, section: &OutlineSection) -> Result<String> {
        let (system, user) = prompts::section(ctx, section);
        let request = CompletionRequest::text(system, user)
            .temperature(0.35)
            .max_tokens(2200);
        complete_text(self.client.as_ref(), request).await
    }
}
