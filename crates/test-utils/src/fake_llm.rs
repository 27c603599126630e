#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use contractgen::llm::{CompletionRequest, LlmClient, LlmError};

/// Which stage a request belongs to, recognised from its system prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptedStage {
    Infer,
    Guidance,
    Outline,
    FrontMatter,
    Section,
    Review,
    Fix,
}

impl ScriptedStage {
    fn classify(request: &CompletionRequest) -> Option<Self> {
        let system = request.system.as_str();
        let stage = if system.contains("Infer minimal variables") {
            ScriptedStage::Infer
        } else if system.contains("drafting guidance") {
            ScriptedStage::Guidance
        } else if system.contains("legal architect") {
            ScriptedStage::Outline
        } else if system.contains("senior drafter") {
            ScriptedStage::FrontMatter
        } else if system.contains("Draft ONE contract section") {
            ScriptedStage::Section
        } else if system.contains("contracts reviewer") {
            ScriptedStage::Review
        } else if system.contains("fixing an HTML contract") {
            ScriptedStage::Fix
        } else {
            return None;
        };
        Some(stage)
    }
}

pub const FRONT_MATTER_HTML: &str = "<section id='front-matter'><h1>Test Agreement</h1></section>";

/// Body a successfully drafted section is rendered with.
pub fn section_html(number: &str, title: &str) -> String {
    format!("<h2>{number} {title}</h2><p>Body of {title}.</p>")
}

/// A fake completion service that answers each stage with a canned reply.
///
/// - every stage has a scripted happy-path response
/// - individual sections (by title) can be delayed or made to fail
/// - whole stages can be delayed or made to fail
/// - calls are recorded, and section concurrency is tracked
pub struct ScriptedLlm {
    variables: Value,
    guidance: Value,
    outline: Value,
    front_matter: Value,
    review: Value,
    fixed_html: String,
    section_delays: HashMap<String, Duration>,
    failing_sections: HashSet<String>,
    stage_delays: HashMap<ScriptedStage, Duration>,
    failing_stages: HashSet<ScriptedStage>,
    calls: Mutex<Vec<ScriptedStage>>,
    sections_in_flight: AtomicUsize,
    max_sections_in_flight: AtomicUsize,
    sections_finished: AtomicUsize,
}

impl ScriptedLlm {
    /// Happy-path script whose outline contains exactly `titles`.
    pub fn with_titles(titles: &[&str]) -> Self {
        let sections: Vec<Value> = titles
            .iter()
            .enumerate()
            .map(|(i, title)| {
                json!({
                    "number": format!("{}.", i + 1),
                    "title": title,
                    "target_words": 200,
                    "bullets": ["cover the basics"],
                })
            })
            .collect();

        Self {
            variables: json!({
                "title": "Test Agreement",
                "contract_type": "Services Agreement",
                "jurisdiction": "Applicable Law",
                "parties": ["Provider", "Customer"],
            }),
            guidance: json!({"html": "<section><h2>Guidelines</h2></section>", "notes": "n/a"}),
            outline: json!({ "sections": sections }),
            front_matter: json!({"html": FRONT_MATTER_HTML, "context": "Provider serves Customer."}),
            review: json!({"should_fix": false, "issues": []}),
            fixed_html: String::new(),
            section_delays: HashMap::new(),
            failing_sections: HashSet::new(),
            stage_delays: HashMap::new(),
            failing_stages: HashSet::new(),
            calls: Mutex::new(Vec::new()),
            sections_in_flight: AtomicUsize::new(0),
            max_sections_in_flight: AtomicUsize::new(0),
            sections_finished: AtomicUsize::new(0),
        }
    }

    /// Script with `n` sections titled `Section Title 1..=n`.
    pub fn with_sections(n: usize) -> Self {
        let titles: Vec<String> = (1..=n).map(|i| format!("Section Title {i}")).collect();
        let refs: Vec<&str> = titles.iter().map(String::as_str).collect();
        Self::with_titles(&refs)
    }

    pub fn with_variables(mut self, variables: Value) -> Self {
        self.variables = variables;
        self
    }

    pub fn with_outline(mut self, outline: Value) -> Self {
        self.outline = outline;
        self
    }

    pub fn with_review(mut self, should_fix: bool, issues: &[&str]) -> Self {
        self.review = json!({"should_fix": should_fix, "issues": issues});
        self
    }

    pub fn with_fixed_html(mut self, html: &str) -> Self {
        self.fixed_html = html.to_string();
        self
    }

    pub fn with_front_matter_html(mut self, html: &str) -> Self {
        self.front_matter = json!({"html": html, "context": "ctx"});
        self
    }

    pub fn delay_section(mut self, title: &str, delay: Duration) -> Self {
        self.section_delays.insert(title.to_string(), delay);
        self
    }

    pub fn fail_section(mut self, title: &str) -> Self {
        self.failing_sections.insert(title.to_string());
        self
    }

    pub fn delay_stage(mut self, stage: ScriptedStage, delay: Duration) -> Self {
        self.stage_delays.insert(stage, delay);
        self
    }

    pub fn fail_stage(mut self, stage: ScriptedStage) -> Self {
        self.failing_stages.insert(stage);
        self
    }

    /// Stages called so far, in call order.
    pub fn calls(&self) -> Vec<ScriptedStage> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, stage: ScriptedStage) -> usize {
        self.calls().iter().filter(|s| **s == stage).count()
    }

    /// Highest number of section calls observed in flight at once.
    pub fn max_sections_in_flight(&self) -> usize {
        self.max_sections_in_flight.load(Ordering::SeqCst)
    }

    pub fn sections_finished(&self) -> usize {
        self.sections_finished.load(Ordering::SeqCst)
    }

    async fn answer_section(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let number = field(&request.user, "Section number: ").unwrap_or_default();
        let title = field(&request.user, "Section title: ").unwrap_or_default();

        let now = self.sections_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_sections_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.section_delays.get(&title) {
            tokio::time::sleep(*delay).await;
        } else {
            tokio::task::yield_now().await;
        }

        self.sections_in_flight.fetch_sub(1, Ordering::SeqCst);
        self.sections_finished.fetch_add(1, Ordering::SeqCst);

        if self.failing_sections.contains(&title) {
            return Err(LlmError::Response(format!("HTTP 500: scripted failure for {title}")));
        }
        Ok(section_html(&number, &title))
    }
}

fn field(text: &str, prefix: &str) -> Option<String> {
    text.lines()
        .find_map(|line| line.strip_prefix(prefix))
        .map(|v| v.trim().to_string())
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError> {
        let stage = ScriptedStage::classify(&request)
            .ok_or_else(|| LlmError::Response("unscripted request".to_string()))?;
        self.calls.lock().unwrap().push(stage);

        if stage == ScriptedStage::Section {
            return self.answer_section(&request).await;
        }

        if let Some(delay) = self.stage_delays.get(&stage) {
            tokio::time::sleep(*delay).await;
        }
        if self.failing_stages.contains(&stage) {
            return Err(LlmError::Http(format!("scripted failure for {stage:?}")));
        }

        let reply = match stage {
            ScriptedStage::Infer => self.variables.to_string(),
            ScriptedStage::Guidance => self.guidance.to_string(),
            ScriptedStage::Outline => self.outline.to_string(),
            ScriptedStage::FrontMatter => self.front_matter.to_string(),
            ScriptedStage::Review => self.review.to_string(),
            ScriptedStage::Fix => self.fixed_html.clone(),
            ScriptedStage::Section => unreachable!("handled above"),
        };
        Ok(reply)
    }
}
