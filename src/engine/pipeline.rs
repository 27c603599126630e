// src/engine/pipeline.rs

//! The per-job pipeline state machine.
//!
//! ```text
//! STARTED -> INFERRED -> GUIDANCE_READY -> OUTLINED -> FRONT_MATTER_READY
//!   -> SECTIONS_IN_FLIGHT -> SECTIONS_DONE -> QC_DONE -> STREAMING -> DONE
//! ```
//!
//! `ERROR` and `CANCELLED` are absorbing and reachable from every state.
//! Each successful transition emits progress onto the job channel; only the
//! `STREAMING` state transmits document text.
//!
//! [`drive`] is the happy path and returns `Err` on the first fatal stage
//! failure. [`run_job`] wraps it with the terminal handling that must run on
//! every exit path: one `error`+`done` pair on failure, and the deferred
//! registry eviction.

use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::EngineSettings;
use super::event::Event;
use super::fanout::draft_sections;
use super::job::Job;
use super::reaper::Reaper;
use crate::errors::{ContractgenError, Result};
use crate::html::{chunk_chars, sanitize_html, validate_document};
use crate::stages::{SectionContext, Stages};
use crate::types::OutlineSection;

pub const CANCELLED_MESSAGE: &str = "Generation cancelled";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineState {
    Started,
    Inferred,
    GuidanceReady,
    Outlined,
    FrontMatterReady,
    SectionsInFlight,
    SectionsDone,
    QcDone,
    Streaming,
    Done,
    Error,
    Cancelled,
}

impl PipelineState {
    pub fn as_str(self) -> &'static str {
        match self {
            PipelineState::Started => "STARTED",
            PipelineState::Inferred => "INFERRED",
            PipelineState::GuidanceReady => "GUIDANCE_READY",
            PipelineState::Outlined => "OUTLINED",
            PipelineState::FrontMatterReady => "FRONT_MATTER_READY",
            PipelineState::SectionsInFlight => "SECTIONS_IN_FLIGHT",
            PipelineState::SectionsDone => "SECTIONS_DONE",
            PipelineState::QcDone => "QC_DONE",
            PipelineState::Streaming => "STREAMING",
            PipelineState::Done => "DONE",
            PipelineState::Error => "ERROR",
            PipelineState::Cancelled => "CANCELLED",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PipelineState::Done | PipelineState::Error | PipelineState::Cancelled
        )
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Race a stage against the job's cancellation token.
///
/// The in-flight request is dropped when the token fires; a response that
/// was already on its way is discarded.
pub async fn cancellable<T, F>(cancel: &CancellationToken, stage: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    if cancel.is_cancelled() {
        return Err(ContractgenError::Cancelled);
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ContractgenError::Cancelled),
        result = stage => result,
    }
}

fn transition(job: &Job, state: PipelineState) {
    job.set_state(state);
    info!(job_id = %job.id(), state = %state, "job.state");
}

/// Progress token for a finished section, e.g. `section_ready:4`.
fn section_ready_token(section: &OutlineSection) -> String {
    format!("section_ready:{}", section.number.trim_end_matches('.'))
}

/// Run every stage for `job`, emitting progress and finally the document.
pub async fn drive(job: &Job, stages: &Stages, settings: &EngineSettings) -> Result<()> {
    let cancel = job.cancel_token();
    let channel = job.channel();
    let brief = job.input();

    channel.put(Event::start(job.id()));

    let vars = cancellable(&cancel, stages.infer(brief)).await?;
    transition(job, PipelineState::Inferred);
    channel.put(Event::variables(&vars));

    let guidance = cancellable(&cancel, stages.guidance(&vars)).await?;
    transition(job, PipelineState::GuidanceReady);
    channel.put(Event::progress("guidelines_ready"));

    let outline = cancellable(&cancel, stages.outline(&vars, &guidance, brief)).await?;
    transition(job, PipelineState::Outlined);
    channel.put(Event::outline(&outline));

    let front = cancellable(&cancel, stages.front_matter(&vars, &outline)).await?;
    transition(job, PipelineState::FrontMatterReady);
    channel.put(Event::progress("first_part_ready"));

    transition(job, PipelineState::SectionsInFlight);
    let ctx = Arc::new(SectionContext::new(
        vars.clone(),
        &guidance,
        &front,
        stages.settings().include_global_context,
    ));
    let fanned = draft_sections(
        stages,
        ctx,
        &outline.sections,
        settings.max_parallel_sections,
        &cancel,
        |draft| {
            if let Some(section) = outline.sections.get(draft.index) {
                channel.put(Event::progress(section_ready_token(section)));
            }
        },
    )
    .await;
    if fanned.cancelled {
        return Err(ContractgenError::Cancelled);
    }
    if fanned.failed > 0 {
        warn!(job_id = %job.id(), failed = fanned.failed, "some sections carry inline errors");
    }
    transition(job, PipelineState::SectionsDone);
    channel.put(Event::progress("sections_done"));

    let mut merged = front.html.clone();
    merged.push('\n');
    merged.push_str(
        &fanned
            .drafts
            .iter()
            .map(|d| d.html.as_str())
            .collect::<Vec<_>>()
            .join("\n"),
    );

    let known_issues = if settings.validation_enabled {
        let issues = validate_document(&merged, &outline);
        if !issues.is_empty() {
            info!(job_id = %job.id(), issues = ?issues, "local validation findings");
        }
        issues
    } else {
        Vec::new()
    };

    let reviewed = cancellable(&cancel, stages.quality_control(&merged, &vars, &known_issues)).await?;
    transition(job, PipelineState::QcDone);
    channel.put(Event::progress("qc_done"));

    let final_html = sanitize_html(&reviewed);
    transition(job, PipelineState::Streaming);
    debug!(job_id = %job.id(), size = final_html.len(), "streaming final document");

    for slice in chunk_chars(&final_html, settings.chars_per_event) {
        if cancel.is_cancelled() {
            return Err(ContractgenError::Cancelled);
        }
        channel.put(Event::chunk(slice));
        if !settings.chunk_delay.is_zero() {
            cancellable(&cancel, async {
                tokio::time::sleep(settings.chunk_delay).await;
                Ok(())
            })
            .await?;
        }
    }

    channel.put(Event::done());
    transition(job, PipelineState::Done);
    Ok(())
}

/// Background body of one job. Never panics past this point and always
/// schedules the job's eviction.
pub async fn run_job(job: Arc<Job>, stages: Stages, settings: EngineSettings, reaper: Arc<Reaper>) {
    let outcome = AssertUnwindSafe(drive(&job, &stages, &settings))
        .catch_unwind()
        .await;

    let failure = match outcome {
        Ok(Ok(())) => None,
        Ok(Err(e)) if e.is_cancelled() || job.is_cancelled() => {
            info!(job_id = %job.id(), "pipeline cancelled");
            Some((PipelineState::Cancelled, CANCELLED_MESSAGE.to_string()))
        }
        Ok(Err(e)) => {
            error!(job_id = %job.id(), error = %e, "pipeline failed");
            Some((PipelineState::Error, format!("Internal error: {e}")))
        }
        Err(_) => {
            error!(job_id = %job.id(), "pipeline panicked");
            Some((
                PipelineState::Error,
                "Internal error: pipeline task panicked".to_string(),
            ))
        }
    };

    if let Some((state, message)) = failure {
        if !job.channel().finish_with_error(message) {
            debug!(job_id = %job.id(), "channel already closed; terminal error not written");
        }
        transition(&job, state);
    }

    reaper.schedule(job.id());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(PipelineState::Done.is_terminal());
        assert!(PipelineState::Error.is_terminal());
        assert!(PipelineState::Cancelled.is_terminal());
        assert!(!PipelineState::Streaming.is_terminal());
        assert_eq!(PipelineState::FrontMatterReady.as_str(), "FRONT_MATTER_READY");
    }

    #[test]
    fn section_token_drops_trailing_dot() {
        let section = OutlineSection {
            number: "7.".to_string(),
            title: "Term".to_string(),
            target_words: 200,
            bullets: Vec::new(),
        };
        assert_eq!(section_ready_token(&section), "section_ready:7");
    }

    #[tokio::test]
    async fn cancellable_short_circuits_a_cancelled_token() {
        let token = CancellationToken::new();
        token.cancel();
        let result = cancellable(&token, async { Ok::<_, ContractgenError>(1) }).await;
        assert!(matches!(result, Err(ContractgenError::Cancelled)));
    }

    #[tokio::test]
    async fn cancellable_interrupts_a_pending_stage() {
        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::task::yield_now().await;
            trigger.cancel();
        });

        let result: Result<()> = cancellable(&token, std::future::pending()).await;
        assert!(matches!(result, Err(ContractgenError::Cancelled)));
    }
}
