// src/engine/fanout.rs

//! Bounded-concurrency section drafting.
//!
//! One task per outline section, at most `max_parallel` in flight. A task
//! waiting for a slot gives up as soon as the job is cancelled; a task that
//! already holds a slot runs to completion. Drafting failures never escape a
//! task: they become an inline error fragment at that section's position.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::reassembly::SectionReassembler;
use crate::html::section_error_fragment;
use crate::stages::{SectionContext, Stages};
use crate::types::{OutlineSection, SectionDraft};

/// Result of one fan-out run.
#[derive(Debug, Default)]
pub struct FanOutOutcome {
    /// Drafted sections in ascending index order. Failed sections carry
    /// their inline error fragment.
    pub drafts: Vec<SectionDraft>,
    /// Indices that were never started because the job was cancelled.
    pub skipped: Vec<usize>,
    /// Number of sections whose drafting call failed.
    pub failed: usize,
    /// Whether cancellation was observed during the run.
    pub cancelled: bool,
}

enum SectionResult {
    Drafted(String),
    Failed(String),
    Skipped,
}

/// Draft every section concurrently, calling `on_ready` for each draft in
/// strict ascending index order as soon as its predecessors are done.
pub async fn draft_sections<F>(
    stages: &Stages,
    ctx: Arc<SectionContext>,
    sections: &[OutlineSection],
    max_parallel: usize,
    cancel: &CancellationToken,
    mut on_ready: F,
) -> FanOutOutcome
where
    F: FnMut(&SectionDraft),
{
    let slots = Arc::new(Semaphore::new(max_parallel.max(1)));
    let mut set = JoinSet::new();

    for (index, section) in sections.iter().enumerate() {
        let stages = stages.clone();
        let ctx = ctx.clone();
        let section = section.clone();
        let slots = slots.clone();
        let cancel = cancel.clone();

        set.spawn(async move {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                permit = slots.acquire_owned() => permit.ok(),
            };
            let Some(_permit) = permit else {
                return (index, SectionResult::Skipped);
            };
            if cancel.is_cancelled() {
                return (index, SectionResult::Skipped);
            }

            debug!(section = index, title = %section.title, "section drafting started");
            let drafted = AssertUnwindSafe(stages.draft_section(&ctx, &section))
                .catch_unwind()
                .await;
            let result = match drafted {
                Ok(Ok(html)) => SectionResult::Drafted(html),
                Ok(Err(e)) => {
                    warn!(section = index, title = %section.title, error = %e, "section.failed");
                    SectionResult::Failed(section_error_fragment(&section, &e.to_string()))
                }
                Err(_) => {
                    warn!(section = index, title = %section.title, "section.failed (panicked)");
                    SectionResult::Failed(section_error_fragment(
                        &section,
                        "section drafting task panicked",
                    ))
                }
            };
            (index, result)
        });
    }

    let mut outcome = FanOutOutcome::default();
    let mut reassembler = SectionReassembler::new();

    while let Some(joined) = set.join_next().await {
        let (index, result) = match joined {
            Ok(pair) => pair,
            Err(e) => {
                warn!(error = %e, "section task did not complete");
                continue;
            }
        };

        let ready = match result {
            SectionResult::Drafted(html) => reassembler.push(SectionDraft { index, html }),
            SectionResult::Failed(html) => {
                outcome.failed += 1;
                reassembler.push(SectionDraft { index, html })
            }
            SectionResult::Skipped => {
                outcome.skipped.push(index);
                reassembler.skip(index)
            }
        };
        for draft in ready {
            on_ready(&draft);
            outcome.drafts.push(draft);
        }
    }

    for draft in reassembler.flush() {
        on_ready(&draft);
        outcome.drafts.push(draft);
    }

    outcome.skipped.sort_unstable();
    outcome.cancelled = cancel.is_cancelled();
    debug!(
        drafted = outcome.drafts.len(),
        failed = outcome.failed,
        skipped = outcome.skipped.len(),
        cancelled = outcome.cancelled,
        "fan-out settled"
    );
    outcome
}
