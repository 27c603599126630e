// src/engine/mod.rs

//! Job orchestration engine.
//!
//! This module ties together:
//! - the per-job event channel and its wire format ([`channel`], [`event`])
//! - job records, the registry and deferred eviction ([`job`], [`registry`],
//!   [`reaper`])
//! - section fan-out with ordered re-assembly ([`fanout`], [`reassembly`])
//! - the pipeline state machine ([`pipeline`])
//! - the client attach stream ([`stream`])
//!
//! [`Orchestrator`] is the entry point used by the HTTP layer.

use std::time::Duration;

use crate::config::ConfigFile;

pub mod channel;
pub mod event;
pub mod fanout;
pub mod job;
pub mod orchestrator;
pub mod pipeline;
pub mod reaper;
pub mod reassembly;
pub mod registry;
pub mod stream;

pub use channel::EventChannel;
pub use event::{Event, EventKind};
pub use fanout::{FanOutOutcome, draft_sections};
pub use job::{Job, JobId, new_job_id};
pub use orchestrator::{JobStatus, Orchestrator, STOPPED_MESSAGE, StopOutcome};
pub use pipeline::{CANCELLED_MESSAGE, PipelineState};
pub use reaper::Reaper;
pub use reassembly::SectionReassembler;
pub use registry::JobRegistry;
pub use stream::attach_stream;

/// Engine knobs injected from configuration.
#[derive(Debug, Clone, Copy)]
pub struct EngineSettings {
    pub max_parallel_sections: usize,
    pub job_ttl: Duration,
    pub chars_per_event: usize,
    pub chunk_delay: Duration,
    pub keep_alive: Duration,
    pub retry_ms: u64,
    pub validation_enabled: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_parallel_sections: 10,
            job_ttl: Duration::from_secs(30),
            chars_per_event: 5,
            chunk_delay: Duration::from_millis(1),
            keep_alive: Duration::from_secs(1),
            retry_ms: 60_000,
            validation_enabled: true,
        }
    }
}

impl From<&ConfigFile> for EngineSettings {
    fn from(cfg: &ConfigFile) -> Self {
        Self {
            max_parallel_sections: cfg.generation.max_parallel_sections,
            job_ttl: Duration::from_secs(cfg.jobs.ttl_secs),
            chars_per_event: cfg.stream.chars_per_event,
            chunk_delay: Duration::from_millis(cfg.stream.delay_ms),
            keep_alive: Duration::from_millis(cfg.stream.keep_alive_ms),
            retry_ms: cfg.stream.retry_ms,
            validation_enabled: cfg.generation.validation_enabled,
        }
    }
}
