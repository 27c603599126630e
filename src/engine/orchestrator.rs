// src/engine/orchestrator.rs

use std::sync::Arc;
use std::time::Duration;

use futures_util::Stream;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{info, warn};

use super::EngineSettings;
use super::job::{Job, JobId, new_job_id};
use super::pipeline::run_job;
use super::reaper::Reaper;
use super::registry::JobRegistry;
use super::stream::attach_stream;
use crate::errors::Result;
use crate::stages::Stages;

pub const STOPPED_MESSAGE: &str = "Generation stopped by user.";

const DRAIN_POLL: Duration = Duration::from_millis(20);

/// Result of a stop request. Both variants are successes for the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// The job was running and has been told to stop.
    Stopped,
    /// No such job, or it had already reached a terminal event.
    NotRunning,
}

/// Read-only view of a registered job.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatus {
    pub job_id: JobId,
    pub state: String,
    pub finished: bool,
    pub age_ms: u64,
}

/// Entry point for the external interfaces: submit, attach, stop, status.
///
/// Owns the registry (shared with the reaper) and launches one background
/// pipeline task per submitted brief.
#[derive(Debug)]
pub struct Orchestrator {
    registry: Arc<JobRegistry>,
    reaper: Arc<Reaper>,
    stages: Stages,
    settings: EngineSettings,
}

impl Orchestrator {
    pub fn new(stages: Stages, settings: EngineSettings) -> Self {
        Self::with_registry(Arc::new(JobRegistry::new()), stages, settings)
    }

    pub fn with_registry(registry: Arc<JobRegistry>, stages: Stages, settings: EngineSettings) -> Self {
        let reaper = Arc::new(Reaper::new(registry.clone(), settings.job_ttl));
        Self {
            registry,
            reaper,
            stages,
            settings,
        }
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    pub fn reaper(&self) -> &Arc<Reaper> {
        &self.reaper
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Register a job for `brief` and start its pipeline in the background.
    /// Must be called from within a tokio runtime.
    pub fn submit(&self, brief: impl Into<String>) -> Result<JobId> {
        let job = self.registry.create(new_job_id(), brief)?;
        let handle = tokio::spawn(run_job(
            job.clone(),
            self.stages.clone(),
            self.settings,
            self.reaper.clone(),
        ));
        job.attach_task(handle);

        info!(job_id = %job.id(), prompt_len = job.input().len(), "job.created");
        Ok(job.id().to_string())
    }

    /// Open the event stream for `id` (see [`attach_stream`]).
    pub fn attach(&self, id: &str) -> impl Stream<Item = String> + Send + 'static {
        attach_stream(
            self.registry.get(id),
            self.settings.keep_alive,
            self.settings.retry_ms,
        )
    }

    /// Stop a job: cancel its token and close its channel with an
    /// `error`+`done` pair. Never fails.
    pub fn stop(&self, id: &str) -> StopOutcome {
        let Some(job) = self.registry.get(id) else {
            info!(job_id = %id, "stop.unknown");
            return StopOutcome::NotRunning;
        };

        job.request_cancel();
        if job.channel().finish_with_error(STOPPED_MESSAGE) {
            info!(job_id = %id, state = %job.state(), "stop.ok");
            StopOutcome::Stopped
        } else {
            info!(job_id = %id, "stop.unknown (already finished)");
            StopOutcome::NotRunning
        }
    }

    pub fn status(&self, id: &str) -> Option<JobStatus> {
        self.registry.get(id).map(|job| status_of(&job))
    }

    /// Cancel every live job and drop pending evictions. Each cancelled
    /// pipeline closes its channel, which ends any attached stream.
    pub fn shutdown(&self) {
        let jobs = self.registry.jobs();
        info!(jobs = jobs.len(), "shutting down orchestrator");
        for job in &jobs {
            job.request_cancel();
        }
        self.reaper.close();
    }

    /// Wait up to `grace` for pipeline tasks to settle, then abort whatever
    /// is still running. Returns the number of aborted tasks.
    pub async fn drain(&self, grace: Duration) -> usize {
        let deadline = Instant::now() + grace;
        loop {
            let running: Vec<Arc<Job>> = self
                .registry
                .jobs()
                .into_iter()
                .filter(|job| !job.is_finished())
                .collect();
            if running.is_empty() {
                return 0;
            }
            if Instant::now() >= deadline {
                for job in &running {
                    warn!(job_id = %job.id(), state = %job.state(), "job.aborted");
                    job.abort_task();
                }
                return running.len();
            }
            tokio::time::sleep(DRAIN_POLL).await;
        }
    }
}

fn status_of(job: &Job) -> JobStatus {
    JobStatus {
        job_id: job.id().to_string(),
        state: job.state().as_str().to_string(),
        finished: job.is_finished(),
        age_ms: u64::try_from(job.age().as_millis()).unwrap_or(u64::MAX),
    }
}
