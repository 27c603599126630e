// src/engine/job.rs

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

use super::PipelineState;
use super::channel::EventChannel;

/// Opaque job identity; also the registry key.
pub type JobId = String;

/// Generate a fresh high-entropy job id (32 lowercase hex characters).
pub fn new_job_id() -> JobId {
    Uuid::new_v4().simple().to_string()
}

/// One end-to-end generation request.
///
/// - `channel`: written by the pipeline task (and by a stop request), read
///   by the attach stream.
/// - `cancel`: set once by a stop request; observed at stage boundaries,
///   inside the fan-out, and raced against each in-flight sequential stage.
/// - `task`: the background pipeline task, used for completion checks and
///   aborted by `Orchestrator::drain` if it outlives the shutdown grace.
#[derive(Debug)]
pub struct Job {
    id: JobId,
    input: String,
    channel: EventChannel,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
    state: Mutex<PipelineState>,
    created_at: Instant,
}

impl Job {
    pub fn new(input: impl Into<String>) -> Self {
        Self::with_id(new_job_id(), input)
    }

    pub fn with_id(id: impl Into<JobId>, input: impl Into<String>) -> Self {
        let job = Self {
            id: id.into(),
            input: input.into(),
            channel: EventChannel::new(),
            cancel: CancellationToken::new(),
            task: Mutex::new(None),
            state: Mutex::new(PipelineState::Started),
            created_at: Instant::now(),
        };
        debug!(job_id = %job.id, prompt_len = job.input.len(), "job.init");
        job
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The client's brief, immutable once set.
    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn channel(&self) -> &EventChannel {
        &self.channel
    }

    /// Clone of the job's cancellation token for handing to tasks.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Request cooperative cancellation. Idempotent.
    pub fn request_cancel(&self) {
        self.cancel.cancel();
    }

    fn task_slot(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.task.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Take ownership of the background pipeline task.
    pub fn attach_task(&self, handle: JoinHandle<()>) {
        *self.task_slot() = Some(handle);
    }

    /// True when the background task has completed (or was never attached).
    pub fn is_finished(&self) -> bool {
        self.task_slot()
            .as_ref()
            .map(JoinHandle::is_finished)
            .unwrap_or(true)
    }

    /// Forcefully abort the background task, skipping its terminal handling.
    pub fn abort_task(&self) {
        if let Some(handle) = self.task_slot().as_ref() {
            handle.abort();
        }
    }

    pub fn state(&self) -> PipelineState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn set_state(&self, state: PipelineState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }
}
