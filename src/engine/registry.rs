// src/engine/registry.rs

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use super::job::{Job, JobId};
use crate::errors::{ContractgenError, Result};

/// Mapping from job id to job; membership is what makes a job "known" to
/// attach, stop and status requests.
///
/// Passed explicitly to every component that needs lookups, so each test
/// can build its own.
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: Mutex<HashMap<JobId, Arc<Job>>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<JobId, Arc<Job>>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create and register a job under `id`. Fails if the id is taken.
    pub fn create(&self, id: impl Into<JobId>, input: impl Into<String>) -> Result<Arc<Job>> {
        let job = Arc::new(Job::with_id(id, input));
        self.insert(job.clone())?;
        Ok(job)
    }

    /// Register an existing job. Fails if its id is taken.
    pub fn insert(&self, job: Arc<Job>) -> Result<()> {
        let mut jobs = self.lock();
        if jobs.contains_key(job.id()) {
            return Err(ContractgenError::JobExists(job.id().to_string()));
        }
        jobs.insert(job.id().to_string(), job);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<Arc<Job>> {
        self.lock().get(id).cloned()
    }

    /// Remove a job. A no-op for unknown ids.
    pub fn remove(&self, id: &str) -> Option<Arc<Job>> {
        let removed = self.lock().remove(id);
        if removed.is_some() {
            debug!(job_id = %id, "job removed from registry");
        }
        removed
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lock().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of every registered job.
    pub fn jobs(&self) -> Vec<Arc<Job>> {
        self.lock().values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_get_remove() {
        let registry = JobRegistry::new();
        let job = registry.create("j1", "brief").unwrap();

        assert_eq!(job.input(), "brief");
        assert!(registry.contains("j1"));
        assert_eq!(registry.get("j1").unwrap().id(), "j1");

        assert!(registry.remove("j1").is_some());
        assert!(registry.get("j1").is_none());
    }

    #[test]
    fn colliding_id_is_rejected() {
        let registry = JobRegistry::new();
        registry.create("dup", "first").unwrap();

        let err = registry.create("dup", "second").unwrap_err();

        assert!(matches!(err, ContractgenError::JobExists(id) if id == "dup"));
        assert_eq!(registry.get("dup").unwrap().input(), "first");
    }

    #[test]
    fn remove_is_idempotent() {
        let registry = JobRegistry::new();
        assert!(registry.remove("never").is_none());
        registry.create("j", "x").unwrap();
        assert!(registry.remove("j").is_some());
        assert!(registry.remove("j").is_none());
        assert!(registry.is_empty());
    }
}
