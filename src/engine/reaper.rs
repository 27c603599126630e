// src/engine/reaper.rs

//! Deferred registry eviction.
//!
//! When a pipeline reaches a terminal state the orchestrator schedules the
//! job's removal `ttl` later. Timers are owned here (not detached), so they
//! can be inspected, cancelled at shutdown, and driven by tokio's paused
//! clock in tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::job::JobId;
use super::registry::JobRegistry;

type Pending = HashMap<JobId, (u64, JoinHandle<()>)>;

#[derive(Debug)]
pub struct Reaper {
    registry: Arc<JobRegistry>,
    ttl: Duration,
    pending: Arc<Mutex<Pending>>,
    generation: AtomicU64,
    closed: AtomicBool,
}

fn lock(pending: &Mutex<Pending>) -> MutexGuard<'_, Pending> {
    pending.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Reaper {
    pub fn new(registry: Arc<JobRegistry>, ttl: Duration) -> Self {
        Self {
            registry,
            ttl,
            pending: Arc::new(Mutex::new(HashMap::new())),
            generation: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Schedule removal of `id` after the TTL. Rescheduling an id replaces
    /// its earlier timer. A no-op once the reaper is closed.
    pub fn schedule(&self, id: &str) {
        if self.is_closed() {
            debug!(job_id = %id, "reaper closed; eviction not scheduled");
            return;
        }
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;

        let registry = self.registry.clone();
        let pending = self.pending.clone();
        let ttl = self.ttl;
        let job_id = id.to_string();

        // Hold the map while spawning so the timer cannot clear its own
        // entry before it is inserted.
        let mut map = lock(&self.pending);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            if registry.remove(&job_id).is_some() {
                info!(job_id = %job_id, ttl_secs = ttl.as_secs_f64(), "job.evicted");
            }
            let mut map = lock(&pending);
            if map.get(&job_id).is_some_and(|(g, _)| *g == generation) {
                map.remove(&job_id);
            }
        });

        if let Some((_, previous)) = map.insert(id.to_string(), (generation, handle)) {
            debug!(job_id = %id, "replacing earlier eviction timer");
            previous.abort();
        }
    }

    /// Cancel a scheduled eviction. Returns whether one was pending.
    pub fn cancel(&self, id: &str) -> bool {
        match lock(&self.pending).remove(id) {
            Some((_, handle)) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// Abort every pending timer and refuse new ones (used at shutdown).
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        let drained: Vec<_> = lock(&self.pending).drain().collect();
        for (_, (_, handle)) in drained {
            handle.abort();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Number of evictions scheduled but not yet fired.
    pub fn pending(&self) -> usize {
        lock(&self.pending).len()
    }

    pub fn is_scheduled(&self, id: &str) -> bool {
        lock(&self.pending).contains_key(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn evicts_after_ttl() {
        let registry = Arc::new(JobRegistry::new());
        registry.create("j", "brief").unwrap();
        let reaper = Reaper::new(registry.clone(), Duration::from_secs(30));

        reaper.schedule("j");
        tokio::time::sleep(Duration::from_secs(29)).await;
        assert!(registry.contains("j"));
        assert!(reaper.is_scheduled("j"));

        tokio::time::sleep(Duration::from_secs(2)).await;
        settle().await;
        assert!(!registry.contains("j"));
        assert_eq!(reaper.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_timer_leaves_job_registered() {
        let registry = Arc::new(JobRegistry::new());
        registry.create("j", "brief").unwrap();
        let reaper = Reaper::new(registry.clone(), Duration::from_secs(1));

        reaper.schedule("j");
        assert!(reaper.cancel("j"));
        assert!(!reaper.cancel("j"));

        tokio::time::sleep(Duration::from_secs(5)).await;
        settle().await;
        assert!(registry.contains("j"));
    }

    #[tokio::test(start_paused = true)]
    async fn rescheduling_restarts_the_delay() {
        let registry = Arc::new(JobRegistry::new());
        registry.create("j", "brief").unwrap();
        let reaper = Reaper::new(registry.clone(), Duration::from_secs(10));

        reaper.schedule("j");
        tokio::time::sleep(Duration::from_secs(6)).await;
        reaper.schedule("j");
        tokio::time::sleep(Duration::from_secs(6)).await;
        settle().await;
        assert!(registry.contains("j"));
        assert_eq!(reaper.pending(), 1);

        tokio::time::sleep(Duration::from_secs(5)).await;
        settle().await;
        assert!(!registry.contains("j"));
    }

    #[tokio::test(start_paused = true)]
    async fn closing_drops_pending_timers_and_refuses_new_ones() {
        let registry = Arc::new(JobRegistry::new());
        registry.create("a", "brief").unwrap();
        registry.create("b", "brief").unwrap();
        let reaper = Reaper::new(registry.clone(), Duration::from_secs(1));

        reaper.schedule("a");
        reaper.close();
        assert_eq!(reaper.pending(), 0);

        reaper.schedule("b");
        assert!(!reaper.is_scheduled("b"));

        tokio::time::sleep(Duration::from_secs(5)).await;
        settle().await;
        assert!(registry.contains("a"));
        assert!(registry.contains("b"));
    }
}
