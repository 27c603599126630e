// src/engine/channel.rs

//! Per-job event channel.
//!
//! Unbounded and ordered: `put` never blocks and never fails. The first
//! `done` seals the channel; anything put afterwards is dropped, so a
//! consumer sees exactly one `done` and it is the last event.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::debug;

use super::event::{Event, EventKind};

#[derive(Debug, Default)]
struct ChannelState {
    queue: VecDeque<Event>,
    sealed: bool,
}

#[derive(Debug, Default)]
pub struct EventChannel {
    state: Mutex<ChannelState>,
    notify: Notify,
}

impl EventChannel {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ChannelState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append an event. Returns `false` if the channel was already sealed
    /// and the event was dropped.
    pub fn put(&self, event: Event) -> bool {
        let accepted = {
            let mut state = self.lock();
            Self::push_locked(&mut state, event)
        };
        if accepted {
            self.notify.notify_one();
        }
        accepted
    }

    /// Append an `error` + `done` pair atomically, unless the channel is
    /// already sealed. Returns whether the pair was written.
    pub fn finish_with_error(&self, message: impl Into<String>) -> bool {
        let written = {
            let mut state = self.lock();
            if state.sealed {
                false
            } else {
                Self::push_locked(&mut state, Event::error(message));
                Self::push_locked(&mut state, Event::done())
            }
        };
        if written {
            self.notify.notify_one();
        }
        written
    }

    fn push_locked(state: &mut ChannelState, event: Event) -> bool {
        if state.sealed {
            debug!(kind = %event.kind, "channel sealed; dropping event");
            return false;
        }
        if event.kind == EventKind::Done {
            state.sealed = true;
        }
        state.queue.push_back(event);
        true
    }

    /// Pop the next event without waiting.
    pub fn try_get(&self) -> Option<Event> {
        self.lock().queue.pop_front()
    }

    /// Wait up to `timeout` for the next event.
    ///
    /// Returns `None` on timeout; nothing is consumed in that case.
    pub async fn get(&self, timeout: Duration) -> Option<Event> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(event) = self.try_get() {
                return Some(event);
            }
            // `notify_one` stores a permit when nobody is waiting, so a put
            // landing between `try_get` and here is not lost.
            if tokio::time::timeout_at(deadline, self.notify.notified())
                .await
                .is_err()
            {
                return None;
            }
        }
    }

    /// True once a `done` event has been accepted.
    pub fn is_sealed(&self) -> bool {
        self.lock().sealed
    }

    /// Number of buffered, not yet consumed events.
    pub fn len(&self) -> usize {
        self.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn events_come_out_in_insertion_order() {
        let channel = EventChannel::new();
        channel.put(Event::progress("a"));
        channel.put(Event::progress("b"));

        let first = channel.get(Duration::from_millis(10)).await.unwrap();
        let second = channel.get(Duration::from_millis(10)).await.unwrap();

        assert_eq!(first.data, "a");
        assert_eq!(second.data, "b");
    }

    #[tokio::test(start_paused = true)]
    async fn get_times_out_without_consuming() {
        let channel = EventChannel::new();
        assert!(channel.get(Duration::from_secs(1)).await.is_none());

        channel.put(Event::progress("late"));
        assert_eq!(channel.len(), 1);
        assert_eq!(channel.get(Duration::from_secs(1)).await.unwrap().data, "late");
    }

    #[tokio::test]
    async fn waiting_reader_wakes_on_put() {
        let channel = std::sync::Arc::new(EventChannel::new());
        let reader = {
            let channel = channel.clone();
            tokio::spawn(async move { channel.get(Duration::from_secs(5)).await })
        };

        tokio::task::yield_now().await;
        channel.put(Event::chunk("x"));

        let got = reader.await.unwrap().unwrap();
        assert_eq!(got, Event::chunk("x"));
    }

    #[test]
    fn done_seals_the_channel() {
        let channel = EventChannel::new();
        assert!(channel.put(Event::done()));
        assert!(!channel.put(Event::chunk("after")));
        assert!(!channel.finish_with_error("too late"));

        assert!(channel.is_sealed());
        assert_eq!(channel.try_get(), Some(Event::done()));
        assert_eq!(channel.try_get(), None);
    }

    #[test]
    fn finish_with_error_writes_exactly_one_pair() {
        let channel = EventChannel::new();
        assert!(channel.finish_with_error("Generation stopped by user."));
        assert!(!channel.finish_with_error("Generation cancelled"));

        let kinds: Vec<_> = std::iter::from_fn(|| channel.try_get())
            .map(|e| e.kind)
            .collect();
        assert_eq!(kinds, vec![EventKind::Error, EventKind::Done]);
    }
}
