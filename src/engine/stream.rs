// src/engine/stream.rs

//! Client attach stream: relays a job's channel as server-sent-events text.

use std::sync::Arc;
use std::time::Duration;

use async_stream::stream;
use futures_util::Stream;
use tracing::info;

use super::event::{Event, KEEP_ALIVE, retry_directive};
use super::job::Job;

/// Logs when the consumer goes away, whether the stream ended on `done` or
/// the client disconnected and the stream was dropped.
struct CloseGuard {
    job_id: String,
    relayed: usize,
}

impl Drop for CloseGuard {
    fn drop(&mut self) {
        info!(job_id = %self.job_id, relayed = self.relayed, "stream.close");
    }
}

/// Build the wire stream for an attach request.
///
/// - Unknown job: a retry directive, then a single `done`.
/// - Known job: a retry directive, then every channel event in order, with
///   a keep-alive comment after each `keep_alive` of silence, ending after
///   the `done` event.
pub fn attach_stream(
    job: Option<Arc<Job>>,
    keep_alive: Duration,
    retry_ms: u64,
) -> impl Stream<Item = String> + Send + 'static {
    stream! {
        yield retry_directive(retry_ms);

        if let Some(job) = job {
            info!(job_id = %job.id(), "stream.open");
            let mut guard = CloseGuard { job_id: job.id().to_string(), relayed: 0 };
            loop {
                match job.channel().get(keep_alive).await {
                    Some(event) => {
                        let done = event.is_done();
                        guard.relayed += 1;
                        yield event.to_wire();
                        if done {
                            break;
                        }
                    }
                    None => yield KEEP_ALIVE.to_string(),
                }
            }
        } else {
            info!("stream.missing");
            yield Event::done().to_wire();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    #[tokio::test]
    async fn unknown_job_yields_retry_then_done() {
        let frames: Vec<String> = attach_stream(None, Duration::from_millis(10), 500)
            .collect()
            .await;
        assert_eq!(frames, vec!["retry: 500\n\n".to_string(), Event::done().to_wire()]);
    }

    #[tokio::test(start_paused = true)]
    async fn quiet_periods_produce_keep_alives() {
        let job = Arc::new(Job::new("brief"));
        let mut stream = Box::pin(attach_stream(Some(job.clone()), Duration::from_secs(1), 100));

        assert_eq!(stream.next().await.unwrap(), "retry: 100\n\n");
        assert_eq!(stream.next().await.unwrap(), KEEP_ALIVE);

        job.channel().put(Event::progress("guidelines_ready"));
        job.channel().put(Event::done());

        assert_eq!(
            stream.next().await.unwrap(),
            Event::progress("guidelines_ready").to_wire()
        );
        assert_eq!(stream.next().await.unwrap(), Event::done().to_wire());
        assert!(stream.next().await.is_none());
    }
}
