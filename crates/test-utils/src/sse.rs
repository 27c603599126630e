#![allow(dead_code)]

use std::time::Duration;

use contractgen::engine::{Event, Job};

/// One parsed server-sent-events frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Retry(u64),
    KeepAlive,
    Event { kind: String, data: String },
}

impl Frame {
    pub fn kind(&self) -> Option<&str> {
        match self {
            Frame::Event { kind, .. } => Some(kind),
            _ => None,
        }
    }

    pub fn is(&self, kind: &str) -> bool {
        self.kind() == Some(kind)
    }

    pub fn data(&self) -> &str {
        match self {
            Frame::Event { data, .. } => data,
            _ => "",
        }
    }
}

/// Parse a server-sent-events body into frames. Multiple `data:` lines
/// are joined with `\n`.
pub fn parse_frames(body: &str) -> Vec<Frame> {
    let mut frames = Vec::new();
    for block in body.split("\n\n").filter(|b| !b.is_empty()) {
        if block.starts_with(':') {
            frames.push(Frame::KeepAlive);
            continue;
        }
        if let Some(ms) = block.strip_prefix("retry: ") {
            frames.push(Frame::Retry(ms.trim().parse().unwrap_or(0)));
            continue;
        }

        let mut kind = String::new();
        let mut data: Vec<&str> = Vec::new();
        for line in block.lines() {
            if let Some(k) = line.strip_prefix("event: ") {
                kind = k.to_string();
            } else if let Some(d) = line.strip_prefix("data: ") {
                data.push(d);
            }
        }
        frames.push(Frame::Event {
            kind,
            data: data.join("\n"),
        });
    }
    frames
}

/// Drain a job's channel until `done` (inclusive) or until `limit` passes.
pub async fn drain_until_done(job: &Job, limit: Duration) -> Vec<Event> {
    let mut events = Vec::new();
    let deadline = tokio::time::Instant::now() + limit;
    while tokio::time::Instant::now() < deadline {
        match job.channel().get(Duration::from_millis(50)).await {
            Some(event) => {
                let done = event.is_done();
                events.push(event);
                if done {
                    break;
                }
            }
            None => continue,
        }
    }
    events
}

/// Concatenated payloads of every `chunk` event.
pub fn document_of(events: &[Event]) -> String {
    events
        .iter()
        .filter(|e| e.kind == contractgen::engine::EventKind::Chunk)
        .map(|e| e.data.as_str())
        .collect()
}
