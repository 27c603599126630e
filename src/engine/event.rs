// src/engine/event.rs

//! Job events and their server-sent-events wire format.
//!
//! An event serializes as:
//!
//! ```text
//! event: <kind>
//! data: <payload line 1>
//! data: <payload line 2>
//!
//! ```
//!
//! Every payload produces at least one `data:` line so that clients
//! dispatch even empty events such as `done`.

use std::fmt;

use serde::Serialize;

use crate::types::{Outline, Variables};

/// Comment line written during quiet periods to keep the connection open.
pub const KEEP_ALIVE: &str = ": keep-alive\n\n";

/// Client reconnect directive written first on every attach.
pub fn retry_directive(retry_ms: u64) -> String {
    format!("retry: {retry_ms}\n\n")
}

/// Recognized event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Start,
    Variables,
    Progress,
    Outline,
    Chunk,
    Error,
    Done,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Start => "start",
            EventKind::Variables => "variables",
            EventKind::Progress => "progress",
            EventKind::Outline => "outline",
            EventKind::Chunk => "chunk",
            EventKind::Error => "error",
            EventKind::Done => "done",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named event with a text payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub kind: EventKind,
    pub data: String,
}

impl Event {
    pub fn new(kind: EventKind, data: impl Into<String>) -> Self {
        Self {
            kind,
            data: data.into(),
        }
    }

    pub fn start(job_id: &str) -> Self {
        Self::new(EventKind::Start, to_json(&serde_json::json!({ "job_id": job_id })))
    }

    pub fn variables(vars: &Variables) -> Self {
        Self::new(EventKind::Variables, to_json(vars))
    }

    pub fn outline(outline: &Outline) -> Self {
        Self::new(EventKind::Outline, to_json(outline))
    }

    pub fn progress(token: impl Into<String>) -> Self {
        Self::new(EventKind::Progress, token)
    }

    pub fn chunk(slice: impl Into<String>) -> Self {
        Self::new(EventKind::Chunk, slice)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(EventKind::Error, message)
    }

    pub fn done() -> Self {
        Self::new(EventKind::Done, "")
    }

    pub fn is_done(&self) -> bool {
        self.kind == EventKind::Done
    }

    /// Serialize in the server-sent-events framing.
    pub fn to_wire(&self) -> String {
        let mut out = String::with_capacity(self.data.len() + 32);
        out.push_str("event: ");
        out.push_str(self.kind.as_str());
        out.push('\n');
        for line in self.data.split('\n') {
            let line = line.strip_suffix('\r').unwrap_or(line);
            out.push_str("data: ");
            out.push_str(line);
            out.push('\n');
        }
        out.push('\n');
        out
    }
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_line_payload() {
        assert_eq!(
            Event::progress("guidelines_ready").to_wire(),
            "event: progress\ndata: guidelines_ready\n\n"
        );
    }

    #[test]
    fn multi_line_payload_becomes_several_data_lines() {
        assert_eq!(
            Event::chunk("<p>a\r\nb</p>\n").to_wire(),
            "event: chunk\ndata: <p>a\ndata: b</p>\ndata: \n\n"
        );
    }

    #[test]
    fn done_carries_one_empty_data_line() {
        assert_eq!(Event::done().to_wire(), "event: done\ndata: \n\n");
    }

    #[test]
    fn start_payload_is_json() {
        assert_eq!(Event::start("abc").data, r#"{"job_id":"abc"}"#);
    }

    #[test]
    fn retry_and_keep_alive_framing() {
        assert_eq!(retry_directive(60_000), "retry: 60000\n\n");
        assert!(KEEP_ALIVE.starts_with(':'));
        assert!(KEEP_ALIVE.ends_with("\n\n"));
    }
}
