//! Diagnostics emitted by select calls.
//!
//! Every call that reaches interpolation reports one timing, whatever its
//! outcome; a rejected query additionally reports an error event. Sinks are
//! fire-and-forget and cannot influence the call's result.

use crate::error::Error;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Receives timing measurements and error events.
pub trait Diagnostics: Send + Sync {
    fn record_timing(&self, name: &str, duration_nanos: u64, tags: &[(&str, &str)]);

    fn record_error(&self, name: &str, error: &Error, tags: &[(&str, &str)]);
}

/// Logs diagnostics through `tracing`.
#[derive(Debug, Clone, Default)]
pub struct TracingDiagnostics {
    slow_query: Option<Duration>,
}

impl TracingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Logs timings at or above `threshold` as warnings.
    pub fn with_slow_query_threshold(mut self, threshold: Duration) -> Self {
        self.slow_query = Some(threshold);
        self
    }
}

fn tag<'a>(tags: &[(&str, &'a str)], key: &str) -> &'a str {
    tags.iter()
        .find(|(k, _)| *k == key)
        .map(|(_, v)| *v)
        .unwrap_or("")
}

impl Diagnostics for TracingDiagnostics {
    fn record_timing(&self, name: &str, duration_nanos: u64, tags: &[(&str, &str)]) {
        let elapsed = Duration::from_nanos(duration_nanos);
        let sql = tag(tags, "sql");

        match self.slow_query {
            Some(threshold) if elapsed >= threshold => {
                warn!(metric = name, elapsed_ms = elapsed.as_millis() as u64, sql, "Slow query");
            }
            _ => debug!(metric = name, elapsed_us = elapsed.as_micros() as u64, sql, "Query timing"),
        }
    }

    fn record_error(&self, name: &str, error: &Error, tags: &[(&str, &str)]) {
        error!(metric = name, sql = tag(tags, "sql"), "{}: {}", error.category(), error);
    }
}

/// A diagnostics event captured by [`MemoryDiagnostics`].
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Timing {
        name: String,
        duration_nanos: u64,
        tags: Vec<(String, String)>,
    },
    Error {
        name: String,
        error: Error,
        tags: Vec<(String, String)>,
    },
}

impl Event {
    /// Value of the tag `key`, if present.
    pub fn tag(&self, key: &str) -> Option<&str> {
        let tags = match self {
            Self::Timing { tags, .. } | Self::Error { tags, .. } => tags,
        };
        tags.iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Keeps every event in memory, for tests and inspection.
#[derive(Debug, Default)]
pub struct MemoryDiagnostics {
    events: Mutex<Vec<Event>>,
}

impl MemoryDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn timings(&self) -> Vec<Event> {
        self.events()
            .into_iter()
            .filter(|e| matches!(e, Event::Timing { .. }))
            .collect()
    }

    pub fn errors(&self) -> Vec<Event> {
        self.events()
            .into_iter()
            .filter(|e| matches!(e, Event::Error { .. }))
            .collect()
    }

    fn push(&self, event: Event) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event);
    }
}

fn owned_tags(tags: &[(&str, &str)]) -> Vec<(String, String)> {
    tags.iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

impl Diagnostics for MemoryDiagnostics {
    fn record_timing(&self, name: &str, duration_nanos: u64, tags: &[(&str, &str)]) {
        self.push(Event::Timing {
            name: name.to_string(),
            duration_nanos,
            tags: owned_tags(tags),
        });
    }

    fn record_error(&self, name: &str, error: &Error, tags: &[(&str, &str)]) {
        self.push(Event::Error {
            name: name.to_string(),
            error: error.clone(),
            tags: owned_tags(tags),
        });
    }
}
