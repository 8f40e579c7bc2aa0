use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    Started { label: String, total: usize },
    Completed { label: String, done: usize, total: usize },
    Finished { label: String, total: usize },
    /// The group failed after `done` examples; no further events follow.
    Aborted { label: String, done: usize, total: usize },
}

pub trait ProgressSink: Send + Sync {
    fn on_event(&self, event: ProgressEvent);
}

/// Discards every event.
#[derive(Debug, Default)]
pub struct NullProgressSink;

impl ProgressSink for NullProgressSink {
    fn on_event(&self, _event: ProgressEvent) {}
}

/// Logs group start, finish and abort through `tracing`; per-example events are dropped.
#[derive(Debug, Default)]
pub struct LogProgressSink;

impl ProgressSink for LogProgressSink {
    fn on_event(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Started { label, total } => info!(group = %label, total, "evaluation started"),
            ProgressEvent::Completed { .. } => {}
            ProgressEvent::Finished { label, total } => info!(group = %label, total, "evaluation finished"),
            ProgressEvent::Aborted { label, done, total } => warn!(group = %label, done, total, "evaluation aborted"),
        }
    }
}
