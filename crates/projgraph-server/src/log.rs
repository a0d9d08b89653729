//! Request outcome reporting.
//!
//! The session reports every request to a [`SessionLog`]: successes,
//! capability rejections and other failures alike, so nothing is dropped
//! silently.

use projgraph_core::{ErrorKind, ProjectError};
use serde::Serialize;
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "status")]
pub enum Outcome {
    Success { project: Option<String> },
    /// Refused by capability gating.
    Rejected { kind: ErrorKind, message: String },
    Failed { kind: ErrorKind, message: String },
}

impl Outcome {
    pub fn from_error(error: &ProjectError) -> Self {
        let kind = error.kind();
        let message = error.to_string();
        if error.is_capability_rejection() {
            Self::Rejected { kind, message }
        } else {
            Self::Failed { kind, message }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub seq: u64,
    pub command: String,
    pub outcome: Outcome,
}

/// Diagnostic/log collaborator of the session.
pub trait SessionLog: Send + Sync {
    fn record(&self, entry: LogEntry);
}

/// Forwards entries to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLog;

impl SessionLog for TracingLog {
    fn record(&self, entry: LogEntry) {
        match &entry.outcome {
            Outcome::Success { project } => tracing::debug!(
                "request {} '{}' served by {}",
                entry.seq,
                entry.command,
                project.as_deref().unwrap_or("-")
            ),
            Outcome::Rejected { message, .. } => {
                tracing::warn!("request {} '{}' rejected: {}", entry.seq, entry.command, message);
            }
            Outcome::Failed { message, .. } => {
                tracing::warn!("request {} '{}' failed: {}", entry.seq, entry.command, message);
            }
        }
    }
}

/// Keeps entries in memory, in arrival order.
#[derive(Debug, Default)]
pub struct MemoryLog {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Entries refused by capability gating.
    pub fn rejections(&self) -> Vec<LogEntry> {
        self.entries()
            .into_iter()
            .filter(|e| matches!(e.outcome, Outcome::Rejected { .. }))
            .collect()
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl SessionLog for MemoryLog {
    fn record(&self, entry: LogEntry) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
    }
}
