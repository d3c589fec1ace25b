//! Core types for sftp-dl

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Size and kind of a remote entry, as reported by `stat`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteStat {
    /// Size in bytes (0 for directories on most servers)
    pub size_bytes: u64,
    /// Whether the entry is a directory
    pub is_dir: bool,
}

/// One entry of a remote directory listing
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEntry {
    /// Absolute remote path of the entry
    pub path: String,
    /// Size in bytes
    pub size_bytes: u64,
    /// Whether the entry is a directory
    pub is_dir: bool,
}

/// Strategy selected for a file based on its size
///
/// See [`classify`](crate::downloader::classify) for the thresholds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferStrategy {
    /// File exceeds the hard single-file ceiling; flagged for manual handling
    Skip,
    /// Chunked pipelined download with periodic progress logging
    Streamed,
    /// Single whole-file request, no manual chunking
    Direct,
}

/// A single planned file transfer
///
/// Created by the directory walker when an entry is classified; immutable
/// after creation and consumed exactly once.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferTask {
    /// Remote source path
    pub remote_path: String,
    /// Local destination path (already sanitized)
    pub local_path: PathBuf,
    /// Size reported by the listing that produced this task
    pub size_bytes: u64,
    /// Strategy chosen by the transfer policy
    pub strategy: TransferStrategy,
}

/// Outcome of one transfer task
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskOutcome {
    /// File transferred and verified
    Success {
        /// Remote source path
        remote_path: String,
        /// Local path the file was written to
        local_path: PathBuf,
        /// Bytes transferred
        bytes: u64,
    },
    /// Task skipped (oversize file, or entry turned out to be a directory)
    Skipped {
        /// Remote source path
        remote_path: String,
        /// Human-readable reason for the skip
        reason: String,
    },
    /// Task failed; the batch continues with the next task
    Failed {
        /// Remote source path
        remote_path: String,
        /// Stringified error
        error: String,
    },
}

impl TaskOutcome {
    /// Remote path this outcome refers to.
    pub fn remote_path(&self) -> &str {
        match self {
            TaskOutcome::Success { remote_path, .. }
            | TaskOutcome::Skipped { remote_path, .. }
            | TaskOutcome::Failed { remote_path, .. } => remote_path,
        }
    }

    /// Bytes transferred by this task (0 unless successful).
    pub fn bytes(&self) -> u64 {
        match self {
            TaskOutcome::Success { bytes, .. } => *bytes,
            _ => 0,
        }
    }
}

/// Ordered record of per-task outcomes across one batch
///
/// Outcomes are appended in the order they are recorded; under a worker pool
/// that is completion order, not submission order. Immutable once the batch
/// finishes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BatchReport {
    outcomes: Vec<TaskOutcome>,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

impl BatchReport {
    /// Start an empty report, stamping the batch start time.
    pub(crate) fn new() -> Self {
        Self {
            outcomes: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub(crate) fn push(&mut self, outcome: TaskOutcome) {
        self.outcomes.push(outcome);
    }

    pub(crate) fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// All outcomes, in recorded order.
    pub fn outcomes(&self) -> &[TaskOutcome] {
        &self.outcomes
    }

    /// Number of successful transfers.
    pub fn success_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, TaskOutcome::Success { .. }))
            .count()
    }

    /// Number of skipped tasks.
    pub fn skipped_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, TaskOutcome::Skipped { .. }))
            .count()
    }

    /// Number of failed tasks.
    pub fn failed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, TaskOutcome::Failed { .. }))
            .count()
    }

    /// Total bytes transferred by successful tasks.
    pub fn bytes_transferred(&self) -> u64 {
        self.outcomes.iter().map(TaskOutcome::bytes).sum()
    }

    /// Batch start time.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Batch finish time, if the batch has completed.
    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }
}
