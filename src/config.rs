//! Configuration types for sftp-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Transfer engine configuration
///
/// Every tunable of the engine is an explicit field here and is passed to
/// each component at construction time; nothing is read from the process
/// environment. Defaults match the operational values the engine was tuned
/// with (48-request window of 32 KiB chunks, decimal size thresholds,
/// reconnect every 300 files).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransferConfig {
    /// Maximum number of chunks simultaneously requested-but-not-yet-written
    /// (default: 48)
    ///
    /// Bounds both the outstanding read requests and the reassembly buffer:
    /// their combined size never exceeds this value. Raising it increases
    /// pipelining at the cost of memory (`window_capacity * chunk_size`).
    #[serde(default = "default_window_capacity")]
    pub window_capacity: usize,

    /// Maximum byte length of a single chunk request (default: 32 KiB)
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u32,

    /// Files larger than this are transferred chunked with periodic progress
    /// logging (default: 300_000_000 bytes, decimal)
    #[serde(default = "default_large_file_threshold")]
    pub large_file_threshold: u64,

    /// Files larger than this are skipped entirely and flagged for manual
    /// handling (default: 4_000_000_000 bytes, decimal)
    ///
    /// Single-connection transfers beyond this size risk exhausting
    /// transport-level rekey limits.
    #[serde(default = "default_huge_file_skip_threshold")]
    pub huge_file_skip_threshold: u64,

    /// Force a session reconnect after this many completed transfers
    /// (default: 300; 0 disables forced reconnects)
    #[serde(default = "default_reconnect_every_n_files")]
    pub reconnect_every_n_files: u64,

    /// Number of parallel transfer workers, each owning its own session
    /// (default: 1, sequential)
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// Emit a progress log line every this many bytes of a streamed transfer
    /// (default: 4 MiB)
    #[serde(default = "default_progress_step_bytes")]
    pub progress_step_bytes: u64,

    /// Maximum time to wait for a single response poll before declaring the
    /// transfer stalled (default: 120 seconds)
    ///
    /// Per-chunk liveness is otherwise delegated to the transport; this is a
    /// last-resort guard against a session that stops responding entirely.
    #[serde(default = "default_stall_timeout", with = "duration_serde")]
    pub stall_timeout: Duration,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            window_capacity: default_window_capacity(),
            chunk_size: default_chunk_size(),
            large_file_threshold: default_large_file_threshold(),
            huge_file_skip_threshold: default_huge_file_skip_threshold(),
            reconnect_every_n_files: default_reconnect_every_n_files(),
            worker_count: default_worker_count(),
            progress_step_bytes: default_progress_step_bytes(),
            stall_timeout: default_stall_timeout(),
        }
    }
}

impl TransferConfig {
    /// Validate the configuration, returning a descriptive error for the
    /// first invalid field.
    pub fn validate(&self) -> Result<()> {
        if self.window_capacity == 0 {
            return Err(Error::Config {
                message: "window_capacity must be at least 1".to_string(),
                key: Some("window_capacity".to_string()),
            });
        }
        if self.chunk_size == 0 {
            return Err(Error::Config {
                message: "chunk_size must be at least 1 byte".to_string(),
                key: Some("chunk_size".to_string()),
            });
        }
        if self.worker_count == 0 {
            return Err(Error::Config {
                message: "worker_count must be at least 1".to_string(),
                key: Some("worker_count".to_string()),
            });
        }
        if self.large_file_threshold >= self.huge_file_skip_threshold {
            return Err(Error::Config {
                message: format!(
                    "large_file_threshold ({}) must be below huge_file_skip_threshold ({})",
                    self.large_file_threshold, self.huge_file_skip_threshold
                ),
                key: Some("large_file_threshold".to_string()),
            });
        }
        if self.progress_step_bytes == 0 {
            return Err(Error::Config {
                message: "progress_step_bytes must be at least 1".to_string(),
                key: Some("progress_step_bytes".to_string()),
            });
        }
        Ok(())
    }
}

/// Credentials for establishing a remote session
///
/// Passed to the [`SessionFactory`](crate::session::SessionFactory)
/// implementation; the engine itself never interprets them beyond logging the
/// endpoint. Loadable from a JSON secret file of the shape
/// `{"host": ..., "port": ..., "username": ..., "password": ...}`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Credentials {
    /// Remote hostname or address
    pub host: String,

    /// Remote port (default: 22)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Username for authentication
    pub username: String,

    /// Password for authentication
    pub password: String,
}

impl Credentials {
    /// Load credentials from a JSON secret file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// The `host:port` endpoint string used in log lines.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn default_window_capacity() -> usize {
    48
}

fn default_chunk_size() -> u32 {
    0x8000 // 32 KiB
}

fn default_large_file_threshold() -> u64 {
    300_000_000
}

fn default_huge_file_skip_threshold() -> u64 {
    4_000_000_000
}

fn default_reconnect_every_n_files() -> u64 {
    300
}

fn default_worker_count() -> usize {
    1
}

fn default_progress_step_bytes() -> u64 {
    4 * 1024 * 1024
}

fn default_stall_timeout() -> Duration {
    Duration::from_secs(120)
}

fn default_port() -> u16 {
    22
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
