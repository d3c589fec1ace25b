//! # sftp-dl
//!
//! Bounded-concurrency bulk file transfer library for SFTP-style remote
//! sessions.
//!
//! ## Design Philosophy
//!
//! sftp-dl is designed to be:
//! - **Latency-tolerant** - Many small reads pipelined in flight instead of
//!   one round trip per chunk
//! - **Bounded** - Never more than a fixed window of unacknowledged work;
//!   bytes reach disk strictly in offset order
//! - **Resilient by policy** - Oversize files are skipped, long-lived
//!   sessions are refreshed, and one failed file never aborts a batch
//! - **Library-first** - No CLI or UI; the remote transport is reached
//!   through narrow async traits the embedder implements
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use sftp_dl::{BatchRunner, TransferConfig};
//! # use sftp_dl::session::{RemoteSession, SessionFactory};
//! # struct MySftpFactory;
//! # #[async_trait::async_trait]
//! # impl SessionFactory for MySftpFactory {
//! #     async fn connect(&self) -> sftp_dl::Result<Box<dyn RemoteSession>> {
//! #         unimplemented!()
//! #     }
//! # }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = TransferConfig {
//!         worker_count: 2,
//!         ..Default::default()
//!     };
//!
//!     let runner = BatchRunner::new(config, Arc::new(MySftpFactory))?;
//!     let report = runner
//!         .download_dir("/outbound/reports", std::path::Path::new("./downloads"))
//!         .await?;
//!
//!     println!(
//!         "{} transferred, {} skipped, {} failed",
//!         report.success_count(),
//!         report.skipped_count(),
//!         report.failed_count()
//!     );
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Core transfer engine (decomposed into focused submodules)
pub mod downloader;
/// Error types
pub mod error;
/// Remote session collaborator contracts
pub mod session;
/// Core types and batch reporting
pub mod types;
/// Path sanitization and log formatting helpers
pub mod utils;

// Re-export commonly used types
pub use config::{Credentials, TransferConfig};
pub use downloader::{BatchRunner, ChunkedDownloader, SessionLifecycle, SessionUsage, classify};
pub use error::{Error, Result};
pub use session::{ChunkResponse, RemoteFile, RemoteSession, SessionFactory};
pub use types::{
    BatchReport, RemoteEntry, RemoteStat, TaskOutcome, TransferStrategy, TransferTask,
};
