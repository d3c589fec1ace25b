//! Directory walker and batch orchestrator.
//!
//! Enumerates a remote tree, classifies every file through the transfer
//! policy, and drives the transfers either sequentially or across a fixed
//! pool of workers, each owning its own session. A single task failure never
//! aborts the batch; it is recorded and the walk proceeds.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;

use crate::config::TransferConfig;
use crate::error::{Error, Result};
use crate::session::{RemoteSession, SessionFactory};
use crate::types::{BatchReport, RemoteEntry, TaskOutcome, TransferStrategy, TransferTask};
use crate::utils::{format_bytes, sanitize_path};

use super::chunked::ChunkedDownloader;
use super::lifecycle::SessionLifecycle;
use super::policy::classify;

/// Runs transfer batches against a remote endpoint.
///
/// Holds the engine configuration and the session factory; one runner can
/// execute any number of batches.
pub struct BatchRunner {
    config: Arc<TransferConfig>,
    factory: Arc<dyn SessionFactory>,
    cancel: CancellationToken,
}

impl BatchRunner {
    /// Create a runner after validating the configuration.
    pub fn new(config: TransferConfig, factory: Arc<dyn SessionFactory>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            factory,
            cancel: CancellationToken::new(),
        })
    }

    /// Token that stops the batch between tasks when cancelled.
    ///
    /// Cancellation never interrupts an in-flight transfer; remaining queued
    /// tasks are simply not attempted and do not appear in the report.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Enumerate `remote_root` recursively and transfer every file beneath it
    /// into `local_root`, preserving the tree structure.
    pub async fn download_dir(&self, remote_root: &str, local_root: &Path) -> Result<BatchReport> {
        let mut session = self.factory.connect().await?;
        let discovered = discover(session.as_mut(), remote_root).await;
        if let Err(e) = session.close().await {
            tracing::warn!(error = %e, "closing discovery session failed");
        }
        let entries = discovered?;

        tracing::info!(
            root = remote_root,
            files = entries.iter().filter(|e| !e.is_dir).count(),
            "remote tree enumerated"
        );

        let tasks = self.plan(remote_root, local_root, entries);
        self.run(tasks).await
    }

    /// Build transfer tasks from discovered entries.
    ///
    /// Directories are dropped (they exist only to shape local paths), each
    /// file is classified by size, and the local relative path is sanitized:
    /// characters forbidden on some filesystems are substituted before the
    /// path is used.
    pub fn plan(
        &self,
        remote_root: &str,
        local_root: &Path,
        entries: Vec<RemoteEntry>,
    ) -> Vec<TransferTask> {
        entries
            .into_iter()
            .filter(|entry| !entry.is_dir)
            .map(|entry| {
                let relative = entry
                    .path
                    .strip_prefix(remote_root)
                    .unwrap_or(&entry.path)
                    .trim_start_matches('/');
                let relative = if relative.is_empty() {
                    entry.path.rsplit('/').next().unwrap_or(&entry.path)
                } else {
                    relative
                };

                let sanitized = sanitize_path(relative);
                if sanitized != relative {
                    tracing::warn!(
                        remote = %entry.path,
                        "forbidden filesystem characters in path, substituted with '_'"
                    );
                }

                let mut local_path = local_root.to_path_buf();
                for component in sanitized
                    .split('/')
                    .filter(|c| !c.is_empty() && *c != "." && *c != "..")
                {
                    local_path.push(component);
                }

                TransferTask {
                    strategy: classify(entry.size_bytes, &self.config),
                    remote_path: entry.path,
                    local_path,
                    size_bytes: entry.size_bytes,
                }
            })
            .collect()
    }

    /// Execute a list of prepared tasks and return the batch report.
    ///
    /// Runs sequentially for `worker_count = 1`, otherwise across a fixed
    /// pool where every worker owns its own session and lifecycle manager.
    ///
    /// # Errors
    ///
    /// Per-task errors are captured as [`TaskOutcome::Failed`] entries and do
    /// not end the batch. Only session establishment and reconnect failures
    /// propagate, since there is no session left to continue on.
    pub async fn run(&self, tasks: Vec<TransferTask>) -> Result<BatchReport> {
        let total = tasks.len();
        tracing::info!(
            tasks = total,
            workers = self.config.worker_count,
            "starting batch"
        );

        let mut report = if self.config.worker_count <= 1 {
            self.run_sequential(tasks).await?
        } else {
            self.run_parallel(tasks).await?
        };
        report.finish();

        tracing::info!(
            success = report.success_count(),
            skipped = report.skipped_count(),
            failed = report.failed_count(),
            bytes = %format_bytes(report.bytes_transferred()),
            "batch finished"
        );
        Ok(report)
    }

    async fn run_sequential(&self, tasks: Vec<TransferTask>) -> Result<BatchReport> {
        let total = tasks.len();
        let mut lifecycle = SessionLifecycle::connect(Arc::clone(&self.factory), &self.config).await?;
        let mut report = BatchReport::new();

        for (index, task) in tasks.into_iter().enumerate() {
            if self.cancel.is_cancelled() {
                tracing::info!(remaining = total - index, "batch cancelled between tasks");
                break;
            }
            if lifecycle.should_reconnect() {
                lifecycle.reconnect().await?;
            }

            let outcome =
                execute_task(&self.config, lifecycle.session_mut(), &task, index, total).await;
            if let TaskOutcome::Success { bytes, .. } = &outcome {
                lifecycle.record_transfer(*bytes);
            }
            report.push(outcome);
        }

        if let Err(e) = lifecycle.close().await {
            tracing::warn!(error = %e, "closing session at end of batch failed");
        }
        Ok(report)
    }

    async fn run_parallel(&self, tasks: Vec<TransferTask>) -> Result<BatchReport> {
        let total = tasks.len();
        let queue: Arc<Mutex<VecDeque<(usize, TransferTask)>>> =
            Arc::new(Mutex::new(tasks.into_iter().enumerate().collect()));
        let (outcome_tx, mut outcome_rx) = mpsc::unbounded_channel();

        let mut workers = Vec::with_capacity(self.config.worker_count);
        for worker_id in 0..self.config.worker_count {
            let config = Arc::clone(&self.config);
            let factory = Arc::clone(&self.factory);
            let queue = Arc::clone(&queue);
            let outcome_tx = outcome_tx.clone();
            let cancel = self.cancel.clone();

            workers.push(tokio::spawn(async move {
                let mut lifecycle = SessionLifecycle::connect(factory, &config).await?;
                loop {
                    if cancel.is_cancelled() {
                        break;
                    }
                    let next = { queue.lock().await.pop_front() };
                    let Some((index, task)) = next else { break };

                    if lifecycle.should_reconnect() {
                        lifecycle.reconnect().await?;
                    }

                    let outcome =
                        execute_task(&config, lifecycle.session_mut(), &task, index, total).await;
                    if let TaskOutcome::Success { bytes, .. } = &outcome {
                        lifecycle.record_transfer(*bytes);
                    }
                    // The receiver outlives the workers; a send can only fail
                    // if the batch is being torn down.
                    let _ = outcome_tx.send(outcome);
                }
                if let Err(e) = lifecycle.close().await {
                    tracing::warn!(worker_id, error = %e, "closing worker session failed");
                }
                Ok::<(), Error>(())
            }));
        }
        drop(outcome_tx);

        let results = futures::future::join_all(workers).await;
        for result in results {
            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => return Err(e),
                Err(e) => return Err(Error::Other(format!("transfer worker panicked: {e}"))),
            }
        }

        let mut report = BatchReport::new();
        while let Some(outcome) = outcome_rx.recv().await {
            report.push(outcome);
        }
        Ok(report)
    }
}

/// Enumerate every file beneath `root` with an explicit worklist.
///
/// Iterative rather than recursive so arbitrarily deep trees cannot exhaust
/// the stack.
pub(crate) async fn discover(
    session: &mut dyn RemoteSession,
    root: &str,
) -> Result<Vec<RemoteEntry>> {
    let mut pending: VecDeque<String> = VecDeque::from([root.to_string()]);
    let mut files = Vec::new();

    while let Some(dir) = pending.pop_front() {
        tracing::debug!(dir = %dir, "listing remote directory");
        for entry in session.list_dir(&dir).await? {
            if entry.is_dir {
                pending.push_back(entry.path);
            } else {
                files.push(entry);
            }
        }
    }
    Ok(files)
}

/// Run one task to completion, converting every error into an outcome.
async fn execute_task(
    config: &TransferConfig,
    session: &mut dyn RemoteSession,
    task: &TransferTask,
    index: usize,
    total: usize,
) -> TaskOutcome {
    if task.strategy == TransferStrategy::Skip {
        tracing::error!(
            remote = %task.remote_path,
            size = %format_bytes(task.size_bytes),
            ceiling = config.huge_file_skip_threshold,
            "file exceeds the single-file ceiling, skipped; manual transfer required"
        );
        return TaskOutcome::Skipped {
            remote_path: task.remote_path.clone(),
            reason: format!(
                "{} bytes exceeds the {}-byte single-file ceiling, manual transfer required",
                task.size_bytes, config.huge_file_skip_threshold
            ),
        };
    }

    tracing::info!(
        task = index + 1,
        total,
        remote = %task.remote_path,
        local = %task.local_path.display(),
        size = %format_bytes(task.size_bytes),
        "starting transfer"
    );
    let started = Instant::now();

    match transfer_file(config, session, task).await {
        Ok(bytes) => {
            tracing::info!(
                remote = %task.remote_path,
                bytes,
                elapsed_s = started.elapsed().as_secs_f64(),
                "transfer complete"
            );
            TaskOutcome::Success {
                remote_path: task.remote_path.clone(),
                local_path: task.local_path.clone(),
                bytes,
            }
        }
        Err(e) if e.is_skippable() => {
            // Listing said file, the server says otherwise (typically a
            // directory). Drop whatever partial file was created and move on.
            let _ = tokio::fs::remove_file(&task.local_path).await;
            tracing::info!(remote = %task.remote_path, "entry not transferable, skipped");
            TaskOutcome::Skipped {
                remote_path: task.remote_path.clone(),
                reason: e.to_string(),
            }
        }
        Err(e) => {
            tracing::error!(remote = %task.remote_path, error = %e, "transfer failed");
            TaskOutcome::Failed {
                remote_path: task.remote_path.clone(),
                error: e.to_string(),
            }
        }
    }
}

/// Transfer one file with the strategy chosen at planning time.
async fn transfer_file(
    config: &TransferConfig,
    session: &mut dyn RemoteSession,
    task: &TransferTask,
) -> Result<u64> {
    if let Some(parent) = task.local_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    // Size as reported at open time; the post-transfer check runs against
    // this, not the possibly stale listing size.
    let stat = session.stat(&task.remote_path).await?;

    match task.strategy {
        TransferStrategy::Direct => {
            let data = session.read_whole(&task.remote_path).await?;
            if data.len() as u64 != stat.size_bytes {
                return Err(Error::SizeMismatch {
                    path: task.local_path.clone(),
                    expected: stat.size_bytes,
                    actual: data.len() as u64,
                });
            }
            tokio::fs::write(&task.local_path, &data).await?;
            Ok(data.len() as u64)
        }
        TransferStrategy::Streamed => {
            let mut remote_file = session.open_read(&task.remote_path).await?;
            let mut sink = tokio::fs::File::create(&task.local_path).await?;

            let total_size = stat.size_bytes;
            let step = config.progress_step_bytes;
            let remote = task.remote_path.as_str();
            let mut done = 0u64;
            let mut since_step = 0u64;
            let mut progress = |chunk_bytes: u64| {
                done += chunk_bytes;
                since_step += chunk_bytes;
                while since_step >= step {
                    tracing::info!(
                        remote,
                        progress = %format_bytes(done),
                        total = %format_bytes(total_size),
                        "download progress"
                    );
                    since_step -= step;
                }
            };

            let written = ChunkedDownloader::new(config)
                .download(remote_file.as_mut(), total_size, &mut sink, Some(&mut progress))
                .await?;
            sink.sync_all().await?;
            drop(sink);

            // Partial files are left in place for diagnostics on mismatch.
            let local_size = tokio::fs::metadata(&task.local_path).await?.len();
            if local_size != total_size {
                return Err(Error::SizeMismatch {
                    path: task.local_path.clone(),
                    expected: total_size,
                    actual: local_size,
                });
            }
            Ok(written)
        }
        TransferStrategy::Skip => unreachable!("skip tasks never reach transfer_file"),
    }
}
