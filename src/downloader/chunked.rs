//! Chunked sliding-window downloader: pipelined reads, offset-ordered reassembly.
//!
//! Single-request-at-a-time transfer pays a full network round trip per
//! chunk. This downloader keeps a bounded window of read requests in flight,
//! collects responses in whatever order they arrive, and writes them to the
//! sink strictly in ascending offset order. The window bounds memory and
//! keeps the remote session's internal queues from being overwhelmed while
//! still saturating the round-trip latency.

use std::collections::{BTreeMap, HashMap};

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::config::TransferConfig;
use crate::error::{Error, Result};
use crate::session::{ChunkResponse, RemoteFile};

/// Progress callback invoked with the byte count of each chunk as it is
/// written to the sink, in offset order.
pub type ProgressFn<'a> = &'a mut (dyn FnMut(u64) + Send);

/// Drives one chunked file transfer against an open [`RemoteFile`].
///
/// All transfer state (outstanding-request table, reassembly buffer, offset
/// counters) is owned exclusively by the instance for the duration of one
/// [`download`](Self::download) call; instances are cheap and not reused
/// across files.
#[derive(Clone, Debug)]
pub struct ChunkedDownloader {
    window_capacity: usize,
    chunk_size: u32,
    stall_timeout: std::time::Duration,
}

impl ChunkedDownloader {
    /// Build a downloader from the engine configuration.
    pub fn new(config: &TransferConfig) -> Self {
        Self {
            window_capacity: config.window_capacity,
            chunk_size: config.chunk_size,
            stall_timeout: config.stall_timeout,
        }
    }

    /// Download `file_size` bytes from `file` into `sink`.
    ///
    /// Issues read requests while the combined count of outstanding requests
    /// and buffered-but-unwritten chunks is below the window capacity, then
    /// awaits responses and drains every chunk that became contiguous with
    /// the write position. The optional `progress` callback observes each
    /// written chunk's byte count.
    ///
    /// Returns the number of bytes written, which equals `file_size` on
    /// success.
    ///
    /// # Errors
    ///
    /// - [`Error::Transport`] if a response carries an error status or a data
    ///   block whose length differs from the requested length.
    /// - [`Error::Stall`] if the window is full and a poll cycle makes no
    ///   progress (protocol desynchronization), or if no response arrives
    ///   within the configured stall timeout.
    /// - [`Error::Io`] if writing to the sink fails.
    pub async fn download<W>(
        &self,
        file: &mut dyn RemoteFile,
        file_size: u64,
        sink: &mut W,
        mut progress: Option<ProgressFn<'_>>,
    ) -> Result<u64>
    where
        W: AsyncWrite + Unpin,
    {
        // Next offset to request / next offset that must be written.
        let mut requested_offset: u64 = 0;
        let mut received_offset: u64 = 0;

        // request_id -> (offset, requested length)
        let mut outstanding: HashMap<u32, (u64, u32)> = HashMap::new();
        // offset -> chunk data, for chunks that arrived ahead of the write position
        let mut reassembly: BTreeMap<u64, Vec<u8>> = BTreeMap::new();
        let mut unproductive_cycles = 0usize;

        while received_offset < file_size {
            // Fill the request window.
            while outstanding.len() + reassembly.len() < self.window_capacity
                && requested_offset < file_size
            {
                let length = u64::from(self.chunk_size).min(file_size - requested_offset) as u32;
                let request_id = file.read_async(requested_offset, length).await?;
                outstanding.insert(request_id, (requested_offset, length));
                requested_offset += u64::from(length);
            }

            // Await at least one response, bounded by the stall timeout.
            let responses = tokio::time::timeout(self.stall_timeout, file.poll_responses())
                .await
                .map_err(|_| {
                    Error::Stall(format!(
                        "no response within {:?} ({} requests outstanding, {} chunks buffered)",
                        self.stall_timeout,
                        outstanding.len(),
                        reassembly.len()
                    ))
                })??;

            let mut matched = 0usize;
            for response in responses {
                match response {
                    ChunkResponse::Data { request_id, data } => {
                        let Some((offset, length)) = outstanding.remove(&request_id) else {
                            // Correlation anomaly, not fatal: the transfer can
                            // still complete from the requests we do track.
                            tracing::warn!(request_id, "response for unknown request id, dropped");
                            continue;
                        };
                        if data.len() != length as usize {
                            return Err(Error::Transport(format!(
                                "invalid data block at offset {}: expected {} bytes, got {}",
                                offset,
                                length,
                                data.len()
                            )));
                        }
                        reassembly.insert(offset, data);
                        matched += 1;
                    }
                    ChunkResponse::Error { request_id, message } => {
                        // No partial recovery at this layer; the orchestrator
                        // records the task as failed and moves on.
                        return Err(Error::Transport(format!(
                            "read request {request_id} failed: {message}"
                        )));
                    }
                }
            }

            // Drain every chunk contiguous with the write position.
            let mut drained = 0u64;
            while let Some(data) = reassembly.remove(&received_offset) {
                let length = data.len() as u64;
                sink.write_all(&data).await?;
                if let Some(callback) = progress.as_deref_mut() {
                    callback(length);
                }
                received_offset += length;
                drained += length;
            }

            // A poll cycle that matched nothing and drained nothing is fatal
            // once the window is full (the session is answering requests we
            // never made), and tolerated only briefly otherwise; a run of
            // them longer than the window itself is the same
            // desynchronization arriving in dribs.
            if matched == 0 && drained == 0 {
                unproductive_cycles += 1;
                let window_full =
                    outstanding.len() + reassembly.len() >= self.window_capacity;
                if window_full || unproductive_cycles > self.window_capacity {
                    return Err(Error::Stall(format!(
                        "no progress after {} poll cycle(s) with {} outstanding and {} buffered \
                         at offset {}",
                        unproductive_cycles,
                        outstanding.len(),
                        reassembly.len(),
                        received_offset
                    )));
                }
            } else {
                unproductive_cycles = 0;
            }
        }

        sink.flush().await?;
        Ok(received_offset)
    }
}
