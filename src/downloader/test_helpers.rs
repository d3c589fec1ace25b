//! Shared test helpers: scripted remote sessions for engine tests.
//!
//! `ScriptedSession`/`ScriptedFile` answer the collaborator traits from
//! in-memory byte buffers, with knobs for response arrival order, lying stat
//! sizes, truncated or error responses, and sessions that stop responding.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::session::{ChunkResponse, RemoteFile, RemoteSession, SessionFactory};
use crate::types::{RemoteEntry, RemoteStat};

/// Deterministic non-trivial content for transfer tests.
pub(crate) fn pattern_bytes(len: usize) -> Vec<u8> {
    (0..len)
        .map(|i| (i.wrapping_mul(31).wrapping_add(7) & 0xff) as u8)
        .collect()
}

/// Order in which a scripted file answers its pending read requests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ResponseOrder {
    /// Oldest request first (network behaves)
    InOrder,
    /// Newest request first (worst-case reordering)
    Reversed,
}

/// How a scripted file behaves on `poll_responses`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum FileBehavior {
    /// Answer up to `per_poll` pending requests per poll
    Normal {
        /// Responses produced per poll cycle
        per_poll: usize,
    },
    /// Never produce a response (exercises the stall timeout)
    Silent,
    /// Acknowledge requests but answer with ids that match nothing
    /// (exercises desynchronization stall detection)
    Ghost,
}

/// Counters observed by tests after a transfer.
#[derive(Debug, Default)]
pub(crate) struct FileStats {
    /// Total read requests submitted
    pub(crate) requests_issued: AtomicUsize,
    /// Data responses delivered to the downloader
    pub(crate) delivered: AtomicUsize,
    /// Chunks the test's progress callback has seen written
    pub(crate) chunks_written: AtomicUsize,
    /// Maximum observed outstanding + buffered occupancy
    pub(crate) max_window_occupancy: AtomicUsize,
}

impl FileStats {
    /// Buffered chunk count as derivable from the mock's viewpoint:
    /// responses delivered minus chunks written.
    fn buffered(&self) -> usize {
        self.delivered
            .load(Ordering::Relaxed)
            .saturating_sub(self.chunks_written.load(Ordering::Relaxed))
    }
}

/// Everything needed to open one scripted remote file.
#[derive(Clone)]
pub(crate) struct FileSpec {
    pub(crate) content: Arc<Vec<u8>>,
    /// Override the stat-reported size (a "lying" server)
    pub(crate) stat_size: Option<u64>,
    /// Fail open_read/read_whole with a permission error
    pub(crate) permission_denied: bool,
    pub(crate) order: ResponseOrder,
    pub(crate) behavior: FileBehavior,
    /// Deliver this chunk one byte short
    pub(crate) truncate_at: Option<u64>,
    /// Answer this chunk with an error response
    pub(crate) error_at: Option<u64>,
    /// Deliver one unmatched-id response before any real ones
    pub(crate) ghost_first: bool,
    /// Shared across opens and session clones
    pub(crate) stats: Arc<FileStats>,
}

impl FileSpec {
    pub(crate) fn new(content: Vec<u8>) -> Self {
        Self {
            content: Arc::new(content),
            stat_size: None,
            permission_denied: false,
            order: ResponseOrder::InOrder,
            behavior: FileBehavior::Normal { per_poll: 1 },
            truncate_at: None,
            error_at: None,
            ghost_first: false,
            stats: Arc::new(FileStats::default()),
        }
    }

    pub(crate) fn reversed(mut self) -> Self {
        self.order = ResponseOrder::Reversed;
        self
    }

    pub(crate) fn behavior(mut self, behavior: FileBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    pub(crate) fn stat_size(mut self, size: u64) -> Self {
        self.stat_size = Some(size);
        self
    }

    pub(crate) fn permission_denied(mut self) -> Self {
        self.permission_denied = true;
        self
    }

    pub(crate) fn truncate_at(mut self, offset: u64) -> Self {
        self.truncate_at = Some(offset);
        self
    }

    pub(crate) fn error_at(mut self, offset: u64) -> Self {
        self.error_at = Some(offset);
        self
    }

    pub(crate) fn ghost_first(mut self) -> Self {
        self.ghost_first = true;
        self
    }

    pub(crate) fn reported_size(&self) -> u64 {
        self.stat_size.unwrap_or(self.content.len() as u64)
    }
}

/// An open scripted file answering chunk reads from its in-memory content.
pub(crate) struct ScriptedFile {
    spec: FileSpec,
    /// (request_id, offset, length) in submission order
    pending: Vec<(u32, u64, u32)>,
    next_id: u32,
    ghost_sent: bool,
}

impl ScriptedFile {
    pub(crate) fn new(spec: FileSpec) -> Self {
        Self {
            spec,
            pending: Vec::new(),
            next_id: 0,
            ghost_sent: false,
        }
    }

    fn make_response(&self, request_id: u32, offset: u64, length: u32) -> ChunkResponse {
        if self.spec.error_at == Some(offset) {
            return ChunkResponse::Error {
                request_id,
                message: format!("server rejected read at offset {offset}"),
            };
        }
        let start = offset as usize;
        let end = (start + length as usize).min(self.spec.content.len());
        let mut data = self.spec.content.get(start..end).unwrap_or(&[]).to_vec();
        if self.spec.truncate_at == Some(offset) {
            data.pop();
        }
        ChunkResponse::Data { request_id, data }
    }
}

#[async_trait::async_trait]
impl RemoteFile for ScriptedFile {
    async fn read_async(&mut self, offset: u64, length: u32) -> Result<u32> {
        let request_id = self.next_id;
        self.next_id += 1;
        self.pending.push((request_id, offset, length));

        let stats = &self.spec.stats;
        stats.requests_issued.fetch_add(1, Ordering::Relaxed);
        // The transfer loop is cooperative, so this snapshot is consistent:
        // outstanding (= pending here) plus buffered-but-unwritten chunks.
        let occupancy = self.pending.len() + stats.buffered();
        stats.max_window_occupancy.fetch_max(occupancy, Ordering::Relaxed);
        Ok(request_id)
    }

    async fn poll_responses(&mut self) -> Result<Vec<ChunkResponse>> {
        match self.spec.behavior {
            FileBehavior::Silent => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(Vec::new())
            }
            FileBehavior::Ghost => Ok(vec![ChunkResponse::Data {
                request_id: u32::MAX,
                data: Vec::new(),
            }]),
            FileBehavior::Normal { per_poll } => {
                assert!(
                    !self.pending.is_empty(),
                    "poll_responses called with no outstanding requests"
                );
                if self.spec.ghost_first && !self.ghost_sent {
                    self.ghost_sent = true;
                    return Ok(vec![ChunkResponse::Data {
                        request_id: u32::MAX,
                        data: Vec::new(),
                    }]);
                }
                let mut responses = Vec::new();
                for _ in 0..per_poll.max(1) {
                    if self.pending.is_empty() {
                        break;
                    }
                    let (request_id, offset, length) = match self.spec.order {
                        ResponseOrder::InOrder => self.pending.remove(0),
                        ResponseOrder::Reversed => {
                            self.pending.pop().expect("pending checked non-empty")
                        }
                    };
                    responses.push(self.make_response(request_id, offset, length));
                    self.spec.stats.delivered.fetch_add(1, Ordering::Relaxed);
                }
                Ok(responses)
            }
        }
    }
}

/// Scripted remote session backed by in-memory directory listings and files.
#[derive(Clone, Default)]
pub(crate) struct ScriptedSession {
    dirs: HashMap<String, Vec<RemoteEntry>>,
    files: HashMap<String, FileSpec>,
    closed: Arc<AtomicUsize>,
}

impl ScriptedSession {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_dir(mut self, path: &str, entries: Vec<RemoteEntry>) -> Self {
        self.dirs.insert(path.to_string(), entries);
        self
    }

    pub(crate) fn with_file(mut self, path: &str, spec: FileSpec) -> Self {
        self.files.insert(path.to_string(), spec);
        self
    }

    pub(crate) fn close_count(&self) -> usize {
        self.closed.load(Ordering::Relaxed)
    }
}

#[async_trait::async_trait]
impl RemoteSession for ScriptedSession {
    async fn stat(&mut self, path: &str) -> Result<RemoteStat> {
        if let Some(spec) = self.files.get(path) {
            return Ok(RemoteStat {
                size_bytes: spec.reported_size(),
                is_dir: false,
            });
        }
        if self.dirs.contains_key(path) {
            return Ok(RemoteStat {
                size_bytes: 0,
                is_dir: true,
            });
        }
        Err(Error::NotFound(path.to_string()))
    }

    async fn open_read(&mut self, path: &str) -> Result<Box<dyn RemoteFile>> {
        let spec = self
            .files
            .get(path)
            .ok_or_else(|| Error::NotFound(path.to_string()))?;
        if spec.permission_denied {
            return Err(Error::Permission(path.to_string()));
        }
        Ok(Box::new(ScriptedFile::new(spec.clone())))
    }

    async fn read_whole(&mut self, path: &str) -> Result<Vec<u8>> {
        let spec = self
            .files
            .get(path)
            .ok_or_else(|| Error::NotFound(path.to_string()))?;
        if spec.permission_denied {
            return Err(Error::Permission(path.to_string()));
        }
        Ok(spec.content.as_ref().clone())
    }

    async fn list_dir(&mut self, path: &str) -> Result<Vec<RemoteEntry>> {
        self.dirs
            .get(path)
            .cloned()
            .ok_or_else(|| Error::NotFound(path.to_string()))
    }

    async fn close(&mut self) -> Result<()> {
        self.closed.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// Factory handing out clones of a template session.
pub(crate) struct ScriptedFactory {
    template: ScriptedSession,
    connects: Arc<AtomicUsize>,
    /// Fail the Nth and later connects (0-based), for reconnect-failure tests
    fail_from_connect: Option<usize>,
}

impl ScriptedFactory {
    pub(crate) fn new(template: ScriptedSession) -> Self {
        Self {
            template,
            connects: Arc::new(AtomicUsize::new(0)),
            fail_from_connect: None,
        }
    }

    pub(crate) fn fail_from_connect(mut self, nth: usize) -> Self {
        self.fail_from_connect = Some(nth);
        self
    }

    pub(crate) fn connect_count(&self) -> usize {
        self.connects.load(Ordering::Relaxed)
    }
}

#[async_trait::async_trait]
impl SessionFactory for ScriptedFactory {
    async fn connect(&self) -> Result<Box<dyn RemoteSession>> {
        let n = self.connects.fetch_add(1, Ordering::Relaxed);
        if let Some(limit) = self.fail_from_connect
            && n >= limit
        {
            return Err(Error::Transport("endpoint unreachable".to_string()));
        }
        Ok(Box::new(self.template.clone()))
    }
}

/// Convenience constructor for a file listing entry.
pub(crate) fn entry_file(path: &str, size_bytes: u64) -> RemoteEntry {
    RemoteEntry {
        path: path.to_string(),
        size_bytes,
        is_dir: false,
    }
}

/// Convenience constructor for a directory listing entry.
pub(crate) fn entry_dir(path: &str) -> RemoteEntry {
    RemoteEntry {
        path: path.to_string(),
        size_bytes: 0,
        is_dir: true,
    }
}
