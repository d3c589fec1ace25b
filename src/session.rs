//! Remote session collaborator contracts.
//!
//! The transfer engine never speaks a wire protocol itself; it drives a
//! remote file-transfer session through these narrow async traits. A
//! production implementation wraps an SFTP (or similar) client; tests script
//! them directly.

use crate::error::Result;
use crate::types::{RemoteEntry, RemoteStat};

/// Correlated response to a previously submitted chunk read request.
///
/// Responses carry only the request id; the downloader that issued the
/// request resolves offset and expected length from its own outstanding-
/// request table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChunkResponse {
    /// A data response for an outstanding read request
    Data {
        /// Id returned by [`RemoteFile::read_async`] for the originating request
        request_id: u32,
        /// Chunk payload; must be exactly the requested length
        data: Vec<u8>,
    },
    /// A non-data (error/status) response
    Error {
        /// Id of the request the error refers to
        request_id: u32,
        /// Server-reported error message
        message: String,
    },
}

/// A remote file opened for chunked reading.
///
/// One instance backs exactly one in-flight chunked download; implementations
/// do not need to be shareable across transfers.
#[async_trait::async_trait]
pub trait RemoteFile: Send {
    /// Submit a read request for `[offset, offset + length)` without waiting
    /// for the response. Returns a request id unique for this open file.
    async fn read_async(&mut self, offset: u64, length: u32) -> Result<u32>;

    /// Wait until at least one response is available and return everything
    /// that has arrived. Responses may be out of submission order.
    async fn poll_responses(&mut self) -> Result<Vec<ChunkResponse>>;
}

/// One authenticated connection to the remote file-transfer endpoint.
#[async_trait::async_trait]
pub trait RemoteSession: Send {
    /// Stat a remote path.
    async fn stat(&mut self, path: &str) -> Result<RemoteStat>;

    /// Open a remote file for chunked reading.
    async fn open_read(&mut self, path: &str) -> Result<Box<dyn RemoteFile>>;

    /// Read an entire remote file in one request (Direct strategy).
    async fn read_whole(&mut self, path: &str) -> Result<Vec<u8>>;

    /// List the immediate entries of a remote directory.
    async fn list_dir(&mut self, path: &str) -> Result<Vec<RemoteEntry>>;

    /// Close the session. Further calls are undefined.
    async fn close(&mut self) -> Result<()>;
}

/// Factory for establishing remote sessions.
///
/// Used for the initial connect and for every forced reconnect, so that the
/// lifecycle manager can re-establish a session with the same credentials.
#[async_trait::async_trait]
pub trait SessionFactory: Send + Sync {
    /// Establish a new authenticated session.
    async fn connect(&self) -> Result<Box<dyn RemoteSession>>;
}
