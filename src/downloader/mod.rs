//! Core transfer engine split into focused submodules.
//!
//! - [`chunked`] - Sliding-window chunked downloader with offset reassembly
//! - [`policy`] - Size-based transfer strategy selection
//! - [`lifecycle`] - Session usage accounting and forced reconnects
//! - [`batch`] - Directory walker and batch orchestrator

mod batch;
mod chunked;
mod lifecycle;
mod policy;

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

pub use batch::BatchRunner;
pub use chunked::{ChunkedDownloader, ProgressFn};
pub use lifecycle::{SessionLifecycle, SessionUsage};
pub use policy::classify;
