//! Session lifecycle management: usage accounting and forced reconnects.
//!
//! Long-lived transport sessions accumulate rekey/window pressure; forcing a
//! reconnect after a fixed number of completed transfers bounds that risk
//! without per-chunk renegotiation. Reconnects happen strictly between
//! tasks, never mid-transfer.

use std::sync::Arc;

use crate::config::TransferConfig;
use crate::error::{Error, Result};
use crate::session::{RemoteSession, SessionFactory};

/// Cumulative usage of the current session, reset on every reconnect.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionUsage {
    /// Completed transfers since the session was established
    pub files_since_connect: u64,
    /// Bytes moved since the session was established
    pub bytes_since_connect: u64,
}

/// Owns one remote session and decides when to replace it.
///
/// Each transfer worker holds exactly one lifecycle manager; the usage
/// counters are therefore only ever mutated by that worker's own sequential
/// hook calls.
pub struct SessionLifecycle {
    factory: Arc<dyn SessionFactory>,
    session: Box<dyn RemoteSession>,
    usage: SessionUsage,
    reconnect_every_n_files: u64,
}

impl SessionLifecycle {
    /// Establish the initial session through the factory.
    pub async fn connect(
        factory: Arc<dyn SessionFactory>,
        config: &TransferConfig,
    ) -> Result<Self> {
        let session = factory.connect().await?;
        Ok(Self {
            factory,
            session,
            usage: SessionUsage::default(),
            reconnect_every_n_files: config.reconnect_every_n_files,
        })
    }

    /// The current session, for executing a transfer.
    pub fn session_mut(&mut self) -> &mut dyn RemoteSession {
        self.session.as_mut()
    }

    /// Record a completed transfer against the current session.
    pub fn record_transfer(&mut self, bytes: u64) {
        self.usage.files_since_connect += 1;
        self.usage.bytes_since_connect += bytes;
    }

    /// Usage counters of the current session.
    pub fn usage(&self) -> SessionUsage {
        self.usage
    }

    /// Whether the file-count threshold has been reached and the session
    /// should be replaced before the next task.
    ///
    /// Always false when forced reconnects are disabled
    /// (`reconnect_every_n_files = 0`).
    pub fn should_reconnect(&self) -> bool {
        self.reconnect_every_n_files > 0
            && self.usage.files_since_connect > 0
            && self.usage.files_since_connect >= self.reconnect_every_n_files
    }

    /// Close the current session and establish a fresh one with the same
    /// credentials, resetting the usage counters.
    ///
    /// A failure here is fatal to the batch: there is no session left to
    /// continue on, so the error propagates to the caller.
    pub async fn reconnect(&mut self) -> Result<()> {
        tracing::info!(
            files = self.usage.files_since_connect,
            bytes = self.usage.bytes_since_connect,
            "reached transfer threshold, refreshing session"
        );

        if let Err(e) = self.session.close().await {
            // The old session is being discarded either way.
            tracing::warn!(error = %e, "closing exhausted session failed");
        }

        self.session = self
            .factory
            .connect()
            .await
            .map_err(|e| Error::Reconnect(e.to_string()))?;
        self.usage = SessionUsage::default();
        Ok(())
    }

    /// Close the session at the end of a batch.
    pub async fn close(&mut self) -> Result<()> {
        self.session.close().await
    }
}
