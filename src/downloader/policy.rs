//! Transfer policy: size-based strategy selection.

use crate::config::TransferConfig;
use crate::types::TransferStrategy;

/// Classify a file by size into a transfer strategy.
///
/// Pure function of the size and the configured thresholds (decimal bytes,
/// matching the operational comparison values):
///
/// - `size > huge_file_skip_threshold` (default 4_000_000_000) →
///   [`TransferStrategy::Skip`]: single-connection transfers this large risk
///   exhausting transport rekey limits; the file is flagged for manual
///   handling and counted as a non-fatal outcome.
/// - `size > large_file_threshold` (default 300_000_000) →
///   [`TransferStrategy::Streamed`]: chunked pipelined download with periodic
///   progress logging.
/// - otherwise → [`TransferStrategy::Direct`]: one whole-file request; small
///   files gain nothing from pipelining overhead.
pub fn classify(size_bytes: u64, config: &TransferConfig) -> TransferStrategy {
    if size_bytes > config.huge_file_skip_threshold {
        TransferStrategy::Skip
    } else if size_bytes > config.large_file_threshold {
        TransferStrategy::Streamed
    } else {
        TransferStrategy::Direct
    }
}
