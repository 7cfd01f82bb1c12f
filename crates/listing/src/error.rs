//! Error types for the listing crate.

use thiserror::Error;

/// Listing error type covering the failures the parsers can report.
///
/// Malformed lines are never an error: they are skipped. Only conditions a
/// caller explicitly asked to be told about end up here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ListingError {
    /// The long-format and plain listings disagree on a folder's entry count.
    #[error("reconciliation mismatch in '{folder}': {expected} reference names, {found} entries")]
    ReconciliationMismatch {
        /// Folder key (`.` for the listing root).
        folder: String,
        /// Number of names in the plain listing.
        expected: usize,
        /// Number of parsed entries in the long-format listing.
        found: usize,
    },

    /// A timestamp did not match the device's listing format.
    #[error("invalid timestamp '{value}': expected format {format}")]
    InvalidTimestamp {
        /// The text that failed to parse.
        value: String,
        /// The chrono format string that was tried.
        format: &'static str,
    },
}

/// Result type alias for listing operations.
pub type Result<T> = std::result::Result<T, ListingError>;
