//! Ledger errors

use std::path::PathBuf;

/// Durable ledger failures
///
/// Gates treat every variant as a denial.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Reading, creating, appending to, or syncing a ledger file failed
    #[error("ledger I/O failed for {}: {source}", .path.display())]
    Io {
        /// Ledger file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A record could not be encoded as JSON
    #[error("failed to encode ledger record: {0}")]
    Encode(#[from] serde_json::Error),

    /// A record field that must be non-empty was empty
    #[error("ledger record field {field} must be non-empty")]
    EmptyField {
        /// Field name
        field: &'static str,
    },
}

impl LedgerError {
    /// I/O failure on `path`
    #[inline]
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// True for storage failures, false for rejected input
    #[must_use]
    pub const fn is_infrastructure(&self) -> bool {
        matches!(self, Self::Io { .. } | Self::Encode(_))
    }
}

/// Result alias for ledger operations
pub type Result<T> = std::result::Result<T, LedgerError>;
