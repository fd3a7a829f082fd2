//! Revocation Store
//!
//! Append-only record of revoked override ids. There is no unrevoke.

use crate::error::{LedgerError, Result};
use crate::jsonl::{append_record, read_records};
use chrono::{DateTime, Utc};
use oxide_token::RevocationCheck;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One revocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevocationRecord {
    /// Revoked token id
    pub override_id: String,
    /// Revocation time
    pub revoked_at: DateTime<Utc>,
    /// Operator that revoked it
    pub revoked_by: String,
    /// Free-form reason
    pub reason: String,
}

/// Membership only needs the id
#[derive(Deserialize)]
struct IdView {
    override_id: String,
}

/// Durable revocation list backed by a JSONL file
#[derive(Debug, Clone)]
pub struct RevocationStore {
    path: PathBuf,
}

impl RevocationStore {
    /// Store over `path`; the file is created on first revocation
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backing JSONL file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Revoke an override id now
    ///
    /// # Errors
    /// Returns [`LedgerError`] if the id is empty or the append fails.
    pub fn revoke(&self, override_id: &str, revoked_by: &str, reason: &str) -> Result<RevocationRecord> {
        self.revoke_at(override_id, revoked_by, reason, Utc::now())
    }

    /// Revoke an override id with an explicit timestamp
    ///
    /// # Errors
    /// Returns [`LedgerError`] if the id is empty or the append fails.
    pub fn revoke_at(
        &self,
        override_id: &str,
        revoked_by: &str,
        reason: &str,
        revoked_at: DateTime<Utc>,
    ) -> Result<RevocationRecord> {
        if override_id.trim().is_empty() {
            return Err(LedgerError::EmptyField { field: "override_id" });
        }
        let record = RevocationRecord {
            override_id: override_id.to_owned(),
            revoked_at,
            revoked_by: revoked_by.to_owned(),
            reason: reason.to_owned(),
        };
        append_record(&self.path, &record)?;
        tracing::info!(override_id, revoked_by, "override token revoked");
        Ok(record)
    }

    /// Membership query that surfaces I/O failures
    ///
    /// # Errors
    /// Returns [`LedgerError::Io`] if the file exists but cannot be read.
    pub fn try_is_revoked(&self, override_id: &str) -> Result<bool> {
        Ok(read_records::<IdView>(&self.path)?
            .iter()
            .any(|r| r.override_id == override_id))
    }

    /// All well-formed records, oldest first
    ///
    /// # Errors
    /// Returns [`LedgerError::Io`] if the file exists but cannot be read.
    pub fn records(&self) -> Result<Vec<RevocationRecord>> {
        read_records(&self.path)
    }
}

impl RevocationCheck for RevocationStore {
    /// Fails closed: an unreadable store answers revoked
    fn is_revoked(&self, override_id: &str) -> bool {
        self.try_is_revoked(override_id).unwrap_or_else(|e| {
            tracing::error!(override_id, error = %e, "revocation store unreadable; treating token as revoked");
            true
        })
    }
}
