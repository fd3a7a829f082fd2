//! Replay Ledger
//!
//! Records each accepted `(override_id, nonce)` pair so a token can grant
//! at most once. Two layers:
//!
//! - [`HotReplaySet`]: a shared in-process set claimed atomically before any
//!   disk access. Every ledger in the process should be handed a clone of
//!   the same set.
//! - a durable JSONL file, loaded lazily once per ledger instance.

use crate::error::{LedgerError, Result};
use crate::jsonl::{append_record, read_records};
use chrono::{DateTime, Utc};
use dashmap::DashSet;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Build the ledger key for an override id and nonce
#[must_use]
pub fn replay_key(override_id: &str, nonce: &str) -> String {
    format!("{override_id}::{nonce}")
}

/// Process-wide set of claimed replay keys
///
/// Cloning shares the underlying set.
#[derive(Debug, Clone, Default)]
pub struct HotReplaySet {
    keys: Arc<DashSet<String>>,
}

impl HotReplaySet {
    /// Empty set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a key; true only for the first caller
    #[inline]
    pub fn claim(&self, key: &str) -> bool {
        self.keys.insert(key.to_owned())
    }

    /// Whether the key was claimed
    #[inline]
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    /// Number of claimed keys
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// `true` if nothing was claimed
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// One accepted token use
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayRecord {
    /// Accepted token id
    pub override_id: String,
    /// Consumed nonce
    pub nonce: String,
    /// Hash of the accepted token
    pub token_hash: String,
    /// Acceptance time
    pub accepted_at: DateTime<Utc>,
}

/// Minimal view used when loading; extra or missing fields are tolerated
#[derive(Deserialize)]
struct KeyView {
    override_id: String,
    nonce: String,
}

/// Durable replay ledger backed by a JSONL file
#[derive(Debug)]
pub struct ReplayLedger {
    path: PathBuf,
    hot: HotReplaySet,
    durable: Mutex<Option<HashSet<String>>>,
}

impl ReplayLedger {
    /// Create a ledger over `path` sharing `hot` with other ledgers
    pub fn new(path: impl Into<PathBuf>, hot: HotReplaySet) -> Self {
        Self {
            path: path.into(),
            hot,
            durable: Mutex::new(None),
        }
    }

    /// Backing JSONL file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Shared in-process set
    #[must_use]
    pub fn hot_set(&self) -> &HotReplaySet {
        &self.hot
    }

    /// Whether the pair was already claimed or recorded
    ///
    /// # Errors
    /// Returns [`LedgerError::Io`] if the durable file cannot be read.
    pub fn has_seen(&self, override_id: &str, nonce: &str) -> Result<bool> {
        let key = replay_key(override_id, nonce);
        if self.hot.contains(&key) {
            return Ok(true);
        }
        let mut durable = self.durable.lock();
        Ok(self.durable_keys(&mut durable)?.contains(&key))
    }

    /// Record a first use of the pair
    ///
    /// Returns `Ok(true)` if this call recorded the pair and `Ok(false)` if it
    /// was already claimed in this process or recorded on disk. A failed
    /// durable write leaves the key claimed in the hot set.
    ///
    /// # Errors
    /// Returns [`LedgerError`] if the durable file cannot be read or appended.
    pub fn mark_seen(
        &self,
        override_id: &str,
        nonce: &str,
        token_hash: &str,
        accepted_at: DateTime<Utc>,
    ) -> Result<bool> {
        if override_id.is_empty() {
            return Err(LedgerError::EmptyField { field: "override_id" });
        }
        if nonce.is_empty() {
            return Err(LedgerError::EmptyField { field: "nonce" });
        }

        let key = replay_key(override_id, nonce);
        if !self.hot.claim(&key) {
            tracing::debug!(override_id, "replay key already claimed in process");
            return Ok(false);
        }

        let mut durable = self.durable.lock();
        let keys = self.durable_keys(&mut durable)?;
        if keys.contains(&key) {
            tracing::debug!(override_id, "replay key already recorded on disk");
            return Ok(false);
        }

        let record = ReplayRecord {
            override_id: override_id.to_owned(),
            nonce: nonce.to_owned(),
            token_hash: token_hash.to_owned(),
            accepted_at,
        };
        append_record(&self.path, &record)?;
        keys.insert(key);
        Ok(true)
    }

    /// All well-formed records on disk
    ///
    /// # Errors
    /// Returns [`LedgerError::Io`] if the file exists but cannot be read.
    pub fn records(&self) -> Result<Vec<ReplayRecord>> {
        read_records(&self.path)
    }

    fn durable_keys<'a>(&self, slot: &'a mut Option<HashSet<String>>) -> Result<&'a mut HashSet<String>> {
        if slot.is_none() {
            let keys: HashSet<String> = read_records::<KeyView>(&self.path)?
                .into_iter()
                .filter(|r| !r.override_id.is_empty() && !r.nonce.is_empty())
                .map(|r| replay_key(&r.override_id, &r.nonce))
                .collect();
            tracing::debug!(path = %self.path.display(), entries = keys.len(), "loaded replay ledger");
            *slot = Some(keys);
        }
        Ok(slot.get_or_insert_with(HashSet::new))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn ledger(dir: &TempDir, hot: &HotReplaySet) -> ReplayLedger {
        ReplayLedger::new(dir.path().join("governance/override_replay.jsonl"), hot.clone())
    }

    #[test]
    fn first_mark_wins_and_later_marks_lose() {
        let dir = TempDir::new().unwrap();
        let hot = HotReplaySet::new();
        let ledger = ledger(&dir, &hot);

        assert!(!ledger.has_seen("ovr-1", "n-1").unwrap());
        assert!(ledger.mark_seen("ovr-1", "n-1", "h", Utc::now()).unwrap());
        assert!(!ledger.mark_seen("ovr-1", "n-1", "h", Utc::now()).unwrap());
        assert!(ledger.has_seen("ovr-1", "n-1").unwrap());

        assert!(ledger.mark_seen("ovr-1", "n-2", "h", Utc::now()).unwrap());
        assert_eq!(ledger.records().unwrap().len(), 2);
    }

    #[test]
    fn second_ledger_sharing_the_hot_set_is_refused() {
        let dir = TempDir::new().unwrap();
        let hot = HotReplaySet::new();

        assert!(ledger(&dir, &hot).mark_seen("ovr-1", "n-1", "h", Utc::now()).unwrap());
        let other = ledger(&dir, &hot);
        assert!(other.has_seen("ovr-1", "n-1").unwrap());
        assert!(!other.mark_seen("ovr-1", "n-1", "h", Utc::now()).unwrap());
    }

    #[test]
    fn durable_records_survive_a_fresh_hot_set() {
        let dir = TempDir::new().unwrap();
        assert!(ledger(&dir, &HotReplaySet::new())
            .mark_seen("ovr-1", "n-1", "h", Utc::now())
            .unwrap());

        let restarted = ledger(&dir, &HotReplaySet::new());
        assert!(restarted.has_seen("ovr-1", "n-1").unwrap());
        assert!(!restarted.mark_seen("ovr-1", "n-1", "h", Utc::now()).unwrap());
    }

    #[test]
    fn loading_skips_partial_and_malformed_lines() {
        let dir = TempDir::new().unwrap();
        let hot = HotReplaySet::new();
        let ledger = ledger(&dir, &hot);
        fs::create_dir_all(ledger.path().parent().unwrap()).unwrap();
        fs::write(
            ledger.path(),
            "garbage\n{\"override_id\":\"ovr-1\",\"nonce\":\"n-1\"}\n{\"override_id\":\"\",\"nonce\":\"n-2\"}\n",
        )
        .unwrap();

        assert!(ledger.has_seen("ovr-1", "n-1").unwrap());
        assert!(!ledger.has_seen("", "n-2").unwrap());
    }

    #[test]
    fn torn_tail_does_not_swallow_the_next_acceptance() {
        let dir = TempDir::new().unwrap();
        let first = ledger(&dir, &HotReplaySet::new());
        fs::create_dir_all(first.path().parent().unwrap()).unwrap();
        fs::write(first.path(), "{\"override_id\":\"ovr-0\",\"no").unwrap();

        assert!(first.mark_seen("ovr-1", "n-1", "h", Utc::now()).unwrap());

        let restarted = ledger(&dir, &HotReplaySet::new());
        assert!(restarted.has_seen("ovr-1", "n-1").unwrap());
        assert!(!restarted.mark_seen("ovr-1", "n-1", "h", Utc::now()).unwrap());
    }

    #[test]
    fn non_utf8_lines_do_not_block_the_ledger() {
        let dir = TempDir::new().unwrap();
        let hot = HotReplaySet::new();
        let ledger = ledger(&dir, &hot);
        fs::create_dir_all(ledger.path().parent().unwrap()).unwrap();
        let mut bytes = b"{\"override_id\":\"ovr-1\",\"nonce\":\"n-1\"}\n".to_vec();
        bytes.extend_from_slice(b"\xff\xfe garbage\n");
        fs::write(ledger.path(), bytes).unwrap();

        assert!(ledger.has_seen("ovr-1", "n-1").unwrap());
        assert!(ledger.mark_seen("ovr-2", "n-2", "h", Utc::now()).unwrap());
        assert_eq!(ledger.records().unwrap().len(), 1);
    }

    #[test]
    fn empty_identifiers_are_rejected() {
        let dir = TempDir::new().unwrap();
        let ledger = ledger(&dir, &HotReplaySet::new());
        assert!(matches!(
            ledger.mark_seen("", "n", "h", Utc::now()),
            Err(LedgerError::EmptyField { field: "override_id" })
        ));
        assert!(ledger.hot_set().is_empty());
    }
}
