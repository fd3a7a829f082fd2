//! Audit Sinks
//!
//! Every privileged decision is written as exactly one [`AuditEvent`].
//! [`JsonlAuditSink`] chains events with SHA-256 so edits or deletions in
//! the log are detectable with [`verify_chain`].

use crate::error::AuditError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use once_cell::sync::Lazy;
use oxide_ledger::jsonl::{append_record, read_lines};
use oxide_token::canonical::to_canonical_json;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

/// Message of a granted decision
pub const PRIVILEGE_GRANTED: &str = "PRIVILEGE_GRANTED";
/// Message of a denied decision
pub const PRIVILEGE_DENIED: &str = "PRIVILEGE_DENIED";

/// One writer per log path in this process, so every sink on a path
/// extends the same chain head. Keyed by [`registry_key`].
static WRITERS: Lazy<DashMap<PathBuf, Arc<ChainWriter>>> = Lazy::new(DashMap::new);

/// Hash that precedes the first event of a chain
const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// Category of an audit event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditEventType {
    /// A privilege was granted
    Approval,
    /// A policy refused a privilege
    Policy,
}

/// Severity of an audit event
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditLevel {
    /// Routine
    Low,
    /// Worth review
    Medium,
    /// Needs attention
    High,
    /// Needs immediate attention
    Critical,
}

/// One recorded decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Random event id
    pub event_id: Uuid,
    /// When the event was built
    pub recorded_at: DateTime<Utc>,
    /// Run the decision belongs to
    pub workflow_run_id: String,
    /// Event category
    pub event_type: AuditEventType,
    /// Event severity
    pub event_level: AuditLevel,
    /// `PRIVILEGE_GRANTED` or `PRIVILEGE_DENIED` for gate decisions
    pub message: String,
    /// Decision details
    pub payload: Value,
}

impl AuditEvent {
    /// `approval`/`low` event for a granted privilege
    pub fn granted(workflow_run_id: impl Into<String>, payload: Value) -> Self {
        Self::new(workflow_run_id, AuditEventType::Approval, AuditLevel::Low, PRIVILEGE_GRANTED, payload)
    }

    /// `policy`/`high` event for a denied privilege
    pub fn denied(workflow_run_id: impl Into<String>, payload: Value) -> Self {
        Self::new(workflow_run_id, AuditEventType::Policy, AuditLevel::High, PRIVILEGE_DENIED, payload)
    }

    /// Event with a fresh id, stamped now
    pub fn new(
        workflow_run_id: impl Into<String>,
        event_type: AuditEventType,
        event_level: AuditLevel,
        message: impl Into<String>,
        payload: Value,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            recorded_at: Utc::now(),
            workflow_run_id: workflow_run_id.into(),
            event_type,
            event_level,
            message: message.into(),
            payload,
        }
    }

    /// Whether this records a grant
    #[must_use]
    pub fn is_grant(&self) -> bool {
        self.message == PRIVILEGE_GRANTED
    }
}

/// Destination for audit events
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Durably record one event
    async fn append_event(&self, event: AuditEvent) -> Result<(), AuditError>;
}

/// In-memory sink, mainly for tests
#[derive(Debug, Default, Clone)]
pub struct MemoryAuditSink {
    events: Arc<Mutex<Vec<AuditEvent>>>,
}

impl MemoryAuditSink {
    /// Empty sink
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of recorded events
    #[must_use]
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().clone()
    }

    /// Number of recorded events
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// `true` if nothing was recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn append_event(&self, event: AuditEvent) -> Result<(), AuditError> {
        self.events.lock().push(event);
        Ok(())
    }
}

/// Stored form of an event in a hash-chained log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainedAuditEvent {
    /// The recorded event
    #[serde(flatten)]
    pub event: AuditEvent,
    /// Hash of the previous line, or the genesis hash
    pub prev_hash: String,
    /// SHA-256 over `prev_hash` and the event
    pub hash: String,
}

/// Append-only JSONL audit log with a SHA-256 hash chain
///
/// Sinks created with the same path share a writer.
#[derive(Debug, Clone)]
pub struct JsonlAuditSink {
    inner: Arc<ChainWriter>,
}

#[derive(Debug)]
struct ChainWriter {
    path: PathBuf,
    // Hash of the last written event; `None` until the file tail is read.
    head: Mutex<Option<String>>,
}

impl JsonlAuditSink {
    /// Sink appending to `path`, sharing the writer of any other sink on it
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let writer = WRITERS.entry(registry_key(&path)).or_insert_with(|| {
            Arc::new(ChainWriter {
                path,
                head: Mutex::new(None),
            })
        });
        Self {
            inner: Arc::clone(&writer),
        }
    }

    /// Log file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.inner.path
    }
}

#[async_trait]
impl AuditSink for JsonlAuditSink {
    async fn append_event(&self, event: AuditEvent) -> Result<(), AuditError> {
        let writer = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || writer.append(event))
            .await
            .map_err(|e| AuditError::Task(e.to_string()))?
    }
}

/// Absolute, lexically normalized spelling of `path`
fn registry_key(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
    };
    let mut key = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                key.pop();
            }
            other => key.push(other.as_os_str()),
        }
    }
    key
}

impl ChainWriter {
    fn append(&self, event: AuditEvent) -> Result<(), AuditError> {
        let mut head = self.head.lock();
        let prev_hash = match head.as_ref() {
            Some(hash) => hash.clone(),
            None => last_hash(&self.path)?,
        };
        let hash = chain_hash(&prev_hash, &event);
        let record = ChainedAuditEvent { event, prev_hash, hash };
        append_record(&self.path, &record)?;
        *head = Some(record.hash);
        Ok(())
    }
}

fn chain_hash(prev_hash: &str, event: &AuditEvent) -> String {
    let body = serde_json::to_value(event).map_or_else(|_| String::new(), |v| to_canonical_json(&v));
    let mut hasher = Sha256::new();
    hasher.update(prev_hash.as_bytes());
    hasher.update([0]);
    hasher.update(body.as_bytes());
    hex::encode(hasher.finalize())
}

fn last_hash(path: &Path) -> Result<String, AuditError> {
    // The newest line that parses is the head; a torn or corrupt tail is
    // left for verify_chain to report.
    for (line_no, line) in read_lines(path)?.into_iter().rev() {
        match line.as_deref().map(|l| serde_json::from_str::<ChainedAuditEvent>(l)) {
            Some(Ok(record)) => return Ok(record.hash),
            _ => tracing::warn!(path = %path.display(), line = line_no, "skipping unreadable audit line"),
        }
    }
    Ok(GENESIS_HASH.to_owned())
}

/// Check every link of a hash-chained audit log
///
/// Returns the number of events verified. A missing file is an empty chain.
///
/// # Errors
/// Returns [`AuditError::ChainBroken`] at the first malformed line, hash
/// mismatch, or broken link.
pub fn verify_chain(path: &Path) -> Result<usize, AuditError> {
    let mut prev = GENESIS_HASH.to_owned();
    let mut count = 0;

    for (line_no, line) in read_lines(path)? {
        let broken = |reason: String| AuditError::ChainBroken { line: line_no, reason };
        let line = line.ok_or_else(|| broken("line is not valid UTF-8".into()))?;
        let record: ChainedAuditEvent = serde_json::from_str(&line).map_err(|e| broken(e.to_string()))?;
        if record.prev_hash != prev {
            return Err(broken("prev_hash does not match preceding event".into()));
        }
        if chain_hash(&record.prev_hash, &record.event) != record.hash {
            return Err(broken("event hash mismatch".into()));
        }
        prev = record.hash;
        count += 1;
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn payload(reason: &str) -> Value {
        json!({ "action": "reindex", "reason": reason, "overrideId": null, "origin": "gate" })
    }

    #[tokio::test]
    async fn memory_sink_collects_events() {
        let sink = MemoryAuditSink::new();
        sink.append_event(AuditEvent::granted("run-1", payload("Final gate is GO."))).await.unwrap();
        sink.append_event(AuditEvent::denied("run-1", payload("nope"))).await.unwrap();

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert!(events[0].is_grant());
        assert_eq!(events[0].event_type, AuditEventType::Approval);
        assert_eq!(events[1].event_level, AuditLevel::High);
        assert_eq!(events[1].message, PRIVILEGE_DENIED);
    }

    #[tokio::test]
    async fn jsonl_sink_writes_a_verifiable_chain() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("governance/privileged_audit.jsonl");
        let sink = JsonlAuditSink::new(&path);

        for i in 0..3 {
            sink.append_event(AuditEvent::denied("run", payload(&format!("reason {i}")))).await.unwrap();
        }
        assert_eq!(verify_chain(&path).unwrap(), 3);

        let reopened = JsonlAuditSink::new(&path);
        reopened.append_event(AuditEvent::granted("run", payload("ok"))).await.unwrap();
        assert_eq!(verify_chain(&path).unwrap(), 4);
    }

    #[tokio::test]
    async fn edited_events_break_the_chain() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("audit.jsonl");
        let sink = JsonlAuditSink::new(&path);
        sink.append_event(AuditEvent::denied("run", payload("first"))).await.unwrap();
        sink.append_event(AuditEvent::denied("run", payload("second"))).await.unwrap();

        let tampered = fs::read_to_string(&path).unwrap().replacen("first", "fine", 1);
        fs::write(&path, tampered).unwrap();

        let err = verify_chain(&path).unwrap_err();
        assert!(err.is_integrity_failure());
        assert!(matches!(err, AuditError::ChainBroken { line: 1, .. }));
    }

    #[tokio::test]
    async fn deleted_events_break_the_chain() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("audit.jsonl");
        let sink = JsonlAuditSink::new(&path);
        for reason in ["a", "b", "c"] {
            sink.append_event(AuditEvent::denied("run", payload(reason))).await.unwrap();
        }

        let content = fs::read_to_string(&path).unwrap();
        let kept: Vec<&str> = content.lines().enumerate().filter(|(i, _)| *i != 1).map(|(_, l)| l).collect();
        fs::write(&path, kept.join("\n")).unwrap();

        assert!(matches!(verify_chain(&path), Err(AuditError::ChainBroken { line: 2, .. })));
    }

    #[tokio::test]
    async fn corrupt_tail_is_reported_but_does_not_block_appends() {
        let dir = TempDir::new().unwrap();
        let written = dir.path().join("written.jsonl");
        let sink = JsonlAuditSink::new(&written);
        for reason in ["a", "b"] {
            sink.append_event(AuditEvent::denied("run", payload(reason))).await.unwrap();
        }

        // Same content under a path no writer has seen, plus a torn non-UTF-8 tail.
        let path = dir.path().join("recovered.jsonl");
        let mut bytes = fs::read(&written).unwrap();
        bytes.extend_from_slice(b"\xff{\"event_id");
        fs::write(&path, bytes).unwrap();

        JsonlAuditSink::new(&path)
            .append_event(AuditEvent::granted("run", payload("ok")))
            .await
            .unwrap();

        let err = verify_chain(&path).unwrap_err();
        assert!(matches!(err, AuditError::ChainBroken { line: 3, .. }));
    }

    #[tokio::test]
    async fn differently_spelled_paths_share_one_chain() {
        let dir = TempDir::new().unwrap();
        let plain = dir.path().join("gov/audit.jsonl");
        let dotted = dir.path().join("gov/./nested/../audit.jsonl");
        let first = JsonlAuditSink::new(&plain);
        let second = JsonlAuditSink::new(&dotted);
        assert!(Arc::ptr_eq(&first.inner, &second.inner));

        for i in 0..4 {
            let sink = if i % 2 == 0 { &first } else { &second };
            sink.append_event(AuditEvent::denied("run", payload(&format!("r{i}")))).await.unwrap();
        }
        assert_eq!(verify_chain(&plain).unwrap(), 4);
    }

    #[test]
    fn missing_log_is_an_empty_chain() {
        let dir = TempDir::new().unwrap();
        assert_eq!(verify_chain(&dir.path().join("none.jsonl")).unwrap(), 0);
    }
}
