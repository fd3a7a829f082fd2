//! Privileged Gate
//!
//! Decides whether a privileged action may run and records the decision.
//!
//! Decision order under NO-GO:
//! 1. an override token must be presented
//! 2. the token verifies (structure, revocation, time, key, hash, signature)
//! 3. the token is not revoked
//! 4. the token's scope permits the action and paths
//! 5. the token's nonce has not been consumed (when a replay ledger is attached)
//!
//! Every decision produces exactly one audit event. The decision and its
//! audit write run together on a spawned task, so dropping the gate future
//! cannot separate a consumed nonce from its event. Ledger and revocation
//! file reads run on the blocking pool. A grant whose audit write fails is
//! returned as a denial.

use crate::audit::{AuditEvent, AuditSink};
use crate::error::{AuditError, DenialKind, PrivilegeDenied};
use crate::scope::assert_permits;
use chrono::{DateTime, Utc};
use oxide_ledger::ReplayLedger;
use oxide_token::{KeyResolver, RevocationCheck, TokenVerifier, VerifyOptions};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Grant reason when the release gate is GO
pub const GO_REASON: &str = "Final gate is GO.";
/// Denial reason for a NO-GO request without a token
pub const TOKEN_REQUIRED_REASON: &str = "NO-GO requires valid override token for privileged action.";
/// Denial reason for a revoked token
pub const REVOKED_REASON: &str = "override token has been revoked";
/// Denial reason for a consumed nonce
pub const REPLAYED_REASON: &str = "override token nonce has already been consumed";
/// Grant reason for a verified override
pub const OVERRIDE_GRANTED_REASON: &str = "Override token validated and permits action.";

/// Release readiness signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FinalGateStatus {
    /// Release may proceed
    #[serde(rename = "GO")]
    Go,
    /// Release is blocked
    #[serde(rename = "NO-GO")]
    NoGo,
}

impl FinalGateStatus {
    /// Wire representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Go => "GO",
            Self::NoGo => "NO-GO",
        }
    }
}

impl fmt::Display for FinalGateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FinalGateStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GO" => Ok(Self::Go),
            "NO-GO" | "NOGO" | "NO_GO" => Ok(Self::NoGo),
            other => Err(format!("unknown final gate status: {other}")),
        }
    }
}

/// A privileged action a caller wants to perform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivilegeRequest {
    /// Privileged action name
    pub action: String,
    /// Paths the action touches, relative to `workspace_root`
    #[serde(default)]
    pub affected_paths: Vec<String>,
    /// Release gate status at request time
    pub final_gate_status: FinalGateStatus,
    /// Workspace the action runs in
    pub workspace_root: String,
    /// Run id recorded with the audit event
    pub workflow_run_id: String,
    /// Untrusted token candidate, verified by the gate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_token: Option<Value>,
}

impl PrivilegeRequest {
    /// Request with a fresh workflow run id and no paths or token
    pub fn new(action: impl Into<String>, final_gate_status: FinalGateStatus, workspace_root: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            affected_paths: Vec::new(),
            final_gate_status,
            workspace_root: workspace_root.into(),
            workflow_run_id: Uuid::new_v4().to_string(),
            override_token: None,
        }
    }

    /// Set the affected paths
    #[must_use]
    pub fn with_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.affected_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    /// Attach a token candidate
    #[must_use]
    pub fn with_token(mut self, token: Value) -> Self {
        self.override_token = Some(token);
        self
    }

    /// Set the run id
    #[must_use]
    pub fn with_workflow_run_id(mut self, id: impl Into<String>) -> Self {
        self.workflow_run_id = id.into();
        self
    }

    /// `override_id` of the presented token, if it has one
    #[must_use]
    pub fn presented_override_id(&self) -> Option<&str> {
        self.override_token.as_ref()?.get("override_id")?.as_str()
    }

    /// `integrity.nonce` of the presented token, if it has one
    #[must_use]
    pub fn presented_nonce(&self) -> Option<&str> {
        self.override_token.as_ref()?.get("integrity")?.get("nonce")?.as_str()
    }

    /// Telemetry-safe view: the token is reduced to its id
    #[must_use]
    pub fn redacted(&self) -> Value {
        let mut view = json!({
            "action": self.action,
            "affectedPaths": self.affected_paths,
            "finalGateStatus": self.final_gate_status,
            "workspaceRoot": self.workspace_root,
            "workflowRunId": self.workflow_run_id,
        });
        if self.override_token.is_some() {
            view["overrideToken"] = json!({ "override_id": self.presented_override_id() });
        }
        view
    }
}

/// A granted privileged action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivilegeGranted {
    /// Why the action was allowed
    pub reason: String,
    /// Authorizing token, if any
    pub override_id: Option<String>,
}

impl PrivilegeGranted {
    /// Grant with a reason
    pub fn new(reason: impl Into<String>, override_id: Option<String>) -> Self {
        Self {
            reason: reason.into(),
            override_id,
        }
    }

    /// Whether an override token (rather than a GO gate) authorized the action
    #[must_use]
    pub fn via_override(&self) -> bool {
        self.override_id.is_some()
    }
}

impl Serialize for PrivilegeGranted {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("PrivilegeGranted", 3)?;
        state.serialize_field("granted", &true)?;
        state.serialize_field("reason", &self.reason)?;
        state.serialize_field("overrideId", &self.override_id)?;
        state.end()
    }
}

/// Outcome of a privileged decision
pub type Decision = Result<PrivilegeGranted, PrivilegeDenied>;

/// Orchestrates verification, revocation, scope, and replay checks
///
/// Cloning shares the key resolver, stores, and audit sink.
#[derive(Clone)]
pub struct PrivilegedGate {
    verifier: TokenVerifier,
    keys: Arc<dyn KeyResolver>,
    revocations: Option<Arc<dyn RevocationCheck>>,
    replay: Option<Arc<ReplayLedger>>,
    audit: Arc<dyn AuditSink>,
}

impl fmt::Debug for PrivilegedGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivilegedGate")
            .field("verifier", &self.verifier)
            .field("revocations", &self.revocations.is_some())
            .field("replay", &self.replay.as_ref().map(|l| l.path().to_path_buf()))
            .finish_non_exhaustive()
    }
}

impl PrivilegedGate {
    /// Start building a gate around a key resolver and an audit sink
    pub fn builder(keys: impl KeyResolver + 'static, audit: impl AuditSink + 'static) -> PrivilegedGateBuilder {
        PrivilegedGateBuilder {
            options: VerifyOptions::default(),
            keys: Arc::new(keys),
            revocations: None,
            replay: None,
            audit: Arc::new(audit),
        }
    }

    /// Sink every decision is recorded in
    #[must_use]
    pub fn audit_sink(&self) -> Arc<dyn AuditSink> {
        Arc::clone(&self.audit)
    }

    /// Attached replay ledger, if any
    #[must_use]
    pub fn replay_ledger(&self) -> Option<Arc<ReplayLedger>> {
        self.replay.clone()
    }

    /// Decide and audit a request at the current time
    ///
    /// # Errors
    /// Returns [`PrivilegeDenied`] for every refusal, including audit failure
    /// on an otherwise granted request.
    pub async fn require_privilege(&self, request: &PrivilegeRequest) -> Decision {
        self.require_privilege_at(request, Utc::now()).await
    }

    /// Decide and audit a request at `now`
    ///
    /// # Errors
    /// Returns [`PrivilegeDenied`] for every refusal, including audit failure
    /// on an otherwise granted request.
    pub async fn require_privilege_at(&self, request: &PrivilegeRequest, now: DateTime<Utc>) -> Decision {
        let gate = self.clone();
        let owned = request.clone();
        let task = tokio::spawn(async move {
            let decide_gate = gate.clone();
            let decide_request = owned.clone();
            let decision = tokio::task::spawn_blocking(move || decide_gate.decide(&decide_request, now))
                .await
                .unwrap_or_else(|e| Err(task_failed(&owned, &e)));
            record_decision(&gate.audit, &owned, decision).await
        });
        task.await.unwrap_or_else(|e| Err(task_failed(request, &e)))
    }

    fn decide(&self, request: &PrivilegeRequest, now: DateTime<Utc>) -> Decision {
        let action = request.action.as_str();

        if request.final_gate_status == FinalGateStatus::Go {
            return Ok(PrivilegeGranted::new(GO_REASON, None));
        }

        let Some(candidate) = &request.override_token else {
            return Err(PrivilegeDenied::new(action, TOKEN_REQUIRED_REASON, DenialKind::TokenRequired));
        };

        let verified = self
            .verifier
            .verify_value(candidate, self.keys.as_ref(), self.revocations.as_deref(), now)
            .map_err(|e| {
                PrivilegeDenied::from_verify(action, &e)
                    .with_override_id(request.presented_override_id().map(str::to_owned))
            })?;

        let override_id = verified.override_id().to_owned();
        let deny = |reason: String, kind: DenialKind| {
            PrivilegeDenied::new(action, reason, kind).with_override_id(Some(override_id.clone()))
        };

        if let Some(revocations) = &self.revocations {
            if revocations.is_revoked(&override_id) {
                return Err(deny(REVOKED_REASON.to_owned(), DenialKind::Trust));
            }
        }

        assert_permits(&verified.token, action, &request.affected_paths, &request.workspace_root)
            .map_err(|violation| deny(violation.to_string(), DenialKind::Scope))?;

        if let Some(ledger) = &self.replay {
            match ledger.mark_seen(&override_id, &verified.nonce, &verified.token_hash, now) {
                Ok(true) => {}
                Ok(false) => return Err(deny(REPLAYED_REASON.to_owned(), DenialKind::Trust)),
                Err(e) => {
                    tracing::error!(override_id = %override_id, error = %e, "replay ledger write failed");
                    return Err(deny(format!("replay ledger unavailable: {e}"), DenialKind::Infrastructure));
                }
            }
        }

        Ok(PrivilegeGranted::new(OVERRIDE_GRANTED_REASON, Some(override_id)))
    }
}

fn task_failed(request: &PrivilegeRequest, err: &tokio::task::JoinError) -> PrivilegeDenied {
    tracing::error!(action = %request.action, error = %err, "privileged decision task failed");
    PrivilegeDenied::new(
        request.action.as_str(),
        format!("privileged decision task failed: {err}"),
        DenialKind::Infrastructure,
    )
    .with_override_id(request.presented_override_id().map(str::to_owned))
}

/// Builder for [`PrivilegedGate`]
pub struct PrivilegedGateBuilder {
    options: VerifyOptions,
    keys: Arc<dyn KeyResolver>,
    revocations: Option<Arc<dyn RevocationCheck>>,
    replay: Option<Arc<ReplayLedger>>,
    audit: Arc<dyn AuditSink>,
}

impl PrivilegedGateBuilder {
    /// Clock skew and token hash settings
    #[must_use]
    pub fn verify_options(mut self, options: VerifyOptions) -> Self {
        self.options = options;
        self
    }

    /// Revocation source consulted before signature work
    #[must_use]
    pub fn revocations(mut self, revocations: impl RevocationCheck + 'static) -> Self {
        self.revocations = Some(Arc::new(revocations));
        self
    }

    /// Ledger that makes each nonce single-use
    #[must_use]
    pub fn replay_ledger(mut self, ledger: Arc<ReplayLedger>) -> Self {
        self.replay = Some(ledger);
        self
    }

    /// Finish the gate
    #[must_use]
    pub fn build(self) -> PrivilegedGate {
        PrivilegedGate {
            verifier: TokenVerifier::new(self.options),
            keys: self.keys,
            revocations: self.revocations,
            replay: self.replay,
            audit: self.audit,
        }
    }
}

/// Audit payload for a decision
fn decision_payload(request: &PrivilegeRequest, decision: &Decision) -> Value {
    match decision {
        Ok(granted) => json!({
            "action": request.action,
            "reason": granted.reason,
            "overrideId": granted.override_id,
            "origin": "gate",
        }),
        Err(denied) => json!({
            "action": denied.action,
            "reason": denied.reason,
            "overrideId": denied.override_id,
            "origin": denied.origin.as_str(),
        }),
    }
}

/// Write the single audit event for `decision` on a detached task
///
/// A grant whose write fails becomes an infrastructure denial; a denial stays
/// the same denial.
pub(crate) async fn record_decision(sink: &Arc<dyn AuditSink>, request: &PrivilegeRequest, decision: Decision) -> Decision {
    let payload = decision_payload(request, &decision);
    let event = match &decision {
        Ok(_) => AuditEvent::granted(&request.workflow_run_id, payload),
        Err(_) => AuditEvent::denied(&request.workflow_run_id, payload),
    };

    let sink = Arc::clone(sink);
    let written = match tokio::spawn(async move { sink.append_event(event).await }).await {
        Ok(result) => result,
        Err(e) => Err(AuditError::Task(e.to_string())),
    };

    match (decision, written) {
        (Ok(granted), Ok(())) => {
            tracing::info!(
                action = %request.action,
                override_id = granted.override_id.as_deref().unwrap_or("-"),
                reason = %granted.reason,
                "privilege granted"
            );
            Ok(granted)
        }
        (Ok(granted), Err(e)) => {
            tracing::error!(action = %request.action, error = %e, "audit write failed; revoking grant");
            Err(PrivilegeDenied::new(
                request.action.as_str(),
                format!("audit write failed: {e}"),
                DenialKind::Infrastructure,
            )
            .with_override_id(granted.override_id))
        }
        (Err(denied), Ok(())) => {
            tracing::warn!(
                action = %denied.action,
                kind = denied.kind.as_str(),
                origin = denied.origin.as_str(),
                reason = %denied.reason,
                "privilege denied"
            );
            Err(denied)
        }
        (Err(denied), Err(e)) => {
            tracing::error!(action = %denied.action, error = %e, "audit write failed for denial");
            Err(denied)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{AuditEventType, AuditLevel, MemoryAuditSink};
    use async_trait::async_trait;
    use oxide_ledger::HotReplaySet;
    use oxide_test_utils::{fixed_now, sealed_token_value_at, test_keyring, TEST_OVERRIDE_ID};
    use tempfile::TempDir;

    const ROOT: &str = "/work/tom";

    struct FailingSink;

    #[async_trait]
    impl AuditSink for FailingSink {
        async fn append_event(&self, _event: AuditEvent) -> Result<(), AuditError> {
            Err(AuditError::Task("disk full".into()))
        }
    }

    fn no_go_request() -> PrivilegeRequest {
        PrivilegeRequest::new("reindex", FinalGateStatus::NoGo, ROOT)
            .with_paths(["src/lib.rs"])
            .with_token(sealed_token_value_at(fixed_now()))
    }

    fn gate(sink: &MemoryAuditSink) -> PrivilegedGate {
        PrivilegedGate::builder(test_keyring(), sink.clone()).build()
    }

    #[tokio::test]
    async fn go_grants_without_a_token() {
        let sink = MemoryAuditSink::new();
        let request = PrivilegeRequest::new("deploy", FinalGateStatus::Go, ROOT);

        let granted = gate(&sink).require_privilege(&request).await.unwrap();
        assert_eq!(granted.reason, GO_REASON);
        assert!(!granted.via_override());

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, AuditEventType::Approval);
        assert_eq!(events[0].event_level, AuditLevel::Low);
        assert_eq!(events[0].payload["overrideId"], Value::Null);
    }

    #[tokio::test]
    async fn no_go_without_token_is_denied() {
        let sink = MemoryAuditSink::new();
        let request = PrivilegeRequest::new("reindex", FinalGateStatus::NoGo, ROOT);

        let denied = gate(&sink).require_privilege(&request).await.unwrap_err();
        assert_eq!(denied.reason, TOKEN_REQUIRED_REASON);
        assert_eq!(denied.kind, DenialKind::TokenRequired);
        assert_eq!(denied.code(), "PRIVILEGE_DENIED");

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, AuditEventType::Policy);
        assert_eq!(events[0].event_level, AuditLevel::High);
        assert_eq!(events[0].payload["reason"], TOKEN_REQUIRED_REASON);
        assert_eq!(events[0].payload["origin"], "gate");
    }

    #[tokio::test]
    async fn valid_token_grants_with_override_id() {
        let sink = MemoryAuditSink::new();
        let granted = gate(&sink)
            .require_privilege_at(&no_go_request(), fixed_now())
            .await
            .unwrap();

        assert_eq!(granted.reason, OVERRIDE_GRANTED_REASON);
        assert_eq!(granted.override_id.as_deref(), Some(TEST_OVERRIDE_ID));
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.events()[0].payload["overrideId"], TEST_OVERRIDE_ID);
    }

    #[tokio::test]
    async fn tampered_token_is_denied_with_generic_public_reason() {
        let sink = MemoryAuditSink::new();
        let mut request = no_go_request();
        request.override_token.as_mut().unwrap()["capabilities"]["allow"][0] = "deploy_prod".into();

        let denied = gate(&sink).require_privilege_at(&request, fixed_now()).await.unwrap_err();
        assert_eq!(denied.kind, DenialKind::Trust);
        assert_eq!(denied.reason, "token_hash mismatch");
        assert_eq!(denied.public_reason(), "override token could not be verified");
        assert_eq!(denied.override_id.as_deref(), Some(TEST_OVERRIDE_ID));
        assert_eq!(sink.events()[0].payload["reason"], "token_hash mismatch");
    }

    #[tokio::test]
    async fn expired_token_is_a_temporal_denial() {
        let sink = MemoryAuditSink::new();
        let later = fixed_now() + chrono::Duration::hours(3);

        let denied = gate(&sink).require_privilege_at(&no_go_request(), later).await.unwrap_err();
        assert_eq!(denied.kind, DenialKind::Temporal);
        assert_eq!(denied.reason, "Token is expired");
    }

    #[tokio::test]
    async fn revoked_token_is_denied() {
        let sink = MemoryAuditSink::new();
        let gate = PrivilegedGate::builder(test_keyring(), sink.clone())
            .revocations(|id: &str| id == TEST_OVERRIDE_ID)
            .build();

        let denied = gate.require_privilege_at(&no_go_request(), fixed_now()).await.unwrap_err();
        assert_eq!(denied.kind, DenialKind::Trust);
        assert!(denied.reason.to_lowercase().contains("revoked"));
        assert_eq!(sink.len(), 1);
    }

    #[tokio::test]
    async fn out_of_scope_path_is_denied() {
        let sink = MemoryAuditSink::new();
        let request = no_go_request().with_paths(["memory/../memory/secrets.db"]);

        let denied = gate(&sink).require_privilege_at(&request, fixed_now()).await.unwrap_err();
        assert_eq!(denied.kind, DenialKind::Scope);
        assert_eq!(denied.reason, "path matches disallowed_paths scope: memory/../memory/secrets.db");
        assert_eq!(denied.public_reason(), denied.reason);
    }

    #[tokio::test]
    async fn replayed_nonce_is_denied() {
        let dir = TempDir::new().unwrap();
        let sink = MemoryAuditSink::new();
        let ledger = Arc::new(ReplayLedger::new(dir.path().join("replay.jsonl"), HotReplaySet::new()));
        let gate = PrivilegedGate::builder(test_keyring(), sink.clone())
            .replay_ledger(ledger)
            .build();

        assert!(gate.require_privilege_at(&no_go_request(), fixed_now()).await.is_ok());
        let denied = gate.require_privilege_at(&no_go_request(), fixed_now()).await.unwrap_err();
        assert_eq!(denied.reason, REPLAYED_REASON);
        assert_eq!(sink.len(), 2);
    }

    #[tokio::test]
    async fn grant_becomes_denial_when_audit_fails() {
        let gate = PrivilegedGate::builder(test_keyring(), FailingSink).build();

        let denied = gate.require_privilege_at(&no_go_request(), fixed_now()).await.unwrap_err();
        assert_eq!(denied.kind, DenialKind::Infrastructure);
        assert!(denied.reason.contains("disk full"));
        assert_eq!(denied.override_id.as_deref(), Some(TEST_OVERRIDE_ID));
    }

    #[tokio::test]
    async fn huge_clock_skew_still_yields_one_audited_decision() {
        let sink = MemoryAuditSink::new();
        let gate = PrivilegedGate::builder(test_keyring(), sink.clone())
            .verify_options(VerifyOptions::default().with_clock_skew_secs(i64::MAX))
            .build();

        assert!(gate.require_privilege_at(&no_go_request(), fixed_now()).await.is_ok());
        let denied = gate
            .require_privilege_at(&no_go_request(), DateTime::<Utc>::MAX_UTC)
            .await
            .unwrap_err();
        assert_eq!(denied.kind, DenialKind::Temporal);
        assert_eq!(sink.len(), 2);
    }

    #[tokio::test]
    async fn store_reads_run_off_the_calling_thread() {
        let sink = MemoryAuditSink::new();
        let seen_on = Arc::new(parking_lot::Mutex::new(None));
        let recorder = Arc::clone(&seen_on);
        let gate = PrivilegedGate::builder(test_keyring(), sink.clone())
            .revocations(move |_: &str| {
                *recorder.lock() = Some(std::thread::current().id());
                false
            })
            .build();

        assert!(gate.require_privilege_at(&no_go_request(), fixed_now()).await.is_ok());
        let reader = seen_on.lock().expect("revocations consulted");
        assert_ne!(reader, std::thread::current().id());
    }

    #[tokio::test]
    async fn dropped_request_still_consumes_and_audits_once() {
        let dir = TempDir::new().unwrap();
        let sink = MemoryAuditSink::new();
        let ledger = Arc::new(ReplayLedger::new(dir.path().join("replay.jsonl"), HotReplaySet::new()));
        let gate = PrivilegedGate::builder(test_keyring(), sink.clone())
            .replay_ledger(Arc::clone(&ledger))
            .build();

        let request = no_go_request();
        tokio::select! {
            biased;
            _ = gate.require_privilege_at(&request, fixed_now()) => panic!("decision finished on first poll"),
            () = std::future::ready(()) => {}
        }

        for _ in 0..200 {
            if !sink.is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(sink.len(), 1);
        assert!(sink.events()[0].is_grant());
        assert!(ledger.has_seen(TEST_OVERRIDE_ID, request.presented_nonce().unwrap()).unwrap());
    }

    #[test]
    fn redacted_view_keeps_only_the_override_id() {
        let view = no_go_request().redacted();
        assert_eq!(view["overrideToken"], json!({ "override_id": TEST_OVERRIDE_ID }));
        assert_eq!(view["finalGateStatus"], "NO-GO");
        assert!(!view.to_string().contains("signature"));
    }

    #[test]
    fn grant_serializes_as_decision_api() {
        let granted = PrivilegeGranted::new(GO_REASON, None);
        assert_eq!(
            serde_json::to_value(&granted).unwrap(),
            json!({ "granted": true, "reason": GO_REASON, "overrideId": null })
        );
    }

    #[test]
    fn gate_status_parses_loosely() {
        assert_eq!("no-go".parse::<FinalGateStatus>(), Ok(FinalGateStatus::NoGo));
        assert_eq!("GO".parse::<FinalGateStatus>(), Ok(FinalGateStatus::Go));
        assert!("maybe".parse::<FinalGateStatus>().is_err());
    }
}
