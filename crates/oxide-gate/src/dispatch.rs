//! Privileged request dispatcher
//!
//! Caller-side wrapper around [`PrivilegedGate`]. Cheap pre-checks run
//! first: an optional allow-list of privileged action names and a replay
//! lookup for NO-GO requests. Pre-check denials are audited here; anything
//! the gate returns was already audited by the gate and passes through.

use crate::audit::AuditSink;
use crate::error::{DenialKind, DenialOrigin, PrivilegeDenied};
use crate::privileged::{
    record_decision, Decision, FinalGateStatus, PrivilegeGranted, PrivilegeRequest, PrivilegedGate,
    REPLAYED_REASON,
};
use oxide_ledger::ReplayLedger;
use serde::Serialize;
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

/// Wire envelope returned to untrusted callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum DispatchResponse {
    /// Privilege granted
    Granted {
        /// Always `true`
        ok: bool,
        /// Grant details
        result: PrivilegeGranted,
    },
    /// Privilege refused
    Denied {
        /// Always `false`
        ok: bool,
        /// Sanitized denial
        error: PublicDenial,
    },
}

/// Denial as shown to the requester
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublicDenial {
    /// Stable denial code
    pub code: &'static str,
    /// Failure class
    pub kind: DenialKind,
    /// Which stage refused
    pub origin: DenialOrigin,
    /// Requested action
    pub action: String,
    /// Reason safe to show the requester
    pub message: String,
}

impl From<&PrivilegeDenied> for PublicDenial {
    fn from(denied: &PrivilegeDenied) -> Self {
        Self {
            code: denied.code(),
            kind: denied.kind,
            origin: denied.origin,
            action: denied.action.clone(),
            message: denied.public_reason().to_owned(),
        }
    }
}

impl From<&Decision> for DispatchResponse {
    fn from(decision: &Decision) -> Self {
        match decision {
            Ok(granted) => Self::Granted {
                ok: true,
                result: granted.clone(),
            },
            Err(denied) => Self::Denied {
                ok: false,
                error: denied.into(),
            },
        }
    }
}

/// Pre-checks plus the gate
pub struct Dispatcher {
    gate: Arc<PrivilegedGate>,
    audit: Arc<dyn AuditSink>,
    allowed_actions: Option<HashSet<String>>,
    replay: Option<Arc<ReplayLedger>>,
}

impl Dispatcher {
    /// Dispatcher that shares the gate's audit sink and replay ledger
    #[must_use]
    pub fn new(gate: Arc<PrivilegedGate>) -> Self {
        Self {
            audit: gate.audit_sink(),
            replay: gate.replay_ledger(),
            gate,
            allowed_actions: None,
        }
    }

    /// Only these action names may be dispatched at all
    #[must_use]
    pub fn with_allowed_actions<I, S>(mut self, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_actions = Some(actions.into_iter().map(Into::into).collect());
        self
    }

    /// Use a different ledger for the replay pre-check
    #[must_use]
    pub fn with_replay_ledger(mut self, ledger: Option<Arc<ReplayLedger>>) -> Self {
        self.replay = ledger;
        self
    }

    /// Run pre-checks, then the gate
    ///
    /// # Errors
    /// Returns [`PrivilegeDenied`]; its `origin` tells pre-check denials apart
    /// from gate denials.
    pub async fn dispatch(&self, request: &PrivilegeRequest) -> Decision {
        if let Err(denied) = self.pre_check(request).await {
            let denied = denied.with_origin(DenialOrigin::PreCheck);
            return record_decision(&self.audit, request, Err(denied)).await;
        }
        self.gate.require_privilege(request).await
    }

    /// Dispatch and run `handler` only when granted
    ///
    /// # Errors
    /// Returns the denial without calling `handler`.
    pub async fn run<F, Fut, T>(&self, request: &PrivilegeRequest, handler: F) -> Result<T, PrivilegeDenied>
    where
        F: FnOnce(PrivilegeGranted) -> Fut,
        Fut: Future<Output = T>,
    {
        let granted = self.dispatch(request).await?;
        Ok(handler(granted).await)
    }

    /// Dispatch and wrap the outcome for an untrusted caller
    pub async fn handle(&self, request: &PrivilegeRequest) -> DispatchResponse {
        tracing::debug!(request = %request.redacted(), "privileged request received");
        DispatchResponse::from(&self.dispatch(request).await)
    }

    async fn pre_check(&self, request: &PrivilegeRequest) -> Result<(), PrivilegeDenied> {
        let action = request.action.as_str();
        let presented_id = request.presented_override_id().map(str::to_owned);

        if let Some(allowed) = &self.allowed_actions {
            if !allowed.contains(action) {
                return Err(PrivilegeDenied::new(
                    action,
                    format!("action is not a registered privileged action: {action}"),
                    DenialKind::Policy,
                )
                .with_override_id(presented_id));
            }
        }

        if request.final_gate_status != FinalGateStatus::NoGo {
            return Ok(());
        }
        let (Some(ledger), Some(id), Some(nonce)) =
            (&self.replay, request.presented_override_id(), request.presented_nonce())
        else {
            return Ok(());
        };

        // The first lookup loads the ledger file.
        let (ledger, id, nonce) = (Arc::clone(ledger), id.to_owned(), nonce.to_owned());
        let seen = tokio::task::spawn_blocking(move || ledger.has_seen(&id, &nonce))
            .await
            .map_err(|e| e.to_string())
            .and_then(|result| result.map_err(|e| e.to_string()));

        match seen {
            Ok(false) => Ok(()),
            Ok(true) => Err(PrivilegeDenied::new(action, REPLAYED_REASON, DenialKind::Trust).with_override_id(presented_id)),
            Err(e) => {
                tracing::error!(error = %e, "replay pre-check failed");
                Err(PrivilegeDenied::new(
                    action,
                    format!("replay ledger unavailable: {e}"),
                    DenialKind::Infrastructure,
                )
                .with_override_id(presented_id))
            }
        }
    }
}
