//! Subcommand implementations

use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use oxide_gate::audit::verify_chain;
use oxide_gate::roles::stage_authorities;
use oxide_gate::{
    assert_role_can_execute_stage, evaluate_autonomy_gate, AutonomyOptions, DispatchResponse, FinalGateStatus,
    GateConfig, HitlOverrideToken, HotReplaySet, PrivilegeRequest, RoleAgent, WorkflowStage,
};
use oxide_token::validate::validate_structure;
use oxide_token::{OverrideToken, RevocationCheck, TokenSigner, TokenVerifier};
use serde_json::{json, Value};

/// Printable result of a command
///
/// `success` drives the process exit code; a denial is a well-formed
/// result, not an error.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    /// JSON document printed on stdout
    pub output: Value,
    /// Process exits with 0 when set
    pub success: bool,
}

impl Outcome {
    fn ok(output: Value) -> Self {
        Self { output, success: true }
    }

    fn failed(output: Value) -> Self {
        Self { output, success: false }
    }
}

/// Verify a token without consuming its nonce
#[must_use]
pub fn verify(config: &GateConfig, token: &Value, now: DateTime<Utc>) -> Outcome {
    let verifier = TokenVerifier::new(config.verify_options());
    let revocations = config.revocation_store();

    match verifier.verify_value(token, &config.keyring(), Some(&revocations as &dyn RevocationCheck), now) {
        Ok(verified) => Outcome::ok(json!({
            "valid": true,
            "overrideId": verified.override_id(),
            "nonce": verified.nonce,
            "tokenHash": verified.token_hash,
        })),
        Err(err) => {
            tracing::warn!(kind = err.kind().as_str(), "override token failed verification");
            Outcome::failed(json!({
                "valid": false,
                "kind": err.kind().as_str(),
                "reason": err.reason(),
            }))
        }
    }
}

/// Compute `token_hash` and `sig` under the configured key
///
/// # Errors
/// Fails if the token is malformed or no usable signing key is configured.
pub fn seal(config: &GateConfig, token: Value) -> anyhow::Result<Value> {
    let mut token: OverrideToken = serde_json::from_value(token).context("token does not match oxide.override.v1")?;
    validate_structure(&token)?;

    let key = config
        .signing_key()
        .with_context(|| format!("no signing key configured for key id '{}'", config.key_id))?;
    TokenSigner::new(config.key_id.clone(), key)?.seal(&mut token);
    Ok(serde_json::to_value(&token)?)
}

/// Record a revocation in the durable store
///
/// # Errors
/// Fails on an empty override id or a store write failure.
pub fn revoke(config: &GateConfig, override_id: &str, revoked_by: &str, reason: &str) -> anyhow::Result<Value> {
    let record = config.revocation_store().revoke(override_id, revoked_by, reason)?;
    Ok(serde_json::to_value(record)?)
}

/// Run a privilege request through the configured dispatcher
///
/// A grant consumes the token's nonce, so this is not a dry run.
///
/// # Errors
/// Fails only if the response cannot be serialized.
pub async fn check(config: &GateConfig, request: &PrivilegeRequest) -> anyhow::Result<Outcome> {
    let dispatcher = config.build_dispatcher(HotReplaySet::new());
    let response = dispatcher.handle(request).await;
    let success = matches!(response, DispatchResponse::Granted { .. });
    Ok(Outcome {
        output: serde_json::to_value(&response)?,
        success,
    })
}

/// Evaluate the autonomy gate for a release status and optional HITL token
///
/// # Errors
/// Fails if the HITL document is not a JSON object.
pub fn autonomy(status: FinalGateStatus, hitl: Option<Value>, now: DateTime<Utc>) -> anyhow::Result<Outcome> {
    let token: Option<HitlOverrideToken> = hitl
        .map(serde_json::from_value)
        .transpose()
        .context("HITL override token must be a JSON object")?;

    let decision = evaluate_autonomy_gate(status, AutonomyOptions::default().with_token(token.as_ref()).at(now));
    Ok(Outcome {
        success: decision.autonomy_granted,
        output: serde_json::to_value(&decision)?,
    })
}

/// Show role contracts, or check one role against one stage
///
/// # Errors
/// Fails if only one of `role` and `stage` is given.
pub fn roles(role: Option<RoleAgent>, stage: Option<WorkflowStage>) -> anyhow::Result<Outcome> {
    match (role, stage) {
        (Some(role), Some(stage)) => Ok(match assert_role_can_execute_stage(role, stage) {
            Ok(()) => Outcome::ok(json!({ "allowed": true, "role": role.as_str(), "stage": stage.as_str() })),
            Err(violation) => Outcome::failed(json!({
                "allowed": false,
                "code": violation.code(),
                "message": violation.to_string(),
            })),
        }),
        (Some(role), None) => Ok(Outcome::ok(serde_json::to_value(role.contract())?)),
        (None, None) => {
            let contracts: Vec<_> = RoleAgent::ALL.into_iter().map(RoleAgent::contract).collect();
            let authorities: serde_json::Map<String, Value> = stage_authorities()
                .into_iter()
                .map(|(stage, authority)| (stage.as_str().to_owned(), authority.as_str().into()))
                .collect();
            Ok(Outcome::ok(json!({
                "stages": WorkflowStage::ALL,
                "authorities": authorities,
                "contracts": contracts,
            })))
        }
        (None, Some(_)) => bail!("--stage requires --role"),
    }
}

/// Verify the configured audit log's hash chain
#[must_use]
pub fn audit(config: &GateConfig) -> Outcome {
    let path = config.audit_log_path();
    match verify_chain(&path) {
        Ok(events) => Outcome::ok(json!({ "intact": true, "events": events, "path": path })),
        Err(err) => {
            tracing::error!(path = %path.display(), error = %err, "audit chain verification failed");
            Outcome::failed(json!({ "intact": false, "error": err.to_string(), "path": path }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxide_test_utils::fixed_now;
    use std::io;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn revocation_is_logged_once() {
        let dir = TempDir::new().unwrap();
        let config = GateConfig {
            governance_dir: dir.path().to_path_buf(),
            ..GateConfig::default()
        };
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_max_level(tracing::Level::INFO)
            .with_ansi(false)
            .finish();

        let record = tracing::subscriber::with_default(subscriber, || revoke(&config, "ovr-9", "ops", "leaked")).unwrap();
        assert_eq!(record["override_id"], "ovr-9");

        let logs = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert_eq!(logs.matches("override token revoked").count(), 1);
    }

    #[test]
    fn stage_without_role_is_a_usage_error() {
        assert!(roles(None, Some(WorkflowStage::Promote)).is_err());
    }

    #[test]
    fn role_listing_covers_every_stage() {
        let outcome = roles(None, None).unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.output["stages"].as_array().unwrap().len(), 5);
        assert_eq!(outcome.output["authorities"]["approve"], "oxide-governance");
        assert_eq!(outcome.output["contracts"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn oxide_may_not_promote() {
        let outcome = roles(Some(RoleAgent::Oxide), Some(WorkflowStage::Promote)).unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.output["allowed"], false);
    }

    #[test]
    fn go_needs_no_hitl_token() {
        let outcome = autonomy(FinalGateStatus::Go, None, fixed_now()).unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.output["state"], "NORMAL_GO");
    }

    #[test]
    fn non_object_hitl_document_is_rejected() {
        assert!(autonomy(FinalGateStatus::NoGo, Some(json!("not a token")), fixed_now()).is_err());
    }
}
