//! Testing utilities for the Oxide governance workspace
//!
//! Shared keys, override token fixtures, and HITL override payloads.

#![allow(missing_docs)]
#![allow(clippy::missing_panics_doc)]

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{DateTime, Duration, SecondsFormat, TimeZone, Utc};
use oxide_token::{Keyring, OverrideToken, SecretKey, TokenSigner};
use serde_json::{json, Value};

pub const TEST_KEY_ID: &str = "oxide-local-override-key";
pub const TEST_OVERRIDE_ID: &str = "ovr-2026-0001";
pub const TEST_REPO: &str = "tom";

pub fn test_key() -> SecretKey {
    SecretKey::new(b"integration-hmac-key-0123456789abcdef".to_vec())
}

/// [`test_key`] as it would appear in `TOM_OVERRIDE_HMAC_KEY_B64`
pub fn test_key_base64() -> String {
    BASE64.encode(test_key().as_bytes())
}

pub fn test_keyring() -> Keyring {
    Keyring::new().with_key(TEST_KEY_ID, test_key())
}

pub fn test_signer() -> TokenSigner {
    TokenSigner::new(TEST_KEY_ID, test_key()).unwrap()
}

/// Fixed instant inside every default fixture window
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap()
}

pub fn rfc3339(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Unsealed token JSON valid from `now - 1h` to `now + 1h`
///
/// Scope: repo `tom`, `repo_root` `.`, paths `src/` and `memory/` minus
/// `memory/secrets.db`; actions `reindex` and `write_memory`, `deploy` denied.
pub fn token_value_at(now: DateTime<Utc>) -> Value {
    json!({
        "schema_version": "oxide.override.v1",
        "override_id": TEST_OVERRIDE_ID,
        "project": {
            "project_id": "tom-brain",
            "repo_root": ".",
            "scope": {
                "allowed_paths": ["src/", "memory/"],
                "disallowed_paths": ["memory/secrets.db"],
                "allowed_repos": [TEST_REPO]
            }
        },
        "gate_context": {
            "final_gate_status": "NO-GO",
            "gate_reason": "release review incomplete",
            "blocking_items": ["as-built review"],
            "reference_artifacts": []
        },
        "authorization": {
            "issued_by": { "name": "R. Moore", "role": "maintainer", "method": "cli" },
            "issued_at": rfc3339(now - Duration::hours(1)),
            "expires_at": rfc3339(now + Duration::hours(1)),
            "revocation": { "revocable": true },
            "statement": "I acknowledge the system is in NO-GO.",
            "risk_acceptance": {
                "risk_ceiling": "medium",
                "accepted_risks": ["stale index"],
                "mitigations_required": []
            }
        },
        "capabilities": { "allow": ["reindex", "write_memory"], "deny": ["deploy"] },
        "execution_constraints": {
            "ollama": { "allowed_models": ["llama3.1:8b"] }
        },
        "audit": {
            "audit_log_path": ".tom-workspace/governance/privileged_audit.jsonl",
            "evidence_dir": ".tom-workspace/evidence"
        },
        "integrity": {
            "nonce": "n-0001",
            "token_hash": "pending",
            "signature": { "alg": "HMAC-SHA256", "key_id": TEST_KEY_ID, "sig": "AAAA" }
        }
    })
}

pub fn token_at(now: DateTime<Utc>) -> OverrideToken {
    serde_json::from_value(token_value_at(now)).unwrap()
}

/// Sealed token valid around `now`
pub fn sealed_token_at(now: DateTime<Utc>) -> OverrideToken {
    test_signer().sealed(token_at(now))
}

/// Sealed token valid around [`fixed_now`]
pub fn sealed_token() -> OverrideToken {
    sealed_token_at(fixed_now())
}

/// Apply `edit` to the unsealed fixture, then seal
pub fn sealed_token_with(now: DateTime<Utc>, edit: impl FnOnce(&mut OverrideToken)) -> OverrideToken {
    let mut token = token_at(now);
    edit(&mut token);
    test_signer().sealed(token)
}

pub fn sealed_token_value_at(now: DateTime<Utc>) -> Value {
    serde_json::to_value(sealed_token_at(now)).unwrap()
}

pub const HITL_AUTHORIZATION_LANGUAGE: &str = "I acknowledge the system is in NO-GO. \
I accept the associated risks. \
You are granted full control within the approved project scope until completion or expiration.";

/// Camel-case HITL override payload valid around `now`
pub fn hitl_token_value_at(now: DateTime<Utc>) -> Value {
    json!({
        "overrideId": "hitl-2026-0001",
        "approver": "R. Moore",
        "projectScope": "tom-brain",
        "riskAcceptance": "accepted: degraded retrieval quality",
        "issuedAt": rfc3339(now - Duration::minutes(10)),
        "expiresAt": rfc3339(now + Duration::hours(4)),
        "linkedProposalRef": "proposal/cycle-42",
        "authorizationLanguage": HITL_AUTHORIZATION_LANGUAGE
    })
}
