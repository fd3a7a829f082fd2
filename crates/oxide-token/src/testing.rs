//! In-crate fixtures for unit tests

use crate::issuer::TokenSigner;
use crate::keys::{Keyring, SecretKey};
use crate::model::OverrideToken;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};

pub(crate) const TEST_KEY_ID: &str = "oxide-local-override-key";

pub(crate) fn test_key() -> SecretKey {
    SecretKey::new(b"unit-test-hmac-key-0123456789abcdef".to_vec())
}

pub(crate) fn test_keyring() -> Keyring {
    Keyring::new().with_key(TEST_KEY_ID, test_key())
}

/// Noon on the day the sample token is valid
pub(crate) fn verification_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap()
}

pub(crate) fn sample_token_value() -> Value {
    json!({
        "schema_version": "oxide.override.v1",
        "override_id": "ovr-2026-0001",
        "project": {
            "project_id": "tom-brain",
            "repo_root": ".",
            "scope": {
                "allowed_paths": ["src/", "memory/"],
                "disallowed_paths": ["memory/secrets.db"],
                "allowed_repos": ["ToM"]
            }
        },
        "gate_context": {
            "final_gate_status": "NO-GO",
            "gate_reason": "peer review incomplete",
            "blocking_items": ["as-built review"]
        },
        "authorization": {
            "issued_by": { "name": "R. Moore", "role": "maintainer", "method": "cli" },
            "issued_at": "2026-10-16T00:00:00Z",
            "expires_at": "2026-10-17T00:00:00Z",
            "revocation": { "revocable": true },
            "statement": "I acknowledge the system is in NO-GO.",
            "risk_acceptance": { "risk_ceiling": "medium", "accepted_risks": ["stale index"] }
        },
        "capabilities": { "allow": ["reindex", "write_memory"], "deny": ["deploy"] },
        "execution_constraints": {
            "ollama": { "allowed_models": ["llama3.1:8b"] }
        },
        "audit": {
            "audit_log_path": ".tom-workspace/governance/audit.jsonl",
            "evidence_dir": ".tom-workspace/evidence"
        },
        "integrity": {
            "nonce": "n-0001",
            "token_hash": "pending",
            "signature": { "alg": "HMAC-SHA256", "key_id": TEST_KEY_ID, "sig": "AAAA" }
        }
    })
}

pub(crate) fn sample_token() -> OverrideToken {
    serde_json::from_value(sample_token_value()).unwrap()
}

pub(crate) fn sealed_token() -> OverrideToken {
    TokenSigner::new(TEST_KEY_ID, test_key()).unwrap().sealed(sample_token())
}
