//! Structural validation
//!
//! Serde enforces the field set and primitive types; this module asserts the
//! remaining per-field constraints (non-empty strings and lists, literals,
//! base64 shape, parseable and ordered timestamps, numeric ranges). All
//! violations are collected so the audit reason names each one.

use crate::error::VerifyError;
use crate::model::{OverrideToken, SCHEMA_VERSION, SIGNATURE_ALG};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static BASE64_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9+/]+={0,2}$").expect("static base64 pattern"));

/// Parse an untrusted JSON candidate into a structurally valid token
///
/// # Errors
/// Returns [`VerifyError::Structural`] naming the violated constraints.
pub fn parse_candidate(candidate: &Value) -> Result<OverrideToken, VerifyError> {
    let token: OverrideToken = serde_json::from_value(candidate.clone())
        .map_err(|e| VerifyError::structural(e.to_string()))?;
    validate_structure(&token)?;
    Ok(token)
}

/// Parse an RFC 3339 timestamp into UTC
#[must_use]
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Check every per-field constraint of an already deserialized token
///
/// # Errors
/// Returns [`VerifyError::Structural`] listing every violation found.
pub fn validate_structure(token: &OverrideToken) -> Result<(), VerifyError> {
    let mut v = Violations::default();

    if token.schema_version != SCHEMA_VERSION {
        v.push(format!("schema_version must be '{SCHEMA_VERSION}'"));
    }
    v.non_empty("override_id", &token.override_id);

    let project = &token.project;
    v.non_empty("project.project_id", &project.project_id);
    v.non_empty("project.repo_root", &project.repo_root);
    v.non_empty_list("project.scope.allowed_paths", &project.scope.allowed_paths);
    v.entries("project.scope.disallowed_paths", &project.scope.disallowed_paths);
    v.non_empty_list("project.scope.allowed_repos", &project.scope.allowed_repos);

    let gate = &token.gate_context;
    v.non_empty("gate_context.gate_reason", &gate.gate_reason);
    v.entries("gate_context.blocking_items", &gate.blocking_items);
    v.entries("gate_context.reference_artifacts", &gate.reference_artifacts);

    let auth = &token.authorization;
    v.non_empty("authorization.issued_by.name", &auth.issued_by.name);
    v.non_empty("authorization.issued_by.role", &auth.issued_by.role);
    v.non_empty("authorization.issued_by.method", &auth.issued_by.method);
    if let Some(key_id) = &auth.revocation.revocation_key_id {
        v.non_empty("authorization.revocation.revocation_key_id", key_id);
    }
    v.non_empty("authorization.statement", &auth.statement);
    v.entries("authorization.risk_acceptance.accepted_risks", &auth.risk_acceptance.accepted_risks);
    v.entries(
        "authorization.risk_acceptance.mitigations_required",
        &auth.risk_acceptance.mitigations_required,
    );

    let issued_at = parse_timestamp(&auth.issued_at);
    let expires_at = parse_timestamp(&auth.expires_at);
    if issued_at.is_none() {
        v.push("authorization.issued_at: Invalid ISO datetime");
    }
    if expires_at.is_none() {
        v.push("authorization.expires_at: Invalid ISO datetime");
    }
    if let (Some(issued), Some(expires)) = (issued_at, expires_at) {
        if expires <= issued {
            v.push("authorization.expires_at must be later than issued_at");
        }
    }

    v.non_empty_list("capabilities.allow", &token.capabilities.allow);
    v.entries("capabilities.deny", &token.capabilities.deny);

    let limits = &token.execution_constraints;
    v.positive("execution_constraints.max_iterations", limits.max_iterations);
    v.positive("execution_constraints.max_diff_lines", limits.max_diff_lines);
    v.non_negative(
        "execution_constraints.requires_post_deploy_monitoring_minutes",
        limits.requires_post_deploy_monitoring_minutes,
    );
    v.non_negative(
        "execution_constraints.cooldown_minutes_after_completion",
        limits.cooldown_minutes_after_completion,
    );
    let models = &limits.model_usage;
    if models.mode != "local_only" {
        v.push("execution_constraints.ollama.mode must be 'local_only'");
    }
    v.non_empty_list("execution_constraints.ollama.allowed_models", &models.allowed_models);
    if !(0.0..=2.0).contains(&models.temperature_max) {
        v.push("execution_constraints.ollama.temperature_max must be within [0, 2]");
    }
    v.positive("execution_constraints.ollama.max_tokens", models.max_tokens);

    v.non_empty("audit.audit_log_path", &token.audit.audit_log_path);
    v.entries("audit.event_tags", &token.audit.event_tags);
    v.non_empty("audit.evidence_dir", &token.audit.evidence_dir);

    let integrity = &token.integrity;
    v.non_empty("integrity.nonce", &integrity.nonce);
    if let Some(prev) = &integrity.previous_audit_hash {
        v.non_empty("integrity.previous_audit_hash", prev);
    }
    v.non_empty("integrity.token_hash", &integrity.token_hash);
    if integrity.signature.alg != SIGNATURE_ALG {
        v.push(format!("integrity.signature.alg must be '{SIGNATURE_ALG}'"));
    }
    v.non_empty("integrity.signature.key_id", &integrity.signature.key_id);
    if !BASE64_SHAPE.is_match(&integrity.signature.sig) {
        v.push("integrity.signature.sig: Must be valid base64");
    }

    v.finish()
}

#[derive(Default)]
struct Violations(Vec<String>);

impl Violations {
    fn push(&mut self, violation: impl Into<String>) {
        self.0.push(violation.into());
    }

    fn non_empty(&mut self, field: &str, value: &str) {
        if value.is_empty() {
            self.push(format!("{field} must be non-empty"));
        }
    }

    fn entries(&mut self, field: &str, values: &[String]) {
        if values.iter().any(String::is_empty) {
            self.push(format!("{field} entries must be non-empty"));
        }
    }

    fn non_empty_list(&mut self, field: &str, values: &[String]) {
        if values.is_empty() {
            self.push(format!("{field} must contain at least 1 entry"));
        }
        self.entries(field, values);
    }

    fn positive(&mut self, field: &str, value: i64) {
        if value <= 0 {
            self.push(format!("{field} must be positive"));
        }
    }

    fn non_negative(&mut self, field: &str, value: i64) {
        if value < 0 {
            self.push(format!("{field} must be non-negative"));
        }
    }

    fn finish(self) -> Result<(), VerifyError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(VerifyError::Structural { violations: self.0 })
        }
    }
}
