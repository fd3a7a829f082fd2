//! Override token data model
//!
//! Mirrors the `oxide.override.v1` wire format. Every struct rejects unknown
//! fields so that an unexpected shape fails at the deserialization boundary.
//! Timestamps stay as their issued strings: the signing view must reproduce
//! exactly what the issuer hashed.

use serde::{Deserialize, Serialize};

/// Schema identifier carried by every override token
pub const SCHEMA_VERSION: &str = "oxide.override.v1";

/// Only signature algorithm accepted for override tokens
pub const SIGNATURE_ALG: &str = "HMAC-SHA256";

/// Signed capability grant permitting privileged action during NO-GO
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OverrideToken {
    /// Always [`SCHEMA_VERSION`]
    pub schema_version: String,
    /// Stable id used for revocation and replay keys
    pub override_id: String,
    /// Project and paths the grant is bound to
    pub project: ProjectBinding,
    /// Release gate state at issuance
    pub gate_context: GateContext,
    /// Issuer, validity window and accepted risk
    pub authorization: Authorization,
    /// Actions the token permits
    pub capabilities: Capabilities,
    /// Limits on the privileged run
    pub execution_constraints: ExecutionConstraints,
    /// Evidence settings
    pub audit: AuditSettings,
    /// Nonce, hash and signature
    pub integrity: Integrity,
}

impl OverrideToken {
    /// Key id the token claims it was signed with
    #[inline]
    #[must_use]
    pub fn key_id(&self) -> &str {
        &self.integrity.signature.key_id
    }

    /// Nonce that, together with the override id, identifies one use
    #[inline]
    #[must_use]
    pub fn nonce(&self) -> &str {
        &self.integrity.nonce
    }
}

/// Project the token is issued for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectBinding {
    /// Project identifier, e.g. the repository name
    pub project_id: String,
    /// Workspace root the scope paths are relative to
    pub repo_root: String,
    /// Paths the grant may touch
    pub scope: PathScope,
}

/// Blast radius of the grant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PathScope {
    /// Glob patterns an affected path must match
    pub allowed_paths: Vec<String>,
    /// Glob patterns that always deny
    #[serde(default)]
    pub disallowed_paths: Vec<String>,
    /// Repositories the grant applies to
    pub allowed_repos: Vec<String>,
}

/// Literal `"NO-GO"`. Tokens cannot be expressed for any other gate state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoGoStatus {
    /// Release gate is closed
    #[serde(rename = "NO-GO")]
    NoGo,
}

impl NoGoStatus {
    /// Wire representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoGo => "NO-GO",
        }
    }
}

/// Release gate state the token was issued against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GateContext {
    /// Always NO-GO
    pub final_gate_status: NoGoStatus,
    /// Why the release gate is NO-GO
    pub gate_reason: String,
    /// Items keeping the gate closed
    #[serde(default)]
    pub blocking_items: Vec<String>,
    /// Supporting documents
    #[serde(default)]
    pub reference_artifacts: Vec<String>,
}

/// Who authorized the override and for how long
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Authorization {
    /// Issuer identity
    pub issued_by: Issuer,
    /// RFC 3339 timestamp
    pub issued_at: String,
    /// RFC 3339 timestamp
    pub expires_at: String,
    /// Revocation policy
    pub revocation: RevocationPolicy,
    /// Free-form authorization statement
    pub statement: String,
    /// Accepted risk
    pub risk_acceptance: RiskAcceptance,
}

/// Human or process that issued the token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Issuer {
    /// Issuer name
    pub name: String,
    /// Issuer role, e.g. release owner
    pub role: String,
    /// How the authorization was given
    pub method: String,
}

/// Whether the token may be revoked, and with which key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RevocationPolicy {
    /// Whether revocation is honored
    pub revocable: bool,
    /// Key id for signed revocations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revocation_key_id: Option<String>,
}

/// Ordered risk ceiling
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    /// Routine change
    Low,
    /// Needs review
    Medium,
    /// Needs explicit acceptance
    High,
    /// Highest ceiling
    Critical,
}

/// Risks the issuer explicitly accepted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RiskAcceptance {
    /// Highest risk the run may reach
    pub risk_ceiling: RiskLevel,
    /// Risks accepted by the issuer
    #[serde(default)]
    pub accepted_risks: Vec<String>,
    /// Mitigations the caller must apply
    #[serde(default)]
    pub mitigations_required: Vec<String>,
}

/// Action allow/deny lists; deny wins
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Capabilities {
    /// Permitted action names
    pub allow: Vec<String>,
    /// Forbidden action names
    #[serde(default)]
    pub deny: Vec<String>,
}

/// Bounds enforced by the executing caller. Only their shape is checked here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExecutionConstraints {
    /// Iteration cap
    #[serde(default = "defaults::max_iterations")]
    pub max_iterations: i64,
    /// Diff size cap
    #[serde(default = "defaults::max_diff_lines")]
    pub max_diff_lines: i64,
    /// CI evidence must be attached
    #[serde(default = "defaults::yes")]
    pub requires_ci_evidence: bool,
    /// Minutes of monitoring after deploy
    #[serde(default = "defaults::monitoring_minutes")]
    pub requires_post_deploy_monitoring_minutes: i64,
    /// Minutes before another run
    #[serde(default = "defaults::cooldown_minutes")]
    pub cooldown_minutes_after_completion: i64,
    /// Local model limits
    #[serde(rename = "ollama")]
    pub model_usage: ModelUsagePolicy,
}

/// Local model usage limits, serialized as `ollama`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelUsagePolicy {
    /// Whether local models may be used
    #[serde(default = "defaults::yes")]
    pub enabled: bool,
    /// Usage mode, `local_only` by default
    #[serde(default = "defaults::local_only")]
    pub mode: String,
    /// Model names the run may use
    pub allowed_models: Vec<String>,
    /// Sampling temperature ceiling
    #[serde(default = "defaults::temperature_max")]
    pub temperature_max: f64,
    /// Per-call token ceiling
    #[serde(default = "defaults::max_tokens")]
    pub max_tokens: i64,
}

/// Where the executing caller records evidence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuditSettings {
    /// Audit log the caller appends to
    pub audit_log_path: String,
    /// Whether events are emitted
    #[serde(default = "defaults::yes")]
    pub emit_events: bool,
    /// Tags attached to emitted events
    #[serde(default)]
    pub event_tags: Vec<String>,
    /// Directory for run evidence
    pub evidence_dir: String,
}

/// Replay nonce, content hash and signature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Integrity {
    /// Single-use nonce
    pub nonce: String,
    /// Audit chain head at issuance
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_audit_hash: Option<String>,
    /// Hex SHA-256 of the canonical signing view
    pub token_hash: String,
    /// Signature block
    pub signature: TokenSignature,
}

/// HMAC signature and the key id it was made with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TokenSignature {
    /// Always [`SIGNATURE_ALG`]
    pub alg: String,
    /// Keyring entry used to sign
    pub key_id: String,
    /// Base64 HMAC over the canonical signing view
    pub sig: String,
}

mod defaults {
    pub(super) fn max_iterations() -> i64 {
        25
    }

    pub(super) fn max_diff_lines() -> i64 {
        800
    }

    pub(super) fn monitoring_minutes() -> i64 {
        60
    }

    pub(super) fn cooldown_minutes() -> i64 {
        120
    }

    pub(super) fn yes() -> bool {
        true
    }

    pub(super) fn local_only() -> String {
        "local_only".to_string()
    }

    pub(super) fn temperature_max() -> f64 {
        0.3
    }

    pub(super) fn max_tokens() -> i64 {
        4096
    }
}
