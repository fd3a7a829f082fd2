//! Error types for the governance gate
//!
//! - [`PrivilegeDenied`]: every refused privileged request
//! - [`RolePolicyViolation`]: a role asked to run a stage it does not own
//! - [`AuditError`]: the audit trail could not be written or verified
//! - [`ConfigError`]: configuration could not be loaded

use crate::roles::{RoleAgent, WorkflowStage};
use oxide_ledger::LedgerError;
use oxide_token::{FailureKind, VerifyError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Stable error code carried by every privilege denial
pub const PRIVILEGE_DENIED_CODE: &str = "PRIVILEGE_DENIED";

/// Stable error code carried by role policy violations
pub const ROLE_POLICY_VIOLATION_CODE: &str = "OXIDE_ROLE_POLICY_VIOLATION";

/// What kind of check refused the request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialKind {
    /// NO-GO and no override token was presented
    TokenRequired,
    /// Token shape invalid
    Structural,
    /// Token outside its validity window
    Temporal,
    /// Key, hash, signature, revocation, or replay failure
    Trust,
    /// Action, repository, or path outside the token's scope
    Scope,
    /// Caller-side policy such as an action allow-list
    Policy,
    /// Ledger or audit storage failed; always denies
    Infrastructure,
}

impl DenialKind {
    /// Name used in audit payloads and responses
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TokenRequired => "token_required",
            Self::Structural => "structural",
            Self::Temporal => "temporal",
            Self::Trust => "trust",
            Self::Scope => "scope",
            Self::Policy => "policy",
            Self::Infrastructure => "infrastructure",
        }
    }
}

impl From<FailureKind> for DenialKind {
    fn from(kind: FailureKind) -> Self {
        match kind {
            FailureKind::Structural => Self::Structural,
            FailureKind::Temporal => Self::Temporal,
            FailureKind::Trust => Self::Trust,
        }
    }
}

/// Which layer produced a denial
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialOrigin {
    /// The privileged gate itself
    Gate,
    /// A dispatcher check that ran before the gate
    PreCheck,
}

impl DenialOrigin {
    /// Name used in audit payloads and responses
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Gate => "gate",
            Self::PreCheck => "pre_check",
        }
    }
}

/// A refused privileged request
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Privilege denied for action '{action}': {reason}")]
pub struct PrivilegeDenied {
    /// Requested action
    pub action: String,
    /// Full reason, recorded in the audit log
    pub reason: String,
    /// Failure class
    pub kind: DenialKind,
    /// Which layer refused
    pub origin: DenialOrigin,
    /// Token id, when one could be read
    pub override_id: Option<String>,
}

impl PrivilegeDenied {
    /// Gate denial with no override id
    pub fn new(action: impl Into<String>, reason: impl Into<String>, kind: DenialKind) -> Self {
        Self {
            action: action.into(),
            reason: reason.into(),
            kind,
            origin: DenialOrigin::Gate,
            override_id: None,
        }
    }

    /// Denial from a failed token verification
    pub fn from_verify(action: impl Into<String>, err: &VerifyError) -> Self {
        Self::new(action, err.reason(), err.kind().into())
    }

    /// Set the origin
    #[must_use]
    pub fn with_origin(mut self, origin: DenialOrigin) -> Self {
        self.origin = origin;
        self
    }

    /// Attach the token id
    #[must_use]
    pub fn with_override_id(mut self, override_id: Option<String>) -> Self {
        self.override_id = override_id;
        self
    }

    /// Always `PRIVILEGE_DENIED`
    #[inline]
    #[must_use]
    pub const fn code(&self) -> &'static str {
        PRIVILEGE_DENIED_CODE
    }

    /// Reason safe to show to the requester
    ///
    /// Trust and infrastructure failures are reported generically; the full
    /// reason only reaches the audit log.
    #[must_use]
    pub fn public_reason(&self) -> &str {
        match self.kind {
            DenialKind::Trust => "override token could not be verified",
            DenialKind::Infrastructure => "privileged decision could not be recorded",
            _ => &self.reason,
        }
    }

    /// Whether the gate itself produced this denial
    #[inline]
    #[must_use]
    pub fn is_from_gate(&self) -> bool {
        self.origin == DenialOrigin::Gate
    }
}

/// A role attempted a workflow stage it is not contracted for
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error(
    "Role routing policy violation: '{}' is not allowed to execute '{}'. Allowed stages: {}",
    .role.as_str(),
    .requested_stage.as_str(),
    .allowed_stages.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ")
)]
pub struct RolePolicyViolation {
    /// Role that asked
    pub role: RoleAgent,
    /// Stage it asked for
    pub requested_stage: WorkflowStage,
    /// Stages its contract allows
    pub allowed_stages: Vec<WorkflowStage>,
}

impl RolePolicyViolation {
    /// Always `OXIDE_ROLE_POLICY_VIOLATION`
    #[inline]
    #[must_use]
    pub const fn code(&self) -> &'static str {
        ROLE_POLICY_VIOLATION_CODE
    }
}

/// Audit trail failures
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    /// The underlying JSONL file could not be written or read
    #[error("audit storage failed: {0}")]
    Storage(#[from] LedgerError),

    /// A stored event does not match its recorded hash chain
    #[error("audit chain broken at line {line}: {reason}")]
    ChainBroken {
        /// One-based line number
        line: usize,
        /// What did not match
        reason: String,
    },

    /// The detached write task panicked or was aborted
    #[error("audit write task failed: {0}")]
    Task(String),
}

impl AuditError {
    /// Tampering, as opposed to an I/O problem
    #[must_use]
    pub const fn is_integrity_failure(&self) -> bool {
        matches!(self, Self::ChainBroken { .. })
    }
}

/// Configuration loading failures
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The TOML file could not be read
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        /// Config file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The TOML file is malformed or has unknown keys
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// An environment override could not be parsed or is out of range
    #[error("invalid value for {name}: {value}")]
    InvalidEnv {
        /// Variable name
        name: &'static str,
        /// Raw value
        value: String,
    },

    /// A numeric setting is outside its accepted range
    #[error("{field} must be between 0 and {max}, got {value}")]
    OutOfRange {
        /// Setting name
        field: &'static str,
        /// Rejected value
        value: i64,
        /// Largest accepted value
        max: i64,
    },
}

impl ConfigError {
    /// True when the problem is in the input rather than the filesystem
    #[must_use]
    pub const fn is_invalid_input(&self) -> bool {
        !matches!(self, Self::Read { .. })
    }
}
