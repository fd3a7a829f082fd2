//! Error types for override token verification
//!
//! Every failure is a value. The `Display` output is the reason written to
//! the audit log; [`VerifyError::kind`] lets callers branch without matching
//! on strings.

/// Failure classification used by gates and audit payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Malformed token shape; no cryptographic work was attempted
    Structural,
    /// Outside the validity window; no key work was attempted
    Temporal,
    /// Key, hash, signature, or revocation failure
    Trust,
}

impl FailureKind {
    /// Name used in audit payloads and CLI output
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Structural => "structural",
            Self::Temporal => "temporal",
            Self::Trust => "trust",
        }
    }
}

/// Errors produced while verifying an override token
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    /// Shape or field constraint violated
    #[error("invalid override token: {}", .violations.join("; "))]
    Structural {
        /// One entry per failed constraint
        violations: Vec<String>,
    },

    /// Token id appears in the revocation store
    #[error("Override token has been revoked")]
    Revoked {
        /// Revoked id
        override_id: String,
    },

    /// Issued in the future beyond the allowed clock skew
    #[error("Token issued_at is in the future (beyond skew)")]
    NotYetValid,

    /// Expired beyond the allowed clock skew
    #[error("Token is expired")]
    Expired,

    /// Key id unknown to the resolver or key material below the entropy floor
    #[error("Signing key not available or too short")]
    KeyUnavailable {
        /// Key id the token or signer asked for
        key_id: String,
    },

    /// `integrity.token_hash` does not match the canonical signing view
    #[error("token_hash mismatch")]
    TokenHashMismatch,

    /// HMAC over the canonical signing view does not match `signature.sig`
    #[error("Signature mismatch")]
    SignatureMismatch,
}

impl VerifyError {
    /// Build a structural error from a single violation
    pub fn structural(violation: impl Into<String>) -> Self {
        Self::Structural {
            violations: vec![violation.into()],
        }
    }

    /// Classify the failure
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::Structural { .. } => FailureKind::Structural,
            Self::NotYetValid | Self::Expired => FailureKind::Temporal,
            Self::Revoked { .. }
            | Self::KeyUnavailable { .. }
            | Self::TokenHashMismatch
            | Self::SignatureMismatch => FailureKind::Trust,
        }
    }

    /// Audit reason string
    #[must_use]
    pub fn reason(&self) -> String {
        self.to_string()
    }
}
