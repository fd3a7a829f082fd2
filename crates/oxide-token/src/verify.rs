//! Override token verification
//!
//! Order of checks:
//! 1. Structure (no crypto on malformed input)
//! 2. Revocation short-circuit (before any signature work)
//! 3. Validity window with symmetric clock skew
//! 4. Key resolution and entropy floor
//! 5. `token_hash` over the canonical signing view (optional, on by default)
//! 6. Constant-time HMAC comparison

use crate::canonical::{canonical_signing_payload, sha256_hex, verify_hmac_sha256_base64};
use crate::error::VerifyError;
use crate::keys::KeyResolver;
use crate::model::OverrideToken;
use crate::validate::{parse_candidate, parse_timestamp, validate_structure};
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;

/// Default symmetric clock skew tolerance
pub const DEFAULT_CLOCK_SKEW_SECS: i64 = 30;

/// Largest accepted clock skew tolerance (one day)
pub const MAX_CLOCK_SKEW_SECS: i64 = 86_400;

/// Answers whether an override id has been revoked
pub trait RevocationCheck: Send + Sync {
    /// `true` if the override id must be refused
    fn is_revoked(&self, override_id: &str) -> bool;
}

impl<F> RevocationCheck for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn is_revoked(&self, override_id: &str) -> bool {
        self(override_id)
    }
}

/// Verification tunables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifyOptions {
    /// Tolerance applied to both ends of the validity window
    pub clock_skew: Duration,
    /// Recompute and compare `token_hash`
    pub enforce_token_hash: bool,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            clock_skew: Duration::seconds(DEFAULT_CLOCK_SKEW_SECS),
            enforce_token_hash: true,
        }
    }
}

impl VerifyOptions {
    /// Set the skew tolerance, clamped to `0..=MAX_CLOCK_SKEW_SECS`
    #[must_use]
    pub fn with_clock_skew_secs(mut self, secs: i64) -> Self {
        self.clock_skew = Duration::seconds(secs.clamp(0, MAX_CLOCK_SKEW_SECS));
        self
    }

    /// Toggle the `token_hash` check
    #[must_use]
    pub fn with_token_hash(mut self, enforce: bool) -> Self {
        self.enforce_token_hash = enforce;
        self
    }
}

/// A token that passed every integrity check
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedToken {
    /// The verified token
    pub token: OverrideToken,
    /// Canonical JSON the signature covers
    pub canonical_signing_payload: String,
    /// Replay nonce
    pub nonce: String,
    /// Recomputed content hash
    pub token_hash: String,
}

impl VerifiedToken {
    /// Id of the verified token
    #[inline]
    #[must_use]
    pub fn override_id(&self) -> &str {
        &self.token.override_id
    }
}

/// Stateless verifier configured with [`VerifyOptions`]
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenVerifier {
    options: VerifyOptions,
}

impl TokenVerifier {
    /// Verifier with the given options
    #[must_use]
    pub fn new(options: VerifyOptions) -> Self {
        Self { options }
    }

    /// Options in effect
    #[must_use]
    pub fn options(&self) -> VerifyOptions {
        self.options
    }

    /// Verify an untrusted JSON candidate
    ///
    /// # Errors
    /// Returns the first failing check as a [`VerifyError`].
    pub fn verify_value(
        &self,
        candidate: &Value,
        keys: &dyn KeyResolver,
        revocations: Option<&dyn RevocationCheck>,
        now: DateTime<Utc>,
    ) -> Result<VerifiedToken, VerifyError> {
        let token = parse_candidate(candidate)?;
        self.verify_parsed(token, keys, revocations, now)
    }

    /// Verify an already deserialized token
    ///
    /// Structural constraints are still checked; deserialization alone does
    /// not prove them.
    ///
    /// # Errors
    /// Returns the first failing check as a [`VerifyError`].
    pub fn verify(
        &self,
        token: &OverrideToken,
        keys: &dyn KeyResolver,
        revocations: Option<&dyn RevocationCheck>,
        now: DateTime<Utc>,
    ) -> Result<VerifiedToken, VerifyError> {
        validate_structure(token)?;
        self.verify_parsed(token.clone(), keys, revocations, now)
    }

    fn verify_parsed(
        &self,
        token: OverrideToken,
        keys: &dyn KeyResolver,
        revocations: Option<&dyn RevocationCheck>,
        now: DateTime<Utc>,
    ) -> Result<VerifiedToken, VerifyError> {
        if let Some(store) = revocations {
            if store.is_revoked(&token.override_id) {
                return Err(VerifyError::Revoked {
                    override_id: token.override_id.clone(),
                });
            }
        }

        let issued_at = parse_timestamp(&token.authorization.issued_at)
            .ok_or_else(|| VerifyError::structural("Invalid issued_at/expires_at timestamps"))?;
        let expires_at = parse_timestamp(&token.authorization.expires_at)
            .ok_or_else(|| VerifyError::structural("Invalid issued_at/expires_at timestamps"))?;

        // Out-of-range arithmetic fails closed.
        let skew = self.options.clock_skew;
        if issued_at.checked_sub_signed(skew).map_or(true, |earliest| earliest > now) {
            return Err(VerifyError::NotYetValid);
        }
        if now.checked_sub_signed(skew).map_or(true, |latest| latest > expires_at) {
            return Err(VerifyError::Expired);
        }

        let key_id = token.key_id().to_owned();
        let secret = keys
            .resolve_key(&key_id)
            .filter(|key| key.is_strong())
            .ok_or(VerifyError::KeyUnavailable { key_id })?;

        let payload = canonical_signing_payload(&token);

        if self.options.enforce_token_hash && sha256_hex(&payload) != token.integrity.token_hash {
            tracing::debug!(override_id = %token.override_id, "token hash mismatch");
            return Err(VerifyError::TokenHashMismatch);
        }

        if !verify_hmac_sha256_base64(secret.as_bytes(), &payload, &token.integrity.signature.sig) {
            tracing::debug!(override_id = %token.override_id, "signature mismatch");
            return Err(VerifyError::SignatureMismatch);
        }

        Ok(VerifiedToken {
            nonce: token.integrity.nonce.clone(),
            token_hash: token.integrity.token_hash.clone(),
            canonical_signing_payload: payload,
            token,
        })
    }
}
