//! Token Sealing
//!
//! Computes `integrity.token_hash` and `integrity.signature` for a token
//! whose other fields are final. Sealing is the issuance-side counterpart of
//! [`crate::verify::TokenVerifier`]; both use the same canonical view.

use crate::canonical::{canonical_signing_payload, hmac_sha256_base64, sha256_hex};
use crate::error::VerifyError;
use crate::keys::SecretKey;
use crate::model::{OverrideToken, TokenSignature, SIGNATURE_ALG};

/// Signs override tokens under a single key id
pub struct TokenSigner {
    key_id: String,
    key: SecretKey,
}

impl TokenSigner {
    /// Create a signer
    ///
    /// # Errors
    /// Returns [`VerifyError::KeyUnavailable`] if the key is below the entropy floor.
    pub fn new(key_id: impl Into<String>, key: SecretKey) -> Result<Self, VerifyError> {
        let key_id = key_id.into();
        if !key.is_strong() {
            return Err(VerifyError::KeyUnavailable { key_id });
        }
        Ok(Self { key_id, key })
    }

    /// Key id written into sealed tokens
    #[must_use]
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Seal a token in place
    ///
    /// The signature's key id is set before hashing; it is part of the
    /// signing view.
    pub fn seal(&self, token: &mut OverrideToken) {
        token.integrity.signature = TokenSignature {
            alg: SIGNATURE_ALG.to_string(),
            key_id: self.key_id.clone(),
            sig: String::new(),
        };
        let payload = canonical_signing_payload(token);
        token.integrity.token_hash = sha256_hex(&payload);
        token.integrity.signature.sig = hmac_sha256_base64(self.key.as_bytes(), &payload);
        tracing::debug!(override_id = %token.override_id, key_id = %self.key_id, "sealed override token");
    }

    /// Seal and return a token
    #[must_use]
    pub fn sealed(&self, mut token: OverrideToken) -> OverrideToken {
        self.seal(&mut token);
        token
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sample_token, test_key};

    #[test]
    fn weak_keys_are_refused() {
        assert!(TokenSigner::new("k", SecretKey::new(vec![0u8; 15])).is_err());
        assert!(TokenSigner::new("k", SecretKey::new(vec![0u8; 16])).is_ok());
    }

    #[test]
    fn sealing_sets_key_id_hash_and_signature() {
        let signer = TokenSigner::new("ops-2026", test_key()).unwrap();
        let token = signer.sealed(sample_token());

        assert_eq!(token.integrity.signature.key_id, "ops-2026");
        assert_eq!(token.integrity.signature.alg, SIGNATURE_ALG);
        assert_eq!(token.integrity.token_hash.len(), 64);
        assert!(!token.integrity.signature.sig.is_empty());
    }

    #[test]
    fn resealing_is_stable() {
        let signer = TokenSigner::new("ops-2026", test_key()).unwrap();
        let once = signer.sealed(sample_token());
        let twice = signer.sealed(once.clone());
        assert_eq!(once, twice);
    }
}
