//! Oxide Override Tokens
//!
//! Signed, scope-limited capability grants that permit privileged action
//! while the release gate is NO-GO.
//!
//! - [`model`]: the `oxide.override.v1` token structure
//! - [`validate`]: per-field structural constraints
//! - [`canonical`]: the canonical signing view, SHA-256 and HMAC helpers
//! - [`verify`]: structure, revocation, time, key, hash and signature checks
//! - [`issuer`]: sealing tokens with a token hash and signature
//!
//! # Example
//!
//! ```rust,ignore
//! use oxide_token::prelude::*;
//!
//! let verifier = TokenVerifier::new(VerifyOptions::default());
//! let verified = verifier.verify_value(&candidate, &keyring, Some(&revocations), Utc::now())?;
//! println!("override {} accepted", verified.override_id());
//! ```

pub mod canonical;
pub mod error;
pub mod issuer;
pub mod keys;
pub mod model;
pub mod validate;
pub mod verify;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{FailureKind, VerifyError};
pub use issuer::TokenSigner;
pub use keys::{KeyResolver, Keyring, SecretKey, MIN_KEY_BYTES};
pub use model::{NoGoStatus, OverrideToken, RiskLevel, SCHEMA_VERSION, SIGNATURE_ALG};
pub use verify::{RevocationCheck, TokenVerifier, VerifiedToken, VerifyOptions, DEFAULT_CLOCK_SKEW_SECS, MAX_CLOCK_SKEW_SECS};

/// Common imports
pub mod prelude {
    pub use crate::{
        FailureKind, KeyResolver, Keyring, OverrideToken, RevocationCheck, SecretKey, TokenSigner,
        TokenVerifier, VerifiedToken, VerifyError, VerifyOptions,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
