//! Signing key material and resolution
//!
//! The verifier never owns keys; it asks a [`KeyResolver`] by key id.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use std::collections::HashMap;
use std::fmt;

/// Minimum accepted HMAC key length in bytes
pub const MIN_KEY_BYTES: usize = 16;

/// HMAC secret. `Debug` never prints the bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretKey(Vec<u8>);

impl SecretKey {
    /// Wrap raw key bytes
    #[must_use]
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Decode a base64 secret; empty or undecodable input yields `None`
    #[must_use]
    pub fn from_base64(encoded: &str) -> Option<Self> {
        let trimmed = encoded.trim();
        if trimmed.is_empty() {
            return None;
        }
        BASE64
            .decode(trimmed)
            .ok()
            .filter(|bytes| !bytes.is_empty())
            .map(Self)
    }

    /// Raw key bytes
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Key length in bytes
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `true` for a zero-length key
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether the key meets the entropy floor
    #[inline]
    #[must_use]
    pub fn is_strong(&self) -> bool {
        self.0.len() >= MIN_KEY_BYTES
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretKey(<{} bytes>)", self.0.len())
    }
}

/// Looks up HMAC keys by id
pub trait KeyResolver: Send + Sync {
    /// Return the key for `key_id`, if known
    fn resolve_key(&self, key_id: &str) -> Option<SecretKey>;
}

impl<F> KeyResolver for F
where
    F: Fn(&str) -> Option<SecretKey> + Send + Sync,
{
    fn resolve_key(&self, key_id: &str) -> Option<SecretKey> {
        self(key_id)
    }
}

/// In-memory key id → key map
#[derive(Debug, Clone, Default)]
pub struct Keyring {
    keys: HashMap<String, SecretKey>,
}

impl Keyring {
    /// Empty keyring
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a key
    #[must_use]
    pub fn with_key(mut self, key_id: impl Into<String>, key: SecretKey) -> Self {
        self.insert(key_id, key);
        self
    }

    /// Add or replace a key in place
    pub fn insert(&mut self, key_id: impl Into<String>, key: SecretKey) {
        self.keys.insert(key_id.into(), key);
    }

    /// Number of keys
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// `true` if no key is loaded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl KeyResolver for Keyring {
    fn resolve_key(&self, key_id: &str) -> Option<SecretKey> {
        self.keys.get(key_id).cloned()
    }
}
