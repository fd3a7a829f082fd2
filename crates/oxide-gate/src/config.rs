//! Gate configuration
//!
//! Loaded from TOML, then overridden from the environment. Every field has
//! a default, so an empty file (or no file) is a valid configuration.

use crate::audit::JsonlAuditSink;
use crate::dispatch::Dispatcher;
use crate::error::ConfigError;
use crate::privileged::PrivilegedGate;
use oxide_ledger::{HotReplaySet, ReplayLedger, RevocationStore, REPLAY_LEDGER_FILE, REVOCATIONS_FILE};
use oxide_token::{Keyring, SecretKey, VerifyOptions, DEFAULT_CLOCK_SKEW_SECS, MAX_CLOCK_SKEW_SECS};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Environment variable naming the signing key id
pub const ENV_KEY_ID: &str = "TOM_OVERRIDE_HMAC_KEY_ID";
/// Environment variable holding the base64 HMAC secret
pub const ENV_KEY_B64: &str = "TOM_OVERRIDE_HMAC_KEY_B64";
/// Environment variable overriding the governance directory
pub const ENV_GOVERNANCE_DIR: &str = "OXIDE_GOVERNANCE_DIR";
/// Environment variable overriding the clock skew in seconds
pub const ENV_CLOCK_SKEW_SECS: &str = "OXIDE_CLOCK_SKEW_SECS";

/// Key id used when none is configured
pub const DEFAULT_KEY_ID: &str = "oxide-local-override-key";
/// Directory holding the ledgers and the audit log
pub const DEFAULT_GOVERNANCE_DIR: &str = ".tom-workspace/governance";
/// Audit log file name inside the governance directory
pub const DEFAULT_AUDIT_LOG_FILE: &str = "privileged_audit.jsonl";

/// Configuration for building a [`PrivilegedGate`] over durable stores
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GateConfig {
    /// Directory holding the ledger files and audit log
    pub governance_dir: PathBuf,
    /// Replay ledger file name
    pub replay_ledger_file: String,
    /// Revocation store file name
    pub revocations_file: String,
    /// Audit log file name
    pub audit_log_file: String,
    /// Validity window tolerance, `0..=MAX_CLOCK_SKEW_SECS`
    pub clock_skew_secs: i64,
    /// Recompute and compare `token_hash`
    pub enforce_token_hash: bool,
    /// Key id the configured secret is registered under
    pub key_id: String,
    /// Base64 HMAC secret; usually supplied through the environment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hmac_key_b64: Option<String>,
    /// Dispatcher allow-list; empty disables the pre-check
    pub allowed_actions: Vec<String>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            governance_dir: PathBuf::from(DEFAULT_GOVERNANCE_DIR),
            replay_ledger_file: REPLAY_LEDGER_FILE.to_owned(),
            revocations_file: REVOCATIONS_FILE.to_owned(),
            audit_log_file: DEFAULT_AUDIT_LOG_FILE.to_owned(),
            clock_skew_secs: DEFAULT_CLOCK_SKEW_SECS,
            enforce_token_hash: true,
            key_id: DEFAULT_KEY_ID.to_owned(),
            hmac_key_b64: None,
            allowed_actions: Vec::new(),
        }
    }
}

impl fmt::Debug for GateConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GateConfig")
            .field("governance_dir", &self.governance_dir)
            .field("replay_ledger_file", &self.replay_ledger_file)
            .field("revocations_file", &self.revocations_file)
            .field("audit_log_file", &self.audit_log_file)
            .field("clock_skew_secs", &self.clock_skew_secs)
            .field("enforce_token_hash", &self.enforce_token_hash)
            .field("key_id", &self.key_id)
            .field("hmac_key_b64", &self.hmac_key_b64.as_ref().map(|_| "<redacted>"))
            .field("allowed_actions", &self.allowed_actions)
            .finish()
    }
}

impl GateConfig {
    /// Parse a TOML document
    ///
    /// # Errors
    /// Returns [`ConfigError::Parse`] for invalid TOML or unknown keys and
    /// [`ConfigError::OutOfRange`] for a clock skew outside `0..=MAX_CLOCK_SKEW_SECS`.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        if !(0..=MAX_CLOCK_SKEW_SECS).contains(&config.clock_skew_secs) {
            return Err(ConfigError::OutOfRange {
                field: "clock_skew_secs",
                value: config.clock_skew_secs,
                max: MAX_CLOCK_SKEW_SECS,
            });
        }
        Ok(config)
    }

    /// Read and parse a TOML file
    ///
    /// # Errors
    /// Returns [`ConfigError::Read`] or [`ConfigError::Parse`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Apply overrides from the process environment
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidEnv`] for an unparseable or out-of-range
    /// clock skew.
    pub fn with_env(self) -> Result<Self, ConfigError> {
        self.with_env_from(|name| std::env::var(name).ok())
    }

    /// Apply overrides from `lookup`
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidEnv`] for an unparseable or out-of-range
    /// clock skew.
    pub fn with_env_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        if let Some(key_id) = lookup(ENV_KEY_ID).filter(|v| !v.trim().is_empty()) {
            self.key_id = key_id;
        }
        if let Some(key) = lookup(ENV_KEY_B64) {
            self.hmac_key_b64 = Some(key);
        }
        if let Some(dir) = lookup(ENV_GOVERNANCE_DIR).filter(|v| !v.trim().is_empty()) {
            self.governance_dir = PathBuf::from(dir);
        }
        if let Some(skew) = lookup(ENV_CLOCK_SKEW_SECS) {
            self.clock_skew_secs = skew
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|s| (0..=MAX_CLOCK_SKEW_SECS).contains(s))
                .ok_or(ConfigError::InvalidEnv {
                    name: ENV_CLOCK_SKEW_SECS,
                    value: skew,
                })?;
        }
        Ok(self)
    }

    /// Full replay ledger path
    #[must_use]
    pub fn replay_ledger_path(&self) -> PathBuf {
        self.governance_dir.join(&self.replay_ledger_file)
    }

    /// Full revocation store path
    #[must_use]
    pub fn revocations_path(&self) -> PathBuf {
        self.governance_dir.join(&self.revocations_file)
    }

    /// Full audit log path
    #[must_use]
    pub fn audit_log_path(&self) -> PathBuf {
        self.governance_dir.join(&self.audit_log_file)
    }

    /// Verifier options derived from this config
    #[must_use]
    pub fn verify_options(&self) -> VerifyOptions {
        VerifyOptions::default()
            .with_clock_skew_secs(self.clock_skew_secs)
            .with_token_hash(self.enforce_token_hash)
    }

    /// Configured signing key, if present and decodable
    #[must_use]
    pub fn signing_key(&self) -> Option<SecretKey> {
        let encoded = self.hmac_key_b64.as_deref()?;
        let key = SecretKey::from_base64(encoded);
        if key.is_none() {
            tracing::warn!(key_id = %self.key_id, "override HMAC key is not valid base64; no key configured");
        }
        key
    }

    /// Keyring holding the configured key; empty when no usable key is set
    #[must_use]
    pub fn keyring(&self) -> Keyring {
        let mut ring = Keyring::new();
        if let Some(key) = self.signing_key() {
            ring.insert(self.key_id.clone(), key);
        }
        ring
    }

    /// Revocation store over the configured file
    #[must_use]
    pub fn revocation_store(&self) -> RevocationStore {
        RevocationStore::new(self.revocations_path())
    }

    /// Gate over the configured JSONL stores
    ///
    /// `hot` must be shared by every gate in the process.
    #[must_use]
    pub fn build_gate(&self, hot: HotReplaySet) -> PrivilegedGate {
        PrivilegedGate::builder(self.keyring(), JsonlAuditSink::new(self.audit_log_path()))
            .verify_options(self.verify_options())
            .revocations(self.revocation_store())
            .replay_ledger(Arc::new(ReplayLedger::new(self.replay_ledger_path(), hot)))
            .build()
    }

    /// Dispatcher around [`Self::build_gate`] with the configured allow-list
    #[must_use]
    pub fn build_dispatcher(&self, hot: HotReplaySet) -> Dispatcher {
        let dispatcher = Dispatcher::new(Arc::new(self.build_gate(hot)));
        if self.allowed_actions.is_empty() {
            dispatcher
        } else {
            dispatcher.with_allowed_actions(self.allowed_actions.iter().cloned())
        }
    }
}
