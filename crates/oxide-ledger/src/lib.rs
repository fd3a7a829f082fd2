//! Oxide Ledgers
//!
//! Durable, append-only state that override token checks depend on:
//!
//! - [`replay`]: at-most-once acceptance of `(override_id, nonce)` pairs
//! - [`revocation`]: permanent revocation of override ids
//! - [`jsonl`]: the newline-delimited JSON file format both use

pub mod error;
pub mod jsonl;
pub mod replay;
pub mod revocation;

pub use error::{LedgerError, Result};
pub use replay::{replay_key, HotReplaySet, ReplayLedger, ReplayRecord};
pub use revocation::{RevocationRecord, RevocationStore};

/// Default replay ledger file name
pub const REPLAY_LEDGER_FILE: &str = "override_replay.jsonl";

/// Default revocation list file name
pub const REVOCATIONS_FILE: &str = "override_revocations.jsonl";
