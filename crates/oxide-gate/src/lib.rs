//! Oxide Governance Gate
//!
//! Decides whether privileged actions may run while the release gate is
//! NO-GO, and keeps a tamper-evident record of every decision.
//!
//! - [`privileged`]: the gate that combines token verification, revocation,
//!   scope, and replay checks
//! - [`dispatch`]: caller-side pre-checks and the public response envelope
//! - [`scope`]: action and path scope enforcement
//! - [`audit`]: audit events and sinks, including a hash-chained JSONL log
//! - [`roles`]: stage authorities and role contracts
//! - [`autonomy`]: HITL override validation and the autonomy gate
//! - [`proposal`]: cycle proposal payloads and their policy decision
//! - [`config`]: TOML and environment configuration
//!
//! # Example
//!
//! ```rust,ignore
//! use oxide_gate::prelude::*;
//!
//! let config = GateConfig::load(path)?.with_env()?;
//! let gate = config.build_gate(HotReplaySet::new());
//! let request = PrivilegeRequest::new("reindex", FinalGateStatus::NoGo, "/work/tom")
//!     .with_paths(["memory/index.json"])
//!     .with_token(token_json);
//! let granted = gate.require_privilege(&request).await?;
//! ```

pub mod audit;
pub mod autonomy;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod privileged;
pub mod proposal;
pub mod roles;
pub mod scope;

pub use audit::{verify_chain, AuditEvent, AuditSink, JsonlAuditSink, MemoryAuditSink};
pub use autonomy::{
    evaluate_autonomy_gate, validate_hitl_override_token, AutonomyGateDecision, AutonomyOptions, AutonomyState,
    HitlOverrideToken, ValidationResult,
};
pub use config::GateConfig;
pub use dispatch::{DispatchResponse, Dispatcher};
pub use error::{AuditError, ConfigError, DenialKind, DenialOrigin, PrivilegeDenied, RolePolicyViolation};
pub use privileged::{FinalGateStatus, PrivilegeGranted, PrivilegeRequest, PrivilegedGate};
pub use proposal::{
    create_cycle_proposal_payload, decide_cycle_proposal_policy, validate_cycle_proposal_payload, CycleProposalPayload,
    CycleReport, PolicyDecision,
};
pub use roles::{assert_role_can_execute_stage, Authority, RoleAgent, RoleContract, WorkflowStage};
pub use scope::{assert_permits, ScopeViolation};

pub use oxide_ledger::HotReplaySet;

/// Common imports
pub mod prelude {
    pub use crate::{
        AuditSink, DenialKind, Dispatcher, FinalGateStatus, GateConfig, HotReplaySet, PrivilegeDenied,
        PrivilegeGranted, PrivilegeRequest, PrivilegedGate, RoleAgent, WorkflowStage,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
