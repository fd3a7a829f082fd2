//! Role/Stage Policy
//!
//! Separation of duties for the proposal workflow. Each stage has exactly
//! one authority, and each logical agent may only run the stages in its
//! contract, so no agent can approve or promote its own proposal.

use crate::error::RolePolicyViolation;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Workflow stages in canonical order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStage {
    /// Find source material
    Discover,
    /// Draft a cycle proposal
    Propose,
    /// Check the proposal in CI
    Validate,
    /// Governance sign-off
    Approve,
    /// Write into runtime memory
    Promote,
}

impl WorkflowStage {
    /// All stages, discover first
    pub const ALL: [Self; 5] = [
        Self::Discover,
        Self::Propose,
        Self::Validate,
        Self::Approve,
        Self::Promote,
    ];

    /// Wire name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Discover => "discover",
            Self::Propose => "propose",
            Self::Validate => "validate",
            Self::Approve => "approve",
            Self::Promote => "promote",
        }
    }

    /// The single authority allowed to act at this stage
    #[must_use]
    pub const fn authority(self) -> Authority {
        match self {
            Self::Discover => Authority::Tom,
            Self::Propose => Authority::Oxide,
            Self::Validate => Authority::Ci,
            Self::Approve => Authority::OxideGovernance,
            Self::Promote => Authority::RuntimeMemory,
        }
    }
}

impl fmt::Display for WorkflowStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for WorkflowStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| format!("unknown workflow stage: {s}"))
    }
}

/// Parties that own a stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Authority {
    /// The ToM agent
    Tom,
    /// The Oxide agent
    Oxide,
    /// Continuous integration
    Ci,
    /// Human governance
    OxideGovernance,
    /// The runtime memory store
    RuntimeMemory,
}

impl Authority {
    /// Wire name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tom => "tom",
            Self::Oxide => "oxide",
            Self::Ci => "ci",
            Self::OxideGovernance => "oxide-governance",
            Self::RuntimeMemory => "runtime-memory",
        }
    }
}

impl fmt::Display for Authority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stage to authority table in canonical stage order
#[must_use]
pub fn stage_authorities() -> [(WorkflowStage, Authority); 5] {
    WorkflowStage::ALL.map(|stage| (stage, stage.authority()))
}

/// Logical agents that run workflow stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleAgent {
    /// Discovers and indexes
    Tom,
    /// Proposes
    Oxide,
}

impl RoleAgent {
    /// Every agent
    pub const ALL: [Self; 2] = [Self::Tom, Self::Oxide];

    /// Wire name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tom => "tom",
            Self::Oxide => "oxide",
        }
    }

    /// Static contract for this agent
    #[must_use]
    pub fn contract(self) -> &'static RoleContract {
        match self {
            Self::Tom => &TOM_CONTRACT,
            Self::Oxide => &OXIDE_CONTRACT,
        }
    }
}

impl std::str::FromStr for RoleAgent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tom" => Ok(Self::Tom),
            "oxide" => Ok(Self::Oxide),
            other => Err(format!("unknown role agent: {other}")),
        }
    }
}

/// What an agent is for and what it may never do
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleContract {
    /// Display name
    pub role: &'static str,
    /// What the agent does
    pub responsibilities: &'static [&'static str],
    /// What the agent may never do
    pub cannot: &'static [&'static str],
    /// Stages the agent may run
    pub allowed_stages: &'static [WorkflowStage],
}

static TOM_CONTRACT: RoleContract = RoleContract {
    role: "ToM",
    responsibilities: &["skill discovery", "context synthesis", "governed orchestration"],
    cannot: &["direct promote", "policy override", "unreviewed deployment"],
    allowed_stages: &[WorkflowStage::Discover],
};

static OXIDE_CONTRACT: RoleContract = RoleContract {
    role: "O.X.I.D.E",
    responsibilities: &["deterministic proposal synthesis", "policy-aware validation support"],
    cannot: &["executive override", "self-approval", "autonomous deployment"],
    allowed_stages: &[WorkflowStage::Propose],
};

/// Check that `role` may execute `stage`
///
/// # Errors
/// Returns [`RolePolicyViolation`] naming the role's allowed stages.
pub fn assert_role_can_execute_stage(role: RoleAgent, stage: WorkflowStage) -> Result<(), RolePolicyViolation> {
    let allowed = role.contract().allowed_stages;
    if allowed.contains(&stage) {
        return Ok(());
    }
    tracing::warn!(role = role.as_str(), stage = stage.as_str(), "role policy violation");
    Err(RolePolicyViolation {
        role,
        requested_stage: stage,
        allowed_stages: allowed.to_vec(),
    })
}
