//! Autonomy Gate
//!
//! Reconciles the release gate with human-in-the-loop (HITL) overrides.
//! Under GO, normal autonomy applies. Under NO-GO, autonomy is granted only
//! for a complete, unexpired HITL token carrying the required authorization
//! language, and only if the optional acceptance hook agrees.

use crate::privileged::FinalGateStatus;
use chrono::{DateTime, Utc};
use oxide_token::validate::parse_timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Phrases that must all appear in `authorizationLanguage`, ignoring case
pub const REQUIRED_AUTHORIZATION_PHRASES: [&str; 3] = [
    "i acknowledge the system is in no-go",
    "i accept the associated risks",
    "you are granted full control within the approved project scope until completion or expiration",
];

/// Human-issued override of a NO-GO autonomy decision
///
/// Missing fields deserialize as empty and are reported by validation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HitlOverrideToken {
    /// Override id
    pub override_id: String,
    /// Human approver
    pub approver: String,
    /// Project the override covers
    pub project_scope: String,
    /// Accepted risk statement
    pub risk_acceptance: String,
    /// RFC 3339 issuance time
    pub issued_at: String,
    /// RFC 3339 expiry time
    pub expires_at: String,
    /// Proposal the override approves
    pub linked_proposal_ref: String,
    /// Must contain the required acknowledgement
    pub authorization_language: String,
}

/// Validity plus every problem found
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// `true` when `errors` is empty
    pub valid: bool,
    /// Every problem found
    pub errors: Vec<String>,
}

impl ValidationResult {
    pub(crate) fn from_errors(errors: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }
}

/// Validate a HITL override token at `now`
#[must_use]
pub fn validate_hitl_override_token(token: Option<&HitlOverrideToken>, now: DateTime<Utc>) -> ValidationResult {
    let Some(token) = token else {
        return ValidationResult::from_errors(vec!["override token missing".to_owned()]);
    };

    let mut errors = Vec::new();
    for (field, value) in [
        ("overrideId", &token.override_id),
        ("approver", &token.approver),
        ("projectScope", &token.project_scope),
        ("riskAcceptance", &token.risk_acceptance),
        ("linkedProposalRef", &token.linked_proposal_ref),
    ] {
        if value.trim().is_empty() {
            errors.push(format!("{field} must be a non-empty string"));
        }
    }

    let issued_at = parse_timestamp(&token.issued_at);
    let expires_at = parse_timestamp(&token.expires_at);
    if issued_at.is_none() {
        errors.push("issuedAt must be an ISO timestamp".to_owned());
    }
    if expires_at.is_none() {
        errors.push("expiresAt must be an ISO timestamp".to_owned());
    }
    if let (Some(issued), Some(expires)) = (issued_at, expires_at) {
        if expires <= issued {
            errors.push("expiresAt must be later than issuedAt".to_owned());
        }
    }
    if expires_at.is_some_and(|expires| expires <= now) {
        errors.push("override token is expired".to_owned());
    }

    let language = token.authorization_language.trim().to_lowercase();
    if language.is_empty() {
        errors.push("authorizationLanguage must be a non-empty string".to_owned());
    } else {
        for phrase in REQUIRED_AUTHORIZATION_PHRASES {
            if !language.contains(phrase) {
                errors.push(format!("authorizationLanguage missing required phrase: {phrase}"));
            }
        }
    }

    ValidationResult::from_errors(errors)
}

/// Named autonomy state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AutonomyState {
    /// NO-GO without an accepted override
    SupervisedNoGo,
    /// NO-GO with an accepted HITL override
    OverrideAutonomy,
    /// Release gate is GO
    NormalGo,
}

/// Outcome of [`evaluate_autonomy_gate`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutonomyGateDecision {
    /// Gate status evaluated
    pub final_gate: FinalGateStatus,
    /// Resulting autonomy state
    pub state: AutonomyState,
    /// Whether autonomous execution may proceed
    pub autonomy_granted: bool,
    /// Human-readable explanation
    pub reason: String,
    /// Whether a HITL override was applied
    pub override_active: bool,
    /// Id of the applied override
    pub override_id: Option<String>,
}

/// Hook that may veto an otherwise valid override
pub type AcceptOverride<'a> = &'a (dyn Fn(&HitlOverrideToken) -> Result<(), String> + Send + Sync);

/// Inputs to [`evaluate_autonomy_gate`] beyond the gate status
#[derive(Default, Clone)]
pub struct AutonomyOptions<'a> {
    /// HITL override to consider under NO-GO
    pub token: Option<&'a HitlOverrideToken>,
    /// Precomputed validation; computed from `token` when absent
    pub token_validation: Option<ValidationResult>,
    /// Veto hook run before an override is applied
    pub on_accept_override: Option<AcceptOverride<'a>>,
    /// Evaluation time; defaults to now
    pub now: Option<DateTime<Utc>>,
}

impl fmt::Debug for AutonomyOptions<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AutonomyOptions")
            .field("token", &self.token.map(|t| t.override_id.as_str()))
            .field("token_validation", &self.token_validation)
            .field("on_accept_override", &self.on_accept_override.is_some())
            .field("now", &self.now)
            .finish()
    }
}

impl<'a> AutonomyOptions<'a> {
    /// Set the HITL token
    #[must_use]
    pub fn with_token(mut self, token: Option<&'a HitlOverrideToken>) -> Self {
        self.token = token;
        self
    }

    /// Use a precomputed validation
    #[must_use]
    pub fn with_validation(mut self, validation: ValidationResult) -> Self {
        self.token_validation = Some(validation);
        self
    }

    /// Install the veto hook
    #[must_use]
    pub fn on_accept(mut self, hook: AcceptOverride<'a>) -> Self {
        self.on_accept_override = Some(hook);
        self
    }

    /// Evaluate at a fixed time
    #[must_use]
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }
}

/// Decide the autonomy state for `final_gate`
#[must_use]
pub fn evaluate_autonomy_gate(final_gate: FinalGateStatus, options: AutonomyOptions<'_>) -> AutonomyGateDecision {
    if final_gate == FinalGateStatus::Go {
        return AutonomyGateDecision {
            final_gate,
            state: AutonomyState::NormalGo,
            autonomy_granted: true,
            reason: "Final gate is GO; normal autonomy policy applies.".to_owned(),
            override_active: false,
            override_id: None,
        };
    }

    let now = options.now.unwrap_or_else(Utc::now);
    let validation = options
        .token_validation
        .unwrap_or_else(|| validate_hitl_override_token(options.token, now));

    let mut errors = validation.errors;
    if let (true, Some(token)) = (validation.valid, options.token) {
        match options.on_accept_override.map_or(Ok(()), |hook| hook(token)) {
            Ok(()) => {
                tracing::info!(override_id = %token.override_id, approver = %token.approver, "HITL override accepted");
                return AutonomyGateDecision {
                    final_gate,
                    state: AutonomyState::OverrideAutonomy,
                    autonomy_granted: true,
                    reason: "NO-GO overridden by valid HITL token; bounded temporary autonomy granted.".to_owned(),
                    override_active: true,
                    override_id: Some(token.override_id.clone()),
                };
            }
            Err(rejection) => errors.push(format!("override rejected: {rejection}")),
        }
    }
    if errors.is_empty() {
        errors.push("override token missing".to_owned());
    }

    AutonomyGateDecision {
        final_gate,
        state: AutonomyState::SupervisedNoGo,
        autonomy_granted: false,
        reason: format!("NO-GO blocks autonomy; no valid HITL override token ({}).", errors.join("; ")),
        override_active: false,
        override_id: None,
    }
}
