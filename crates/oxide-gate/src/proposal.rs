//! Cycle proposal payloads
//!
//! A knowledge cycle produces a proposal at the `propose` stage. The payload
//! pins the canonical stage order and authority table so a downstream
//! validator can reject a proposal that tries to reassign approval.

use crate::autonomy::{
    evaluate_autonomy_gate, validate_hitl_override_token, AutonomyGateDecision, AutonomyOptions,
    HitlOverrideToken, ValidationResult,
};
use crate::privileged::FinalGateStatus;
use crate::roles::{Authority, WorkflowStage};
use chrono::{DateTime, Utc};
use oxide_token::RiskLevel;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Schema version stamped on every proposal
pub const PROPOSAL_SCHEMA_VERSION: &str = "1.0";

/// Summary of one indexing cycle
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleReport {
    /// RFC 3339 cycle start
    pub started_at: String,
    /// RFC 3339 cycle end
    pub finished_at: String,
    /// Documents found on disk
    #[serde(default)]
    pub documents_discovered: u64,
    /// Documents written to the index
    pub documents_indexed: u64,
    /// Chunks written to the index
    #[serde(default)]
    pub chunks_indexed: u64,
    /// Web searches issued
    pub web_queries_run: u64,
    /// Web results indexed
    pub web_documents_indexed: u64,
}

/// Stage order and the proposal's position in it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalLifecycle {
    /// Canonical stage order
    pub stages: Vec<WorkflowStage>,
    /// Always `propose` when built
    pub current_stage: WorkflowStage,
}

/// Report fields carried into the proposal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalReport {
    /// Cycle start
    pub started_at: String,
    /// Cycle end
    pub finished_at: String,
    /// Documents indexed
    pub documents_indexed: u64,
    /// Web results indexed
    pub web_documents_indexed: u64,
    /// Web searches issued
    pub web_queries_run: u64,
}

/// Proposal submitted for approval
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleProposalPayload {
    /// Always [`PROPOSAL_SCHEMA_VERSION`]
    pub schema_version: String,
    /// Cycle run id
    pub workflow_run_id: String,
    /// Stage order
    pub lifecycle: ProposalLifecycle,
    /// Authority per stage
    pub authority: BTreeMap<WorkflowStage, Authority>,
    /// Cycle summary
    pub report: ProposalReport,
    /// Suggested next actions
    pub recommended_actions: Vec<String>,
}

/// Build a proposal for `report` at the `propose` stage
#[must_use]
pub fn create_cycle_proposal_payload(
    workflow_run_id: impl Into<String>,
    report: &CycleReport,
    recommended_actions: Vec<String>,
) -> CycleProposalPayload {
    CycleProposalPayload {
        schema_version: PROPOSAL_SCHEMA_VERSION.to_owned(),
        workflow_run_id: workflow_run_id.into(),
        lifecycle: ProposalLifecycle {
            stages: WorkflowStage::ALL.to_vec(),
            current_stage: WorkflowStage::Propose,
        },
        authority: WorkflowStage::ALL.into_iter().map(|s| (s, s.authority())).collect(),
        report: ProposalReport {
            started_at: report.started_at.clone(),
            finished_at: report.finished_at.clone(),
            documents_indexed: report.documents_indexed,
            web_documents_indexed: report.web_documents_indexed,
            web_queries_run: report.web_queries_run,
        },
        recommended_actions,
    }
}

/// Check an untrusted proposal payload, reporting every problem
#[must_use]
pub fn validate_cycle_proposal_payload(payload: &Value) -> ValidationResult {
    let Some(value) = payload.as_object() else {
        return ValidationResult::from_errors(vec!["payload must be an object".to_owned()]);
    };
    let mut errors = Vec::new();
    let non_empty_str = |v: Option<&Value>| v.and_then(Value::as_str).is_some_and(|s| !s.is_empty());

    if value.get("schemaVersion").and_then(Value::as_str) != Some(PROPOSAL_SCHEMA_VERSION) {
        errors.push(format!("schemaVersion must be '{PROPOSAL_SCHEMA_VERSION}'"));
    }
    if !non_empty_str(value.get("workflowRunId")) {
        errors.push("workflowRunId must be a non-empty string".to_owned());
    }

    match value.get("lifecycle").and_then(Value::as_object) {
        None => errors.push("lifecycle must be an object".to_owned()),
        Some(lifecycle) => {
            match lifecycle.get("stages").and_then(Value::as_array) {
                None => errors.push("lifecycle.stages must be an array".to_owned()),
                Some(stages) => {
                    let canonical = stages.len() == WorkflowStage::ALL.len()
                        && stages
                            .iter()
                            .zip(WorkflowStage::ALL)
                            .all(|(given, stage)| given.as_str() == Some(stage.as_str()));
                    if !canonical {
                        errors.push("lifecycle.stages must match canonical stage order".to_owned());
                    }
                }
            }
            if lifecycle.get("currentStage").and_then(Value::as_str) != Some(WorkflowStage::Propose.as_str()) {
                errors.push("lifecycle.currentStage must be 'propose'".to_owned());
            }
        }
    }

    match value.get("authority").and_then(Value::as_object) {
        None => errors.push("authority must be an object".to_owned()),
        Some(authority) => {
            for stage in WorkflowStage::ALL {
                let expected = stage.authority().as_str();
                if authority.get(stage.as_str()).and_then(Value::as_str) != Some(expected) {
                    errors.push(format!("authority.{stage} must be '{expected}'"));
                }
            }
        }
    }

    match value.get("report").and_then(Value::as_object) {
        None => errors.push("report must be an object".to_owned()),
        Some(report) => {
            for field in ["startedAt", "finishedAt"] {
                if !non_empty_str(report.get(field)) {
                    errors.push(format!("report.{field} must be a non-empty string"));
                }
            }
            for field in ["documentsIndexed", "webDocumentsIndexed", "webQueriesRun"] {
                if !report.get(field).is_some_and(Value::is_number) {
                    errors.push(format!("report.{field} must be a number"));
                }
            }
        }
    }

    match value.get("recommendedActions").and_then(Value::as_array) {
        None => errors.push("recommendedActions must be an array".to_owned()),
        Some(actions) if actions.is_empty() => {
            errors.push("recommendedActions must include at least one action".to_owned());
        }
        Some(actions) => {
            if !actions.iter().all(|a| a.as_str().is_some_and(|s| !s.trim().is_empty())) {
                errors.push("recommendedActions must contain non-empty strings".to_owned());
            }
        }
    }

    ValidationResult::from_errors(errors)
}

/// Verdict on a proposal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProposalDecision {
    /// May advance
    Validated,
    /// Sent back
    Rejected,
}

/// Deterministic policy verdict on a proposal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyDecision {
    /// Whether the proposal passed
    pub policy_pass: bool,
    /// Assessed risk
    pub risk_level: RiskLevel,
    /// Confidence in the verdict, from 0.0 to 1.0
    pub determinism_score: f64,
    /// Verdict
    pub decision: ProposalDecision,
    /// Explanation
    pub reason: String,
    /// Autonomy decision made alongside
    pub autonomy_gate: AutonomyGateDecision,
}

/// Decide whether a proposal may advance
///
/// - invalid payload: rejected, critical risk, autonomy evaluated under NO-GO
/// - zero documents indexed: NO-GO; a valid HITL override validates it at
///   high risk, otherwise it is rejected at medium risk
/// - otherwise: validated, low risk, autonomy under GO
#[must_use]
pub fn decide_cycle_proposal_policy(
    payload: &Value,
    validation: &ValidationResult,
    hitl: Option<&HitlOverrideToken>,
    now: DateTime<Utc>,
) -> PolicyDecision {
    let override_validation = validate_hitl_override_token(hitl, now);
    let gate = |status| {
        evaluate_autonomy_gate(
            status,
            AutonomyOptions::default()
                .with_token(hitl)
                .with_validation(override_validation.clone())
                .at(now),
        )
    };

    if !validation.valid {
        return PolicyDecision {
            policy_pass: false,
            risk_level: RiskLevel::Critical,
            determinism_score: 0.0,
            decision: ProposalDecision::Rejected,
            reason: format!("Proposal payload schema validation failed: {}", validation.errors.join("; ")),
            autonomy_gate: gate(FinalGateStatus::NoGo),
        };
    }

    let documents_indexed = payload["report"]["documentsIndexed"].as_f64().unwrap_or(0.0);
    if documents_indexed <= 0.0 {
        let autonomy_gate = gate(FinalGateStatus::NoGo);
        if autonomy_gate.autonomy_granted {
            return PolicyDecision {
                policy_pass: true,
                risk_level: RiskLevel::High,
                determinism_score: 0.65,
                decision: ProposalDecision::Validated,
                reason: format!(
                    "NO-GO overridden by valid HITL authorization ({}); bounded autonomy granted.",
                    autonomy_gate.override_id.as_deref().unwrap_or_default()
                ),
                autonomy_gate,
            };
        }
        return PolicyDecision {
            policy_pass: false,
            risk_level: RiskLevel::Medium,
            determinism_score: 0.8,
            decision: ProposalDecision::Rejected,
            reason: "Cycle indexed zero documents; proposal blocked by deterministic policy gate.".to_owned(),
            autonomy_gate,
        };
    }

    PolicyDecision {
        policy_pass: true,
        risk_level: RiskLevel::Low,
        determinism_score: 1.0,
        decision: ProposalDecision::Validated,
        reason: "Cycle payload passed schema and deterministic policy gates.".to_owned(),
        autonomy_gate: gate(FinalGateStatus::Go),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autonomy::AutonomyState;
    use oxide_test_utils::{fixed_now, hitl_token_value_at};
    use serde_json::json;

    fn report(documents_indexed: u64) -> CycleReport {
        CycleReport {
            started_at: "2026-10-16T11:00:00Z".into(),
            finished_at: "2026-10-16T11:05:00Z".into(),
            documents_discovered: 12,
            documents_indexed,
            chunks_indexed: 40,
            web_queries_run: 2,
            web_documents_indexed: 1,
        }
    }

    fn payload(documents_indexed: u64) -> Value {
        let proposal = create_cycle_proposal_payload("run-42", &report(documents_indexed), vec!["refresh embeddings".into()]);
        serde_json::to_value(proposal).unwrap()
    }

    fn hitl() -> HitlOverrideToken {
        serde_json::from_value(hitl_token_value_at(fixed_now())).unwrap()
    }

    #[test]
    fn created_payload_is_valid_and_canonical() {
        let value = payload(3);
        assert!(validate_cycle_proposal_payload(&value).valid);
        assert_eq!(value["lifecycle"]["currentStage"], "propose");
        assert_eq!(value["authority"]["approve"], "oxide-governance");
        assert_eq!(value["lifecycle"]["stages"], json!(["discover", "propose", "validate", "approve", "promote"]));
    }

    #[test]
    fn reassigned_authority_and_bad_fields_are_all_reported() {
        let mut value = payload(3);
        value["authority"]["approve"] = "oxide".into();
        value["lifecycle"]["stages"] = json!(["propose", "discover"]);
        value["recommendedActions"] = json!([]);
        value["report"]["webQueriesRun"] = "two".into();

        let result = validate_cycle_proposal_payload(&value);
        assert!(!result.valid);
        assert_eq!(
            result.errors,
            vec![
                "lifecycle.stages must match canonical stage order",
                "authority.approve must be 'oxide-governance'",
                "report.webQueriesRun must be a number",
                "recommendedActions must include at least one action",
            ]
        );
    }

    #[test]
    fn non_object_payload_is_rejected() {
        let result = validate_cycle_proposal_payload(&json!([1, 2]));
        assert_eq!(result.errors, vec!["payload must be an object"]);
    }

    #[test]
    fn invalid_payload_is_critical() {
        let value = json!({ "schemaVersion": "0.9" });
        let validation = validate_cycle_proposal_payload(&value);
        let decision = decide_cycle_proposal_policy(&value, &validation, None, fixed_now());

        assert_eq!(decision.decision, ProposalDecision::Rejected);
        assert_eq!(decision.risk_level, RiskLevel::Critical);
        assert!(decision.determinism_score.abs() < f64::EPSILON);
        assert_eq!(decision.autonomy_gate.final_gate, FinalGateStatus::NoGo);
    }

    #[test]
    fn zero_documents_without_override_is_blocked() {
        let value = payload(0);
        let validation = validate_cycle_proposal_payload(&value);
        let decision = decide_cycle_proposal_policy(&value, &validation, None, fixed_now());

        assert!(!decision.policy_pass);
        assert_eq!(decision.risk_level, RiskLevel::Medium);
        assert!((decision.determinism_score - 0.8).abs() < f64::EPSILON);
        assert_eq!(decision.autonomy_gate.state, AutonomyState::SupervisedNoGo);
    }

    #[test]
    fn zero_documents_with_override_is_high_risk_validation() {
        let value = payload(0);
        let validation = validate_cycle_proposal_payload(&value);
        let token = hitl();
        let decision = decide_cycle_proposal_policy(&value, &validation, Some(&token), fixed_now());

        assert!(decision.policy_pass);
        assert_eq!(decision.risk_level, RiskLevel::High);
        assert!((decision.determinism_score - 0.65).abs() < f64::EPSILON);
        assert!(decision.reason.contains("hitl-2026-0001"));
        assert_eq!(decision.autonomy_gate.state, AutonomyState::OverrideAutonomy);
    }

    #[test]
    fn indexed_documents_validate_under_go() {
        let value = payload(5);
        let validation = validate_cycle_proposal_payload(&value);
        let decision = decide_cycle_proposal_policy(&value, &validation, None, fixed_now());

        assert_eq!(decision.decision, ProposalDecision::Validated);
        assert_eq!(decision.risk_level, RiskLevel::Low);
        assert_eq!(decision.autonomy_gate.state, AutonomyState::NormalGo);
        let wire = serde_json::to_value(&decision).unwrap();
        assert_eq!(wire["riskLevel"], "low");
        assert_eq!(wire["determinismScore"], json!(1.0));
    }
}
