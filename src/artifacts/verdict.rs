//! Policy-judge output — the verdict that gates deployment.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::orchestrator::model::RiskLevel;

// ─── Decision & findings ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyDecision {
    Approve,
    Deny,
    NeedsRevision,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FindingSeverity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyFinding {
    pub rule_id: String,
    pub rule_name: String,
    pub severity: FindingSeverity,
    pub message: String,
    pub device_id: Option<String>,
    pub remediation: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceSummary {
    pub passed: u32,
    pub failed: u32,
    pub warnings: u32,
    #[serde(default)]
    pub findings: Vec<PolicyFinding>,
}

// ─── PolicyVerdict ────────────────────────────────────────────────────────────

/// The judge's full output. The state machine only accepts verdicts whose
/// `referenced_plan_id` matches the currently active plan — a verdict for a
/// superseded plan surfaces as an explicit staleness guard failure, never a
/// silent ignore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyVerdict {
    pub version: String,
    pub evaluated_at: DateTime<Utc>,
    pub decision: PolicyDecision,
    /// Judge self-confidence, 0–1.
    pub confidence: f64,
    pub risk_level: RiskLevel,
    pub rationale: String,
    pub referenced_plan_id: String,
    #[serde(default)]
    pub compliance: ComplianceSummary,
}

impl PolicyVerdict {
    /// Structural validation — staleness is checked separately by the state
    /// machine, against the run's active plan.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(ValidationError::ConfidenceOutOfRange(self.confidence));
        }
        if self.rationale.trim().is_empty() {
            return Err(ValidationError::RationaleMissing);
        }
        if self.referenced_plan_id.trim().is_empty() {
            return Err(ValidationError::ReferencedPlanMissing);
        }
        Ok(())
    }

    pub fn has_critical_findings(&self) -> bool {
        self.compliance
            .findings
            .iter()
            .any(|f| f.severity == FindingSeverity::Critical)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verdict() -> PolicyVerdict {
        PolicyVerdict {
            version: "v1".into(),
            evaluated_at: Utc::now(),
            decision: PolicyDecision::Approve,
            confidence: 0.9,
            risk_level: RiskLevel::Medium,
            rationale: "No policy violations.".into(),
            referenced_plan_id: "plan-001".into(),
            compliance: ComplianceSummary::default(),
        }
    }

    #[test]
    fn valid_verdict_passes() {
        assert!(verdict().validate().is_ok());
    }

    #[test]
    fn out_of_range_confidence_is_rejected() {
        let mut v = verdict();
        v.confidence = 1.5;
        assert_eq!(v.validate().unwrap_err().code(), "confidence_out_of_range");
    }

    #[test]
    fn empty_rationale_is_rejected() {
        let mut v = verdict();
        v.rationale = "  ".into();
        assert_eq!(v.validate().unwrap_err().code(), "rationale_missing");
    }

    #[test]
    fn missing_plan_reference_is_rejected() {
        let mut v = verdict();
        v.referenced_plan_id = String::new();
        assert_eq!(v.validate().unwrap_err().code(), "referenced_plan_missing");
    }

    #[test]
    fn critical_finding_is_detected() {
        let mut v = verdict();
        assert!(!v.has_critical_findings());
        v.compliance.findings.push(PolicyFinding {
            rule_id: "SEC-001".into(),
            rule_name: "no default communities".into(),
            severity: FindingSeverity::Critical,
            message: "community 'public' present".into(),
            device_id: Some("sw1".into()),
            remediation: None,
        });
        assert!(v.has_critical_findings());
    }

    #[test]
    fn decision_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&PolicyDecision::NeedsRevision).unwrap(),
            "\"needs_revision\""
        );
    }
}
