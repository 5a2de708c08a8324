//! Orchestration events.
//!
//! The AI pipeline (planner, vendor expert, policy judge) runs outside this
//! core; its finished artifacts arrive here as events. The state machine
//! only ever reacts to "artifact ready" — it never waits inline on
//! generation.

use serde::{Deserialize, Serialize};

use crate::artifacts::plan::Plan;
use crate::artifacts::translation::VendorTranslation;
use crate::artifacts::verdict::PolicyVerdict;

use super::risk::RiskFactors;

/// Everything that can happen to a run. Payload shape depends on the kind:
/// `PlanReady` carries a plan, `VerdictReady` carries a verdict, and so on.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "snake_case")]
pub enum RunEvent {
    /// Begin execution: intake checks run against intent and scope.
    Started,
    /// The context pack for the run was built.
    ContextReady { hash: String },
    /// Deterministic lint/digest checks passed; risk factors assessed.
    ChecksPassed { factors: RiskFactors },
    /// Planner produced a task graph.
    PlanReady { plan: Plan },
    /// Vendor expert produced per-device configurations.
    TranslationReady { translation: VendorTranslation },
    /// Verification and rollback plans were assembled.
    VerificationBuilt {
        has_verify_plan: bool,
        has_rollback_plan: bool,
    },
    /// Policy judge delivered its verdict.
    VerdictReady { verdict: PolicyVerdict },
    /// A human recorded an approval.
    ApprovalGranted { approver: String },
    /// A human rejected the change.
    ApprovalDenied { approver: String, reason: String },
    /// Open critical findings were explicitly waived.
    FindingsWaived { reason: String },
    /// Begin deployment. All deploy gates are evaluated here.
    DeployStarted,
    /// Deployment finished successfully.
    DeployCompleted,
    /// Roll the change back.
    RollbackRequested { reason: String },
    /// The run failed irrecoverably.
    Failed { error: String },
    /// The run was abandoned.
    Cancelled { reason: String },
}

impl RunEvent {
    /// Stable event name for logs and guard-failure messages.
    pub fn name(&self) -> &'static str {
        match self {
            RunEvent::Started => "started",
            RunEvent::ContextReady { .. } => "context_ready",
            RunEvent::ChecksPassed { .. } => "checks_passed",
            RunEvent::PlanReady { .. } => "plan_ready",
            RunEvent::TranslationReady { .. } => "translation_ready",
            RunEvent::VerificationBuilt { .. } => "verification_built",
            RunEvent::VerdictReady { .. } => "verdict_ready",
            RunEvent::ApprovalGranted { .. } => "approval_granted",
            RunEvent::ApprovalDenied { .. } => "approval_denied",
            RunEvent::FindingsWaived { .. } => "findings_waived",
            RunEvent::DeployStarted => "deploy_started",
            RunEvent::DeployCompleted => "deploy_completed",
            RunEvent::RollbackRequested { .. } => "rollback_requested",
            RunEvent::Failed { .. } => "failed",
            RunEvent::Cancelled { .. } => "cancelled",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_tagged_payloads() {
        let event = RunEvent::ContextReady {
            hash: "abc123".into(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "context_ready");
        assert_eq!(value["payload"]["hash"], "abc123");

        let bare = serde_json::to_value(RunEvent::DeployStarted).unwrap();
        assert_eq!(bare["event"], "deploy_started");
    }

    #[test]
    fn unknown_event_kind_is_rejected() {
        let json = r#"{"event": "warp_drive", "payload": {}}"#;
        assert!(serde_json::from_str::<RunEvent>(json).is_err());
    }
}
