//! Orchestration run data model: statuses, layers, risk levels, and the run
//! entity with its append-only transition log.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::artifacts::plan::Plan;
use crate::artifacts::translation::VendorTranslation;
use crate::artifacts::verdict::PolicyVerdict;

// ─── RunStatus ────────────────────────────────────────────────────────────────

/// The finite set of statuses a run can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Running,
    AwaitingApproval,
    Approved,
    Rejected,
    Deploying,
    Deployed,
    RolledBack,
    Failed,
    Cancelled,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Pending => "pending",
            RunStatus::Running => "running",
            RunStatus::AwaitingApproval => "awaiting_approval",
            RunStatus::Approved => "approved",
            RunStatus::Rejected => "rejected",
            RunStatus::Deploying => "deploying",
            RunStatus::Deployed => "deployed",
            RunStatus::RolledBack => "rolled_back",
            RunStatus::Failed => "failed",
            RunStatus::Cancelled => "cancelled",
        }
    }

    /// True when no event can move the run anywhere. `Deployed` is not
    /// terminal: it still admits the explicit rollback transition.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunStatus::Rejected | RunStatus::RolledBack | RunStatus::Failed | RunStatus::Cancelled
        )
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Layer ────────────────────────────────────────────────────────────────────

/// One stage of the orchestration pipeline. Runs traverse `LAYER_ORDER`
/// strictly forward; only the explicit rollback transition moves a run out
/// of sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Layer {
    #[serde(rename = "L0_intake")]
    L0Intake,
    #[serde(rename = "L1_context")]
    L1Context,
    #[serde(rename = "L2_deterministic")]
    L2Deterministic,
    #[serde(rename = "L3_planner")]
    L3Planner,
    #[serde(rename = "L4_expert")]
    L4Expert,
    #[serde(rename = "L5_verification")]
    L5Verification,
    #[serde(rename = "L6_judge")]
    L6Judge,
    #[serde(rename = "L7_deploy")]
    L7Deploy,
}

/// The fixed total order all runs traverse.
pub const LAYER_ORDER: [Layer; 8] = [
    Layer::L0Intake,
    Layer::L1Context,
    Layer::L2Deterministic,
    Layer::L3Planner,
    Layer::L4Expert,
    Layer::L5Verification,
    Layer::L6Judge,
    Layer::L7Deploy,
];

impl Layer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Layer::L0Intake => "L0_intake",
            Layer::L1Context => "L1_context",
            Layer::L2Deterministic => "L2_deterministic",
            Layer::L3Planner => "L3_planner",
            Layer::L4Expert => "L4_expert",
            Layer::L5Verification => "L5_verification",
            Layer::L6Judge => "L6_judge",
            Layer::L7Deploy => "L7_deploy",
        }
    }

    /// Position in `LAYER_ORDER` (0–7).
    pub fn index(&self) -> usize {
        LAYER_ORDER.iter().position(|l| l == self).unwrap_or(0)
    }

    pub fn next(&self) -> Option<Layer> {
        LAYER_ORDER.get(self.index() + 1).copied()
    }

    pub fn previous(&self) -> Option<Layer> {
        self.index().checked_sub(1).map(|i| LAYER_ORDER[i])
    }
}

impl std::fmt::Display for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── RiskLevel ────────────────────────────────────────────────────────────────

/// Derived change risk. Ordered so thresholds compare naturally.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Scope, gates, log ────────────────────────────────────────────────────────

/// What the change targets. A run must target at least one device or filter
/// before it can leave intake.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RunScope {
    pub device_ids: Vec<String>,
    pub sites: Vec<String>,
    pub roles: Vec<String>,
    pub vendors: Vec<String>,
    pub tags: Vec<String>,
}

impl RunScope {
    /// Tags alone do not count as targeting.
    pub fn is_targeted(&self) -> bool {
        !self.device_ids.is_empty()
            || !self.sites.is_empty()
            || !self.roles.is_empty()
            || !self.vendors.is_empty()
    }
}

/// Deploy gating flags, all false until the pipeline earns them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunGates {
    pub has_verify_plan: bool,
    pub has_rollback_plan: bool,
    pub has_critical_findings: bool,
    pub critical_findings_waived: bool,
    pub deploy_enabled: bool,
}

/// One applied transition. The log is append-only; rejected transitions are
/// returned to the caller and never appear here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionLogEntry {
    pub ts: DateTime<Utc>,
    pub from_status: RunStatus,
    pub to_status: RunStatus,
    pub from_layer: Layer,
    pub to_layer: Layer,
    pub actor: String,
    pub reason: String,
}

// ─── OrchestrationRun ─────────────────────────────────────────────────────────

/// One stateful change working through the layered pipeline. Mutated only
/// through state-machine transitions; never deleted, only closed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestrationRun {
    pub id: String,
    pub intent: String,
    #[serde(default)]
    pub intent_params: BTreeMap<String, serde_json::Value>,
    pub scope: RunScope,

    pub status: RunStatus,
    pub current_layer: Layer,

    /// Hash of the context pack built for this run.
    pub context_hash: Option<String>,

    pub risk_level: Option<RiskLevel>,
    pub required_approvals: u32,
    pub received_approvals: u32,
    #[serde(default)]
    pub approvers: Vec<String>,

    pub gates: RunGates,

    pub plan: Option<Plan>,
    /// Checksum of the active plan, fixed at acceptance time.
    pub plan_checksum: Option<String>,
    pub translation: Option<VendorTranslation>,
    pub verdict: Option<PolicyVerdict>,

    pub transition_log: Vec<TransitionLogEntry>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_by: String,
    pub error_message: Option<String>,
}

impl OrchestrationRun {
    pub fn new(
        id: impl Into<String>,
        intent: impl Into<String>,
        scope: RunScope,
        created_by: impl Into<String>,
        deploy_enabled: bool,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            intent: intent.into(),
            intent_params: BTreeMap::new(),
            scope,
            status: RunStatus::Pending,
            current_layer: Layer::L0Intake,
            context_hash: None,
            risk_level: None,
            required_approvals: 1,
            received_approvals: 0,
            approvers: Vec::new(),
            gates: RunGates {
                deploy_enabled,
                ..RunGates::default()
            },
            plan: None,
            plan_checksum: None,
            translation: None,
            verdict: None,
            transition_log: Vec::new(),
            created_at,
            updated_at: created_at,
            started_at: None,
            completed_at: None,
            created_by: created_by.into(),
            error_message: None,
        }
    }

    /// Completion percentage, 0–100.
    pub fn progress(&self) -> u8 {
        let total = LAYER_ORDER.len() as u32;
        let index = self.current_layer.index() as u32;
        if self.status == RunStatus::Deployed {
            return 100;
        }
        if self.status.is_terminal() {
            return (index * (100 / total)) as u8;
        }
        ((index * 100) / total) as u8
    }

    /// Human-readable status line.
    pub fn status_description(&self) -> String {
        match self.status {
            RunStatus::Pending => "Run is pending, waiting to start".to_string(),
            RunStatus::Running => format!("Currently executing {}", self.current_layer),
            RunStatus::AwaitingApproval => format!(
                "Awaiting approval ({}/{})",
                self.received_approvals, self.required_approvals
            ),
            RunStatus::Approved => "Approved and ready for deployment".to_string(),
            RunStatus::Rejected => "Change was rejected".to_string(),
            RunStatus::Deploying => "Deployment in progress".to_string(),
            RunStatus::Deployed => "Successfully deployed".to_string(),
            RunStatus::RolledBack => "Changes were rolled back".to_string(),
            RunStatus::Failed => format!(
                "Failed: {}",
                self.error_message.as_deref().unwrap_or("unknown error")
            ),
            RunStatus::Cancelled => "Run was cancelled".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layer_order_is_total_and_monotonic() {
        for (i, layer) in LAYER_ORDER.iter().enumerate() {
            assert_eq!(layer.index(), i);
        }
        assert_eq!(Layer::L0Intake.next(), Some(Layer::L1Context));
        assert_eq!(Layer::L7Deploy.next(), None);
        assert_eq!(Layer::L0Intake.previous(), None);
        assert_eq!(Layer::L7Deploy.previous(), Some(Layer::L6Judge));
    }

    #[test]
    fn terminal_statuses() {
        assert!(RunStatus::RolledBack.is_terminal());
        assert!(RunStatus::Cancelled.is_terminal());
        assert!(!RunStatus::Deployed.is_terminal());
        assert!(!RunStatus::Running.is_terminal());
    }

    #[test]
    fn risk_levels_are_ordered() {
        assert!(RiskLevel::Low < RiskLevel::Medium);
        assert!(RiskLevel::High < RiskLevel::Critical);
    }

    #[test]
    fn scope_targeting_ignores_tags() {
        let mut scope = RunScope::default();
        assert!(!scope.is_targeted());
        scope.tags.push("maintenance".into());
        assert!(!scope.is_targeted());
        scope.sites.push("hq".into());
        assert!(scope.is_targeted());
    }

    #[test]
    fn layer_serializes_with_wire_names() {
        assert_eq!(
            serde_json::to_string(&Layer::L2Deterministic).unwrap(),
            "\"L2_deterministic\""
        );
    }

    #[test]
    fn progress_reaches_100_only_when_deployed() {
        let mut run = OrchestrationRun::new(
            "r1",
            "add vlan",
            RunScope::default(),
            "tester",
            false,
            Utc::now(),
        );
        assert_eq!(run.progress(), 0);
        run.current_layer = Layer::L7Deploy;
        run.status = RunStatus::Deploying;
        assert!(run.progress() < 100);
        run.status = RunStatus::Deployed;
        assert_eq!(run.progress(), 100);
    }
}
