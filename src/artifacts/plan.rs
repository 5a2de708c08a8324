//! Planner output — an ordered task graph over the current topology.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::ValidationError;
use crate::orchestrator::model::RiskLevel;
use crate::topology::model::TopologySnapshot;

// ─── Plan pieces ──────────────────────────────────────────────────────────────

/// What a single task does to its target device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanAction {
    Configure,
    Verify,
    Backup,
    Restore,
    Wait,
    Notify,
}

/// One intended change against one device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanTask {
    pub task_id: String,
    pub device_id: String,
    pub action: PlanAction,
    pub description: String,
    /// Task ids within the same phase that must complete first.
    #[serde(default)]
    pub depends_on: Vec<String>,
    pub timeout_secs: u64,
}

/// One rollout wave. Phases execute strictly in `order` — access-layer
/// devices land in earlier phases than core-layer devices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanPhase {
    pub phase_id: String,
    pub name: String,
    pub order: u32,
    pub tasks: Vec<PlanTask>,
    #[serde(default)]
    pub rollback_on_failure: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanRiskAssessment {
    pub level: RiskLevel,
    #[serde(default)]
    pub factors: Vec<String>,
    #[serde(default)]
    pub mitigations: Vec<String>,
    #[serde(default)]
    pub requires_maintenance_window: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RollbackAction {
    RestoreConfig,
    RunCommand,
    Notify,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollbackStep {
    pub order: u32,
    pub device_id: String,
    pub action: RollbackAction,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollbackStrategy {
    pub automatic: bool,
    #[serde(default)]
    pub triggers: Vec<String>,
    #[serde(default)]
    pub steps: Vec<RollbackStep>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationKind {
    Connectivity,
    Service,
    Metric,
    Manual,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationStep {
    pub step_id: String,
    pub name: String,
    pub kind: VerificationKind,
    pub target: Option<String>,
    pub expected_outcome: String,
    pub timeout_secs: u64,
}

// ─── Plan ─────────────────────────────────────────────────────────────────────

/// The planner's full output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub version: String,
    pub plan_id: String,
    pub summary: String,
    pub risk: PlanRiskAssessment,
    pub phases: Vec<PlanPhase>,
    pub rollback: RollbackStrategy,
    #[serde(default)]
    pub verification_steps: Vec<VerificationStep>,
}

impl Plan {
    /// SHA-256 over the canonical JSON serialization. This is the identity a
    /// policy verdict must reference — it changes whenever any field does.
    pub fn checksum(&self) -> String {
        let canonical = serde_json::to_vec(self).expect("plan serializes");
        hex::encode(Sha256::digest(canonical))
    }

    /// Every device this plan touches.
    pub fn device_ids(&self) -> BTreeSet<String> {
        self.phases
            .iter()
            .flat_map(|phase| phase.tasks.iter())
            .map(|task| task.device_id.clone())
            .collect()
    }

    /// Whole-or-nothing structural validation against the current topology.
    pub fn validate(&self, snapshot: &TopologySnapshot) -> Result<(), ValidationError> {
        if self.phases.is_empty() {
            return Err(ValidationError::EmptyPlan {
                plan_id: self.plan_id.clone(),
            });
        }

        let mut last_order: Option<u32> = None;
        for phase in &self.phases {
            if phase.tasks.is_empty() {
                return Err(ValidationError::EmptyPhase {
                    plan_id: self.plan_id.clone(),
                    phase_id: phase.phase_id.clone(),
                });
            }
            if let Some(prev) = last_order {
                if phase.order <= prev {
                    return Err(ValidationError::PhaseOrderInvalid {
                        plan_id: self.plan_id.clone(),
                    });
                }
            }
            last_order = Some(phase.order);

            for task in &phase.tasks {
                if !snapshot.has_node(&task.device_id) {
                    return Err(ValidationError::UnknownPlanTarget {
                        plan_id: self.plan_id.clone(),
                        node_id: task.device_id.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}
