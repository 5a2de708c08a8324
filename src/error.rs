//! Typed error taxonomy for the netops core.
//!
//! Two families, matching how callers must react:
//!
//! - [`ValidationError`] — a record or artifact is structurally bad. Rejected
//!   synchronously at the boundary, never partially applied.
//! - [`GuardFailure`] — a transition precondition did not hold. The run is
//!   unchanged; the failure is returned to the caller, never logged as a
//!   transition.
//!
//! Every variant carries a stable machine-checkable `code()` so external
//! workflow drivers can branch (retry, re-request a fresh verdict, abandon)
//! without parsing display strings.

use thiserror::Error;

use crate::orchestrator::model::{Layer, RunStatus};

// ─── ValidationError ──────────────────────────────────────────────────────────

/// Structural rejection of an inbound record or artifact.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("evidence endpoint has an empty node id")]
    EmptyNodeId,

    #[error("ports spec has {count} entries, exceeding the maximum of {max}")]
    TooManyPorts { count: usize, max: usize },

    #[error("plan '{plan_id}' has no phases")]
    EmptyPlan { plan_id: String },

    #[error("plan '{plan_id}' phase '{phase_id}' has no tasks")]
    EmptyPhase { plan_id: String, phase_id: String },

    #[error("plan '{plan_id}' references node '{node_id}' absent from the topology snapshot")]
    UnknownPlanTarget { plan_id: String, node_id: String },

    #[error("plan '{plan_id}' phase orders are not strictly increasing")]
    PhaseOrderInvalid { plan_id: String },

    #[error("translation targets plan '{referenced}', but was validated against plan '{active}'")]
    TranslationPlanMismatch { referenced: String, active: String },

    #[error("translation is missing device '{device_id}' assigned by plan '{plan_id}'")]
    TranslationMissingDevice { plan_id: String, device_id: String },

    #[error("translation covers device '{device_id}' the plan does not assign")]
    TranslationUnknownDevice { plan_id: String, device_id: String },

    #[error("verdict confidence {0} is outside [0, 1]")]
    ConfidenceOutOfRange(f64),

    #[error("verdict has an empty rationale")]
    RationaleMissing,

    #[error("verdict does not reference a plan id")]
    ReferencedPlanMissing,
}

impl ValidationError {
    /// Stable reason code for machine consumption.
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::EmptyNodeId => "empty_node_id",
            ValidationError::TooManyPorts { .. } => "too_many_ports",
            ValidationError::EmptyPlan { .. } => "empty_plan",
            ValidationError::EmptyPhase { .. } => "empty_phase",
            ValidationError::UnknownPlanTarget { .. } => "unknown_plan_target",
            ValidationError::PhaseOrderInvalid { .. } => "phase_order_invalid",
            ValidationError::TranslationPlanMismatch { .. } => "translation_plan_mismatch",
            ValidationError::TranslationMissingDevice { .. } => "translation_missing_device",
            ValidationError::TranslationUnknownDevice { .. } => "translation_unknown_device",
            ValidationError::ConfidenceOutOfRange(_) => "confidence_out_of_range",
            ValidationError::RationaleMissing => "rationale_missing",
            ValidationError::ReferencedPlanMissing => "referenced_plan_missing",
        }
    }
}

// ─── GuardFailure ─────────────────────────────────────────────────────────────

/// A rejected state-machine transition. Run state is unchanged.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GuardFailure {
    #[error("run '{0}' not found")]
    RunNotFound(String),

    #[error("run is in terminal status {status}")]
    TerminalStatus { status: RunStatus },

    #[error("event '{event}' is not valid in status {status}")]
    InvalidTransition {
        status: RunStatus,
        event: &'static str,
    },

    #[error("event '{event}' expects layer {expected}, but the run is at {current}")]
    LayerOutOfOrder {
        current: Layer,
        expected: Layer,
        event: &'static str,
    },

    #[error("intent is required")]
    IntentMissing,

    #[error("scope must target at least one device, site, role, or vendor")]
    ScopeEmpty,

    #[error("no topology snapshot is available to validate the plan against")]
    TopologyUnavailable,

    #[error("plan has not been delivered")]
    PlanMissing,

    #[error("policy verdict has not been delivered")]
    VerdictMissing,

    /// Distinguished from plain validation so callers re-request a fresh
    /// verdict instead of retrying blindly.
    #[error("verdict references plan '{referenced}', but the active plan is '{active}'")]
    StaleVerdict { referenced: String, active: String },

    #[error("policy judge rejected the change")]
    VerdictRejected,

    #[error("verification plan has not been built")]
    VerifyPlanMissing,

    #[error("rollback plan has not been built")]
    RollbackPlanMissing,

    #[error("critical findings must be resolved or waived")]
    CriticalFindingsOpen,

    #[error("run has no critical findings to waive")]
    NothingToWaive,

    #[error("insufficient approvals: {received}/{required}")]
    InsufficientApprovals { received: u32, required: u32 },

    #[error("deployment is disabled by configuration")]
    DeployDisabled,

    #[error("artifact rejected: {0}")]
    InvalidArtifact(#[from] ValidationError),
}

impl GuardFailure {
    /// Stable reason code for machine consumption.
    pub fn code(&self) -> &'static str {
        match self {
            GuardFailure::RunNotFound(_) => "run_not_found",
            GuardFailure::TerminalStatus { .. } => "terminal_status",
            GuardFailure::InvalidTransition { .. } => "invalid_transition",
            GuardFailure::LayerOutOfOrder { .. } => "layer_out_of_order",
            GuardFailure::IntentMissing => "intent_missing",
            GuardFailure::ScopeEmpty => "scope_empty",
            GuardFailure::TopologyUnavailable => "topology_unavailable",
            GuardFailure::PlanMissing => "plan_missing",
            GuardFailure::VerdictMissing => "verdict_missing",
            GuardFailure::StaleVerdict { .. } => "stale_verdict",
            GuardFailure::VerdictRejected => "verdict_rejected",
            GuardFailure::VerifyPlanMissing => "verify_plan_missing",
            GuardFailure::RollbackPlanMissing => "rollback_plan_missing",
            GuardFailure::CriticalFindingsOpen => "critical_findings_open",
            GuardFailure::NothingToWaive => "nothing_to_waive",
            GuardFailure::InsufficientApprovals { .. } => "insufficient_approvals",
            GuardFailure::DeployDisabled => "deploy_disabled",
            GuardFailure::InvalidArtifact(inner) => inner.code(),
        }
    }
}
