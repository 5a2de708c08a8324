//! The pure transition function.
//!
//! `reduce` maps `(run, event)` to either a new run value, a no-op, or a
//! typed guard failure. It never mutates its input and never performs I/O,
//! which is what makes guard evaluation race-free once the engine serializes
//! calls per run.
//!
//! Idempotent re-entry: delivering an event to a run already in the
//! resulting state yields `Reduced::NoOp` — a success with no new log entry.
//! This supports at-least-once delivery of orchestration events.

use chrono::{DateTime, Utc};

use crate::config::OrchestrationConfig;
use crate::error::GuardFailure;
use crate::topology::model::TopologySnapshot;

use super::events::RunEvent;
use super::model::{Layer, OrchestrationRun, RunStatus, TransitionLogEntry};
use super::risk::{assess_risk_level, required_approvals};

/// Outcome of a successful reduction.
#[derive(Debug)]
pub enum Reduced {
    /// The event applied; here is the post-transition run.
    Applied(Box<OrchestrationRun>),
    /// The run was already in the resulting state. No log entry.
    NoOp,
}

/// Apply one event to a run.
///
/// `snapshot` is the topology view plans are validated against; it is only
/// consulted for `PlanReady`.
pub fn reduce(
    run: &OrchestrationRun,
    event: &RunEvent,
    actor: &str,
    now: DateTime<Utc>,
    cfg: &OrchestrationConfig,
    snapshot: Option<&TopologySnapshot>,
) -> Result<Reduced, GuardFailure> {
    match event {
        // ── Started ──────────────────────────────────────────────────────────
        RunEvent::Started => {
            if run.status == RunStatus::Running {
                return Ok(Reduced::NoOp);
            }
            require_status(run, RunStatus::Pending, event)?;

            // Intake guards: a run must say what it wants and where.
            if run.intent.trim().is_empty() {
                return Err(GuardFailure::IntentMissing);
            }
            if !run.scope.is_targeted() {
                return Err(GuardFailure::ScopeEmpty);
            }

            let mut next = transition(
                run,
                RunStatus::Running,
                Layer::L1Context,
                actor,
                now,
                "intake checks passed".to_string(),
            );
            next.started_at = Some(now);
            Ok(Reduced::Applied(Box::new(next)))
        }

        // ── ContextReady ─────────────────────────────────────────────────────
        RunEvent::ContextReady { hash } => {
            if run.context_hash.as_deref() == Some(hash.as_str())
                && run.current_layer.index() > Layer::L1Context.index()
            {
                return Ok(Reduced::NoOp);
            }
            require_status(run, RunStatus::Running, event)?;
            require_layer(run, Layer::L1Context, event)?;

            let mut next = transition(
                run,
                RunStatus::Running,
                Layer::L2Deterministic,
                actor,
                now,
                "context pack built".to_string(),
            );
            next.context_hash = Some(hash.clone());
            Ok(Reduced::Applied(Box::new(next)))
        }

        // ── ChecksPassed ─────────────────────────────────────────────────────
        RunEvent::ChecksPassed { factors } => {
            if run.risk_level.is_some()
                && run.current_layer.index() > Layer::L2Deterministic.index()
            {
                return Ok(Reduced::NoOp);
            }
            require_status(run, RunStatus::Running, event)?;
            require_layer(run, Layer::L2Deterministic, event)?;

            let risk = assess_risk_level(factors);
            let mut next = transition(
                run,
                RunStatus::Running,
                Layer::L3Planner,
                actor,
                now,
                format!("deterministic checks passed, risk assessed {risk}"),
            );
            next.risk_level = Some(risk);
            next.required_approvals = required_approvals(risk, cfg);
            Ok(Reduced::Applied(Box::new(next)))
        }

        // ── PlanReady ────────────────────────────────────────────────────────
        RunEvent::PlanReady { plan } => {
            if run
                .plan
                .as_ref()
                .is_some_and(|active| active.plan_id == plan.plan_id)
                && run.current_layer.index() > Layer::L3Planner.index()
            {
                return Ok(Reduced::NoOp);
            }
            require_status(run, RunStatus::Running, event)?;
            require_layer(run, Layer::L3Planner, event)?;

            let snapshot = snapshot.ok_or(GuardFailure::TopologyUnavailable)?;
            plan.validate(snapshot).map_err(GuardFailure::InvalidArtifact)?;

            let mut next = transition(
                run,
                RunStatus::Running,
                Layer::L4Expert,
                actor,
                now,
                format!("plan '{}' accepted", plan.plan_id),
            );
            next.plan_checksum = Some(plan.checksum());
            next.plan = Some(plan.clone());
            Ok(Reduced::Applied(Box::new(next)))
        }

        // ── TranslationReady ─────────────────────────────────────────────────
        RunEvent::TranslationReady { translation } => {
            if run
                .translation
                .as_ref()
                .is_some_and(|t| t.plan_id == translation.plan_id)
                && run.current_layer.index() > Layer::L4Expert.index()
            {
                return Ok(Reduced::NoOp);
            }
            require_status(run, RunStatus::Running, event)?;
            require_layer(run, Layer::L4Expert, event)?;

            let plan = run.plan.as_ref().ok_or(GuardFailure::PlanMissing)?;
            translation
                .validate(plan)
                .map_err(GuardFailure::InvalidArtifact)?;

            let mut next = transition(
                run,
                RunStatus::Running,
                Layer::L5Verification,
                actor,
                now,
                format!(
                    "vendor translation accepted for {} device(s)",
                    translation.device_configs.len()
                ),
            );
            next.translation = Some(translation.clone());
            Ok(Reduced::Applied(Box::new(next)))
        }

        // ── VerificationBuilt ────────────────────────────────────────────────
        RunEvent::VerificationBuilt {
            has_verify_plan,
            has_rollback_plan,
        } => {
            if run.current_layer.index() > Layer::L5Verification.index()
                && run.gates.has_verify_plan == *has_verify_plan
                && run.gates.has_rollback_plan == *has_rollback_plan
            {
                return Ok(Reduced::NoOp);
            }
            require_status(run, RunStatus::Running, event)?;
            require_layer(run, Layer::L5Verification, event)?;

            let mut next = transition(
                run,
                RunStatus::Running,
                Layer::L6Judge,
                actor,
                now,
                "verification and rollback plans built".to_string(),
            );
            next.gates.has_verify_plan = *has_verify_plan;
            next.gates.has_rollback_plan = *has_rollback_plan;
            Ok(Reduced::Applied(Box::new(next)))
        }

        // ── VerdictReady ─────────────────────────────────────────────────────
        RunEvent::VerdictReady { verdict } => {
            if run.verdict.as_ref() == Some(verdict)
                && run.current_layer.index() > Layer::L6Judge.index()
            {
                return Ok(Reduced::NoOp);
            }
            require_status(run, RunStatus::Running, event)?;
            require_layer(run, Layer::L6Judge, event)?;

            let plan = run.plan.as_ref().ok_or(GuardFailure::PlanMissing)?;
            verdict.validate().map_err(GuardFailure::InvalidArtifact)?;

            // A verdict for a superseded plan is stale — explicit rejection
            // so the caller re-requests, rather than silently ignoring it.
            if verdict.referenced_plan_id != plan.plan_id {
                return Err(GuardFailure::StaleVerdict {
                    referenced: verdict.referenced_plan_id.clone(),
                    active: plan.plan_id.clone(),
                });
            }

            use crate::artifacts::verdict::PolicyDecision;
            if verdict.decision == PolicyDecision::Deny {
                let mut next = transition(
                    run,
                    RunStatus::Rejected,
                    run.current_layer,
                    actor,
                    now,
                    "policy judge denied the change".to_string(),
                );
                next.verdict = Some(verdict.clone());
                next.completed_at = Some(now);
                return Ok(Reduced::Applied(Box::new(next)));
            }

            // Risk only ever ratchets up from the judge's estimate.
            let risk = run
                .risk_level
                .map_or(verdict.risk_level, |r| r.max(verdict.risk_level));

            let mut next = transition(
                run,
                RunStatus::AwaitingApproval,
                Layer::L7Deploy,
                actor,
                now,
                format!("policy verdict recorded ({})", risk),
            );
            next.gates.has_critical_findings = verdict.has_critical_findings();
            next.risk_level = Some(risk);
            next.required_approvals = required_approvals(risk, cfg);
            next.verdict = Some(verdict.clone());
            Ok(Reduced::Applied(Box::new(next)))
        }

        // ── ApprovalGranted ──────────────────────────────────────────────────
        RunEvent::ApprovalGranted { approver } => {
            if run.approvers.iter().any(|a| a == approver) {
                return Ok(Reduced::NoOp);
            }
            if run.status == RunStatus::Approved {
                return Ok(Reduced::NoOp);
            }
            require_status(run, RunStatus::AwaitingApproval, event)?;

            let received = run.received_approvals + 1;
            let status = if received >= run.required_approvals {
                RunStatus::Approved
            } else {
                RunStatus::AwaitingApproval
            };
            let mut next = transition(
                run,
                status,
                run.current_layer,
                actor,
                now,
                format!(
                    "approval recorded ({received}/{required})",
                    required = run.required_approvals
                ),
            );
            next.received_approvals = received;
            next.approvers.push(approver.clone());
            Ok(Reduced::Applied(Box::new(next)))
        }

        // ── ApprovalDenied ───────────────────────────────────────────────────
        RunEvent::ApprovalDenied { approver, reason } => {
            if run.status == RunStatus::Rejected {
                return Ok(Reduced::NoOp);
            }
            require_status(run, RunStatus::AwaitingApproval, event)?;

            let mut next = transition(
                run,
                RunStatus::Rejected,
                run.current_layer,
                actor,
                now,
                format!("approval denied by {approver}: {reason}"),
            );
            next.completed_at = Some(now);
            Ok(Reduced::Applied(Box::new(next)))
        }

        // ── FindingsWaived ───────────────────────────────────────────────────
        RunEvent::FindingsWaived { reason } => {
            if run.gates.critical_findings_waived {
                return Ok(Reduced::NoOp);
            }
            if run.status.is_terminal() {
                return Err(GuardFailure::TerminalStatus { status: run.status });
            }
            if !run.gates.has_critical_findings {
                return Err(GuardFailure::NothingToWaive);
            }

            let mut next = transition(
                run,
                run.status,
                run.current_layer,
                actor,
                now,
                format!("critical findings waived: {reason}"),
            );
            next.gates.critical_findings_waived = true;
            Ok(Reduced::Applied(Box::new(next)))
        }

        // ── DeployStarted — every deploy gate evaluates here ─────────────────
        RunEvent::DeployStarted => {
            if run.status == RunStatus::Deploying {
                return Ok(Reduced::NoOp);
            }
            require_status(run, RunStatus::Approved, event)?;

            if !run.gates.deploy_enabled {
                return Err(GuardFailure::DeployDisabled);
            }
            let plan = run.plan.as_ref().ok_or(GuardFailure::PlanMissing)?;
            let verdict = run.verdict.as_ref().ok_or(GuardFailure::VerdictMissing)?;

            // The verdict must reference the active plan — executing a stale
            // or unreviewed plan is the one unforgivable transition.
            if verdict.referenced_plan_id != plan.plan_id {
                return Err(GuardFailure::StaleVerdict {
                    referenced: verdict.referenced_plan_id.clone(),
                    active: plan.plan_id.clone(),
                });
            }
            use crate::artifacts::verdict::PolicyDecision;
            if verdict.decision != PolicyDecision::Approve {
                return Err(GuardFailure::VerdictRejected);
            }
            if !run.gates.has_verify_plan {
                return Err(GuardFailure::VerifyPlanMissing);
            }
            if !run.gates.has_rollback_plan {
                return Err(GuardFailure::RollbackPlanMissing);
            }
            if run.gates.has_critical_findings && !run.gates.critical_findings_waived {
                return Err(GuardFailure::CriticalFindingsOpen);
            }
            if run.received_approvals < run.required_approvals {
                return Err(GuardFailure::InsufficientApprovals {
                    received: run.received_approvals,
                    required: run.required_approvals,
                });
            }

            Ok(Reduced::Applied(Box::new(transition(
                run,
                RunStatus::Deploying,
                run.current_layer,
                actor,
                now,
                "deployment started".to_string(),
            ))))
        }

        // ── DeployCompleted ──────────────────────────────────────────────────
        RunEvent::DeployCompleted => {
            if run.status == RunStatus::Deployed {
                return Ok(Reduced::NoOp);
            }
            require_status(run, RunStatus::Deploying, event)?;

            let mut next = transition(
                run,
                RunStatus::Deployed,
                run.current_layer,
                actor,
                now,
                "deployment completed".to_string(),
            );
            next.completed_at = Some(now);
            Ok(Reduced::Applied(Box::new(next)))
        }

        // ── RollbackRequested — terminal, captures the layer ─────────────────
        RunEvent::RollbackRequested { reason } => {
            if run.status == RunStatus::RolledBack {
                return Ok(Reduced::NoOp);
            }
            if !matches!(run.status, RunStatus::Deploying | RunStatus::Deployed) {
                if run.status.is_terminal() {
                    return Err(GuardFailure::TerminalStatus { status: run.status });
                }
                return Err(GuardFailure::InvalidTransition {
                    status: run.status,
                    event: event.name(),
                });
            }

            let mut next = transition(
                run,
                RunStatus::RolledBack,
                run.current_layer,
                actor,
                now,
                format!("rolled back at {}: {reason}", run.current_layer),
            );
            next.completed_at = Some(now);
            Ok(Reduced::Applied(Box::new(next)))
        }

        // ── Failed — from any non-terminal status ────────────────────────────
        RunEvent::Failed { error } => {
            if run.status == RunStatus::Failed {
                return Ok(Reduced::NoOp);
            }
            if run.status.is_terminal() {
                return Err(GuardFailure::TerminalStatus { status: run.status });
            }

            let mut next = transition(
                run,
                RunStatus::Failed,
                run.current_layer,
                actor,
                now,
                format!("failed: {error}"),
            );
            next.error_message = Some(error.clone());
            next.completed_at = Some(now);
            Ok(Reduced::Applied(Box::new(next)))
        }

        // ── Cancelled — abandonment is itself a transition ───────────────────
        RunEvent::Cancelled { reason } => {
            if run.status == RunStatus::Cancelled {
                return Ok(Reduced::NoOp);
            }
            if run.status.is_terminal() {
                return Err(GuardFailure::TerminalStatus { status: run.status });
            }

            let mut next = transition(
                run,
                RunStatus::Cancelled,
                run.current_layer,
                actor,
                now,
                format!("cancelled: {reason}"),
            );
            next.error_message = Some(reason.clone());
            next.completed_at = Some(now);
            Ok(Reduced::Applied(Box::new(next)))
        }
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn require_status(
    run: &OrchestrationRun,
    expected: RunStatus,
    event: &RunEvent,
) -> Result<(), GuardFailure> {
    if run.status.is_terminal() {
        return Err(GuardFailure::TerminalStatus { status: run.status });
    }
    if run.status != expected {
        return Err(GuardFailure::InvalidTransition {
            status: run.status,
            event: event.name(),
        });
    }
    Ok(())
}

fn require_layer(
    run: &OrchestrationRun,
    expected: Layer,
    event: &RunEvent,
) -> Result<(), GuardFailure> {
    if run.current_layer != expected {
        return Err(GuardFailure::LayerOutOfOrder {
            current: run.current_layer,
            expected,
            event: event.name(),
        });
    }
    Ok(())
}

/// Clone the run with a new status/layer and append the log entry.
fn transition(
    run: &OrchestrationRun,
    to_status: RunStatus,
    to_layer: Layer,
    actor: &str,
    now: DateTime<Utc>,
    reason: String,
) -> OrchestrationRun {
    let mut next = run.clone();
    next.transition_log.push(TransitionLogEntry {
        ts: now,
        from_status: run.status,
        to_status,
        from_layer: run.current_layer,
        to_layer,
        actor: actor.to_string(),
        reason,
    });
    next.status = to_status;
    next.current_layer = to_layer;
    next.updated_at = now;
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::model::RunScope;
    use crate::orchestrator::risk::RiskFactors;

    fn make_run() -> OrchestrationRun {
        OrchestrationRun::new(
            "run-1",
            "add guest vlan",
            RunScope {
                device_ids: vec!["sw1".into()],
                ..Default::default()
            },
            "tester",
            true,
            Utc::now(),
        )
    }

    fn applied(result: Result<Reduced, GuardFailure>) -> OrchestrationRun {
        match result.unwrap() {
            Reduced::Applied(run) => *run,
            Reduced::NoOp => panic!("expected an applied transition"),
        }
    }

    #[test]
    fn started_requires_intent() {
        let mut run = make_run();
        run.intent = String::new();
        let err = reduce(
            &run,
            &RunEvent::Started,
            "tester",
            Utc::now(),
            &Default::default(),
            None,
        )
        .unwrap_err();
        assert_eq!(err, GuardFailure::IntentMissing);
        assert!(run.transition_log.is_empty());
    }

    #[test]
    fn started_requires_targeted_scope() {
        let mut run = make_run();
        run.scope = RunScope::default();
        let err = reduce(
            &run,
            &RunEvent::Started,
            "tester",
            Utc::now(),
            &Default::default(),
            None,
        )
        .unwrap_err();
        assert_eq!(err, GuardFailure::ScopeEmpty);
    }

    #[test]
    fn started_moves_to_running_and_is_idempotent() {
        let run = make_run();
        let cfg = Default::default();
        let next = applied(reduce(&run, &RunEvent::Started, "tester", Utc::now(), &cfg, None));
        assert_eq!(next.status, RunStatus::Running);
        assert_eq!(next.current_layer, Layer::L1Context);
        assert_eq!(next.transition_log.len(), 1);

        // Re-delivery is a no-op with no new log entry.
        match reduce(&next, &RunEvent::Started, "tester", Utc::now(), &cfg, None).unwrap() {
            Reduced::NoOp => {}
            Reduced::Applied(_) => panic!("expected no-op"),
        }
    }

    #[test]
    fn context_before_start_is_out_of_order() {
        let run = make_run();
        let err = reduce(
            &run,
            &RunEvent::ContextReady { hash: "h1".into() },
            "tester",
            Utc::now(),
            &Default::default(),
            None,
        )
        .unwrap_err();
        // Still Pending — the status gate fires before the layer gate.
        assert_eq!(err.code(), "invalid_transition");
    }

    #[test]
    fn checks_passed_records_risk_and_approvals() {
        let cfg = Default::default();
        let run = make_run();
        let run = applied(reduce(&run, &RunEvent::Started, "t", Utc::now(), &cfg, None));
        let run = applied(reduce(
            &run,
            &RunEvent::ContextReady { hash: "h1".into() },
            "t",
            Utc::now(),
            &cfg,
            None,
        ));
        let run = applied(reduce(
            &run,
            &RunEvent::ChecksPassed {
                factors: RiskFactors {
                    device_count: 5,
                    has_routing_changes: true,
                    is_production: true,
                    ..Default::default()
                },
            },
            "t",
            Utc::now(),
            &cfg,
            None,
        ));
        assert_eq!(run.risk_level, Some(crate::orchestrator::model::RiskLevel::High));
        assert_eq!(run.required_approvals, 2);
        assert_eq!(run.current_layer, Layer::L3Planner);
    }

    #[test]
    fn rollback_outside_deployment_is_rejected() {
        let run = make_run();
        let err = reduce(
            &run,
            &RunEvent::RollbackRequested {
                reason: "nope".into(),
            },
            "t",
            Utc::now(),
            &Default::default(),
            None,
        )
        .unwrap_err();
        assert_eq!(err.code(), "invalid_transition");
    }

    #[test]
    fn cancelled_from_any_nonterminal_then_terminal() {
        let cfg = Default::default();
        let run = make_run();
        let run = applied(reduce(&run, &RunEvent::Started, "t", Utc::now(), &cfg, None));
        let run = applied(reduce(
            &run,
            &RunEvent::Cancelled {
                reason: "changed my mind".into(),
            },
            "t",
            Utc::now(),
            &cfg,
            None,
        ));
        assert_eq!(run.status, RunStatus::Cancelled);

        // Idempotent re-delivery.
        match reduce(
            &run,
            &RunEvent::Cancelled {
                reason: "again".into(),
            },
            "t",
            Utc::now(),
            &cfg,
            None,
        )
        .unwrap()
        {
            Reduced::NoOp => {}
            Reduced::Applied(_) => panic!("expected no-op"),
        }

        // Any other event is a terminal-state rejection.
        let err = reduce(&run, &RunEvent::Started, "t", Utc::now(), &cfg, None).unwrap_err();
        assert_eq!(err.code(), "terminal_status");
    }

    #[test]
    fn waiving_without_findings_is_rejected() {
        let run = make_run();
        let err = reduce(
            &run,
            &RunEvent::FindingsWaived {
                reason: "no reason".into(),
            },
            "t",
            Utc::now(),
            &Default::default(),
            None,
        )
        .unwrap_err();
        assert_eq!(err, GuardFailure::NothingToWaive);
    }
}
