//! Run registry — the mutable home of orchestration runs.
//!
//! Runs are independent units of concurrency: each lives behind its own
//! mutex, so operations on different runs never contend, while transitions
//! within one run are serialized (at most one in flight). An abandonment
//! racing an artifact delivery simply contends for the same per-run lock and
//! is evaluated against the post-transition state.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::config::OrchestrationConfig;
use crate::error::GuardFailure;
use crate::observability::LatencyTracker;
use crate::topology::model::TopologySnapshot;

use super::events::RunEvent;
use super::model::{Layer, OrchestrationRun, RunScope, RunStatus};
use super::reducer::{reduce, Reduced};

/// Post-apply view returned to the event API caller.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplyOutcome {
    pub run_id: String,
    pub status: RunStatus,
    pub layer: Layer,
    /// False when the event was an idempotent re-delivery.
    pub applied: bool,
}

/// Registry of live and closed runs. Runs are never deleted — terminal runs
/// stay readable until the embedding service archives them.
pub struct RunRegistry {
    runs: RwLock<HashMap<String, Arc<Mutex<OrchestrationRun>>>>,
    snapshot: RwLock<Option<Arc<TopologySnapshot>>>,
    config: OrchestrationConfig,
}

impl RunRegistry {
    pub fn new(config: OrchestrationConfig) -> Self {
        Self {
            runs: RwLock::new(HashMap::new()),
            snapshot: RwLock::new(None),
            config,
        }
    }

    /// Publish the topology snapshot plans are validated against.
    pub async fn install_snapshot(&self, snapshot: TopologySnapshot) {
        let mut guard = self.snapshot.write().await;
        *guard = Some(Arc::new(snapshot));
    }

    /// Create a run from a submitted change intent.
    pub async fn create_run(
        &self,
        intent: impl Into<String>,
        scope: RunScope,
        created_by: impl Into<String>,
    ) -> OrchestrationRun {
        let run = OrchestrationRun::new(
            uuid::Uuid::new_v4().to_string(),
            intent,
            scope,
            created_by,
            self.config.deploy_enabled,
            Utc::now(),
        );
        info!(run_id = %run.id, intent = %run.intent, "orchestration run created");

        let mut runs = self.runs.write().await;
        runs.insert(run.id.clone(), Arc::new(Mutex::new(run.clone())));
        run
    }

    /// Apply one event to one run.
    ///
    /// Returns the post-transition status, or the typed guard failure with
    /// the run untouched.
    pub async fn apply(
        &self,
        run_id: &str,
        event: &RunEvent,
        actor: &str,
    ) -> Result<ApplyOutcome, GuardFailure> {
        let entry = {
            let runs = self.runs.read().await;
            runs.get(run_id)
                .cloned()
                .ok_or_else(|| GuardFailure::RunNotFound(run_id.to_string()))?
        };
        let snapshot = { self.snapshot.read().await.clone() };

        // Per-run exclusive section: guard evaluation and the log append are
        // atomic with respect to any other event for this run.
        let tracker = LatencyTracker::start(format!("run.apply.{}", event.name()));
        let mut run = entry.lock().await;
        let result = reduce(
            &run,
            event,
            actor,
            Utc::now(),
            &self.config,
            snapshot.as_deref(),
        );

        let outcome = match result {
            Ok(Reduced::Applied(next)) => {
                info!(
                    run_id = %run_id,
                    event = event.name(),
                    from = %run.status,
                    to = %next.status,
                    layer = %next.current_layer,
                    "transition applied"
                );
                *run = *next;
                Ok(ApplyOutcome {
                    run_id: run_id.to_string(),
                    status: run.status,
                    layer: run.current_layer,
                    applied: true,
                })
            }
            Ok(Reduced::NoOp) => {
                debug!(run_id = %run_id, event = event.name(), "idempotent re-delivery ignored");
                Ok(ApplyOutcome {
                    run_id: run_id.to_string(),
                    status: run.status,
                    layer: run.current_layer,
                    applied: false,
                })
            }
            Err(guard) => {
                debug!(
                    run_id = %run_id,
                    event = event.name(),
                    reason = guard.code(),
                    "transition rejected"
                );
                Err(guard)
            }
        };
        tracker.finish();
        outcome
    }

    /// Clone out a run by id.
    pub async fn get(&self, run_id: &str) -> Option<OrchestrationRun> {
        let entry = {
            let runs = self.runs.read().await;
            runs.get(run_id).cloned()
        }?;
        let run = entry.lock().await;
        Some(run.clone())
    }

    /// Ids of all registered runs, sorted.
    pub async fn run_ids(&self) -> Vec<String> {
        let runs = self.runs.read().await;
        let mut ids: Vec<String> = runs.keys().cloned().collect();
        ids.sort();
        ids
    }
}
