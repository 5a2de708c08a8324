//! Evidence graph — canonical edge keys, additive merge, confidence scoring.
//!
//! Collectors feed observations in concurrently (one per device/source per
//! polling cycle). Merging is an atomic append-and-rescore under a per-edge
//! exclusive section: the edge map is only write-locked long enough to
//! insert the entry, so writers targeting different edges never contend.
//!
//! Merge policy is reconciliation, not overwrite: evidence is additive, and
//! two sources that disagree on which port pair joins a node pair land under
//! different canonical keys — both edges are retained. Demoting stale edges
//! is the caller's policy decision.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::error::ValidationError;

use super::model::{edge_key, Endpoint, Evidence, EvidenceDetail, EvidenceSource};

// ─── ConfidencePolicy ─────────────────────────────────────────────────────────

/// Pluggable confidence scoring.
///
/// The score is a function of the *distinct* source kinds attesting an edge,
/// never the raw observation count: ten ARP sightings do not outweigh one
/// LLDP plus one BRIDGE_FDB sighting.
#[derive(Debug, Clone, Copy)]
pub struct ConfidencePolicy {
    /// Bonus per additional distinct source kind beyond the first.
    pub diversity_bonus: u8,
}

impl Default for ConfidencePolicy {
    fn default() -> Self {
        Self { diversity_bonus: 2 }
    }
}

impl ConfidencePolicy {
    /// Score an edge from the set of sources attesting it. Monotonic in
    /// source diversity, capped at 100. Empty input scores 0.
    pub fn score(&self, sources: &BTreeSet<EvidenceSource>) -> u8 {
        let Some(max_base) = sources.iter().map(EvidenceSource::base_confidence).max() else {
            return 0;
        };
        let extra = (sources.len() as u32 - 1) * u32::from(self.diversity_bonus);
        (u32::from(max_base) + extra).min(100) as u8
    }
}

// ─── Edge / node state ────────────────────────────────────────────────────────

/// Mutable per-edge state, guarded by its own mutex.
#[derive(Debug, Clone)]
struct EdgeState {
    a: Endpoint,
    b: Endpoint,
    evidence: Vec<Evidence>,
    confidence: u8,
    last_seen_at: DateTime<Utc>,
}

/// Read-only clone of one edge, safe to hand out.
#[derive(Debug, Clone)]
pub struct EdgeView {
    pub key: String,
    pub a: Endpoint,
    pub b: Endpoint,
    pub evidence: Vec<Evidence>,
    pub sources: BTreeSet<EvidenceSource>,
    pub confidence: u8,
    pub last_seen_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
struct NodeState {
    observed_ports: BTreeSet<u16>,
}

/// Read-only clone of one node.
#[derive(Debug, Clone)]
pub struct NodeView {
    pub id: String,
    pub observed_ports: BTreeSet<u16>,
}

// ─── EvidenceGraph ────────────────────────────────────────────────────────────

/// The merge graph. Edges are keyed by their canonical order-independent
/// key; each holds the evidence records that support it plus a derived
/// confidence score. Edges are never deleted on new evidence, only
/// strengthened.
pub struct EvidenceGraph {
    edges: RwLock<HashMap<String, Arc<Mutex<EdgeState>>>>,
    nodes: RwLock<HashMap<String, NodeState>>,
    policy: ConfidencePolicy,
}

impl EvidenceGraph {
    pub fn new(policy: ConfidencePolicy) -> Self {
        Self {
            edges: RwLock::new(HashMap::new()),
            nodes: RwLock::new(HashMap::new()),
            policy,
        }
    }

    /// Append one evidence record to the edge between `a` and `b`,
    /// registering both endpoints as nodes and rescoring the edge.
    ///
    /// Returns the canonical edge key. Malformed evidence is rejected with a
    /// typed reason and leaves the graph untouched.
    pub async fn record_evidence(
        &self,
        a: &Endpoint,
        b: &Endpoint,
        evidence: Evidence,
    ) -> Result<String, ValidationError> {
        if a.node_id.trim().is_empty() || b.node_id.trim().is_empty() {
            return Err(ValidationError::EmptyNodeId);
        }

        self.register_endpoint(a, &evidence).await;
        self.register_endpoint(b, &evidence).await;

        let key = edge_key(a, b);
        let entry = {
            let mut edges = self.edges.write().await;
            edges
                .entry(key.clone())
                .or_insert_with(|| {
                    Arc::new(Mutex::new(EdgeState {
                        a: a.clone(),
                        b: b.clone(),
                        evidence: Vec::new(),
                        confidence: 0,
                        last_seen_at: evidence.captured_at,
                    }))
                })
                .clone()
        };

        // Per-edge exclusive section: append + rescore is atomic.
        let mut edge = entry.lock().await;
        if evidence.captured_at > edge.last_seen_at {
            edge.last_seen_at = evidence.captured_at;
        }
        edge.evidence.push(evidence);
        let sources: BTreeSet<EvidenceSource> =
            edge.evidence.iter().map(Evidence::source).collect();
        edge.confidence = self.policy.score(&sources);

        debug!(
            edge = %key,
            confidence = edge.confidence,
            distinct_sources = sources.len(),
            "evidence merged"
        );
        Ok(key)
    }

    /// Record a batch, dropping (and logging) bad records instead of
    /// aborting: normalization errors are local and recoverable.
    pub async fn record_batch(
        &self,
        batch: Vec<(Endpoint, Endpoint, Evidence)>,
    ) -> usize {
        let mut recorded = 0;
        for (a, b, evidence) in batch {
            match self.record_evidence(&a, &b, evidence).await {
                Ok(_) => recorded += 1,
                Err(e) => {
                    warn!(reason = e.code(), "dropping malformed evidence");
                }
            }
        }
        recorded
    }

    /// Register a node observed by a scan without asserting any adjacency.
    pub async fn record_host(&self, node_id: &str, open_tcp_ports: &[u16]) {
        if node_id.trim().is_empty() {
            warn!("dropping host observation with empty node id");
            return;
        }
        let mut nodes = self.nodes.write().await;
        let node = nodes.entry(node_id.to_string()).or_default();
        node.observed_ports.extend(open_tcp_ports.iter().copied());
    }

    async fn register_endpoint(&self, endpoint: &Endpoint, evidence: &Evidence) {
        let mut nodes = self.nodes.write().await;
        let node = nodes.entry(endpoint.node_id.clone()).or_default();

        // Numeric endpoint ports count as observed; interface names do not.
        if let Some(port) = endpoint.port.as_deref().and_then(|p| p.parse::<u16>().ok()) {
            node.observed_ports.insert(port);
        }

        // A scan payload enriches the scanned node's port set.
        if let EvidenceDetail::Nmap { ip, open_tcp_ports, .. } = &evidence.detail {
            if *ip == endpoint.node_id {
                node.observed_ports.extend(open_tcp_ports.iter().copied());
            }
        }
    }

    /// Clone out all edges, sorted by canonical key.
    pub async fn edge_views(&self) -> Vec<EdgeView> {
        let entries: Vec<(String, Arc<Mutex<EdgeState>>)> = {
            let edges = self.edges.read().await;
            edges.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
        };

        let mut views = Vec::with_capacity(entries.len());
        for (key, entry) in entries {
            let edge = entry.lock().await;
            let sources: BTreeSet<EvidenceSource> =
                edge.evidence.iter().map(Evidence::source).collect();
            views.push(EdgeView {
                key,
                a: edge.a.clone(),
                b: edge.b.clone(),
                evidence: edge.evidence.clone(),
                sources,
                confidence: edge.confidence,
                last_seen_at: edge.last_seen_at,
            });
        }
        views.sort_by(|x, y| x.key.cmp(&y.key));
        views
    }

    /// Clone out all nodes, sorted by id.
    pub async fn node_views(&self) -> Vec<NodeView> {
        let nodes = self.nodes.read().await;
        let mut views: Vec<NodeView> = nodes
            .iter()
            .map(|(id, state)| NodeView {
                id: id.clone(),
                observed_ports: state.observed_ports.clone(),
            })
            .collect();
        views.sort_by(|x, y| x.id.cmp(&y.id));
        views
    }

    /// Current confidence of the edge with the given canonical key.
    pub async fn confidence_of(&self, key: &str) -> Option<u8> {
        let entry = {
            let edges = self.edges.read().await;
            edges.get(key).cloned()
        }?;
        let edge = entry.lock().await;
        Some(edge.confidence)
    }

    pub async fn edge_count(&self) -> usize {
        self.edges.read().await.len()
    }
}
