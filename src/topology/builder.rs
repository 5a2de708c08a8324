//! Snapshot assembly and role classification.

use std::collections::BTreeSet;

use chrono::Utc;
use once_cell::sync::Lazy;
use tracing::debug;

use crate::evidence::graph::EvidenceGraph;

use super::model::{NodeRole, TopologyEdge, TopologyNode, TopologySnapshot};

/// Well-known ports that mark a node as a server when seen open: remote
/// admin (22), web (80/443/8080/8443), SMB (445), RDP (3389).
static SERVER_PORTS: Lazy<BTreeSet<u16>> =
    Lazy::new(|| [22, 80, 443, 445, 3389, 8080, 8443].into_iter().collect());

/// Classify a node role from its observed port set.
///
/// Pure and order-independent: repeated calls on the same set always yield
/// the same role, so re-classification is idempotent.
pub fn classify_role(observed_ports: &BTreeSet<u16>) -> NodeRole {
    if observed_ports.iter().any(|p| SERVER_PORTS.contains(p)) {
        NodeRole::Server
    } else {
        NodeRole::Unknown
    }
}

/// Assemble an immutable snapshot from the current graph state.
///
/// Nodes and edges come out sorted (by id / canonical key) so identical
/// graph states always produce identical snapshots.
pub async fn build_snapshot(graph: &EvidenceGraph) -> TopologySnapshot {
    let nodes: Vec<TopologyNode> = graph
        .node_views()
        .await
        .into_iter()
        .map(|view| TopologyNode {
            role: classify_role(&view.observed_ports),
            id: view.id,
            observed_ports: view.observed_ports,
        })
        .collect();

    let edges: Vec<TopologyEdge> = graph
        .edge_views()
        .await
        .into_iter()
        .map(|view| TopologyEdge {
            key: view.key,
            a: view.a,
            b: view.b,
            confidence: view.confidence,
            sources: view.sources.into_iter().collect(),
            evidence_count: view.evidence.len(),
            last_seen_at: view.last_seen_at,
        })
        .collect();

    debug!(
        nodes = nodes.len(),
        edges = edges.len(),
        "topology snapshot built"
    );

    TopologySnapshot {
        generated_at: Utc::now(),
        nodes,
        edges,
    }
}
