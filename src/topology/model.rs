// SPDX-License-Identifier: MIT
//! Topology data model.
//!
//! A snapshot is a point-in-time, read-only view of the inferred network.
//! Roles and confidence are derived fields — recomputed from the port set
//! and evidence set on every build, never stored as independent state.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::evidence::model::{Endpoint, EvidenceSource};

// ─── NodeRole ─────────────────────────────────────────────────────────────────

/// Derived device role. A pure function of the observed port set — identical
/// port sets always classify identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeRole {
    Server,
    Unknown,
}

impl NodeRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeRole::Server => "server",
            NodeRole::Unknown => "unknown",
        }
    }
}

// ─── Nodes and edges ──────────────────────────────────────────────────────────

/// One inferred device.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopologyNode {
    pub id: String,
    /// Ordered set of numeric ports observed open or in use on this node.
    pub observed_ports: BTreeSet<u16>,
    pub role: NodeRole,
}

/// One inferred adjacency with its evidence-derived confidence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopologyEdge {
    /// Canonical order-independent key.
    pub key: String,
    pub a: Endpoint,
    pub b: Endpoint,
    /// 0–100, monotonic in supporting-source diversity.
    pub confidence: u8,
    /// Distinct source kinds attesting this edge.
    pub sources: Vec<EvidenceSource>,
    pub evidence_count: usize,
    pub last_seen_at: DateTime<Utc>,
}

// ─── TopologySnapshot ─────────────────────────────────────────────────────────

/// Immutable graph view for read-only consumption by planning and review.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopologySnapshot {
    pub generated_at: DateTime<Utc>,
    pub nodes: Vec<TopologyNode>,
    pub edges: Vec<TopologyEdge>,
}

impl TopologySnapshot {
    /// An empty snapshot — useful before the first discovery cycle.
    pub fn empty(generated_at: DateTime<Utc>) -> Self {
        Self {
            generated_at,
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    pub fn has_node(&self, node_id: &str) -> bool {
        self.nodes.iter().any(|n| n.id == node_id)
    }

    pub fn node(&self, node_id: &str) -> Option<&TopologyNode> {
        self.nodes.iter().find(|n| n.id == node_id)
    }
}
