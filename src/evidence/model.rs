//! Evidence data model.
//!
//! One [`Evidence`] record is a single timestamped observation from one
//! discovery source supporting a network adjacency. Records are immutable
//! once captured; the graph merges them, it never rewrites them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ─── EvidenceSource ───────────────────────────────────────────────────────────

/// The fixed set of discovery sources. Unknown source strings are rejected
/// at deserialization — the enum is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EvidenceSource {
    /// Link-layer neighbor advertisement. Ground-truth grade.
    Lldp,
    /// Bridge forwarding table walked over SNMP.
    BridgeFdb,
    /// Bridge host table collected from the device CLI.
    BridgeHost,
    /// MikroTik neighbor discovery.
    Mndp,
    /// ARP table entry — inferential, node-level only.
    Arp,
    /// Active scan — inferential, node-level only.
    Nmap,
}

impl EvidenceSource {
    /// Canonical wire string.
    pub fn as_str(&self) -> &'static str {
        match self {
            EvidenceSource::Lldp => "LLDP",
            EvidenceSource::BridgeFdb => "BRIDGE_FDB",
            EvidenceSource::BridgeHost => "BRIDGE_HOST",
            EvidenceSource::Mndp => "MNDP",
            EvidenceSource::Arp => "ARP",
            EvidenceSource::Nmap => "NMAP",
        }
    }

    /// Base confidence weight for an edge attested by this source alone.
    ///
    /// LLDP is authoritative; ARP and NMAP only infer that two nodes can
    /// reach each other.
    pub fn base_confidence(&self) -> u8 {
        match self {
            EvidenceSource::Lldp => 98,
            EvidenceSource::Mndp => 90,
            EvidenceSource::BridgeHost => 80,
            EvidenceSource::BridgeFdb => 75,
            EvidenceSource::Arp => 60,
            EvidenceSource::Nmap => 55,
        }
    }
}

impl std::fmt::Display for EvidenceSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── EvidenceDetail ───────────────────────────────────────────────────────────

/// Source-specific payload. Tagged by source so each variant keeps its own
/// fixed field set instead of an open bag of key-value pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "source",
    content = "detail",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum EvidenceDetail {
    Lldp {
        local_port: String,
        remote_port: Option<String>,
        remote_name: Option<String>,
        remote_chassis: Option<String>,
    },
    BridgeFdb {
        mac: String,
        local_port: String,
        vlan: Option<String>,
    },
    BridgeHost {
        mac: String,
        local_port: String,
        vlan: Option<String>,
    },
    Mndp {
        local_port: String,
        remote_address: Option<String>,
        remote_identity: Option<String>,
    },
    Arp {
        ip: String,
        mac: Option<String>,
        iface: String,
    },
    Nmap {
        ip: String,
        open_tcp_ports: Vec<u16>,
        hostname: Option<String>,
    },
}

impl EvidenceDetail {
    /// The source this payload came from. Cannot disagree with the payload
    /// shape — the tag is the variant.
    pub fn source(&self) -> EvidenceSource {
        match self {
            EvidenceDetail::Lldp { .. } => EvidenceSource::Lldp,
            EvidenceDetail::BridgeFdb { .. } => EvidenceSource::BridgeFdb,
            EvidenceDetail::BridgeHost { .. } => EvidenceSource::BridgeHost,
            EvidenceDetail::Mndp { .. } => EvidenceSource::Mndp,
            EvidenceDetail::Arp { .. } => EvidenceSource::Arp,
            EvidenceDetail::Nmap { .. } => EvidenceSource::Nmap,
        }
    }
}

// ─── Evidence ─────────────────────────────────────────────────────────────────

/// One observation: `{source, detail, capturedAt}` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evidence {
    #[serde(flatten)]
    pub detail: EvidenceDetail,
    pub captured_at: DateTime<Utc>,
}

impl Evidence {
    pub fn new(detail: EvidenceDetail, captured_at: DateTime<Utc>) -> Self {
        Self {
            detail,
            captured_at,
        }
    }

    pub fn source(&self) -> EvidenceSource {
        self.detail.source()
    }
}

// ─── Endpoint ─────────────────────────────────────────────────────────────────

/// One side of an adjacency. `port` is `None` for sources that only report
/// node-level reachability (ARP, NMAP).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    pub node_id: String,
    pub port: Option<String>,
}

impl Endpoint {
    pub fn new(node_id: impl Into<String>, port: Option<&str>) -> Self {
        Self {
            node_id: node_id.into(),
            port: port.map(str::to_string),
        }
    }

    /// `"<nodeId>:<port-or-'unknown'>"` — the canonical half of an edge key.
    pub fn label(&self) -> String {
        match &self.port {
            Some(port) => format!("{}:{}", self.node_id, port),
            None => format!("{}:unknown", self.node_id),
        }
    }
}

/// Order-independent canonical key for the undirected edge between two
/// endpoints. LLDP and FDB evidence is often asymmetric — only one side
/// reports it — so `edge_key(a, b)` must equal `edge_key(b, a)`.
pub fn edge_key(a: &Endpoint, b: &Endpoint) -> String {
    let (first, second) = {
        let la = a.label();
        let lb = b.label();
        if la <= lb {
            (la, lb)
        } else {
            (lb, la)
        }
    };
    format!("{first}|{second}")
}
