//! Correlation: normalized discovery tables → evidence records.
//!
//! This is the bridge between collectors and the graph. Neighbor tables
//! become port-pair edges, MAC-learn tables become half-port edges resolved
//! against known interface MACs, ARP tables become node-level adjacencies,
//! and scan results enrich node port sets. Entries that cannot name a remote
//! node are dropped with a logged reason — one bad row never aborts a cycle.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::discovery::snmp::NormalizedTables;
use crate::evidence::graph::EvidenceGraph;
use crate::evidence::model::{Endpoint, Evidence, EvidenceDetail, EvidenceSource};

/// One host seen by an active scan.
#[derive(Debug, Clone)]
pub struct ScannedHost {
    pub ip: String,
    pub open_tcp_ports: Vec<u16>,
    pub hostname: Option<String>,
}

/// Counters for one correlation cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CorrelationSummary {
    pub edges_recorded: usize,
    pub hosts_recorded: usize,
    pub dropped: usize,
}

/// Feed one polling cycle's normalized tables into the evidence graph.
pub async fn correlate_tables(
    graph: &EvidenceGraph,
    tables_by_device: &BTreeMap<String, NormalizedTables>,
    scanned_hosts: &[ScannedHost],
    captured_at: DateTime<Utc>,
) -> CorrelationSummary {
    let mut summary = CorrelationSummary::default();

    // Interface MACs across every device, so learned MACs resolve to the
    // device that owns them rather than to an anonymous endpoint.
    let mut mac_index: BTreeMap<String, String> = BTreeMap::new();
    for (device_id, tables) in tables_by_device {
        for iface in &tables.interfaces {
            if let Some(mac) = &iface.mac {
                mac_index.insert(mac.clone(), device_id.clone());
            }
        }
    }

    for (device_id, tables) in tables_by_device {
        for neighbor in &tables.neighbors {
            let Some(remote_node) = neighbor
                .remote_name
                .clone()
                .or_else(|| neighbor.remote_id.clone())
                .or_else(|| neighbor.remote_mac.clone())
            else {
                warn!(device = %device_id, port = %neighbor.local_port, "neighbor entry names no remote — dropped");
                summary.dropped += 1;
                continue;
            };

            let local = Endpoint::new(device_id.clone(), Some(neighbor.local_port.as_str()));
            let remote = Endpoint::new(remote_node, neighbor.remote_port.as_deref());
            let detail = match neighbor.source {
                EvidenceSource::Lldp => EvidenceDetail::Lldp {
                    local_port: neighbor.local_port.clone(),
                    remote_port: neighbor.remote_port.clone(),
                    remote_name: neighbor.remote_name.clone(),
                    remote_chassis: neighbor.remote_id.clone(),
                },
                _ => EvidenceDetail::Mndp {
                    local_port: neighbor.local_port.clone(),
                    remote_address: neighbor.remote_id.clone(),
                    remote_identity: neighbor.remote_name.clone(),
                },
            };

            match graph
                .record_evidence(&local, &remote, Evidence::new(detail, captured_at))
                .await
            {
                Ok(_) => summary.edges_recorded += 1,
                Err(e) => {
                    warn!(reason = e.code(), "neighbor evidence dropped");
                    summary.dropped += 1;
                }
            }
        }

        for learn in &tables.mac_learn {
            // A learned MAC belonging to a known device interface pins the
            // remote side; otherwise the MAC itself names an endpoint node.
            let remote_node = mac_index
                .get(&learn.mac)
                .cloned()
                .unwrap_or_else(|| learn.mac.clone());

            let local = Endpoint::new(device_id.clone(), Some(learn.local_port.as_str()));
            let remote = Endpoint::new(remote_node, None);
            let detail = match learn.source {
                EvidenceSource::BridgeHost => EvidenceDetail::BridgeHost {
                    mac: learn.mac.clone(),
                    local_port: learn.local_port.clone(),
                    vlan: learn.vlan.clone(),
                },
                _ => EvidenceDetail::BridgeFdb {
                    mac: learn.mac.clone(),
                    local_port: learn.local_port.clone(),
                    vlan: learn.vlan.clone(),
                },
            };

            match graph
                .record_evidence(&local, &remote, Evidence::new(detail, captured_at))
                .await
            {
                Ok(_) => summary.edges_recorded += 1,
                Err(e) => {
                    warn!(reason = e.code(), "mac-learn evidence dropped");
                    summary.dropped += 1;
                }
            }
        }

        for arp in &tables.arp {
            let local = Endpoint::new(device_id.clone(), Some(arp.iface.as_str()));
            let remote = Endpoint::new(arp.ip.clone(), None);
            let detail = EvidenceDetail::Arp {
                ip: arp.ip.clone(),
                mac: arp.mac.clone(),
                iface: arp.iface.clone(),
            };

            match graph
                .record_evidence(&local, &remote, Evidence::new(detail, captured_at))
                .await
            {
                Ok(_) => summary.edges_recorded += 1,
                Err(e) => {
                    warn!(reason = e.code(), "arp evidence dropped");
                    summary.dropped += 1;
                }
            }
        }
    }

    for host in scanned_hosts {
        graph.record_host(&host.ip, &host.open_tcp_ports).await;
        summary.hosts_recorded += 1;
    }

    info!(
        edges = summary.edges_recorded,
        hosts = summary.hosts_recorded,
        dropped = summary.dropped,
        "correlation cycle complete"
    );
    summary
}
