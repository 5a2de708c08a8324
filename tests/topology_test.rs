//! Topology inference integration tests.
//!
//! These exercise the full discovery pipeline:
//!   SNMP rows → normalize → correlate → EvidenceGraph → TopologySnapshot
//!
//! All tests run against in-memory state — no collectors required.

use std::collections::BTreeMap;

use chrono::Utc;
use netops_core::config::CoreConfig;
use netops_core::discovery::oids::OidGroup;
use netops_core::discovery::snmp::{normalize_snmp_datasets, SnmpDataset, SnmpRow};
use netops_core::evidence::graph::{ConfidencePolicy, EvidenceGraph};
use netops_core::evidence::model::{Endpoint, Evidence, EvidenceDetail};
use netops_core::topology::builder::build_snapshot;
use netops_core::topology::correlate::{correlate_tables, ScannedHost};
use netops_core::topology::model::NodeRole;
use netops_core::NetOpsContext;

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn row(oid: &str, value: &str) -> SnmpRow {
    SnmpRow {
        oid: oid.to_string(),
        value: value.to_string(),
    }
}

fn lldp_evidence(local: &str, remote: &str, remote_name: &str) -> Evidence {
    Evidence::new(
        EvidenceDetail::Lldp {
            local_port: local.to_string(),
            remote_port: Some(remote.to_string()),
            remote_name: Some(remote_name.to_string()),
            remote_chassis: None,
        },
        Utc::now(),
    )
}

fn fdb_evidence(mac: &str, port: &str) -> Evidence {
    Evidence::new(
        EvidenceDetail::BridgeFdb {
            mac: mac.to_string(),
            local_port: port.to_string(),
            vlan: None,
        },
        Utc::now(),
    )
}

fn arp_evidence(ip: &str, iface: &str) -> Evidence {
    Evidence::new(
        EvidenceDetail::Arp {
            ip: ip.to_string(),
            mac: None,
            iface: iface.to_string(),
        },
        Utc::now(),
    )
}

// ─── Test 1: source diversity outranks repetition, end to end ────────────────

/// LLDP + BRIDGE_FDB on sw1↔sw2 must outrank ARP twice on sw2↔sw3.
#[tokio::test]
async fn two_source_edge_outranks_repeated_single_source_edge() {
    let graph = EvidenceGraph::new(ConfidencePolicy::default());

    let sw1 = Endpoint::new("sw1", Some("1"));
    let sw2 = Endpoint::new("sw2", Some("24"));
    let diverse_key = graph
        .record_evidence(&sw1, &sw2, lldp_evidence("1", "24", "sw2"))
        .await
        .unwrap();
    graph
        .record_evidence(&sw2, &sw1, fdb_evidence("aa:bb:cc:dd:ee:01", "24"))
        .await
        .unwrap();

    let sw2_flat = Endpoint::new("sw2", None);
    let sw3 = Endpoint::new("sw3", None);
    let repeated_key = graph
        .record_evidence(&sw2_flat, &sw3, arp_evidence("10.0.0.3", "br0"))
        .await
        .unwrap();
    graph
        .record_evidence(&sw2_flat, &sw3, arp_evidence("10.0.0.3", "br0"))
        .await
        .unwrap();

    let snapshot = build_snapshot(&graph).await;
    let diverse = snapshot.edges.iter().find(|e| e.key == diverse_key).unwrap();
    let repeated = snapshot
        .edges
        .iter()
        .find(|e| e.key == repeated_key)
        .unwrap();

    assert_eq!(diverse.sources.len(), 2);
    assert_eq!(diverse.evidence_count, 2);
    assert_eq!(repeated.sources.len(), 1);
    assert_eq!(repeated.evidence_count, 2);
    assert!(diverse.confidence > repeated.confidence);
}

// ─── Test 2: full SNMP pipeline ──────────────────────────────────────────────

/// Walk rows for one device flow through normalization and correlation into
/// a snapshot with the expected nodes, edges, and roles.
#[tokio::test]
async fn snmp_walk_to_snapshot() {
    let datasets = vec![
        SnmpDataset {
            oid_group: OidGroup::IfMib,
            rows: vec![
                row("1.3.6.1.2.1.2.2.1.2.1", "ether1"),
                row("1.3.6.1.2.1.2.2.1.2.2", "ether2"),
                row("1.3.6.1.2.1.2.2.1.6.1", "AA:BB:CC:DD:EE:01"),
            ],
        },
        SnmpDataset {
            oid_group: OidGroup::LldpMib,
            rows: vec![
                row("1.0.8802.1.1.2.1.4.1.1.5.0.1", "chassis-core1"),
                row("1.0.8802.1.1.2.1.4.1.1.7.0.1", "28"),
                row("1.0.8802.1.1.2.1.4.1.1.9.0.1", "core1"),
            ],
        },
        SnmpDataset {
            oid_group: OidGroup::IpMibArp,
            rows: vec![row("1.3.6.1.2.1.4.22.1.2.2.10.0.0.50", "AA:BB:CC:DD:EE:50")],
        },
    ];

    let tables = normalize_snmp_datasets(&datasets);
    assert_eq!(tables.interfaces.len(), 2);
    assert_eq!(tables.neighbors.len(), 1);
    assert_eq!(tables.arp.len(), 1);

    let graph = EvidenceGraph::new(ConfidencePolicy::default());
    let mut by_device = BTreeMap::new();
    by_device.insert("sw1".to_string(), tables);

    let hosts = vec![ScannedHost {
        ip: "10.0.0.50".into(),
        open_tcp_ports: vec![22, 443],
        hostname: None,
    }];

    let summary = correlate_tables(&graph, &by_device, &hosts, Utc::now()).await;
    assert_eq!(summary.edges_recorded, 2);
    assert_eq!(summary.hosts_recorded, 1);
    assert_eq!(summary.dropped, 0);

    let snapshot = build_snapshot(&graph).await;
    assert!(snapshot.has_node("sw1"));
    assert!(snapshot.has_node("core1"));
    assert!(snapshot.has_node("10.0.0.50"));

    // The scanned host exposes SSH/HTTPS — classified as a server. The
    // switches expose nothing well-known — unknown.
    assert_eq!(snapshot.node("10.0.0.50").unwrap().role, NodeRole::Server);
    assert_eq!(snapshot.node("sw1").unwrap().role, NodeRole::Unknown);
}

// ─── Test 3: snapshots are stable values ─────────────────────────────────────

/// Rebuilding from unchanged graph state yields the same nodes, edges, and
/// roles — consumers hold immutable views, not live references.
#[tokio::test]
async fn rebuilt_snapshot_is_identical_modulo_timestamp() {
    let graph = EvidenceGraph::new(ConfidencePolicy::default());
    graph
        .record_evidence(
            &Endpoint::new("sw1", Some("1")),
            &Endpoint::new("sw2", Some("24")),
            lldp_evidence("1", "24", "sw2"),
        )
        .await
        .unwrap();
    graph.record_host("10.0.0.9", &[3389]).await;

    let first = build_snapshot(&graph).await;
    let second = build_snapshot(&graph).await;

    let ids = |snap: &netops_core::topology::model::TopologySnapshot| {
        snap.nodes
            .iter()
            .map(|n| (n.id.clone(), n.role))
            .collect::<Vec<_>>()
    };
    assert_eq!(ids(&first), ids(&second));
    assert_eq!(
        first.edges.iter().map(|e| &e.key).collect::<Vec<_>>(),
        second.edges.iter().map(|e| &e.key).collect::<Vec<_>>()
    );
    assert_eq!(
        first.edges[0].confidence,
        second.edges[0].confidence
    );
}

// ─── Test 4: context wiring ──────────────────────────────────────────────────

/// The shared context exposes one graph to many collector handles.
#[tokio::test]
async fn context_shares_one_graph() {
    let ctx = NetOpsContext::new(CoreConfig::default());
    let handle_a = ctx.clone();
    let handle_b = ctx.clone();

    handle_a
        .graph
        .record_evidence(
            &Endpoint::new("sw1", Some("1")),
            &Endpoint::new("sw2", Some("24")),
            lldp_evidence("1", "24", "sw2"),
        )
        .await
        .unwrap();

    assert_eq!(handle_b.graph.edge_count().await, 1);
}
