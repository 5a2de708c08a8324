//! SNMP walk-row parsing and normalization.
//!
//! Collectors hand over raw `(oid, value)` rows per MIB group. This module
//! turns them into [`NormalizedTables`] — the flat interface / neighbor /
//! MAC-learn / ARP tables the topology correlator consumes. Rows that do not
//! decode (short OIDs, octets out of range) are skipped, never fatal.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::evidence::model::EvidenceSource;

use super::oids::{bridge_mib, if_mib, ip_mib, lldp_mib, OidGroup};

// ─── Raw walk rows ────────────────────────────────────────────────────────────

/// One row from an SNMP walk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnmpRow {
    pub oid: String,
    pub value: String,
}

/// One walked MIB group from one target.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnmpDataset {
    pub oid_group: OidGroup,
    pub rows: Vec<SnmpRow>,
}

// ─── Normalized tables ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceEntry {
    pub if_name: String,
    pub if_index: Option<u32>,
    pub mac: Option<String>,
    pub speed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NeighborEntry {
    pub local_port: String,
    pub remote_id: Option<String>,
    pub remote_mac: Option<String>,
    pub remote_port: Option<String>,
    pub remote_name: Option<String>,
    /// `Lldp` or `Mndp` — which discovery protocol reported the neighbor.
    pub source: EvidenceSource,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MacLearnEntry {
    pub local_port: String,
    pub mac: String,
    pub vlan: Option<String>,
    /// `BridgeFdb` (SNMP) or `BridgeHost` (CLI).
    pub source: EvidenceSource,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArpEntry {
    pub ip: String,
    pub mac: Option<String>,
    pub iface: String,
}

/// Flat per-device discovery tables, ready for correlation.
#[derive(Debug, Clone, Default)]
pub struct NormalizedTables {
    pub interfaces: Vec<InterfaceEntry>,
    pub neighbors: Vec<NeighborEntry>,
    pub mac_learn: Vec<MacLearnEntry>,
    pub arp: Vec<ArpEntry>,
}

// ─── OID decode helpers ───────────────────────────────────────────────────────

fn trailing_index(oid: &str) -> Option<u32> {
    oid.rsplit('.').next()?.parse().ok()
}

/// Recover a MAC address from the trailing six OID octets.
fn mac_from_oid(oid: &str) -> Option<String> {
    let parts: Vec<&str> = oid.split('.').collect();
    if parts.len() < 6 {
        return None;
    }
    let octets = &parts[parts.len() - 6..];
    let mut out = Vec::with_capacity(6);
    for part in octets {
        let value: u16 = part.parse().ok()?;
        if value > 255 {
            return None;
        }
        out.push(format!("{value:02x}"));
    }
    Some(out.join(":"))
}

/// Recover an IPv4 address from the trailing four OID octets.
fn ip_from_oid(oid: &str) -> Option<String> {
    let parts: Vec<&str> = oid.split('.').collect();
    if parts.len() < 4 {
        return None;
    }
    let octets = &parts[parts.len() - 4..];
    for part in octets {
        let value: u16 = part.parse().ok()?;
        if value > 255 {
            return None;
        }
    }
    Some(octets.join("."))
}

/// Canonicalize a MAC to lowercase colon-separated form. Accepts the usual
/// `:`/`-`/`.` separators and bare hex. Anything that is not exactly twelve
/// hex digits is rejected.
pub fn normalize_mac(raw: &str) -> Option<String> {
    let hex: String = raw
        .chars()
        .filter(|c| c.is_ascii_hexdigit())
        .collect::<String>()
        .to_ascii_lowercase();
    if hex.len() != 12 || raw.chars().any(|c| !c.is_ascii_hexdigit() && !":-. ".contains(c)) {
        return None;
    }
    let pairs: Vec<String> = hex
        .as_bytes()
        .chunks(2)
        .map(|pair| String::from_utf8_lossy(pair).into_owned())
        .collect();
    Some(pairs.join(":"))
}

fn column_index<'a>(oid: &'a str, column: &str) -> Option<&'a str> {
    oid.strip_prefix(column)?.strip_prefix('.')
}

// ─── Per-MIB parsers ──────────────────────────────────────────────────────────

/// Decoded IF-MIB interface table.
#[derive(Debug, Clone, Default)]
pub struct IfTable {
    pub name_by_index: BTreeMap<u32, String>,
    pub mac_by_index: BTreeMap<u32, String>,
    pub speed_by_index: BTreeMap<u32, u64>,
}

pub fn parse_if_mib(rows: &[SnmpRow]) -> IfTable {
    let mut table = IfTable::default();
    for row in rows {
        if column_index(&row.oid, if_mib::IF_DESCR).is_some() {
            if let Some(idx) = trailing_index(&row.oid) {
                table.name_by_index.insert(idx, row.value.clone());
            }
        } else if column_index(&row.oid, if_mib::IF_PHYS_ADDRESS).is_some() {
            if let (Some(idx), Some(mac)) = (trailing_index(&row.oid), normalize_mac(&row.value)) {
                table.mac_by_index.insert(idx, mac);
            }
        } else if column_index(&row.oid, if_mib::IF_SPEED).is_some() {
            if let (Some(idx), Ok(speed)) = (trailing_index(&row.oid), row.value.parse::<u64>()) {
                table.speed_by_index.insert(idx, speed);
            }
        }
    }
    table
}

/// Decoded BRIDGE-MIB forwarding database: learned MAC → ifIndex.
///
/// The MIB splits this across two columns (MAC → bridge port, bridge port →
/// ifIndex); the join happens here.
pub fn parse_bridge_mib(rows: &[SnmpRow]) -> BTreeMap<String, u32> {
    let mut mac_to_bridge_port: BTreeMap<String, u32> = BTreeMap::new();
    let mut bridge_port_to_if_index: BTreeMap<u32, u32> = BTreeMap::new();

    for row in rows {
        if column_index(&row.oid, bridge_mib::DOT1D_TP_FDB_PORT).is_some() {
            if let (Some(mac), Ok(port)) = (mac_from_oid(&row.oid), row.value.parse::<u32>()) {
                mac_to_bridge_port.insert(mac, port);
            }
        } else if column_index(&row.oid, bridge_mib::DOT1D_BASE_PORT_IF_INDEX).is_some() {
            if let (Some(port), Ok(if_index)) =
                (trailing_index(&row.oid), row.value.parse::<u32>())
            {
                bridge_port_to_if_index.insert(port, if_index);
            }
        }
    }

    mac_to_bridge_port
        .into_iter()
        .filter_map(|(mac, port)| {
            bridge_port_to_if_index
                .get(&port)
                .map(|if_index| (mac, *if_index))
        })
        .collect()
}

/// One LLDP remote-systems row set, keyed by local port index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LldpNeighborRow {
    pub local_port_index: u32,
    pub remote_chassis: Option<String>,
    pub remote_port: Option<String>,
    pub remote_sys_name: Option<String>,
}

pub fn parse_lldp_mib(rows: &[SnmpRow]) -> Vec<LldpNeighborRow> {
    fn upsert(neighbors: &mut BTreeMap<u32, LldpNeighborRow>, idx: u32) -> &mut LldpNeighborRow {
        neighbors.entry(idx).or_insert_with(|| LldpNeighborRow {
            local_port_index: idx,
            ..Default::default()
        })
    }

    let mut neighbors: BTreeMap<u32, LldpNeighborRow> = BTreeMap::new();
    for row in rows {
        if column_index(&row.oid, lldp_mib::REM_CHASSIS_ID).is_some() {
            if let Some(idx) = trailing_index(&row.oid) {
                upsert(&mut neighbors, idx).remote_chassis = Some(row.value.clone());
            }
        } else if column_index(&row.oid, lldp_mib::REM_PORT_ID).is_some() {
            if let Some(idx) = trailing_index(&row.oid) {
                upsert(&mut neighbors, idx).remote_port = Some(row.value.clone());
            }
        } else if column_index(&row.oid, lldp_mib::REM_SYS_NAME).is_some() {
            if let Some(idx) = trailing_index(&row.oid) {
                upsert(&mut neighbors, idx).remote_sys_name = Some(row.value.clone());
            }
        }
    }

    neighbors.into_values().collect()
}

/// Decoded ipNetToMedia rows: (ifIndex, ip, mac).
#[derive(Debug, Clone, PartialEq)]
pub struct ArpRow {
    pub if_index: u32,
    pub ip: String,
    pub mac: Option<String>,
}

pub fn parse_arp_table(rows: &[SnmpRow]) -> Vec<ArpRow> {
    let mut out = Vec::new();
    for row in rows {
        let Some(index_part) = column_index(&row.oid, ip_mib::NET_TO_MEDIA_PHYS_ADDRESS) else {
            continue;
        };
        // Index layout: <ifIndex>.<a>.<b>.<c>.<d>
        let parts: Vec<&str> = index_part.split('.').collect();
        if parts.len() != 5 {
            continue;
        }
        let (Ok(if_index), Some(ip)) = (parts[0].parse::<u32>(), ip_from_oid(&row.oid)) else {
            continue;
        };
        out.push(ArpRow {
            if_index,
            ip,
            mac: normalize_mac(&row.value),
        });
    }
    out
}

// ─── Dataset normalization ────────────────────────────────────────────────────

/// Normalize one device's walked MIB groups into flat tables.
///
/// BRIDGE, LLDP, and ARP rows are indexed by ifIndex and need the IF-MIB
/// table to resolve port names — without it they are skipped.
pub fn normalize_snmp_datasets(datasets: &[SnmpDataset]) -> NormalizedTables {
    let mut tables = NormalizedTables::default();

    let if_rows = datasets
        .iter()
        .find(|d| d.oid_group == OidGroup::IfMib)
        .map(|d| parse_if_mib(&d.rows));

    if let Some(if_table) = &if_rows {
        for (if_index, if_name) in &if_table.name_by_index {
            tables.interfaces.push(InterfaceEntry {
                if_name: if_name.clone(),
                if_index: Some(*if_index),
                mac: if_table.mac_by_index.get(if_index).cloned(),
                speed: if_table.speed_by_index.get(if_index).copied(),
            });
        }
    }

    let Some(if_table) = if_rows else {
        return tables;
    };

    for dataset in datasets {
        match dataset.oid_group {
            OidGroup::IfMib => {}
            OidGroup::BridgeMib => {
                for (mac, if_index) in parse_bridge_mib(&dataset.rows) {
                    let Some(if_name) = if_table.name_by_index.get(&if_index) else {
                        continue;
                    };
                    tables.mac_learn.push(MacLearnEntry {
                        local_port: if_name.clone(),
                        mac,
                        vlan: None,
                        source: EvidenceSource::BridgeFdb,
                    });
                }
            }
            OidGroup::LldpMib => {
                for neighbor in parse_lldp_mib(&dataset.rows) {
                    let Some(if_name) = if_table.name_by_index.get(&neighbor.local_port_index)
                    else {
                        continue;
                    };
                    tables.neighbors.push(NeighborEntry {
                        local_port: if_name.clone(),
                        remote_id: neighbor.remote_chassis.clone(),
                        remote_mac: neighbor
                            .remote_chassis
                            .as_deref()
                            .and_then(normalize_mac),
                        remote_port: neighbor.remote_port,
                        remote_name: neighbor.remote_sys_name,
                        source: EvidenceSource::Lldp,
                    });
                }
            }
            OidGroup::IpMibArp => {
                for arp in parse_arp_table(&dataset.rows) {
                    let Some(if_name) = if_table.name_by_index.get(&arp.if_index) else {
                        continue;
                    };
                    tables.arp.push(ArpEntry {
                        ip: arp.ip,
                        mac: arp.mac,
                        iface: if_name.clone(),
                    });
                }
            }
        }
    }

    tables
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(oid: &str, value: &str) -> SnmpRow {
        SnmpRow {
            oid: oid.to_string(),
            value: value.to_string(),
        }
    }

    #[test]
    fn normalize_mac_accepts_common_forms() {
        assert_eq!(
            normalize_mac("AA:BB:CC:DD:EE:FF").as_deref(),
            Some("aa:bb:cc:dd:ee:ff")
        );
        assert_eq!(
            normalize_mac("aabb.ccdd.eeff").as_deref(),
            Some("aa:bb:cc:dd:ee:ff")
        );
        assert_eq!(
            normalize_mac("AA-BB-CC-DD-EE-FF").as_deref(),
            Some("aa:bb:cc:dd:ee:ff")
        );
        assert_eq!(normalize_mac("not a mac"), None);
        assert_eq!(normalize_mac("aa:bb:cc"), None);
    }

    #[test]
    fn parse_if_mib_collects_names_macs_speeds() {
        let table = parse_if_mib(&[
            row("1.3.6.1.2.1.2.2.1.2.1", "ether1"),
            row("1.3.6.1.2.1.2.2.1.2.2", "ether2"),
            row("1.3.6.1.2.1.2.2.1.6.1", "AA:BB:CC:DD:EE:01"),
            row("1.3.6.1.2.1.2.2.1.5.1", "1000000000"),
            row("1.3.6.1.2.1.2.2.1.5.2", "garbage"),
        ]);
        assert_eq!(table.name_by_index.get(&1).map(String::as_str), Some("ether1"));
        assert_eq!(
            table.mac_by_index.get(&1).map(String::as_str),
            Some("aa:bb:cc:dd:ee:01")
        );
        assert_eq!(table.speed_by_index.get(&1), Some(&1_000_000_000));
        assert_eq!(table.speed_by_index.get(&2), None);
    }

    #[test]
    fn parse_bridge_mib_joins_fdb_and_base_port() {
        // MAC aa:bb:cc:dd:ee:02 learned on bridge port 7, port 7 → ifIndex 2.
        let fdb = parse_bridge_mib(&[
            row("1.3.6.1.2.1.17.4.3.1.2.170.187.204.221.238.2", "7"),
            row("1.3.6.1.2.1.17.1.4.1.2.7", "2"),
            // Dangling bridge port with no ifIndex mapping — dropped.
            row("1.3.6.1.2.1.17.4.3.1.2.170.187.204.221.238.3", "9"),
        ]);
        assert_eq!(fdb.get("aa:bb:cc:dd:ee:02"), Some(&2));
        assert_eq!(fdb.len(), 1);
    }

    #[test]
    fn parse_lldp_mib_merges_columns_per_port() {
        let neighbors = parse_lldp_mib(&[
            row("1.0.8802.1.1.2.1.4.1.1.5.0.3", "aa:bb:cc:dd:ee:99"),
            row("1.0.8802.1.1.2.1.4.1.1.7.0.3", "24"),
            row("1.0.8802.1.1.2.1.4.1.1.9.0.3", "sw2"),
        ]);
        assert_eq!(neighbors.len(), 1);
        assert_eq!(neighbors[0].local_port_index, 3);
        assert_eq!(neighbors[0].remote_port.as_deref(), Some("24"));
        assert_eq!(neighbors[0].remote_sys_name.as_deref(), Some("sw2"));
    }

    #[test]
    fn parse_arp_table_recovers_ip_from_oid() {
        let arp = parse_arp_table(&[
            row("1.3.6.1.2.1.4.22.1.2.2.10.0.0.15", "AA:BB:CC:DD:EE:15"),
            // Octet out of range — dropped.
            row("1.3.6.1.2.1.4.22.1.2.2.10.0.0.999", "AA:BB:CC:DD:EE:16"),
        ]);
        assert_eq!(arp.len(), 1);
        assert_eq!(arp[0].ip, "10.0.0.15");
        assert_eq!(arp[0].if_index, 2);
        assert_eq!(arp[0].mac.as_deref(), Some("aa:bb:cc:dd:ee:15"));
    }

    #[test]
    fn normalize_without_if_mib_yields_empty_tables() {
        let tables = normalize_snmp_datasets(&[SnmpDataset {
            oid_group: OidGroup::LldpMib,
            rows: vec![row("1.0.8802.1.1.2.1.4.1.1.5.0.3", "chassis")],
        }]);
        assert!(tables.interfaces.is_empty());
        assert!(tables.neighbors.is_empty());
    }

    #[test]
    fn normalize_full_device_walk() {
        let tables = normalize_snmp_datasets(&[
            SnmpDataset {
                oid_group: OidGroup::IfMib,
                rows: vec![
                    row("1.3.6.1.2.1.2.2.1.2.1", "ether1"),
                    row("1.3.6.1.2.1.2.2.1.2.2", "ether2"),
                    row("1.3.6.1.2.1.2.2.1.6.2", "AA:BB:CC:DD:EE:02"),
                ],
            },
            SnmpDataset {
                oid_group: OidGroup::LldpMib,
                rows: vec![
                    row("1.0.8802.1.1.2.1.4.1.1.5.0.1", "chassis-sw2"),
                    row("1.0.8802.1.1.2.1.4.1.1.9.0.1", "sw2"),
                ],
            },
            SnmpDataset {
                oid_group: OidGroup::BridgeMib,
                rows: vec![
                    row("1.3.6.1.2.1.17.4.3.1.2.170.187.204.221.238.3", "7"),
                    row("1.3.6.1.2.1.17.1.4.1.2.7", "2"),
                ],
            },
            SnmpDataset {
                oid_group: OidGroup::IpMibArp,
                rows: vec![row("1.3.6.1.2.1.4.22.1.2.1.10.0.0.5", "AA:BB:CC:DD:EE:05")],
            },
        ]);

        assert_eq!(tables.interfaces.len(), 2);
        assert_eq!(tables.neighbors.len(), 1);
        assert_eq!(tables.neighbors[0].local_port, "ether1");
        assert_eq!(tables.neighbors[0].remote_name.as_deref(), Some("sw2"));
        assert_eq!(tables.mac_learn.len(), 1);
        assert_eq!(tables.mac_learn[0].local_port, "ether2");
        assert_eq!(tables.mac_learn[0].source, EvidenceSource::BridgeFdb);
        assert_eq!(tables.arp.len(), 1);
        assert_eq!(tables.arp[0].iface, "ether1");
    }
}
