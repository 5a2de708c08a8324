//! SNMP OID namespace constants.
//!
//! The symbolic-to-numeric mapping for the standard MIB subtrees discovery
//! collectors walk. This is a static external contract shared with every
//! collector — never runtime-configurable.

use serde::{Deserialize, Serialize};

/// IF-MIB interface table columns.
pub mod if_mib {
    /// ifDescr — interface name.
    pub const IF_DESCR: &str = "1.3.6.1.2.1.2.2.1.2";
    /// ifSpeed — bits per second.
    pub const IF_SPEED: &str = "1.3.6.1.2.1.2.2.1.5";
    /// ifPhysAddress — interface MAC.
    pub const IF_PHYS_ADDRESS: &str = "1.3.6.1.2.1.2.2.1.6";
}

/// BRIDGE-MIB forwarding database columns.
pub mod bridge_mib {
    /// dot1dTpFdbPort — learned MAC (OID-encoded) to bridge port.
    pub const DOT1D_TP_FDB_PORT: &str = "1.3.6.1.2.1.17.4.3.1.2";
    /// dot1dBasePortIfIndex — bridge port to ifIndex.
    pub const DOT1D_BASE_PORT_IF_INDEX: &str = "1.3.6.1.2.1.17.1.4.1.2";
}

/// LLDP-MIB remote systems table columns.
pub mod lldp_mib {
    /// lldpRemChassisId.
    pub const REM_CHASSIS_ID: &str = "1.0.8802.1.1.2.1.4.1.1.5";
    /// lldpRemPortId.
    pub const REM_PORT_ID: &str = "1.0.8802.1.1.2.1.4.1.1.7";
    /// lldpRemSysName.
    pub const REM_SYS_NAME: &str = "1.0.8802.1.1.2.1.4.1.1.9";
}

/// IP-MIB ARP (ipNetToMedia) columns.
pub mod ip_mib {
    /// ipNetToMediaPhysAddress — ifIndex + IPv4 (OID-encoded) to MAC.
    pub const NET_TO_MEDIA_PHYS_ADDRESS: &str = "1.3.6.1.2.1.4.22.1.2";
}

// ─── OidGroup ─────────────────────────────────────────────────────────────────

/// The walkable MIB groups a collector may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OidGroup {
    IfMib,
    BridgeMib,
    LldpMib,
    IpMibArp,
}

impl OidGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            OidGroup::IfMib => "IF_MIB",
            OidGroup::BridgeMib => "BRIDGE_MIB",
            OidGroup::LldpMib => "LLDP_MIB",
            OidGroup::IpMibArp => "IP_MIB_ARP",
        }
    }

    /// The subtree roots a collector walks for this group.
    pub fn walk_roots(&self) -> &'static [&'static str] {
        match self {
            OidGroup::IfMib => &[
                if_mib::IF_DESCR,
                if_mib::IF_SPEED,
                if_mib::IF_PHYS_ADDRESS,
            ],
            OidGroup::BridgeMib => &[
                bridge_mib::DOT1D_TP_FDB_PORT,
                bridge_mib::DOT1D_BASE_PORT_IF_INDEX,
            ],
            OidGroup::LldpMib => &[
                lldp_mib::REM_CHASSIS_ID,
                lldp_mib::REM_PORT_ID,
                lldp_mib::REM_SYS_NAME,
            ],
            OidGroup::IpMibArp => &[ip_mib::NET_TO_MEDIA_PHYS_ADDRESS],
        }
    }
}

impl std::fmt::Display for OidGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walk_roots_are_within_standard_subtrees() {
        for root in OidGroup::IfMib.walk_roots() {
            assert!(root.starts_with("1.3.6.1.2.1.2.2.1."));
        }
        for root in OidGroup::BridgeMib.walk_roots() {
            assert!(root.starts_with("1.3.6.1.2.1.17."));
        }
        for root in OidGroup::LldpMib.walk_roots() {
            assert!(root.starts_with("1.0.8802.1.1.2.1.4.1.1."));
        }
        assert_eq!(
            OidGroup::IpMibArp.walk_roots(),
            &["1.3.6.1.2.1.4.22.1.2"]
        );
    }

    #[test]
    fn group_names_round_trip_through_serde() {
        for group in [
            OidGroup::IfMib,
            OidGroup::BridgeMib,
            OidGroup::LldpMib,
            OidGroup::IpMibArp,
        ] {
            let json = serde_json::to_string(&group).unwrap();
            assert_eq!(json, format!("\"{}\"", group.as_str()));
            let back: OidGroup = serde_json::from_str(&json).unwrap();
            assert_eq!(back, group);
        }
    }
}
