//! Deterministic risk scoring and the approval policy it drives.
//!
//! Scoring is additive over observable change factors — no model in the
//! loop. The resulting level feeds the approval gate: at or above the
//! configured threshold a run can never auto-progress to deployment.

use serde::{Deserialize, Serialize};

use crate::config::OrchestrationConfig;

use super::model::RiskLevel;

/// Observable properties of a change used for scoring.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RiskFactors {
    pub device_count: usize,
    pub has_routing_changes: bool,
    pub has_security_changes: bool,
    pub has_vlan_changes: bool,
    pub affected_sites: usize,
    pub is_production: bool,
}

/// Map change factors to a risk level.
pub fn assess_risk_level(factors: &RiskFactors) -> RiskLevel {
    let mut score = 0u32;

    // Device count impact
    if factors.device_count > 50 {
        score += 3;
    } else if factors.device_count > 10 {
        score += 2;
    } else if factors.device_count > 1 {
        score += 1;
    }

    // Change type impact
    if factors.has_routing_changes {
        score += 2;
    }
    if factors.has_security_changes {
        score += 2;
    }
    if factors.has_vlan_changes {
        score += 1;
    }

    // Site spread impact
    if factors.affected_sites > 5 {
        score += 2;
    } else if factors.affected_sites > 1 {
        score += 1;
    }

    // Production impact
    if factors.is_production {
        score += 2;
    }

    if score >= 8 {
        RiskLevel::Critical
    } else if score >= 5 {
        RiskLevel::High
    } else if score >= 2 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// How many human approvals a run at this risk level needs.
///
/// At or above the configured threshold the configured high-risk count
/// applies; critical runs always need at least two.
pub fn required_approvals(risk: RiskLevel, cfg: &OrchestrationConfig) -> u32 {
    if risk >= cfg.approval_risk_threshold {
        if risk == RiskLevel::Critical {
            cfg.high_risk_approvals_required.max(2)
        } else {
            cfg.high_risk_approvals_required
        }
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_device_lab_change_is_low() {
        let factors = RiskFactors {
            device_count: 1,
            ..Default::default()
        };
        assert_eq!(assess_risk_level(&factors), RiskLevel::Low);
    }

    #[test]
    fn routing_change_in_production_is_high() {
        let factors = RiskFactors {
            device_count: 5,
            has_routing_changes: true,
            is_production: true,
            ..Default::default()
        };
        assert_eq!(assess_risk_level(&factors), RiskLevel::High);
    }

    #[test]
    fn fleet_wide_security_change_is_critical() {
        let factors = RiskFactors {
            device_count: 80,
            has_security_changes: true,
            affected_sites: 7,
            is_production: true,
            ..Default::default()
        };
        assert_eq!(assess_risk_level(&factors), RiskLevel::Critical);
    }

    #[test]
    fn approvals_scale_with_risk() {
        let cfg = OrchestrationConfig::default();
        assert_eq!(required_approvals(RiskLevel::Low, &cfg), 1);
        assert_eq!(required_approvals(RiskLevel::Medium, &cfg), 1);
        assert_eq!(required_approvals(RiskLevel::High, &cfg), 2);
        assert_eq!(required_approvals(RiskLevel::Critical, &cfg), 2);
    }

    #[test]
    fn critical_floor_is_two_even_when_configured_lower() {
        let cfg = OrchestrationConfig {
            high_risk_approvals_required: 1,
            ..Default::default()
        };
        assert_eq!(required_approvals(RiskLevel::High, &cfg), 1);
        assert_eq!(required_approvals(RiskLevel::Critical, &cfg), 2);
    }

    #[test]
    fn lowered_threshold_gates_medium_runs() {
        let cfg = OrchestrationConfig {
            approval_risk_threshold: RiskLevel::Medium,
            ..Default::default()
        };
        assert_eq!(required_approvals(RiskLevel::Medium, &cfg), 2);
        assert_eq!(required_approvals(RiskLevel::Low, &cfg), 1);
    }
}
