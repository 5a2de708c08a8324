//! Core configuration.
//!
//! All tunables are externally supplied: `max_ports`, the discovery timeout,
//! the risk threshold that forces human approval, and the confidence scoring
//! bonus. Nothing here is hard-coded into the engines beyond clamp bounds.
//!
//! Priority: explicit value from the embedding service > `netops.toml` >
//! built-in default. A missing or unparsable file falls back to defaults —
//! the core runs fine without any config on disk.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::evidence::graph::ConfidencePolicy;
use crate::orchestrator::model::RiskLevel;

const DEFAULT_MAX_PORTS: usize = 64;
const DEFAULT_TIMEOUT_SECONDS: u64 = 10;
const DEFAULT_HIGH_RISK_APPROVALS: u32 = 2;
const DEFAULT_DIVERSITY_BONUS: u8 = 2;

// ─── DiscoveryConfig ──────────────────────────────────────────────────────────

/// Discovery guardrails and scoring (`[discovery]` in netops.toml).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Maximum comma-separated port tokens a single query may request.
    pub max_ports: usize,
    /// Default per-call timeout in seconds. Clamped into [1, 300] at use.
    pub timeout_seconds: u64,
    /// Confidence bonus per additional distinct evidence source on an edge.
    /// This is the pluggable part of the scoring policy — the ordering
    /// property (source diversity outranks repetition) holds for any value.
    pub diversity_bonus: u8,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            max_ports: DEFAULT_MAX_PORTS,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            diversity_bonus: DEFAULT_DIVERSITY_BONUS,
        }
    }
}

impl DiscoveryConfig {
    /// Confidence policy derived from this config.
    pub fn scoring(&self) -> ConfidencePolicy {
        ConfidencePolicy {
            diversity_bonus: self.diversity_bonus,
        }
    }
}

// ─── OrchestrationConfig ──────────────────────────────────────────────────────

/// Orchestration gating (`[orchestration]` in netops.toml).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OrchestrationConfig {
    /// Approvals required once a run's risk reaches `approval_risk_threshold`.
    pub high_risk_approvals_required: u32,
    /// Risk level at (and above) which a run can never auto-progress to
    /// deployment without the extra human-approval count.
    pub approval_risk_threshold: RiskLevel,
    /// Master switch for the deploy layer. Off by default — a fresh install
    /// can plan and review but never touch devices.
    pub deploy_enabled: bool,
}

impl Default for OrchestrationConfig {
    fn default() -> Self {
        Self {
            high_risk_approvals_required: DEFAULT_HIGH_RISK_APPROVALS,
            approval_risk_threshold: RiskLevel::High,
            deploy_enabled: false,
        }
    }
}

// ─── CoreConfig ───────────────────────────────────────────────────────────────

/// Top-level configuration for the netops core.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CoreConfig {
    pub discovery: DiscoveryConfig,
    pub orchestration: OrchestrationConfig,
}

impl CoreConfig {
    /// Load from a TOML file, falling back to defaults when the file is
    /// absent or unparsable.
    pub fn load(path: &Path) -> Self {
        let Ok(contents) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        match toml::from_str::<CoreConfig>(&contents) {
            Ok(cfg) => cfg,
            Err(e) => {
                error!(path = %path.display(), err = %e, "failed to parse netops.toml — using defaults");
                Self::default()
            }
        }
    }

    /// Load from a TOML file, failing loudly. For embedders that treat a
    /// broken config as a startup error rather than a silent fallback.
    pub fn load_strict(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let cfg = toml::from_str::<CoreConfig>(&contents)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        Ok(cfg)
    }
}
