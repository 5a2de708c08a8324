//! Vendor-expert output — per-device realizations of a plan.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

use super::plan::Plan;

/// One generated command with its rollback counterpart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslatedCommand {
    pub order: u32,
    pub command: String,
    pub section: String,
    #[serde(default)]
    pub reversible: bool,
    pub rollback_command: Option<String>,
}

/// Vendor-specific configuration for a single device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceConfig {
    pub device_id: String,
    pub device_name: String,
    pub vendor: String,
    /// Redacted snippet for display; the commands are the executable form.
    pub config_snippet: String,
    pub commands: Vec<TranslatedCommand>,
    #[serde(default)]
    pub verify_commands: Vec<String>,
}

/// The vendor expert's full output for one plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorTranslation {
    pub version: String,
    /// The plan this translation realizes.
    pub plan_id: String,
    pub generated_at: DateTime<Utc>,
    pub device_configs: Vec<DeviceConfig>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl VendorTranslation {
    pub fn device_ids(&self) -> BTreeSet<String> {
        self.device_configs
            .iter()
            .map(|c| c.device_id.clone())
            .collect()
    }

    /// A translation must realize the plan it claims to, and must cover the
    /// plan's device set exactly — no device missing, none invented.
    pub fn validate(&self, plan: &Plan) -> Result<(), ValidationError> {
        if self.plan_id != plan.plan_id {
            return Err(ValidationError::TranslationPlanMismatch {
                referenced: self.plan_id.clone(),
                active: plan.plan_id.clone(),
            });
        }

        let planned = plan.device_ids();
        let translated = self.device_ids();

        if let Some(missing) = planned.difference(&translated).next() {
            return Err(ValidationError::TranslationMissingDevice {
                plan_id: plan.plan_id.clone(),
                device_id: missing.clone(),
            });
        }
        if let Some(extra) = translated.difference(&planned).next() {
            return Err(ValidationError::TranslationUnknownDevice {
                plan_id: plan.plan_id.clone(),
                device_id: extra.clone(),
            });
        }
        Ok(())
    }
}
