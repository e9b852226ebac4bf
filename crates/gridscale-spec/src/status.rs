//! Controller-reported status: counts, sample snapshot and conditions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Boolean-ish condition status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionStatus {
    True,
    False,
}

/// One named health condition, at most one entry per type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Condition type, e.g. `Ready`, `TargetFound`, `PrometheusAvailable`.
    #[serde(rename = "type")]
    pub condition_type: String,
    pub status: ConditionStatus,
    /// Machine-readable reason, e.g. `SteadyState`, `QueryError`.
    pub reason: String,
    pub message: String,
    /// Unix timestamp (seconds) of the last True/False flip.
    pub last_transition_time: u64,
}

/// What the controller last computed and applied for one autoscaler.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoscalerStatus {
    /// Instance count observed on the target workload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_count: Option<u32>,
    /// Instance count the policy engine last computed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desired_count: Option<u32>,
    /// Unix timestamp (seconds) of the last applied scale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_scale_time: Option<u64>,
    /// Metric samples used in the last decision, for debugging.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub last_samples: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

impl AutoscalerStatus {
    /// Upsert a condition by type: latest reason/message win, but the
    /// transition time only moves when the boolean status flips.
    pub fn set_condition(
        &mut self,
        condition_type: &str,
        status: ConditionStatus,
        reason: &str,
        message: &str,
        now: u64,
    ) {
        match self
            .conditions
            .iter_mut()
            .find(|c| c.condition_type == condition_type)
        {
            Some(existing) => {
                if existing.status != status {
                    existing.last_transition_time = now;
                }
                existing.status = status;
                existing.reason = reason.to_string();
                existing.message = message.to_string();
            }
            None => self.conditions.push(Condition {
                condition_type: condition_type.to_string(),
                status,
                reason: reason.to_string(),
                message: message.to_string(),
                last_transition_time: now,
            }),
        }
    }

    /// Look up a condition by type.
    pub fn condition(&self, condition_type: &str) -> Option<&Condition> {
        self.conditions
            .iter()
            .find(|c| c.condition_type == condition_type)
    }
}
