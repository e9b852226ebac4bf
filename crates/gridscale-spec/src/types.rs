//! Autoscaler configuration types.
//!
//! These mirror what an operator writes: which workload to scale, the
//! replica bounds, the metric signals that drive decisions, and the
//! optional behavior knobs (cooldowns, stabilization, rate limits).

use serde::{Deserialize, Serialize};

use crate::status::AutoscalerStatus;

/// Points to the workload whose instance count is being controlled.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetRef {
    pub api_version: String,
    pub kind: String,
    pub name: String,
    pub namespace: String,
}

impl TargetRef {
    /// Composite `{namespace}/{name}` key for the target workload.
    pub fn key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

/// How the controller acts on computed decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Mode {
    /// Apply computed counts to the target workload.
    #[default]
    Apply,
    /// Compute and report decisions without touching the workload.
    DryRun,
}

/// Connection settings for the metric source backing this autoscaler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrometheusConfig {
    /// Base URL of the Prometheus HTTP API,
    /// e.g. `http://prometheus.monitoring.svc:9090`.
    pub url: String,
}

/// Threshold and step size for one scaling direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaleDirection {
    /// Metric value at which scaling triggers. For scale-up, samples
    /// above the threshold trigger; for scale-down, samples below it.
    pub threshold: f64,
    /// How many instances one decision adds or removes. Further rate
    /// limiting applies in the policy engine.
    pub step: u32,
}

/// One metric signal driving scaling decisions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricSpec {
    /// Logical name, unique within one autoscaler.
    pub name: String,
    /// Query expression sent to the metric source. Opaque to the
    /// policy engine; it should evaluate to a single scalar.
    pub query: String,
    /// Relative weight under `weighted` aggregation. Defaults to 1.0.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_up: Option<ScaleDirection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_down: Option<ScaleDirection>,
}

/// How per-metric projections are combined into one count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationStrategy {
    #[default]
    Max,
    Min,
    Average,
    Weighted,
}

impl std::fmt::Display for AggregationStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AggregationStrategy::Max => "max",
            AggregationStrategy::Min => "min",
            AggregationStrategy::Average => "average",
            AggregationStrategy::Weighted => "weighted",
        };
        f.write_str(s)
    }
}

/// Stabilization, cooldown and rate limiting knobs.
///
/// Every field is optional; an absent field disables that feature.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BehaviorSpec {
    /// How long past desired counts suppress a scale-down, to avoid
    /// flapping on transient dips.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stabilization_window_seconds: Option<u32>,
    /// Minimum gap between consecutive scale-ups.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_up_cooldown_seconds: Option<u32>,
    /// Minimum gap between consecutive scale-downs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_down_cooldown_seconds: Option<u32>,
    /// Cap on growth per decision, as a percentage of the current count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_scale_up_step_percent: Option<u32>,
    /// Cap on shrinkage per decision, as a percentage of the current count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_scale_down_step_percent: Option<u32>,
}

/// Desired behavior for one autoscaler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoscalerSpec {
    pub target: TargetRef,
    /// Lower bound of the instance count. Must be at least 1.
    pub min_count: u32,
    /// Upper bound of the instance count. Must be at least `min_count`.
    pub max_count: u32,
    #[serde(default)]
    pub mode: Mode,
    pub prometheus: PrometheusConfig,
    #[serde(default)]
    pub aggregation: AggregationStrategy,
    /// Metric signals driving scaling. At least one is required for
    /// the policy engine to produce a decision.
    pub metrics: Vec<MetricSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub behavior: Option<BehaviorSpec>,
}

/// A named autoscaler object: spec plus controller-owned status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Autoscaler {
    pub name: String,
    pub namespace: String,
    /// Set by the configuration source while the object is being torn
    /// down. The controller skips evaluation for deleting objects.
    #[serde(default)]
    pub deleting: bool,
    pub spec: AutoscalerSpec,
    #[serde(default)]
    pub status: AutoscalerStatus,
}

impl Autoscaler {
    /// Composite `{namespace}/{name}` key for this autoscaler.
    pub fn key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_json() -> &'static str {
        r#"{
            "name": "checkout",
            "namespace": "shop",
            "spec": {
                "target": {
                    "apiVersion": "apps/v1",
                    "kind": "Deployment",
                    "name": "checkout",
                    "namespace": "shop"
                },
                "minCount": 1,
                "maxCount": 10,
                "prometheus": {"url": "http://prom:9090"},
                "metrics": [
                    {"name": "latency", "query": "histogram_quantile(0.95, up)"}
                ]
            }
        }"#
    }

    #[test]
    fn defaults_for_optional_fields() {
        let a: Autoscaler = serde_json::from_str(minimal_json()).unwrap();
        assert_eq!(a.spec.mode, Mode::Apply);
        assert_eq!(a.spec.aggregation, AggregationStrategy::Max);
        assert!(a.spec.behavior.is_none());
        assert!(!a.deleting);
        assert_eq!(a.key(), "shop/checkout");
    }

    #[test]
    fn aggregation_parses_lowercase() {
        let s: AggregationStrategy = serde_json::from_str("\"weighted\"").unwrap();
        assert_eq!(s, AggregationStrategy::Weighted);
        assert_eq!(s.to_string(), "weighted");
    }

    #[test]
    fn target_key_format() {
        let t = TargetRef {
            api_version: "apps/v1".to_string(),
            kind: "Deployment".to_string(),
            name: "api".to_string(),
            namespace: "default".to_string(),
        };
        assert_eq!(t.key(), "default/api");
    }
}
