//! gridscale-spec — configuration and status types for autoscalers.
//!
//! An [`Autoscaler`] pairs a user-authored [`AutoscalerSpec`] with the
//! controller-owned [`AutoscalerStatus`]. Specs are immutable for the
//! duration of one reconciliation cycle; status is written exactly once
//! per cycle by the controller.
//!
//! Field names serialize in camelCase so configs round-trip with the
//! JSON/TOML shapes operators write by hand.

pub mod status;
pub mod types;

pub use status::{AutoscalerStatus, Condition, ConditionStatus};
pub use types::{
    AggregationStrategy, Autoscaler, AutoscalerSpec, BehaviorSpec, MetricSpec, Mode,
    PrometheusConfig, ScaleDirection, TargetRef,
};
