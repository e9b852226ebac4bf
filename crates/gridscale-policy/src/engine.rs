//! Core decision logic for one reconciliation cycle.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use gridscale_spec::{AggregationStrategy, AutoscalerSpec, MetricSpec};

/// Errors from the policy engine.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("no metrics defined in spec")]
    NoMetrics,
}

/// One past decision, kept for stabilization windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistorySample {
    /// Unix timestamp (seconds) of the evaluation.
    pub timestamp: u64,
    /// Desired count the engine computed at that time.
    pub desired: u32,
}

/// The engine's answer for one evaluation cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub desired: u32,
    /// Human-readable summary of per-metric samples and projections.
    pub reason: String,
    /// Whether a cooldown forced the result back to the current count.
    pub cooldown_active: bool,
}

/// Everything the engine needs for one decision.
///
/// `now` is injected by the caller; the engine never reads a clock.
#[derive(Debug, Clone)]
pub struct PolicyInput<'a> {
    pub current: u32,
    pub spec: &'a AutoscalerSpec,
    /// Metric name -> latest sample. A configured metric absent from
    /// this map is unresolved for the cycle and projects neutrally.
    pub samples: &'a BTreeMap<String, f64>,
    /// Unix timestamp (seconds) of this evaluation.
    pub now: u64,
    /// Unix timestamp (seconds) of the last applied scale, if any.
    pub last_scale_time: Option<u64>,
    /// Past decisions, oldest first.
    pub history: &'a [HistorySample],
}

/// Decision engine contract. One production implementation
/// ([`DefaultEngine`]); tests substitute their own.
pub trait PolicyEngine: Send + Sync {
    fn decide(&self, input: &PolicyInput<'_>) -> Result<Decision, PolicyError>;
}

/// The straightforward threshold-and-step engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultEngine;

impl PolicyEngine for DefaultEngine {
    fn decide(&self, input: &PolicyInput<'_>) -> Result<Decision, PolicyError> {
        let spec = input.spec;
        if spec.metrics.is_empty() {
            return Err(PolicyError::NoMetrics);
        }

        let current = i64::from(input.current);
        let mut projections = Vec::with_capacity(spec.metrics.len());
        let mut weights = Vec::with_capacity(spec.metrics.len());
        let mut reasons = Vec::new();

        for metric in &spec.metrics {
            let Some(&sample) = input.samples.get(&metric.name) else {
                // Unresolved metric is neutral for this cycle.
                projections.push(current);
                weights.push(1.0);
                continue;
            };

            let projected = project(current, sample, metric);
            projections.push(projected);
            weights.push(metric.weight.unwrap_or(1.0));
            reasons.push(format!("{}={:.4} -> {}", metric.name, sample, projected));
        }

        let mut desired = aggregate(&projections, &weights, spec.aggregation);
        desired = desired.clamp(i64::from(spec.min_count), i64::from(spec.max_count));

        let (desired, cooldown_active) = shape(input, desired);

        let reason = format!(
            "metrics=[{}], aggregation={}",
            reasons.join("; "),
            spec.aggregation
        );

        Ok(Decision {
            desired: desired.max(1) as u32,
            reason,
            cooldown_active,
        })
    }
}

/// Map one metric sample to a desired count.
///
/// Both direction checks read the same `current` baseline, so when
/// both thresholds fire the scale-down branch overwrites scale-up.
fn project(current: i64, sample: f64, metric: &MetricSpec) -> i64 {
    let mut desired = current;

    if let Some(up) = &metric.scale_up
        && sample > up.threshold
    {
        desired = current + i64::from(up.step);
    }

    if let Some(down) = &metric.scale_down
        && sample < down.threshold
    {
        desired = (current - i64::from(down.step)).max(1);
    }

    desired
}

/// Combine per-metric projections into a single count.
///
/// `average` and `weighted` truncate toward zero, biasing non-exact
/// results downward.
fn aggregate(projections: &[i64], weights: &[f64], strategy: AggregationStrategy) -> i64 {
    let Some(&first) = projections.first() else {
        return 1;
    };

    match strategy {
        AggregationStrategy::Min => projections.iter().copied().min().unwrap_or(first),
        AggregationStrategy::Max => projections.iter().copied().max().unwrap_or(first),
        AggregationStrategy::Average => {
            projections.iter().sum::<i64>() / projections.len() as i64
        }
        AggregationStrategy::Weighted => {
            let total: f64 = weights.iter().sum();
            if total == 0.0 {
                return first;
            }
            let sum: f64 = projections
                .iter()
                .zip(weights)
                .map(|(&p, &w)| p as f64 * w)
                .sum();
            (sum / total) as i64
        }
    }
}

/// Apply cooldown, stabilization and rate limiting to a candidate.
fn shape(input: &PolicyInput<'_>, mut desired: i64) -> (i64, bool) {
    let Some(behavior) = &input.spec.behavior else {
        return (desired, false);
    };

    let current = i64::from(input.current);
    let mut cooldown_active = false;

    if let Some(last) = input.last_scale_time {
        let elapsed = input.now.saturating_sub(last);

        if desired > current
            && let Some(cooldown) = behavior.scale_up_cooldown_seconds
            && elapsed < u64::from(cooldown)
        {
            cooldown_active = true;
            desired = current;
        }

        if desired < current
            && let Some(cooldown) = behavior.scale_down_cooldown_seconds
            && elapsed < u64::from(cooldown)
        {
            cooldown_active = true;
            desired = current;
        }
    }

    // A transient dip must stay low for the whole window before it can
    // shrink the workload: take the max over in-window history.
    if let Some(window) = behavior.stabilization_window_seconds
        && desired < current
    {
        let cutoff = input.now.saturating_sub(u64::from(window));
        for sample in input.history {
            if sample.timestamp > cutoff && i64::from(sample.desired) > desired {
                desired = i64::from(sample.desired);
            }
        }
    }

    let delta = desired - current;
    if delta > 0
        && let Some(percent) = behavior.max_scale_up_step_percent
    {
        let allowed = rate_limit_step(current, percent);
        if delta > allowed {
            desired = current + allowed;
        }
    }
    if delta < 0
        && let Some(percent) = behavior.max_scale_down_step_percent
    {
        let allowed = rate_limit_step(current, percent);
        if -delta > allowed {
            desired = current - allowed;
        }
    }

    (desired.max(1), cooldown_active)
}

/// Absolute per-cycle step allowed for a percentage cap, never below 1.
fn rate_limit_step(current: i64, percent: u32) -> i64 {
    ((current * i64::from(percent)) / 100).max(1)
}
