//! One evaluation cycle per autoscaler key.
//!
//! The reconciler fetches the autoscaler and its target workload,
//! gathers one sample per configured metric, asks the policy engine
//! for a decision, records it in history, and applies or simulates the
//! change. Expected failures surface through status conditions with a
//! fixed requeue delay; only unexpected fetch errors and rejected
//! scale mutations escalate to the queue's backoff.
//!
//! Status persistence is best-effort: a failed status write is logged
//! and swallowed, the next cycle re-evaluates from scratch.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::{debug, info, warn};

use gridscale_history::HistoryStore;
use gridscale_metrics::MetricSourceProvider;
use gridscale_policy::{HistorySample, PolicyEngine, PolicyInput};
use gridscale_spec::{Autoscaler, ConditionStatus, Mode};

use crate::error::{ControllerError, ControllerResult};
use crate::traits::{EventSeverity, EventSink, ScaleError, SpecSource, WorkloadAccess};

/// Steady-state and transient-failure requeue delay.
const RETRY_SHORT: Duration = Duration::from_secs(30);
/// Requeue delay for failures that usually need human correction.
const RETRY_SLOW: Duration = Duration::from_secs(60);
/// Per-key bound on stored history samples.
const HISTORY_LIMIT: usize = 20;

/// What the caller should do after a successful cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Re-evaluate after this delay; `None` means the key is settled
    /// until something re-enqueues it.
    pub requeue_after: Option<Duration>,
}

impl ReconcileOutcome {
    fn done() -> Self {
        Self {
            requeue_after: None,
        }
    }

    fn after(delay: Duration) -> Self {
        Self {
            requeue_after: Some(delay),
        }
    }
}

/// Drives one autoscaler evaluation cycle end to end.
///
/// All collaborators are injected; the reconciler owns no transport.
pub struct Reconciler {
    specs: Arc<dyn SpecSource>,
    workloads: Arc<dyn WorkloadAccess>,
    metrics: Arc<dyn MetricSourceProvider>,
    engine: Arc<dyn PolicyEngine>,
    history: HistoryStore,
    events: Arc<dyn EventSink>,
}

impl Reconciler {
    pub fn new(
        specs: Arc<dyn SpecSource>,
        workloads: Arc<dyn WorkloadAccess>,
        metrics: Arc<dyn MetricSourceProvider>,
        engine: Arc<dyn PolicyEngine>,
        history: HistoryStore,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            specs,
            workloads,
            metrics,
            engine,
            history,
            events,
        }
    }

    /// Run one evaluation cycle for `key` (`{namespace}/{name}`).
    pub async fn reconcile(&self, key: &str) -> ControllerResult<ReconcileOutcome> {
        let mut autoscaler = match self.specs.get(key).await {
            Ok(Some(a)) => a,
            Ok(None) => {
                // The autoscaler was deleted; nothing left to do.
                debug!(%key, "autoscaler gone");
                return Ok(ReconcileOutcome::done());
            }
            Err(source) => {
                return Err(ControllerError::SpecFetch {
                    key: key.to_string(),
                    source,
                });
            }
        };

        if autoscaler.deleting {
            // No finalizer semantics; skip objects being torn down.
            debug!(%key, "autoscaler deleting, skipping");
            return Ok(ReconcileOutcome::done());
        }

        let now = epoch_secs();
        let spec = autoscaler.spec.clone();
        let target = &spec.target;

        let workload = match self.workloads.get(target).await {
            Ok(Some(w)) => w,
            Ok(None) => {
                autoscaler.status.set_condition(
                    "TargetFound",
                    ConditionStatus::False,
                    "NotFound",
                    &format!("target workload {} not found", target.key()),
                    now,
                );
                self.persist_status(key, &autoscaler).await;
                return Ok(ReconcileOutcome::after(RETRY_SHORT));
            }
            Err(source) => {
                return Err(ControllerError::TargetFetch {
                    target: target.key(),
                    source,
                });
            }
        };

        let source = match self.metrics.acquire(&spec.prometheus.url) {
            Ok(s) => s,
            Err(e) => {
                autoscaler.status.set_condition(
                    "PrometheusAvailable",
                    ConditionStatus::False,
                    "ClientError",
                    &e.to_string(),
                    now,
                );
                self.persist_status(key, &autoscaler).await;
                return Ok(ReconcileOutcome::after(RETRY_SLOW));
            }
        };

        // All-or-nothing sampling: the first failed query aborts the
        // cycle and earlier samples are discarded.
        let mut samples = BTreeMap::new();
        for metric in &spec.metrics {
            match source.query(&metric.query).await {
                Ok(value) => {
                    samples.insert(metric.name.clone(), value);
                }
                Err(e) => {
                    warn!(%key, metric = %metric.name, query = %metric.query, error = %e,
                        "metric query failed");
                    autoscaler.status.set_condition(
                        "PrometheusAvailable",
                        ConditionStatus::False,
                        "QueryError",
                        &e.to_string(),
                        now,
                    );
                    self.persist_status(key, &autoscaler).await;
                    return Ok(ReconcileOutcome::after(RETRY_SHORT));
                }
            }
        }

        let current = workload.instances;
        let history = self.history.get(key);
        let input = PolicyInput {
            current,
            spec: &spec,
            samples: &samples,
            now,
            last_scale_time: autoscaler.status.last_scale_time,
            history: &history,
        };

        let decision = match self.engine.decide(&input) {
            Ok(d) => d,
            Err(e) => {
                autoscaler.status.set_condition(
                    "SpecValid",
                    ConditionStatus::False,
                    "PolicyError",
                    &e.to_string(),
                    now,
                );
                self.persist_status(key, &autoscaler).await;
                return Ok(ReconcileOutcome::after(RETRY_SLOW));
            }
        };

        let desired = decision.desired;
        debug!(%key, current, desired, cooldown = decision.cooldown_active,
            reason = %decision.reason, "decision computed");

        self.history.append(
            key,
            HistorySample {
                timestamp: now,
                desired,
            },
            HISTORY_LIMIT,
        );
        autoscaler.status.current_count = Some(current);
        autoscaler.status.desired_count = Some(desired);
        autoscaler.status.last_samples = samples;

        if spec.mode == Mode::DryRun {
            info!(%key, current, desired, "dry-run: not applying scaling");
            autoscaler.status.set_condition(
                "Ready",
                ConditionStatus::True,
                "DryRun",
                "computed desired count in dry-run mode; no changes applied",
                now,
            );
            self.persist_status(key, &autoscaler).await;
            return Ok(ReconcileOutcome::after(RETRY_SHORT));
        }

        if desired == current {
            debug!(%key, current, "no scaling required");
            autoscaler.status.set_condition(
                "Ready",
                ConditionStatus::True,
                "SteadyState",
                "current instance count already matches desired",
                now,
            );
            self.persist_status(key, &autoscaler).await;
            return Ok(ReconcileOutcome::after(RETRY_SHORT));
        }

        match self.workloads.scale(target, desired, &workload).await {
            Ok(()) => {}
            Err(ScaleError::Conflict) => {
                // The workload moved under us; retry on a fresh read.
                debug!(%key, target = %target.key(), "scale conflict");
                autoscaler.status.set_condition(
                    "Ready",
                    ConditionStatus::False,
                    "Conflict",
                    "target workload changed since read; will retry",
                    now,
                );
                self.persist_status(key, &autoscaler).await;
                return Ok(ReconcileOutcome::after(RETRY_SHORT));
            }
            Err(ScaleError::Other(source)) => {
                autoscaler.status.set_condition(
                    "Ready",
                    ConditionStatus::False,
                    "ScaleFailed",
                    &source.to_string(),
                    now,
                );
                self.persist_status(key, &autoscaler).await;
                return Err(ControllerError::ScaleApply {
                    target: target.key(),
                    desired,
                    source,
                });
            }
        }

        autoscaler.status.last_scale_time = Some(now);
        autoscaler.status.set_condition(
            "Ready",
            ConditionStatus::True,
            "Scaled",
            &format!("scaled from {current} to {desired}"),
            now,
        );
        self.persist_status(key, &autoscaler).await;

        info!(%key, target = %target.key(), from = current, to = desired, "scaled target");
        self.events.publish(
            key,
            EventSeverity::Normal,
            "Scaled",
            &format!("scaled target {} from {current} to {desired}", target.key()),
        );

        Ok(ReconcileOutcome::after(RETRY_SHORT))
    }

    /// Best-effort status write; failures never fail the cycle.
    async fn persist_status(&self, key: &str, autoscaler: &Autoscaler) {
        if let Err(e) = self.specs.update_status(key, &autoscaler.status).await {
            warn!(%key, error = %e, "failed to update status");
        }
    }
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::traits::Workload;
    use gridscale_metrics::{MetricError, MetricResult, MetricSource};
    use gridscale_policy::DefaultEngine;
    use gridscale_spec::{
        AggregationStrategy, AutoscalerSpec, AutoscalerStatus, MetricSpec, PrometheusConfig,
        ScaleDirection, TargetRef,
    };

    // ── Doubles ────────────────────────────────────────────────────

    #[derive(Default)]
    struct FakeSpecs {
        autoscalers: Mutex<Vec<Autoscaler>>,
        statuses: Mutex<Vec<(String, AutoscalerStatus)>>,
        fail_get: bool,
        fail_status: bool,
    }

    impl FakeSpecs {
        fn with(autoscaler: Autoscaler) -> Self {
            Self {
                autoscalers: Mutex::new(vec![autoscaler]),
                ..Default::default()
            }
        }

        fn last_status(&self) -> Option<AutoscalerStatus> {
            self.statuses.lock().unwrap().last().map(|(_, s)| s.clone())
        }

        fn status_writes(&self) -> usize {
            self.statuses.lock().unwrap().len()
        }
    }

    #[async_trait::async_trait]
    impl SpecSource for FakeSpecs {
        async fn get(&self, key: &str) -> anyhow::Result<Option<Autoscaler>> {
            if self.fail_get {
                anyhow::bail!("spec source down");
            }
            Ok(self
                .autoscalers
                .lock()
                .unwrap()
                .iter()
                .find(|a| a.key() == key)
                .cloned())
        }

        async fn update_status(
            &self,
            key: &str,
            status: &AutoscalerStatus,
        ) -> anyhow::Result<()> {
            if self.fail_status {
                anyhow::bail!("status sink down");
            }
            self.statuses
                .lock()
                .unwrap()
                .push((key.to_string(), status.clone()));
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeWorkloads {
        workload: Mutex<Option<Workload>>,
        fail_get: bool,
        conflict: bool,
        fail_scale: bool,
        scaled_to: Mutex<Vec<u32>>,
    }

    impl FakeWorkloads {
        fn with(instances: u32) -> Self {
            Self {
                workload: Mutex::new(Some(Workload {
                    instances,
                    revision: 1,
                })),
                ..Default::default()
            }
        }
    }

    #[async_trait::async_trait]
    impl WorkloadAccess for FakeWorkloads {
        async fn get(&self, _target: &TargetRef) -> anyhow::Result<Option<Workload>> {
            if self.fail_get {
                anyhow::bail!("workload api down");
            }
            Ok(self.workload.lock().unwrap().clone())
        }

        async fn scale(
            &self,
            _target: &TargetRef,
            desired: u32,
            observed: &Workload,
        ) -> Result<(), ScaleError> {
            if self.conflict {
                return Err(ScaleError::Conflict);
            }
            if self.fail_scale {
                return Err(ScaleError::Other(anyhow::anyhow!("patch rejected")));
            }
            let mut slot = self.workload.lock().unwrap();
            if let Some(w) = slot.as_mut() {
                assert_eq!(w.revision, observed.revision);
                w.instances = desired;
                w.revision += 1;
            }
            self.scaled_to.lock().unwrap().push(desired);
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeMetrics {
        /// query expression -> value; unknown queries fail.
        values: std::collections::HashMap<String, f64>,
        fail_acquire: bool,
    }

    impl FakeMetrics {
        fn with(pairs: &[(&str, f64)]) -> Self {
            Self {
                values: pairs
                    .iter()
                    .map(|(q, v)| (q.to_string(), *v))
                    .collect(),
                fail_acquire: false,
            }
        }
    }

    struct FakeSource {
        values: std::collections::HashMap<String, f64>,
    }

    #[async_trait::async_trait]
    impl MetricSource for FakeSource {
        async fn query(&self, query: &str) -> MetricResult<f64> {
            self.values
                .get(query)
                .copied()
                .ok_or(MetricError::Empty)
        }
    }

    impl MetricSourceProvider for FakeMetrics {
        fn acquire(&self, url: &str) -> MetricResult<Arc<dyn MetricSource>> {
            if self.fail_acquire {
                return Err(MetricError::InvalidUrl {
                    url: url.to_string(),
                    message: "unreachable".to_string(),
                });
            }
            Ok(Arc::new(FakeSource {
                values: self.values.clone(),
            }))
        }
    }

    #[derive(Default)]
    struct RecordingEvents {
        events: Mutex<Vec<(String, String)>>,
    }

    impl EventSink for RecordingEvents {
        fn publish(&self, entity: &str, _severity: EventSeverity, reason: &str, _message: &str) {
            self.events
                .lock()
                .unwrap()
                .push((entity.to_string(), reason.to_string()));
        }
    }

    // ── Fixtures ───────────────────────────────────────────────────

    fn autoscaler(metrics: Vec<MetricSpec>) -> Autoscaler {
        Autoscaler {
            name: "api".to_string(),
            namespace: "default".to_string(),
            deleting: false,
            spec: AutoscalerSpec {
                target: TargetRef {
                    api_version: "apps/v1".to_string(),
                    kind: "Deployment".to_string(),
                    name: "api".to_string(),
                    namespace: "default".to_string(),
                },
                min_count: 1,
                max_count: 10,
                mode: Mode::Apply,
                prometheus: PrometheusConfig {
                    url: "http://prom:9090".to_string(),
                },
                aggregation: AggregationStrategy::Max,
                metrics,
                behavior: None,
            },
            status: AutoscalerStatus::default(),
        }
    }

    fn cpu_metric() -> MetricSpec {
        MetricSpec {
            name: "cpu".to_string(),
            query: "avg(cpu)".to_string(),
            weight: None,
            scale_up: Some(ScaleDirection {
                threshold: 70.0,
                step: 2,
            }),
            scale_down: Some(ScaleDirection {
                threshold: 20.0,
                step: 1,
            }),
        }
    }

    struct Harness {
        specs: Arc<FakeSpecs>,
        workloads: Arc<FakeWorkloads>,
        events: Arc<RecordingEvents>,
        history: HistoryStore,
        reconciler: Reconciler,
    }

    fn harness(specs: FakeSpecs, workloads: FakeWorkloads, metrics: FakeMetrics) -> Harness {
        let specs = Arc::new(specs);
        let workloads = Arc::new(workloads);
        let events = Arc::new(RecordingEvents::default());
        let history = HistoryStore::new();
        let reconciler = Reconciler::new(
            specs.clone(),
            workloads.clone(),
            Arc::new(metrics),
            Arc::new(DefaultEngine),
            history.clone(),
            events.clone(),
        );
        Harness {
            specs,
            workloads,
            events,
            history,
            reconciler,
        }
    }

    const KEY: &str = "default/api";

    // ── Tests ──────────────────────────────────────────────────────

    #[tokio::test]
    async fn missing_autoscaler_terminates_silently() {
        let h = harness(
            FakeSpecs::default(),
            FakeWorkloads::with(3),
            FakeMetrics::default(),
        );
        let outcome = h.reconciler.reconcile(KEY).await.unwrap();
        assert_eq!(outcome.requeue_after, None);
        assert_eq!(h.specs.status_writes(), 0);
    }

    #[tokio::test]
    async fn deleting_autoscaler_terminates_silently() {
        let mut a = autoscaler(vec![cpu_metric()]);
        a.deleting = true;
        let h = harness(
            FakeSpecs::with(a),
            FakeWorkloads::with(3),
            FakeMetrics::with(&[("avg(cpu)", 80.0)]),
        );
        let outcome = h.reconciler.reconcile(KEY).await.unwrap();
        assert_eq!(outcome.requeue_after, None);
        assert_eq!(h.specs.status_writes(), 0);
    }

    #[tokio::test]
    async fn spec_fetch_error_is_fatal() {
        let mut specs = FakeSpecs::with(autoscaler(vec![cpu_metric()]));
        specs.fail_get = true;
        let h = harness(specs, FakeWorkloads::with(3), FakeMetrics::default());
        let err = h.reconciler.reconcile(KEY).await.unwrap_err();
        assert!(matches!(err, ControllerError::SpecFetch { .. }));
    }

    #[tokio::test]
    async fn missing_target_sets_condition_and_retries() {
        let h = harness(
            FakeSpecs::with(autoscaler(vec![cpu_metric()])),
            FakeWorkloads::default(), // no workload registered
            FakeMetrics::default(),
        );
        let outcome = h.reconciler.reconcile(KEY).await.unwrap();
        assert_eq!(outcome.requeue_after, Some(RETRY_SHORT));

        let status = h.specs.last_status().unwrap();
        let cond = status.condition("TargetFound").unwrap();
        assert_eq!(cond.status, ConditionStatus::False);
        assert_eq!(cond.reason, "NotFound");
    }

    #[tokio::test]
    async fn target_fetch_error_is_fatal() {
        let mut workloads = FakeWorkloads::with(3);
        workloads.fail_get = true;
        let h = harness(
            FakeSpecs::with(autoscaler(vec![cpu_metric()])),
            workloads,
            FakeMetrics::default(),
        );
        let err = h.reconciler.reconcile(KEY).await.unwrap_err();
        assert!(matches!(err, ControllerError::TargetFetch { .. }));
        assert_eq!(h.specs.status_writes(), 0);
    }

    #[tokio::test]
    async fn client_error_sets_condition_and_retries_slowly() {
        let mut metrics = FakeMetrics::default();
        metrics.fail_acquire = true;
        let h = harness(
            FakeSpecs::with(autoscaler(vec![cpu_metric()])),
            FakeWorkloads::with(3),
            metrics,
        );
        let outcome = h.reconciler.reconcile(KEY).await.unwrap();
        assert_eq!(outcome.requeue_after, Some(RETRY_SLOW));

        let status = h.specs.last_status().unwrap();
        let cond = status.condition("PrometheusAvailable").unwrap();
        assert_eq!(cond.reason, "ClientError");
    }

    #[tokio::test]
    async fn query_error_discards_partial_samples() {
        let mut other = cpu_metric();
        other.name = "rps".to_string();
        other.query = "sum(rps)".to_string();
        // Only the first metric resolves; the second aborts the cycle.
        let h = harness(
            FakeSpecs::with(autoscaler(vec![cpu_metric(), other])),
            FakeWorkloads::with(3),
            FakeMetrics::with(&[("avg(cpu)", 80.0)]),
        );
        let outcome = h.reconciler.reconcile(KEY).await.unwrap();
        assert_eq!(outcome.requeue_after, Some(RETRY_SHORT));

        let status = h.specs.last_status().unwrap();
        let cond = status.condition("PrometheusAvailable").unwrap();
        assert_eq!(cond.reason, "QueryError");
        assert!(status.last_samples.is_empty());
        assert!(h.history.get(KEY).is_empty());
        assert!(h.workloads.scaled_to.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn zero_metrics_sets_policy_error_condition() {
        let h = harness(
            FakeSpecs::with(autoscaler(vec![])),
            FakeWorkloads::with(3),
            FakeMetrics::default(),
        );
        let outcome = h.reconciler.reconcile(KEY).await.unwrap();
        assert_eq!(outcome.requeue_after, Some(RETRY_SLOW));

        let status = h.specs.last_status().unwrap();
        let cond = status.condition("SpecValid").unwrap();
        assert_eq!(cond.status, ConditionStatus::False);
        assert_eq!(cond.reason, "PolicyError");
        assert!(h.history.get(KEY).is_empty());
    }

    #[tokio::test]
    async fn dry_run_records_but_never_mutates() {
        let mut a = autoscaler(vec![cpu_metric()]);
        a.spec.mode = Mode::DryRun;
        let h = harness(
            FakeSpecs::with(a),
            FakeWorkloads::with(3),
            FakeMetrics::with(&[("avg(cpu)", 90.0)]),
        );
        let outcome = h.reconciler.reconcile(KEY).await.unwrap();
        assert_eq!(outcome.requeue_after, Some(RETRY_SHORT));

        let status = h.specs.last_status().unwrap();
        assert_eq!(status.condition("Ready").unwrap().reason, "DryRun");
        assert_eq!(status.current_count, Some(3));
        assert_eq!(status.desired_count, Some(5));
        assert!(status.last_scale_time.is_none());
        assert_eq!(h.history.get(KEY).len(), 1);
        assert!(h.workloads.scaled_to.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn steady_state_refreshes_status_only() {
        // Sample between the thresholds: desired stays at current.
        let h = harness(
            FakeSpecs::with(autoscaler(vec![cpu_metric()])),
            FakeWorkloads::with(3),
            FakeMetrics::with(&[("avg(cpu)", 50.0)]),
        );
        let outcome = h.reconciler.reconcile(KEY).await.unwrap();
        assert_eq!(outcome.requeue_after, Some(RETRY_SHORT));

        let status = h.specs.last_status().unwrap();
        assert_eq!(status.condition("Ready").unwrap().reason, "SteadyState");
        assert_eq!(status.last_samples.get("cpu"), Some(&50.0));
        assert!(h.workloads.scaled_to.lock().unwrap().is_empty());
        assert_eq!(h.history.get(KEY).len(), 1);
    }

    #[tokio::test]
    async fn scale_up_applies_and_emits_event() {
        let h = harness(
            FakeSpecs::with(autoscaler(vec![cpu_metric()])),
            FakeWorkloads::with(3),
            FakeMetrics::with(&[("avg(cpu)", 90.0)]),
        );
        let outcome = h.reconciler.reconcile(KEY).await.unwrap();
        assert_eq!(outcome.requeue_after, Some(RETRY_SHORT));

        assert_eq!(*h.workloads.scaled_to.lock().unwrap(), vec![5]);
        let status = h.specs.last_status().unwrap();
        assert_eq!(status.condition("Ready").unwrap().reason, "Scaled");
        assert!(status.last_scale_time.is_some());
        assert_eq!(status.desired_count, Some(5));

        let events = h.events.events.lock().unwrap();
        assert_eq!(*events, vec![(KEY.to_string(), "Scaled".to_string())]);
    }

    #[tokio::test]
    async fn scale_conflict_retries_without_escalating() {
        let mut workloads = FakeWorkloads::with(3);
        workloads.conflict = true;
        let h = harness(
            FakeSpecs::with(autoscaler(vec![cpu_metric()])),
            workloads,
            FakeMetrics::with(&[("avg(cpu)", 90.0)]),
        );
        let outcome = h.reconciler.reconcile(KEY).await.unwrap();
        assert_eq!(outcome.requeue_after, Some(RETRY_SHORT));

        let status = h.specs.last_status().unwrap();
        let cond = status.condition("Ready").unwrap();
        assert_eq!(cond.status, ConditionStatus::False);
        assert_eq!(cond.reason, "Conflict");
        assert!(status.last_scale_time.is_none());
    }

    #[tokio::test]
    async fn scale_failure_is_fatal_after_reporting() {
        let mut workloads = FakeWorkloads::with(3);
        workloads.fail_scale = true;
        let h = harness(
            FakeSpecs::with(autoscaler(vec![cpu_metric()])),
            workloads,
            FakeMetrics::with(&[("avg(cpu)", 90.0)]),
        );
        let err = h.reconciler.reconcile(KEY).await.unwrap_err();
        assert!(matches!(err, ControllerError::ScaleApply { desired: 5, .. }));

        // The condition was persisted before escalating.
        let status = h.specs.last_status().unwrap();
        let cond = status.condition("Ready").unwrap();
        assert_eq!(cond.status, ConditionStatus::False);
        assert_eq!(cond.reason, "ScaleFailed");
        assert!(h.events.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn status_persist_failure_is_swallowed() {
        let mut specs = FakeSpecs::with(autoscaler(vec![cpu_metric()]));
        specs.fail_status = true;
        let h = harness(
            specs,
            FakeWorkloads::with(3),
            FakeMetrics::with(&[("avg(cpu)", 90.0)]),
        );
        // The scale still happens and the cycle still succeeds.
        let outcome = h.reconciler.reconcile(KEY).await.unwrap();
        assert_eq!(outcome.requeue_after, Some(RETRY_SHORT));
        assert_eq!(*h.workloads.scaled_to.lock().unwrap(), vec![5]);
    }

    #[tokio::test]
    async fn history_accumulates_across_cycles() {
        let h = harness(
            FakeSpecs::with(autoscaler(vec![cpu_metric()])),
            FakeWorkloads::with(3),
            FakeMetrics::with(&[("avg(cpu)", 50.0)]),
        );
        h.reconciler.reconcile(KEY).await.unwrap();
        h.reconciler.reconcile(KEY).await.unwrap();
        h.reconciler.reconcile(KEY).await.unwrap();
        assert_eq!(h.history.get(KEY).len(), 3);
    }
}
