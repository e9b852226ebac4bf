//! Collaborator contracts the reconciler depends on.
//!
//! Each trait has exactly one production implementation (file/remote
//! sources live outside this crate) plus test doubles in this crate's
//! tests. The reconciler never touches a concrete transport type.

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use gridscale_spec::{Autoscaler, AutoscalerStatus, TargetRef};

/// Live state of a target workload as read at the start of a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workload {
    /// Instance count currently configured on the workload.
    pub instances: u32,
    /// Opaque revision for optimistic concurrency: a scale based on a
    /// stale revision is rejected as a conflict.
    pub revision: u64,
}

/// Errors from [`WorkloadAccess::scale`].
#[derive(Debug, Error)]
pub enum ScaleError {
    /// The workload changed since it was read; retry on a fresh read.
    #[error("workload changed since read")]
    Conflict,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Supplies autoscaler objects and persists their status.
#[async_trait]
pub trait SpecSource: Send + Sync {
    /// Fetch one autoscaler by `{namespace}/{name}` key.
    /// `Ok(None)` means the object no longer exists.
    async fn get(&self, key: &str) -> anyhow::Result<Option<Autoscaler>>;

    /// Persist the reported status for one autoscaler.
    async fn update_status(&self, key: &str, status: &AutoscalerStatus) -> anyhow::Result<()>;
}

/// Reads and mutates target workloads.
#[async_trait]
pub trait WorkloadAccess: Send + Sync {
    /// Fetch the workload's live state. `Ok(None)` means not found.
    async fn get(&self, target: &TargetRef) -> anyhow::Result<Option<Workload>>;

    /// Set the workload's instance count, conditional on `observed`
    /// still being the live state.
    async fn scale(
        &self,
        target: &TargetRef,
        desired: u32,
        observed: &Workload,
    ) -> Result<(), ScaleError>;
}

/// Severity of an observability event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventSeverity {
    Normal,
    Warning,
}

/// Fire-and-forget observability events. No reconciler behavior
/// depends on delivery.
pub trait EventSink: Send + Sync {
    fn publish(&self, entity: &str, severity: EventSeverity, reason: &str, message: &str);
}

/// Event sink that forwards to the tracing pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogEventSink;

impl EventSink for LogEventSink {
    fn publish(&self, entity: &str, severity: EventSeverity, reason: &str, message: &str) {
        match severity {
            EventSeverity::Normal => info!(%entity, reason, message, "event"),
            EventSeverity::Warning => warn!(%entity, reason, message, "event"),
        }
    }
}
