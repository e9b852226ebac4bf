//! gridscale-controller — the reconciliation control loop.
//!
//! A [`Reconciler`] runs one evaluation cycle per autoscaler key:
//! fetch spec and workload, gather samples, decide, record history,
//! apply or simulate, persist status. A [`Controller`] drains a
//! [`WorkQueue`] through the reconciler with a pool of workers, keeping
//! at most one in-flight cycle per key.
//!
//! Collaborators (spec source, workload access, metric source, event
//! sink) are narrow traits; the loop never sees a concrete transport.

pub mod error;
pub mod queue;
pub mod reconciler;
pub mod traits;

pub use error::{ControllerError, ControllerResult};
pub use queue::{Controller, WorkQueue};
pub use reconciler::{ReconcileOutcome, Reconciler};
pub use traits::{
    EventSeverity, EventSink, LogEventSink, ScaleError, SpecSource, Workload, WorkloadAccess,
};
