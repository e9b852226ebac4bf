//! Controller error types.
//!
//! Only unexpected fetch failures and rejected scale mutations are
//! fatal for a cycle; everything else is reported through status
//! conditions and retried on a fixed delay.

use thiserror::Error;

/// Result type alias for reconciliation cycles.
pub type ControllerResult<T> = Result<T, ControllerError>;

/// Fatal cycle errors, retried by the work queue's backoff policy.
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("fetching autoscaler {key}: {source}")]
    SpecFetch {
        key: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("fetching target workload {target}: {source}")]
    TargetFetch {
        target: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("scaling {target} to {desired}: {source}")]
    ScaleApply {
        target: String,
        desired: u32,
        #[source]
        source: anyhow::Error,
    },
}
