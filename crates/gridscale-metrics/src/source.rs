//! Metric source contracts and errors.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

/// Result type alias for metric source operations.
pub type MetricResult<T> = Result<T, MetricError>;

/// Errors from metric sources.
#[derive(Debug, Error)]
pub enum MetricError {
    #[error("invalid metric source url {url}: {message}")]
    InvalidUrl { url: String, message: String },

    #[error("connecting to {address}: {message}")]
    Connect { address: String, message: String },

    #[error("http error: {0}")]
    Http(String),

    #[error("metric source returned http status {0}")]
    Status(u16),

    #[error("decoding metric response: {0}")]
    Decode(String),

    #[error("query rejected: {0}")]
    Query(String),

    #[error("query returned no samples")]
    Empty,

    #[error("query returned unexpected result type {0:?}")]
    UnexpectedResultType(String),
}

/// A source of scalar metric samples.
///
/// Queries are bounded by the source's own timeout; implementations
/// must return exactly one scalar and error on empty or non-scalar
/// results.
#[async_trait]
pub trait MetricSource: Send + Sync {
    /// Execute `query` and return its single scalar value.
    async fn query(&self, query: &str) -> MetricResult<f64>;
}

/// Builds a metric source client for a configured endpoint.
///
/// The reconciliation loop acquires a client per cycle, so endpoint
/// changes in the spec take effect on the next evaluation.
pub trait MetricSourceProvider: Send + Sync {
    fn acquire(&self, url: &str) -> MetricResult<Arc<dyn MetricSource>>;
}
