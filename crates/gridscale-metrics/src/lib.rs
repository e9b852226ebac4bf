//! gridscale-metrics — scalar metric sources for the controller.
//!
//! The controller depends only on the [`MetricSource`] contract: execute
//! one query expression, get back exactly one scalar. The production
//! implementation is [`PrometheusClient`], a thin HTTP/1 client for the
//! Prometheus query API; tests substitute in-memory fakes.

pub mod prometheus;
pub mod source;

pub use prometheus::{PrometheusClient, PrometheusProvider};
pub use source::{MetricError, MetricResult, MetricSource, MetricSourceProvider};
