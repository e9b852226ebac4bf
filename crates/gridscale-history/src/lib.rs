//! gridscale-history — bounded in-memory decision history.
//!
//! The controller appends one [`HistorySample`] per evaluation cycle,
//! keyed by autoscaler `{namespace}/{name}`; the policy engine reads it
//! back to implement stabilization windows.
//!
//! History lives in process memory only. A controller restart starts
//! with empty history, and keys are never evicted — an autoscaler that
//! stops being reconciled keeps its slot for the process lifetime.
//! Acceptable for bounded numbers of autoscalers.

pub mod store;

pub use gridscale_policy::HistorySample;
pub use store::HistoryStore;
