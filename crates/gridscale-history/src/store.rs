//! Shared, mutex-guarded history map.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use gridscale_policy::HistorySample;

/// Per-key append log of past decisions, bounded on append.
///
/// The handle is `Clone` (backed by `Arc`) and shared across all
/// reconciliation workers. The mutex guards structural access to the
/// map; within one key the caller already serializes cycles, so
/// contention is only cross-key. Construct one store at process start
/// and inject it — never reach for it through ambient state.
#[derive(Clone, Default)]
pub struct HistoryStore {
    inner: Arc<Mutex<HashMap<String, Vec<HistorySample>>>>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns an independent copy of the history for `key`, oldest
    /// first. Never aliases internal state.
    pub fn get(&self, key: &str) -> Vec<HistorySample> {
        let inner = self.inner.lock().expect("history lock poisoned");
        inner.get(key).cloned().unwrap_or_default()
    }

    /// Append one sample for `key`, then retain only the newest
    /// `max_len` entries (oldest dropped first).
    pub fn append(&self, key: &str, sample: HistorySample, max_len: usize) {
        let mut inner = self.inner.lock().expect("history lock poisoned");
        let history = inner.entry(key.to_string()).or_default();
        history.push(sample);
        if history.len() > max_len {
            let excess = history.len() - max_len;
            history.drain(..excess);
        }
    }
}
