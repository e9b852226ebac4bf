//! Per-key work queue with delayed re-enqueue.
//!
//! Replaces the host framework's watch-and-requeue machinery with an
//! explicit queue. Guarantees at most one in-flight cycle per key:
//! distinct keys run fully in parallel, but a key re-added while its
//! cycle is running is parked and re-queued when the cycle completes.
//! Pending keys are deduplicated.
//!
//! Fatal reconcile errors are retried with per-key exponential backoff
//! (base 1s, capped at 5 minutes), reset on the next success.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info};

use crate::reconciler::Reconciler;

const BACKOFF_BASE: Duration = Duration::from_secs(1);
const BACKOFF_CAP: Duration = Duration::from_secs(300);

#[derive(Default)]
struct QueueState {
    /// Keys waiting in the channel.
    pending: HashSet<String>,
    /// Keys currently being reconciled.
    active: HashSet<String>,
    /// Keys re-added while active; re-queued on completion.
    parked: HashSet<String>,
}

/// Shared handle for enqueueing autoscaler keys.
pub struct WorkQueue {
    tx: mpsc::UnboundedSender<String>,
    state: Mutex<QueueState>,
}

impl WorkQueue {
    /// Create a queue and the receiver end the worker pool drains.
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let queue = Arc::new(Self {
            tx,
            state: Mutex::new(QueueState::default()),
        });
        (queue, rx)
    }

    /// Enqueue `key` for reconciliation. Re-adding a pending key is a
    /// no-op; re-adding an active key parks it for one more run.
    pub fn add(&self, key: &str) {
        let mut state = self.state.lock().expect("queue lock poisoned");
        if state.active.contains(key) {
            state.parked.insert(key.to_string());
            return;
        }
        if state.pending.insert(key.to_string()) {
            let _ = self.tx.send(key.to_string());
        }
    }

    /// Enqueue `key` after `delay`. Safe to call any number of times;
    /// dedup happens at enqueue time.
    pub fn add_after(self: &Arc<Self>, key: &str, delay: Duration) {
        let queue = Arc::clone(self);
        let key = key.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            queue.add(&key);
        });
    }

    /// Mark `key` as in-flight. Called by workers on dequeue.
    fn begin(&self, key: &str) {
        let mut state = self.state.lock().expect("queue lock poisoned");
        state.pending.remove(key);
        state.active.insert(key.to_string());
    }

    /// Mark `key` done and re-queue it if it was parked meanwhile.
    fn finish(&self, key: &str) {
        let mut state = self.state.lock().expect("queue lock poisoned");
        state.active.remove(key);
        if state.parked.remove(key) && state.pending.insert(key.to_string()) {
            let _ = self.tx.send(key.to_string());
        }
    }
}

/// Exponential backoff delay for the nth consecutive failure.
fn backoff_delay(failures: u32) -> Duration {
    let exp = failures.saturating_sub(1).min(16);
    (BACKOFF_BASE * 2u32.pow(exp)).min(BACKOFF_CAP)
}

/// Worker pool draining the queue through a [`Reconciler`].
pub struct Controller {
    reconciler: Arc<Reconciler>,
    queue: Arc<WorkQueue>,
}

impl Controller {
    pub fn new(reconciler: Arc<Reconciler>, queue: Arc<WorkQueue>) -> Self {
        Self { reconciler, queue }
    }

    /// Run `workers` concurrent workers until shutdown.
    ///
    /// Cancellation is safe at any await point: a worker between
    /// dequeue and completion finishes its current cycle; keys still
    /// pending are simply dropped with the process.
    pub async fn run(
        &self,
        rx: mpsc::UnboundedReceiver<String>,
        workers: usize,
        shutdown: watch::Receiver<bool>,
    ) {
        let rx = Arc::new(tokio::sync::Mutex::new(rx));
        let failures: Arc<Mutex<HashMap<String, u32>>> = Arc::new(Mutex::new(HashMap::new()));

        info!(workers, "controller started");

        let mut handles = Vec::new();
        for worker_id in 0..workers.max(1) {
            let rx = Arc::clone(&rx);
            let queue = Arc::clone(&self.queue);
            let reconciler = Arc::clone(&self.reconciler);
            let failures = Arc::clone(&failures);
            let shutdown = shutdown.clone();
            handles.push(tokio::spawn(async move {
                worker_loop(worker_id, rx, queue, reconciler, failures, shutdown).await;
            }));
        }

        for handle in handles {
            let _ = handle.await;
        }
        info!("controller stopped");
    }
}

async fn worker_loop(
    worker_id: usize,
    rx: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<String>>>,
    queue: Arc<WorkQueue>,
    reconciler: Arc<Reconciler>,
    failures: Arc<Mutex<HashMap<String, u32>>>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let key = {
            let mut rx = rx.lock().await;
            tokio::select! {
                maybe = rx.recv() => match maybe {
                    Some(key) => key,
                    None => break,
                },
                _ = shutdown.changed() => break,
            }
        };

        queue.begin(&key);
        let result = reconciler.reconcile(&key).await;
        queue.finish(&key);

        match result {
            Ok(outcome) => {
                failures.lock().expect("failures lock poisoned").remove(&key);
                if let Some(delay) = outcome.requeue_after {
                    debug!(worker_id, %key, delay_secs = delay.as_secs(), "requeueing");
                    queue.add_after(&key, delay);
                }
            }
            Err(e) => {
                let attempt = {
                    let mut failures = failures.lock().expect("failures lock poisoned");
                    let n = failures.entry(key.clone()).or_insert(0);
                    *n += 1;
                    *n
                };
                let delay = backoff_delay(attempt);
                error!(worker_id, %key, error = %e, attempt,
                    delay_secs = delay.as_secs(), "reconcile failed, backing off");
                queue.add_after(&key, delay);
            }
        }
    }
    debug!(worker_id, "worker stopped");
}
