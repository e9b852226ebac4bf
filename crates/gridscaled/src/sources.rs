//! In-process collaborator implementations backed by the config file.
//!
//! The daemon serves autoscaler definitions straight from the loaded
//! config and scales an in-memory workload registry seeded from it.
//! Swapping these for real transports only means providing other
//! implementations of the same traits.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::info;

use gridscale_controller::{ScaleError, SpecSource, Workload, WorkloadAccess};
use gridscale_spec::{Autoscaler, AutoscalerStatus, TargetRef};

use crate::config::DaemonConfig;

/// Serves autoscalers parsed from gridscaled.toml. Status updates are
/// held in memory and logged so an operator can follow the loop.
pub struct FileSpecSource {
    autoscalers: HashMap<String, Autoscaler>,
    statuses: Mutex<HashMap<String, AutoscalerStatus>>,
}

impl FileSpecSource {
    pub fn from_config(config: &DaemonConfig) -> Self {
        let autoscalers = config
            .autoscalers
            .iter()
            .map(|entry| {
                let autoscaler = Autoscaler {
                    name: entry.name.clone(),
                    namespace: entry.namespace.clone(),
                    deleting: false,
                    spec: entry.spec.clone(),
                    status: AutoscalerStatus::default(),
                };
                (autoscaler.key(), autoscaler)
            })
            .collect();
        Self {
            autoscalers,
            statuses: Mutex::new(HashMap::new()),
        }
    }

    pub fn keys(&self) -> Vec<String> {
        self.autoscalers.keys().cloned().collect()
    }
}

#[async_trait]
impl SpecSource for FileSpecSource {
    async fn get(&self, key: &str) -> anyhow::Result<Option<Autoscaler>> {
        let Some(autoscaler) = self.autoscalers.get(key) else {
            return Ok(None);
        };
        let mut autoscaler = autoscaler.clone();
        if let Some(status) = self
            .statuses
            .lock()
            .expect("status lock poisoned")
            .get(key)
        {
            autoscaler.status = status.clone();
        }
        Ok(Some(autoscaler))
    }

    async fn update_status(&self, key: &str, status: &AutoscalerStatus) -> anyhow::Result<()> {
        if let Some(ready) = status.condition("Ready") {
            info!(%key, reason = %ready.reason, desired = ?status.desired_count,
                current = ?status.current_count, "status updated");
        }
        self.statuses
            .lock()
            .expect("status lock poisoned")
            .insert(key.to_string(), status.clone());
        Ok(())
    }
}

/// In-memory workload registry seeded from gridscaled.toml.
///
/// Scaling checks the revision observed at read time, so a concurrent
/// writer surfaces as [`ScaleError::Conflict`] exactly like a remote
/// compare-and-swap would.
pub struct StaticWorkloads {
    workloads: Mutex<HashMap<String, Workload>>,
}

impl StaticWorkloads {
    pub fn from_config(config: &DaemonConfig) -> Arc<Self> {
        let workloads = config
            .workloads
            .iter()
            .map(|entry| {
                let key = format!("{}/{}", entry.namespace, entry.name);
                let workload = Workload {
                    instances: entry.instances,
                    revision: 1,
                };
                (key, workload)
            })
            .collect();
        Arc::new(Self {
            workloads: Mutex::new(workloads),
        })
    }
}

#[async_trait]
impl WorkloadAccess for StaticWorkloads {
    async fn get(&self, target: &TargetRef) -> anyhow::Result<Option<Workload>> {
        Ok(self
            .workloads
            .lock()
            .expect("workload lock poisoned")
            .get(&target.key())
            .cloned())
    }

    async fn scale(
        &self,
        target: &TargetRef,
        desired: u32,
        observed: &Workload,
    ) -> Result<(), ScaleError> {
        let mut workloads = self.workloads.lock().expect("workload lock poisoned");
        let Some(workload) = workloads.get_mut(&target.key()) else {
            return Err(ScaleError::Other(anyhow::anyhow!(
                "workload {} not registered",
                target.key()
            )));
        };
        if workload.revision != observed.revision {
            return Err(ScaleError::Conflict);
        }
        workload.instances = desired;
        workload.revision += 1;
        info!(target = %target.key(), instances = desired, "workload scaled");
        Ok(())
    }
}
