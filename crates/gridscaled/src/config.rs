//! gridscaled.toml configuration parser.
//!
//! The daemon's config file declares the autoscalers to reconcile and
//! (for local operation) the workload registry they scale against:
//!
//! ```toml
//! [[workloads]]
//! namespace = "shop"
//! name = "checkout"
//! instances = 3
//!
//! [[autoscalers]]
//! namespace = "shop"
//! name = "checkout"
//!
//! [autoscalers.spec]
//! minCount = 1
//! maxCount = 10
//! prometheus = { url = "http://prometheus:9090" }
//!
//! [autoscalers.spec.target]
//! apiVersion = "apps/v1"
//! kind = "Deployment"
//! name = "checkout"
//! namespace = "shop"
//!
//! [[autoscalers.spec.metrics]]
//! name = "latency"
//! query = "histogram_quantile(0.95, sum(rate(request_ms_bucket[5m])) by (le))"
//! scaleUp = { threshold = 250.0, step = 2 }
//! scaleDown = { threshold = 50.0, step = 1 }
//! ```

use std::path::Path;

use serde::Deserialize;

use gridscale_spec::AutoscalerSpec;

#[derive(Debug, Clone, Deserialize)]
pub struct DaemonConfig {
    #[serde(default)]
    pub autoscalers: Vec<AutoscalerEntry>,
    #[serde(default)]
    pub workloads: Vec<WorkloadEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AutoscalerEntry {
    pub name: String,
    pub namespace: String,
    pub spec: AutoscalerSpec,
}

/// Seed entry for the in-memory workload registry.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkloadEntry {
    pub name: String,
    pub namespace: String,
    pub instances: u32,
}

impl DaemonConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: DaemonConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Bounds checks the schema layer would normally enforce.
    fn validate(&self) -> anyhow::Result<()> {
        for entry in &self.autoscalers {
            let spec = &entry.spec;
            if spec.min_count < 1 {
                anyhow::bail!(
                    "autoscaler {}/{}: minCount must be at least 1",
                    entry.namespace,
                    entry.name
                );
            }
            if spec.max_count < spec.min_count {
                anyhow::bail!(
                    "autoscaler {}/{}: maxCount must be at least minCount",
                    entry.namespace,
                    entry.name
                );
            }
        }
        Ok(())
    }
}
