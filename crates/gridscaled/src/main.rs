//! gridscaled — the GridScale daemon.
//!
//! Single binary that assembles the autoscaling control loop:
//! - Autoscaler definitions from a TOML config file
//! - Prometheus metric source
//! - Policy engine
//! - Sample history store
//! - Reconciler + worker pool
//!
//! # Usage
//!
//! ```text
//! gridscaled run --config gridscaled.toml --workers 4
//! ```

mod config;
mod sources;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::info;

use gridscale_controller::{Controller, LogEventSink, Reconciler, WorkQueue};
use gridscale_history::HistoryStore;
use gridscale_metrics::PrometheusProvider;
use gridscale_policy::DefaultEngine;

use crate::config::DaemonConfig;
use crate::sources::{FileSpecSource, StaticWorkloads};

#[derive(Parser)]
#[command(name = "gridscaled", about = "GridScale autoscaling daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the control loop against the autoscalers in the config file.
    Run {
        /// Path to the TOML config file.
        #[arg(long, default_value = "gridscaled.toml")]
        config: PathBuf,

        /// Number of concurrent reconcile workers.
        #[arg(long, default_value = "4")]
        workers: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,gridscaled=debug,gridscale=debug".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run { config, workers } => run(config, workers).await,
    }
}

async fn run(config_path: PathBuf, workers: usize) -> anyhow::Result<()> {
    info!("GridScale daemon starting");

    let config = DaemonConfig::from_file(&config_path)?;
    info!(path = ?config_path, autoscalers = config.autoscalers.len(),
        workloads = config.workloads.len(), "config loaded");

    // ── Assemble collaborators ─────────────────────────────────

    let specs = Arc::new(FileSpecSource::from_config(&config));
    let workloads = StaticWorkloads::from_config(&config);
    let metrics = Arc::new(PrometheusProvider::new());
    let history = HistoryStore::new();

    let reconciler = Arc::new(Reconciler::new(
        specs.clone(),
        workloads,
        metrics,
        Arc::new(DefaultEngine),
        history,
        Arc::new(LogEventSink),
    ));

    // ── Seed the queue and start the worker pool ───────────────

    let (queue, rx) = WorkQueue::new();
    let mut keys = specs.keys();
    keys.sort();
    for key in &keys {
        queue.add(key);
    }
    info!(keys = keys.len(), workers, "work queue seeded");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let controller = Controller::new(reconciler, queue);
    let handle = tokio::spawn(async move {
        controller.run(rx, workers, shutdown_rx).await;
    });

    // ── Graceful shutdown on Ctrl-C ────────────────────────────

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");
    let _ = shutdown_tx.send(true);

    let _ = handle.await;
    info!("GridScale daemon stopped");
    Ok(())
}
