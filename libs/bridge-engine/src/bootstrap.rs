use std::sync::Arc;

use tokio::sync::watch;

use bridge_api::StorageSink;

use crate::aggregator::{Aggregator, spawn_worker};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::keys::{ObjectKeys, new_run_id};
use crate::metrics::Metrics;
use crate::policy::FlushPolicy;
use crate::queue;
use crate::router::IngressRouter;

/// Per-destination shutdown + join handle.
struct WorkerSlot {
    destination: String,
    handle: tokio::task::JoinHandle<()>,
    shutdown_tx: watch::Sender<bool>,
}

/// The running engine: one aggregator task per destination and the router
/// feeding them.
pub struct Engine {
    router: Arc<IngressRouter>,
    metrics: Arc<Metrics>,
    workers: Vec<WorkerSlot>,
    run_id: String,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("router", &self.router)
            .field("run_id", &self.run_id)
            .field("workers", &self.workers.len())
            .finish()
    }
}

impl Engine {
    /// Validate the configuration and spawn one worker per destination.
    pub fn start(config: &EngineConfig, sink: Arc<dyn StorageSink>) -> Result<Self, EngineError> {
        let metrics = Arc::new(Metrics::new()?);
        Self::start_with_metrics(config, sink, metrics)
    }

    pub fn start_with_metrics(
        config: &EngineConfig,
        sink: Arc<dyn StorageSink>,
        metrics: Arc<Metrics>,
    ) -> Result<Self, EngineError> {
        let destinations = config.resolve()?;
        let run_id = new_run_id();

        let mut router = IngressRouter::new(metrics.clone());
        let mut workers = Vec::with_capacity(destinations.len());

        for dest in destinations {
            let (outbox, inbox) = queue::channel(&config.queue);
            let (shutdown_tx, shutdown_rx) = watch::channel(false);

            let aggregator = Aggregator::new(
                dest.name.clone(),
                FlushPolicy::new(dest.policy),
                sink.clone(),
                metrics.clone(),
                ObjectKeys::new(run_id.clone()),
            );
            let handle = spawn_worker(aggregator, inbox, shutdown_rx);

            tracing::info!(
                destination = %dest.name,
                policy = %dest.policy.kind,
                threshold = dest.policy.threshold,
                topics = ?dest.filters.iter().map(ToString::to_string).collect::<Vec<_>>(),
                "spawned aggregator"
            );

            router.add_destination(dest.name.clone(), dest.filters, outbox);
            workers.push(WorkerSlot {
                destination: dest.name,
                handle,
                shutdown_tx,
            });
        }

        tracing::info!(run_id = %run_id, queue = ?config.queue.mode, "engine started");

        Ok(Engine {
            router: Arc::new(router),
            metrics,
            workers,
            run_id,
        })
    }

    /// Router handed to the ingress side.
    pub fn router(&self) -> &Arc<IngressRouter> {
        &self.router
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Graceful shutdown: every worker drains its queue and flushes once.
    ///
    /// Deliveries racing with shutdown fail with `DestinationClosed`.
    pub async fn shutdown(self) {
        for slot in &self.workers {
            let _ = slot.shutdown_tx.send(true);
        }
        for slot in self.workers {
            if let Err(e) = slot.handle.await {
                tracing::error!(destination = %slot.destination, error = %e, "aggregator task failed");
            }
        }
        tracing::info!(metrics = ?self.metrics.snapshot(), "engine shut down");
    }
}
