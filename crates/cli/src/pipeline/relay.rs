//! Relay orchestrator - wires frame source, dispatcher and transport.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use contracts::MocapFrame;
use dispatcher::{DispatcherBuilder, DispatcherConfig, Transport, TransportConfig};
use frame_source::SourceOptions;
use observability::DispatchStatsAggregator;
use tracing::{info, warn};

use super::RelayStats;
use crate::error::CliError;

/// How long to wait for a queued writer to drain at shutdown
const WORKER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Relay configuration
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Frame source address or `fake`
    pub server: String,
    pub source: SourceOptions,
    pub dispatcher: DispatcherConfig,
    pub transport: TransportConfig,
}

/// Main relay orchestrator
pub struct Relay {
    config: RelayConfig,
}

impl Relay {
    pub fn new(config: RelayConfig) -> Self {
        Self { config }
    }

    /// Run until the source ends or `shutdown` resolves
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> Result<RelayStats> {
        let start_time = Instant::now();

        // Connect first: an unreachable source is fatal before any output exists
        let mut source = frame_source::connect(&self.config.server, &self.config.source)
            .map_err(|e| CliError::source_connection(&self.config.server, e.to_string()))?;
        let source_name = source.name().to_string();

        let Transport { sink, worker } = dispatcher::create_transport(&self.config.transport)
            .await
            .context("Failed to create transport")?;
        let sink_name = self.config.transport.name.clone();

        let mut dispatcher = DispatcherBuilder::from_config(self.config.dispatcher.clone())
            .build(sink)
            .context("Failed to build dispatcher")?;
        let dispatch_metrics = Arc::clone(dispatcher.metrics());

        let aggregator = Arc::new(Mutex::new(DispatchStatsAggregator::new()));
        let frame_stats = Arc::clone(&aggregator);

        source.set_callback(Box::new(move |frame: &MocapFrame| {
            let report = dispatcher.on_frame(frame);
            if let Ok(mut stats) = frame_stats.lock() {
                stats.update(
                    frame,
                    report.published,
                    report.failures.len(),
                    report.elapsed_us(),
                );
            }
        }));

        let stop = source.stop_handle();
        info!(source = %source_name, sink = %sink_name, "Relay running");

        // The receive loop blocks; the source and the dispatcher it owns are
        // dropped on that thread when it returns
        let mut spin = tokio::task::spawn_blocking(move || source.spin());

        let spin_result = tokio::select! {
            result = &mut spin => result,
            _ = shutdown => {
                warn!("Received shutdown signal, stopping frame source...");
                stop.stop();
                spin.await
            }
        };

        let source_result = spin_result.context("Frame source task panicked")?;

        let sink_snapshot = match worker {
            Some(worker) => {
                let metrics = Arc::clone(worker.metrics());
                if tokio::time::timeout(WORKER_DRAIN_TIMEOUT, worker.join())
                    .await
                    .is_err()
                {
                    warn!(sink = %sink_name, "Writer did not drain before timeout");
                }
                Some(metrics.snapshot())
            }
            None => None,
        };

        source_result.map_err(|e| CliError::source_stopped(e.to_string()))?;

        let summary = aggregator
            .lock()
            .map(|stats| stats.summary())
            .unwrap_or_default();

        let stats = RelayStats {
            source: source_name,
            sink: sink_name,
            dispatch: dispatch_metrics.snapshot(),
            sink_metrics: sink_snapshot,
            summary,
            duration: start_time.elapsed(),
        };

        info!(
            frames = stats.dispatch.frames,
            channels = stats.dispatch.channels_created,
            duration_secs = stats.duration.as_secs_f64(),
            "Relay shutdown complete"
        );

        Ok(stats)
    }
}
