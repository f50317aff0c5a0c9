//! QueuedSink - hands bus traffic to a writer task through a bounded queue
//!
//! The dispatcher runs on the frame source's thread and must not wait on
//! sockets or disks. `QueuedSink` only does a non-blocking `try_send`; the
//! `SinkWorker` task owns the `BusWriter` and does the slow part.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, warn};

use contracts::{
    BusEnvelope, BusWriter, ChannelHandle, ContractError, OutboundMessage, TransportSink,
};

use crate::metrics::SinkMetrics;

/// Sending half: the `TransportSink` the dispatcher owns
pub struct QueuedSink {
    name: String,
    tx: mpsc::Sender<BusEnvelope>,
    metrics: Arc<SinkMetrics>,
}

/// Worker half: joins the writer task after every `QueuedSink` is dropped
pub struct SinkWorker {
    name: String,
    metrics: Arc<SinkMetrics>,
    worker_handle: JoinHandle<()>,
}

impl QueuedSink {
    /// Spawn the writer task and return both halves
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn<W>(writer: W, queue_capacity: usize) -> (Self, SinkWorker)
    where
        W: BusWriter + Send + 'static,
    {
        let name = writer.name().to_string();
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let metrics = Arc::new(SinkMetrics::new());

        let worker_metrics = Arc::clone(&metrics);
        let worker_name = name.clone();

        let worker_handle = tokio::spawn(async move {
            writer_loop(writer, rx, worker_metrics, worker_name).await;
        });

        let sink = Self {
            name: name.clone(),
            tx,
            metrics: Arc::clone(&metrics),
        };
        let worker = SinkWorker {
            name,
            metrics,
            worker_handle,
        };
        (sink, worker)
    }

    pub fn metrics(&self) -> &Arc<SinkMetrics> {
        &self.metrics
    }

    /// Queue an envelope without blocking
    fn enqueue(&self, envelope: BusEnvelope) -> Result<(), String> {
        match self.tx.try_send(envelope) {
            Ok(()) => {
                let depth = self.tx.max_capacity() - self.tx.capacity();
                self.metrics.set_queue_len(depth);
                observability::record_queue_depth(&self.name, depth);
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(envelope)) => {
                self.metrics.inc_dropped_count();
                observability::record_queue_drop(&self.name);
                warn!(
                    sink = %self.name,
                    topic = envelope.topic(),
                    "Queue full, envelope dropped"
                );
                Err("queue full".to_string())
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                error!(sink = %self.name, "Writer task closed unexpectedly");
                Err("writer task closed".to_string())
            }
        }
    }
}

impl TransportSink for QueuedSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn advertise(
        &mut self,
        channel: &ChannelHandle,
        message_type: &'static str,
    ) -> Result<(), ContractError> {
        self.enqueue(BusEnvelope::Advertise {
            topic: channel.topic().to_string(),
            message_type: message_type.to_string(),
        })
        .map_err(|e| ContractError::advertise(&self.name, channel.topic(), e))
    }

    fn publish(
        &mut self,
        channel: &ChannelHandle,
        message: &OutboundMessage,
    ) -> Result<(), ContractError> {
        self.enqueue(BusEnvelope::Publish {
            topic: channel.topic().to_string(),
            message: message.clone(),
        })
        .map_err(|e| ContractError::publish(&self.name, channel.topic(), e))
    }
}

impl SinkWorker {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metrics(&self) -> &Arc<SinkMetrics> {
        &self.metrics
    }

    /// Wait for the writer task to drain, flush and close
    ///
    /// Returns once every `QueuedSink` for this worker has been dropped.
    #[instrument(name = "sink_worker_join", skip(self), fields(sink = %self.name))]
    pub async fn join(self) {
        if let Err(e) = self.worker_handle.await {
            error!(sink = %self.name, error = ?e, "Writer task panicked");
        }
        debug!(sink = %self.name, "SinkWorker shutdown complete");
    }
}

/// Worker task that consumes envelopes and drives the writer
#[instrument(
    name = "sink_writer_loop",
    skip(writer, rx, metrics),
    fields(sink = %name)
)]
async fn writer_loop<W: BusWriter>(
    mut writer: W,
    mut rx: mpsc::Receiver<BusEnvelope>,
    metrics: Arc<SinkMetrics>,
    name: String,
) {
    debug!(sink = %name, "Writer task started");

    while let Some(envelope) = rx.recv().await {
        metrics.set_queue_len(rx.len());

        match writer.write(&envelope).await {
            Ok(()) => {
                metrics.inc_write_count();
            }
            Err(e) => {
                metrics.inc_failure_count();
                error!(
                    sink = %name,
                    topic = envelope.topic(),
                    error = %e,
                    "Write failed"
                );
                // Continue processing - don't crash on single failure
            }
        }
    }

    // Cleanup
    if let Err(e) = writer.flush().await {
        error!(sink = %name, error = %e, "Flush failed on shutdown");
    }
    if let Err(e) = writer.close().await {
        error!(sink = %name, error = %e, "Close failed on shutdown");
    }

    debug!(sink = %name, "Writer task stopped");
}
