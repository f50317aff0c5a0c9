//! Dispatcher - per-frame fan-out to entity channels

use std::sync::Arc;
use std::time::{Duration, Instant};

use contracts::{
    ChannelHandle, ChannelKey, ContractError, MocapFrame, OutboundMessage, TransportSink,
};
use tracing::{debug, info, instrument, warn};

use crate::builder::{MessageBuilder, DEFAULT_REFERENCE_FRAME, DEFAULT_VISUALIZATION_NS};
use crate::error::DispatcherError;
use crate::metrics::{DispatchMetrics, DispatchMetricsSnapshot};
use crate::registry::{ChannelRegistry, TopicScheme, DEFAULT_NAMESPACE};

/// Progress is logged on frame numbers divisible by this
const PROGRESS_EVERY: u64 = 1000;

/// Dispatcher configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Topic namespace
    pub namespace: String,
    /// Reference frame stamped on every message
    pub reference_frame: String,
    /// Namespace of the aggregate visualization marker
    pub visualization_ns: String,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            reference_frame: DEFAULT_REFERENCE_FRAME.to_string(),
            visualization_ns: DEFAULT_VISUALIZATION_NS.to_string(),
        }
    }
}

/// Builder for creating a Dispatcher
#[derive(Debug, Default)]
pub struct DispatcherBuilder {
    config: DispatcherConfig,
}

impl DispatcherBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: DispatcherConfig) -> Self {
        Self { config }
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.config.namespace = namespace.into();
        self
    }

    pub fn reference_frame(mut self, reference_frame: impl Into<String>) -> Self {
        self.config.reference_frame = reference_frame.into();
        self
    }

    pub fn visualization_ns(mut self, ns: impl Into<String>) -> Self {
        self.config.visualization_ns = ns.into();
        self
    }

    /// Build the dispatcher around a sink
    ///
    /// Advertises the aggregate visualization channel up front.
    ///
    /// # Errors
    /// Fails if the sink refuses the visualization channel
    #[instrument(name = "dispatcher_builder_build", skip(self, sink), fields(sink = %sink.name()))]
    pub fn build<S: TransportSink>(self, mut sink: S) -> Result<Dispatcher<S>, DispatcherError> {
        let mut registry = ChannelRegistry::new(TopicScheme::new(&self.config.namespace));
        let visualization = registry.ensure_visualization(&mut sink)?;
        let builder =
            MessageBuilder::new(self.config.reference_frame, self.config.visualization_ns);

        info!(
            sink = %sink.name(),
            reference_frame = %builder.reference_frame(),
            visualization = %visualization,
            "Dispatcher ready"
        );

        Ok(Dispatcher {
            sink,
            registry,
            builder,
            visualization,
            metrics: Arc::new(DispatchMetrics::new()),
        })
    }
}

/// What a failure was attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchTarget {
    /// A keyed entity channel
    Channel(ChannelKey),
    /// The aggregate visualization
    Aggregate,
}

impl DispatchTarget {
    fn label(&self) -> &'static str {
        match self {
            Self::Channel(key) => key.kind().as_str(),
            Self::Aggregate => "aggregate",
        }
    }
}

impl std::fmt::Display for DispatchTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Channel(key) => write!(f, "{}", key),
            Self::Aggregate => f.write_str("aggregate"),
        }
    }
}

/// One isolated per-entity failure
#[derive(Debug)]
pub struct DispatchFailure {
    pub target: DispatchTarget,
    pub error: ContractError,
}

/// Outcome of dispatching one frame
#[derive(Debug, Default)]
pub struct DispatchReport {
    /// Successful publishes
    pub published: usize,
    /// Channels advertised during this frame
    pub channels_created: usize,
    /// Failures, in attempt order
    pub failures: Vec<DispatchFailure>,
    /// Wall time spent in `on_frame`
    pub elapsed: Duration,
}

impl DispatchReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn elapsed_us(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1e6
    }
}

/// Frame dispatcher
///
/// Owns the channel registry and the sink. `on_frame` is a direct
/// synchronous call made from the frame source's receive loop; it never
/// suspends and returns only after every publish of the frame was
/// attempted.
pub struct Dispatcher<S: TransportSink> {
    sink: S,
    registry: ChannelRegistry,
    builder: MessageBuilder,
    visualization: ChannelHandle,
    metrics: Arc<DispatchMetrics>,
}

impl<S: TransportSink> Dispatcher<S> {
    /// Dispatcher with default configuration
    pub fn new(sink: S) -> Result<Self, DispatcherError> {
        DispatcherBuilder::new().build(sink)
    }

    pub fn registry(&self) -> &ChannelRegistry {
        &self.registry
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Shared counters, still readable after the dispatcher moves
    pub fn metrics(&self) -> &Arc<DispatchMetrics> {
        &self.metrics
    }

    pub fn metrics_snapshot(&self) -> DispatchMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Give the sink back, e.g. to shut it down
    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Dispatch one frame
    ///
    /// Order within the frame: rigid-body poses, then the aggregate
    /// visualization, then standalone marker points. A failure on one
    /// entity is recorded and the rest are still attempted.
    pub fn on_frame(&mut self, frame: &MocapFrame) -> DispatchReport {
        let start = Instant::now();
        let channels_before = self.registry.len();
        let mut report = DispatchReport::default();

        for (index, body) in frame.rigid_bodies.iter().enumerate() {
            let message = self.builder.build_pose(frame.timestamp, body);
            self.publish_keyed(ChannelKey::RigidBody(index), message.into(), &mut report);
        }

        // Empty marker sets skip aggregate and per-marker publishes alike
        if !frame.labelled_markers.is_empty() {
            self.publish_aggregate(frame, &mut report);

            for marker in frame.standalone_markers() {
                let message = self.builder.build_point(frame.timestamp, marker);
                let key = ChannelKey::Marker(marker.marker_id);
                self.publish_keyed(key, message.into(), &mut report);
            }
        }

        report.channels_created = self.registry.len() - channels_before;
        report.elapsed = start.elapsed();

        self.metrics.inc_frames();
        self.metrics.add_channels_created(report.channels_created as u64);
        observability::record_frame(frame, report.elapsed_us());

        debug!(
            t = frame.timestamp,
            frame_number = ?frame.frame_number,
            rigid_bodies = frame.rigid_bodies.len(),
            markers = frame.labelled_markers.len(),
            published = report.published,
            failures = report.failures.len(),
            "Frame dispatched"
        );

        if frame.frame_number.is_some_and(|n| n % PROGRESS_EVERY == 0) {
            info!(
                frames = self.metrics.frames(),
                channels = self.registry.len(),
                "Dispatcher progress"
            );
        }

        report
    }

    fn publish_keyed(
        &mut self,
        key: ChannelKey,
        message: OutboundMessage,
        report: &mut DispatchReport,
    ) {
        let target = DispatchTarget::Channel(key);
        match self.registry.ensure(key, &mut self.sink) {
            Ok(handle) => {
                let result = self.sink.publish(&handle, &message);
                self.record(target, result, report);
            }
            Err(e) => self.record(target, Err(e), report),
        }
    }

    fn publish_aggregate(&mut self, frame: &MocapFrame, report: &mut DispatchReport) {
        let result = self
            .builder
            .build_aggregate_visualization(frame.timestamp, &frame.labelled_markers)
            .and_then(|message| self.sink.publish(&self.visualization, &message.into()));
        self.record(DispatchTarget::Aggregate, result, report);
    }

    fn record(
        &self,
        target: DispatchTarget,
        result: Result<(), ContractError>,
        report: &mut DispatchReport,
    ) {
        match result {
            Ok(()) => {
                report.published += 1;
                self.metrics.inc_publish_count();
                observability::record_publish(target.label(), true);
            }
            Err(error) => {
                warn!(
                    sink = %self.sink.name(),
                    target = %target,
                    error = %error,
                    "Publish failed, continuing with remaining entities"
                );
                self.metrics.inc_failure_count();
                observability::record_publish(target.label(), false);
                report.failures.push(DispatchFailure { target, error });
            }
        }
    }
}
