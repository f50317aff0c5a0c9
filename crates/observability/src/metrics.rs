//! Dispatch metrics collection
//!
//! Prometheus counters for every frame and publish, plus an in-memory
//! aggregator for the end-of-run summary.

use contracts::{ChannelKind, MocapFrame};
use metrics::{counter, gauge, histogram};

/// Record one dispatched frame
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_frame;
///
/// let report = dispatcher.on_frame(&frame);
/// record_frame(&frame, report.elapsed_us());
/// ```
pub fn record_frame(frame: &MocapFrame, dispatch_us: f64) {
    counter!("mocap_relay_frames_total").increment(1);

    if let Some(number) = frame.frame_number {
        gauge!("mocap_relay_last_frame_number").set(number as f64);
    }
    gauge!("mocap_relay_last_timestamp_seconds").set(frame.timestamp);

    gauge!("mocap_relay_frame_rigid_bodies").set(frame.rigid_bodies.len() as f64);
    gauge!("mocap_relay_frame_markers").set(frame.labelled_markers.len() as f64);

    histogram!("mocap_relay_dispatch_duration_us").record(dispatch_us);
}

/// Record a publish attempt
///
/// `target` is a channel kind label or `"aggregate"`.
pub fn record_publish(target: &'static str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "mocap_relay_publishes_total",
        "target" => target,
        "status" => status
    )
    .increment(1);
}

/// Record a newly advertised channel
pub fn record_channel_created(kind: ChannelKind) {
    counter!(
        "mocap_relay_channels_created_total",
        "kind" => kind.as_str()
    )
    .increment(1);
}

/// Record queue depth of a buffered sink
pub fn record_queue_depth(sink_name: &str, depth: usize) {
    gauge!(
        "mocap_relay_sink_queue_depth",
        "sink" => sink_name.to_string()
    )
    .set(depth as f64);
}

/// Record an envelope dropped because a sink queue was full
pub fn record_queue_drop(sink_name: &str) {
    counter!(
        "mocap_relay_sink_dropped_total",
        "sink" => sink_name.to_string()
    )
    .increment(1);
}

/// Record a datagram the frame source could not decode
pub fn record_datagram_rejected(source_name: &str) {
    counter!(
        "mocap_relay_datagrams_rejected_total",
        "source" => source_name.to_string()
    )
    .increment(1);
}

/// Dispatch statistics aggregator
///
/// Aggregates in memory for the summary printed at shutdown.
#[derive(Debug, Clone, Default)]
pub struct DispatchStatsAggregator {
    /// Total frames dispatched
    pub total_frames: u64,

    /// Total successful publishes
    pub total_published: u64,

    /// Total per-entity failures
    pub total_failures: u64,

    /// Frames with at least one failure
    pub frames_with_failures: u64,

    /// Rigid bodies per frame
    pub rigid_body_stats: RunningStats,

    /// Markers per frame
    pub marker_stats: RunningStats,

    /// Dispatch duration (microseconds)
    pub latency_stats: RunningStats,

    /// Tracker timestamp step between frames (milliseconds)
    pub interval_stats: RunningStats,

    last_timestamp: Option<f64>,
}

impl DispatchStatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update with the outcome of one frame
    pub fn update(
        &mut self,
        frame: &MocapFrame,
        published: usize,
        failures: usize,
        dispatch_us: f64,
    ) {
        self.total_frames += 1;
        self.total_published += published as u64;
        self.total_failures += failures as u64;
        if failures > 0 {
            self.frames_with_failures += 1;
        }

        self.rigid_body_stats.push(frame.rigid_bodies.len() as f64);
        self.marker_stats.push(frame.labelled_markers.len() as f64);
        self.latency_stats.push(dispatch_us);

        if let Some(last) = self.last_timestamp {
            self.interval_stats.push((frame.timestamp - last) * 1000.0);
        }
        self.last_timestamp = Some(frame.timestamp);
    }

    /// Generate summary report
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            total_frames: self.total_frames,
            total_published: self.total_published,
            total_failures: self.total_failures,
            frames_with_failures: self.frames_with_failures,
            failure_rate: if self.total_frames > 0 {
                self.frames_with_failures as f64 / self.total_frames as f64 * 100.0
            } else {
                0.0
            },
            rigid_bodies: StatsSummary::from(&self.rigid_body_stats),
            markers: StatsSummary::from(&self.marker_stats),
            dispatch_us: StatsSummary::from(&self.latency_stats),
            frame_interval_ms: StatsSummary::from(&self.interval_stats),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Metrics summary
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_frames: u64,
    pub total_published: u64,
    pub total_failures: u64,
    pub frames_with_failures: u64,
    pub failure_rate: f64,
    pub rigid_bodies: StatsSummary,
    pub markers: StatsSummary,
    pub dispatch_us: StatsSummary,
    pub frame_interval_ms: StatsSummary,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Dispatch Metrics Summary ===")?;
        writeln!(f, "Total frames: {}", self.total_frames)?;
        writeln!(f, "Messages published: {}", self.total_published)?;
        writeln!(
            f,
            "Publish failures: {} in {} frames ({:.2}%)",
            self.total_failures, self.frames_with_failures, self.failure_rate
        )?;
        writeln!(f, "Rigid bodies per frame: {}", self.rigid_bodies)?;
        writeln!(f, "Markers per frame: {}", self.markers)?;
        writeln!(f, "Dispatch time (us): {}", self.dispatch_us)?;
        writeln!(f, "Frame interval (ms): {}", self.frame_interval_ms)?;
        Ok(())
    }
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
