//! Relay statistics.

use std::time::Duration;

use dispatcher::{DispatchMetricsSnapshot, MetricsSnapshot};
use observability::MetricsSummary;

/// Statistics from a relay run
#[derive(Debug, Clone)]
pub struct RelayStats {
    /// Frame source name
    pub source: String,

    /// Transport name
    pub sink: String,

    /// Dispatcher counters
    pub dispatch: DispatchMetricsSnapshot,

    /// Writer counters, for queued transports
    pub sink_metrics: Option<MetricsSnapshot>,

    /// Per-frame statistics
    pub summary: MetricsSummary,

    /// Total duration of the run
    pub duration: Duration,
}

impl RelayStats {
    /// Frames per second over the whole run
    pub fn fps(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.dispatch.frames as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                      Relay Statistics                        ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Source: {}", self.source);
        println!("   ├─ Transport: {}", self.sink);
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Frames: {}", self.dispatch.frames);
        println!("   ├─ FPS: {:.2}", self.fps());
        println!("   └─ Channels created: {}", self.dispatch.channels_created);

        println!("\n📈 Dispatch");
        println!("   ├─ Published: {}", self.dispatch.publish_count);
        println!(
            "   ├─ Failures: {} ({:.2}% of frames)",
            self.dispatch.failure_count, self.summary.failure_rate
        );
        println!("   ├─ Rigid bodies/frame: {}", self.summary.rigid_bodies);
        println!("   ├─ Markers/frame: {}", self.summary.markers);
        println!("   └─ Dispatch time (us): {}", self.summary.dispatch_us);

        if let Some(sink) = &self.sink_metrics {
            println!("\n📦 Writer");
            println!("   ├─ Written: {}", sink.write_count);
            println!("   ├─ Write failures: {}", sink.failure_count);
            println!("   └─ Dropped (queue full): {}", sink.dropped_count);
        }

        println!();
    }
}
