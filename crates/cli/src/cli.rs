//! CLI argument definitions using clap.

use clap::{Parser, ValueEnum};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;

use contracts::WireFormat;
use dispatcher::{DispatcherConfig, TransportConfig, TransportKind};
use frame_source::SourceOptions;
use observability::ObservabilityConfig;

/// Mocap Relay - distributes motion-capture frames to per-entity bus channels
#[derive(Parser, Debug)]
#[command(
    name = "mocap-relay",
    author,
    version,
    about = "Relay motion-capture frames to per-entity bus channels",
    long_about = "Connects to a motion-capture frame source and publishes one pose channel per\n\
                  rigid body, one point channel per standalone marker and an aggregate\n\
                  marker visualization.\n\n\
                  Use `fake` as SERVER to dispatch a single canned frame and exit."
)]
pub struct Cli {
    /// Frame source address (`host[:port]`) or `fake`
    #[arg(value_name = "SERVER")]
    pub server: String,

    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, env = "MOCAP_RELAY_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(long, value_enum, default_value = "pretty", env = "MOCAP_RELAY_LOG_FORMAT")]
    pub log_format: LogFormat,

    /// Where published messages go
    #[arg(long, value_enum, default_value = "log", env = "MOCAP_RELAY_TRANSPORT")]
    pub transport: TransportArg,

    /// Bus relay address for the `udp` transport
    #[arg(long, env = "MOCAP_RELAY_BUS_ADDR")]
    pub bus_addr: Option<SocketAddr>,

    /// Encoding of frames received from the source and of envelopes sent to the bus
    #[arg(long, value_enum, default_value = "json", env = "MOCAP_RELAY_BUS_FORMAT")]
    pub bus_format: FormatArg,

    /// Output directory for the `file` transport
    #[arg(long, default_value = "./output", env = "MOCAP_RELAY_OUTPUT")]
    pub output: PathBuf,

    /// Topic namespace
    #[arg(long, default_value = dispatcher::DEFAULT_NAMESPACE, env = "MOCAP_RELAY_NAMESPACE")]
    pub namespace: String,

    /// Queue capacity between the dispatcher and an async bus writer
    #[arg(long, default_value = "1024", env = "MOCAP_RELAY_QUEUE_CAPACITY")]
    pub queue_capacity: usize,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "MOCAP_RELAY_METRICS_PORT")]
    pub metrics_port: u16,
}

impl Cli {
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "warn";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }

    pub fn observability_config(&self) -> ObservabilityConfig {
        ObservabilityConfig {
            log_format: self.log_format.into(),
            metrics_port: (self.metrics_port != 0).then_some(self.metrics_port),
            default_log_level: self.log_level().to_string(),
        }
    }

    pub fn source_options(&self) -> SourceOptions {
        SourceOptions {
            format: self.bus_format.into(),
            ..Default::default()
        }
    }

    pub fn dispatcher_config(&self) -> DispatcherConfig {
        DispatcherConfig {
            namespace: self.namespace.clone(),
            ..Default::default()
        }
    }

    /// Transport settings; writer parameters only for the selected kind
    pub fn transport_config(&self) -> TransportConfig {
        let kind = TransportKind::from(self.transport);
        let mut params = HashMap::new();

        match kind {
            TransportKind::Udp => {
                if let Some(addr) = self.bus_addr {
                    params.insert("addr".to_string(), addr.to_string());
                }
                params.insert(
                    "format".to_string(),
                    WireFormat::from(self.bus_format).to_string(),
                );
            }
            TransportKind::File => {
                params.insert(
                    "base_path".to_string(),
                    self.output.to_string_lossy().into_owned(),
                );
            }
            TransportKind::Log => {}
        }

        TransportConfig {
            name: kind.to_string(),
            kind,
            queue_capacity: self.queue_capacity,
            params,
        }
    }
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}

/// Transport selection
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TransportArg {
    /// Log every message
    #[default]
    Log,
    /// Send envelopes to a UDP bus relay
    Udp,
    /// Record envelopes to a JSON-lines file
    File,
}

impl From<TransportArg> for TransportKind {
    fn from(arg: TransportArg) -> Self {
        match arg {
            TransportArg::Log => Self::Log,
            TransportArg::Udp => Self::Udp,
            TransportArg::File => Self::File,
        }
    }
}

/// Wire format selection
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FormatArg {
    #[default]
    Json,
    Bincode,
}

impl From<FormatArg> for WireFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Json => Self::Json,
            FormatArg::Bincode => Self::Bincode,
        }
    }
}
