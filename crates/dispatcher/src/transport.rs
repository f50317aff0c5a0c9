//! Transport factory - builds the configured sink

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use contracts::{ChannelHandle, ContractError, OutboundMessage, TransportSink};
use tracing::instrument;

use crate::error::DispatcherError;
use crate::queue::{QueuedSink, SinkWorker};
use crate::sinks::{FileWriter, LogSink, NetworkWriter};

/// Transport kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportKind {
    /// Log every message via tracing
    #[default]
    Log,
    /// UDP datagrams to a bus relay
    Udp,
    /// JSON-lines capture file
    File,
}

impl FromStr for TransportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "log" => Ok(Self::Log),
            "udp" => Ok(Self::Udp),
            "file" => Ok(Self::File),
            other => Err(format!("unknown transport '{}'", other)),
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Log => "log",
            Self::Udp => "udp",
            Self::File => "file",
        })
    }
}

/// Transport configuration
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub name: String,
    pub kind: TransportKind,
    /// Queue capacity for writer-backed transports
    pub queue_capacity: usize,
    /// Writer parameters (`addr`, `format`, `base_path`, ...)
    pub params: HashMap<String, String>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            name: "bus".to_string(),
            kind: TransportKind::Log,
            queue_capacity: 1024,
            params: HashMap::new(),
        }
    }
}

/// A ready transport, plus the worker to join at shutdown if it has one
pub struct Transport {
    pub sink: AnySink,
    pub worker: Option<SinkWorker>,
}

/// Type-erased sink handed to the dispatcher
pub enum AnySink {
    Log(LogSink),
    Queued(QueuedSink),
}

impl TransportSink for AnySink {
    fn name(&self) -> &str {
        match self {
            Self::Log(s) => s.name(),
            Self::Queued(s) => s.name(),
        }
    }

    fn advertise(
        &mut self,
        channel: &ChannelHandle,
        message_type: &'static str,
    ) -> Result<(), ContractError> {
        match self {
            Self::Log(s) => s.advertise(channel, message_type),
            Self::Queued(s) => s.advertise(channel, message_type),
        }
    }

    fn publish(
        &mut self,
        channel: &ChannelHandle,
        message: &OutboundMessage,
    ) -> Result<(), ContractError> {
        match self {
            Self::Log(s) => s.publish(channel, message),
            Self::Queued(s) => s.publish(channel, message),
        }
    }
}

/// Create a transport from configuration
///
/// Must be called from within a Tokio runtime for writer-backed kinds.
#[instrument(
    name = "transport_create",
    skip(config),
    fields(transport = %config.name, kind = %config.kind)
)]
pub async fn create_transport(config: &TransportConfig) -> Result<Transport, DispatcherError> {
    match config.kind {
        TransportKind::Log => Ok(Transport {
            sink: AnySink::Log(LogSink::new(&config.name)),
            worker: None,
        }),
        TransportKind::Udp => {
            if !config.params.contains_key("addr") {
                return Err(DispatcherError::invalid_param(
                    &config.name,
                    "addr",
                    "udp transport needs a bus address",
                ));
            }
            let writer = NetworkWriter::from_params(&config.name, &config.params)
                .await
                .map_err(|e| creation_error(&config.name, e))?;
            let (sink, worker) = QueuedSink::spawn(writer, config.queue_capacity);
            Ok(Transport {
                sink: AnySink::Queued(sink),
                worker: Some(worker),
            })
        }
        TransportKind::File => {
            let writer = FileWriter::from_params(&config.name, &config.params)
                .map_err(|e| creation_error(&config.name, e))?;
            let (sink, worker) = QueuedSink::spawn(writer, config.queue_capacity);
            Ok(Transport {
                sink: AnySink::Queued(sink),
                worker: Some(worker),
            })
        }
    }
}

fn creation_error(name: &str, error: impl Into<ContractError>) -> DispatcherError {
    match error.into() {
        ContractError::ConfigValidation { field, message } => {
            DispatcherError::invalid_param(name, field, message)
        }
        other => DispatcherError::transport_creation(name, other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_kind() {
        assert_eq!("udp".parse::<TransportKind>().unwrap(), TransportKind::Udp);
        assert_eq!(TransportKind::File.to_string(), "file");
        assert!("zmq".parse::<TransportKind>().is_err());
    }

    #[tokio::test]
    async fn test_create_log_transport() {
        let transport = create_transport(&TransportConfig::default()).await.unwrap();
        assert_eq!(transport.sink.name(), "bus");
        assert!(transport.worker.is_none());
    }

    #[tokio::test]
    async fn test_create_udp_transport_requires_addr() {
        let config = TransportConfig {
            kind: TransportKind::Udp,
            ..Default::default()
        };
        let result = create_transport(&config).await;
        assert!(matches!(
            result,
            Err(DispatcherError::InvalidParam { ref param, .. }) if param == "addr"
        ));
    }

    #[tokio::test]
    async fn test_create_udp_transport_rejects_unknown_format() {
        let config = TransportConfig {
            kind: TransportKind::Udp,
            params: HashMap::from([
                ("addr".to_string(), "127.0.0.1:9".to_string()),
                ("format".to_string(), "xml".to_string()),
            ]),
            ..Default::default()
        };
        let result = create_transport(&config).await;
        assert!(matches!(
            result,
            Err(DispatcherError::InvalidParam { ref param, .. }) if param == "format"
        ));
    }

    #[tokio::test]
    async fn test_create_file_transport() {
        let dir = tempdir().unwrap();
        let config = TransportConfig {
            name: "capture".to_string(),
            kind: TransportKind::File,
            queue_capacity: 8,
            params: HashMap::from([(
                "base_path".to_string(),
                dir.path().to_string_lossy().into_owned(),
            )]),
        };

        let transport = create_transport(&config).await.unwrap();
        let worker = transport.worker.expect("file transport has a worker");
        assert_eq!(worker.name(), "capture");

        drop(transport.sink);
        worker.join().await;
    }
}
