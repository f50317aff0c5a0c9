//! NetworkWriter - UDP fire-and-forget bus

use contracts::{BusEnvelope, BusWriter, ContractError, WireFormat};
use std::collections::HashMap;
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tracing::{debug, error, instrument, warn};

/// Configuration for NetworkWriter
#[derive(Debug, Clone)]
pub struct NetworkWriterConfig {
    /// Target address
    pub addr: SocketAddr,
    /// Serialization format
    pub format: WireFormat,
    /// Max datagram size (UDP typically 65507 for IPv4)
    pub max_packet_size: usize,
}

impl NetworkWriterConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, ContractError> {
        let addr_str = params
            .get("addr")
            .ok_or_else(|| ContractError::config_validation("addr", "missing parameter"))?;

        let addr: SocketAddr = addr_str.parse().map_err(|e| {
            let message = format!("invalid address '{}': {}", addr_str, e);
            ContractError::config_validation("addr", message)
        })?;

        let format = match params.get("format") {
            Some(s) => s
                .parse()
                .map_err(|e: String| ContractError::config_validation("format", e))?,
            None => WireFormat::Json,
        };

        let max_packet_size = params
            .get("max_packet_size")
            .and_then(|s| s.parse().ok())
            .unwrap_or(65000);

        Ok(Self {
            addr,
            format,
            max_packet_size,
        })
    }
}

/// Writer that sends envelopes over UDP, one per datagram
pub struct NetworkWriter {
    name: String,
    config: NetworkWriterConfig,
    socket: Option<UdpSocket>,
}

impl NetworkWriter {
    #[instrument(name = "network_writer_new", skip(name, config))]
    pub async fn new(
        name: impl Into<String>,
        config: NetworkWriterConfig,
    ) -> std::io::Result<Self> {
        let name = name.into();
        // Bind to any available port
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket.connect(&config.addr).await?;

        debug!(
            writer = %name,
            target = %config.addr,
            format = %config.format,
            "NetworkWriter connected"
        );

        Ok(Self {
            name,
            config,
            socket: Some(socket),
        })
    }

    /// Create from params (for factory)
    #[instrument(name = "network_writer_from_params", skip(name, params))]
    pub async fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, ContractError> {
        let name = name.into();
        let config = NetworkWriterConfig::from_params(params)?;
        let addr = config.addr;

        Self::new(name, config)
            .await
            .map_err(|e| ContractError::connection(addr.to_string(), e.to_string()))
    }

    fn socket(&self) -> Result<&UdpSocket, ContractError> {
        self.socket
            .as_ref()
            .ok_or_else(|| ContractError::publish(&self.name, "", "socket not connected"))
    }

    fn prepare_payload(&self, envelope: &BusEnvelope) -> Result<bytes::Bytes, ContractError> {
        let data = self.config.format.encode(envelope)?;

        if data.len() > self.config.max_packet_size {
            warn!(
                writer = %self.name,
                topic = envelope.topic(),
                size = data.len(),
                max = self.config.max_packet_size,
                "Datagram too large, dropped"
            );
            return Err(ContractError::publish(
                &self.name,
                envelope.topic(),
                format!(
                    "datagram of {} bytes exceeds {}",
                    data.len(),
                    self.config.max_packet_size
                ),
            ));
        }

        Ok(data)
    }

    async fn transmit(
        &self,
        socket: &UdpSocket,
        data: &[u8],
        topic: &str,
    ) -> Result<(), ContractError> {
        match socket.send(data).await {
            Ok(sent) => {
                debug!(writer = %self.name, topic, bytes = sent, "Sent");
                Ok(())
            }
            Err(e) => {
                error!(writer = %self.name, topic, error = %e, "UDP send failed");
                Err(ContractError::publish(&self.name, topic, e.to_string()))
            }
        }
    }
}

impl BusWriter for NetworkWriter {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "network_writer_write",
        skip(self, envelope),
        fields(writer = %self.name, topic = envelope.topic())
    )]
    async fn write(&mut self, envelope: &BusEnvelope) -> Result<(), ContractError> {
        let socket = self.socket()?;
        let data = self.prepare_payload(envelope)?;
        self.transmit(socket, &data, envelope.topic()).await
    }

    #[instrument(name = "network_writer_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        // UDP doesn't buffer
        Ok(())
    }

    #[instrument(name = "network_writer_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        self.socket = None;
        debug!(writer = %self.name, "NetworkWriter closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{Header, OutboundMessage, PointStamped, Stamp, Vector3};

    fn publish_message() -> OutboundMessage {
        OutboundMessage::Point(PointStamped {
            header: Header {
                frame_id: "mocap_motive".to_string(),
                stamp: Stamp { secs: 1, nsecs: 0 },
            },
            point: Vector3::splat(1.0),
        })
    }

    fn publish_envelope() -> BusEnvelope {
        BusEnvelope::Publish {
            topic: "/mocap/markers/1".to_string(),
            message: publish_message(),
        }
    }

    #[test]
    fn test_network_writer_config_parsing() {
        let mut params = HashMap::new();
        params.insert("addr".to_string(), "127.0.0.1:9999".to_string());
        params.insert("format".to_string(), "bincode".to_string());

        let config = NetworkWriterConfig::from_params(&params).unwrap();
        assert_eq!(config.addr.port(), 9999);
        assert_eq!(config.format, WireFormat::Bincode);
        assert_eq!(config.max_packet_size, 65000);
    }

    #[test]
    fn test_network_writer_config_rejects_bad_input() {
        let params = HashMap::new();
        assert!(NetworkWriterConfig::from_params(&params).is_err());

        let mut params = HashMap::new();
        params.insert("addr".to_string(), "127.0.0.1:9999".to_string());
        params.insert("format".to_string(), "xml".to_string());
        assert!(matches!(
            NetworkWriterConfig::from_params(&params),
            Err(ContractError::ConfigValidation { ref field, .. }) if field == "format"
        ));
    }

    #[tokio::test]
    async fn test_network_writer_bad_format_is_not_a_connection_error() {
        let params = HashMap::from([
            ("addr".to_string(), "127.0.0.1:9999".to_string()),
            ("format".to_string(), "xml".to_string()),
        ]);

        let result = NetworkWriter::from_params("test_net", &params).await;
        assert!(matches!(result, Err(ContractError::ConfigValidation { .. })));
    }

    #[tokio::test]
    async fn test_network_writer_delivers_envelope() {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let config = NetworkWriterConfig {
            addr: receiver.local_addr().unwrap(),
            format: WireFormat::Json,
            max_packet_size: 65000,
        };

        let mut writer = NetworkWriter::new("test_net", config).await.unwrap();
        writer.write(&publish_envelope()).await.unwrap();

        let mut buf = vec![0u8; 65536];
        let n = receiver.recv(&mut buf).await.unwrap();
        let decoded: BusEnvelope = WireFormat::Json.decode(&buf[..n]).unwrap();
        assert_eq!(decoded, publish_envelope());
    }

    #[tokio::test]
    async fn test_network_writer_rejects_oversized() {
        let config = NetworkWriterConfig {
            addr: "127.0.0.1:19998".parse().unwrap(),
            format: WireFormat::Json,
            max_packet_size: 16,
        };

        let mut writer = NetworkWriter::new("test_net", config).await.unwrap();
        let result = writer.write(&publish_envelope()).await;
        assert!(matches!(result, Err(ContractError::Publish { .. })));
    }

    #[tokio::test]
    async fn test_network_writer_closed() {
        let config = NetworkWriterConfig {
            addr: "127.0.0.1:19997".parse().unwrap(),
            format: WireFormat::Bincode,
            max_packet_size: 65000,
        };

        let mut writer = NetworkWriter::new("test_net", config).await.unwrap();
        writer.close().await.unwrap();
        assert!(writer.write(&publish_envelope()).await.is_err());
    }

    #[tokio::test]
    async fn test_network_writer_reports_refused_sends() {
        // Bind then drop to get a port nobody listens on
        let closed = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = closed.local_addr().unwrap();
        drop(closed);

        let config = NetworkWriterConfig {
            addr,
            format: WireFormat::Json,
            max_packet_size: 65000,
        };
        let mut writer = NetworkWriter::new("test_net", config).await.unwrap();

        let mut results = Vec::new();
        for _ in 0..4 {
            results.push(writer.write(&publish_envelope()).await);
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }

        assert!(results
            .iter()
            .any(|r| matches!(r, Err(ContractError::Publish { .. }))));
    }

    #[tokio::test]
    async fn test_refused_sends_count_as_sink_failures() {
        use crate::queue::QueuedSink;
        use contracts::{ChannelHandle, TransportSink};

        let closed = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = closed.local_addr().unwrap();
        drop(closed);

        let config = NetworkWriterConfig {
            addr,
            format: WireFormat::Json,
            max_packet_size: 65000,
        };
        let writer = NetworkWriter::new("refused", config).await.unwrap();
        let (mut sink, worker) = QueuedSink::spawn(writer, 16);
        let metrics = std::sync::Arc::clone(worker.metrics());
        let channel = ChannelHandle::new(0, "/mocap/markers/1");

        sink.advertise(&channel, PointStamped::TYPE_NAME).unwrap();
        for _ in 0..4 {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            sink.publish(&channel, &publish_message()).unwrap();
        }

        drop(sink);
        worker.join().await;

        assert!(metrics.failure_count() > 0);
        assert_eq!(metrics.write_count() + metrics.failure_count(), 5);
    }
}
