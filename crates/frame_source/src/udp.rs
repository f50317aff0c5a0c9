//! UdpFrameSource - receives encoded frames from a relay
//!
//! The relay is subscribed to with a single datagram; from then on every
//! datagram it sends carries one `MocapFrame` in the configured wire format.

use std::io::ErrorKind;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs, UdpSocket};

use contracts::{ContractError, FrameCallback, FrameSource, MocapFrame, StopHandle, WireFormat};
use tracing::{debug, info, instrument, trace, warn};

use crate::SourceOptions;

/// Payload sent to the relay to start the stream
pub const SUBSCRIBE_DATAGRAM: &[u8] = b"mocap-relay/subscribe";

/// Frame source fed by UDP datagrams
pub struct UdpFrameSource {
    name: String,
    server: SocketAddr,
    socket: UdpSocket,
    format: WireFormat,
    buffer: Vec<u8>,
    callback: Option<FrameCallback>,
    stop: StopHandle,
    received: u64,
    rejected: u64,
}

impl UdpFrameSource {
    /// Resolve, bind, connect and subscribe
    #[instrument(name = "udp_source_connect", skip(options))]
    pub fn connect(address: &str, options: &SourceOptions) -> Result<Self, ContractError> {
        let server = resolve(address, options.default_port)?;

        let local: SocketAddr = match server.ip() {
            IpAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
            IpAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
        };
        let connection_error =
            |e: std::io::Error| ContractError::connection(address, e.to_string());

        let socket = UdpSocket::bind(local).map_err(connection_error)?;
        socket
            .set_read_timeout(Some(options.read_timeout))
            .map_err(connection_error)?;
        socket.connect(server).map_err(connection_error)?;
        socket.send(SUBSCRIBE_DATAGRAM).map_err(connection_error)?;

        debug!(
            server = %server,
            local = ?socket.local_addr().ok(),
            "Subscribed to frame relay"
        );

        Ok(Self {
            name: format!("udp://{}", server),
            server,
            socket,
            format: options.format,
            buffer: vec![0u8; options.max_datagram_size.max(1)],
            callback: None,
            stop: StopHandle::new(),
            received: 0,
            rejected: 0,
        })
    }

    pub fn server(&self) -> SocketAddr {
        self.server
    }

    /// Datagrams decoded into frames so far
    pub fn received(&self) -> u64 {
        self.received
    }

    /// Datagrams skipped because they did not decode
    pub fn rejected(&self) -> u64 {
        self.rejected
    }

    fn decode(&mut self, len: usize) -> Option<MocapFrame> {
        match self.format.decode::<MocapFrame>(&self.buffer[..len]) {
            Ok(frame) => {
                self.received += 1;
                Some(frame)
            }
            Err(e) => {
                self.rejected += 1;
                observability::record_datagram_rejected(&self.name);
                warn!(source = %self.name, bytes = len, error = %e, "Undecodable datagram skipped");
                None
            }
        }
    }
}

impl FrameSource for UdpFrameSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_callback(&mut self, callback: FrameCallback) {
        self.callback = Some(callback);
    }

    fn spin(&mut self) -> Result<(), ContractError> {
        info!(source = %self.name, "Receive loop started");

        while !self.stop.is_stopped() {
            let len = match self.socket.recv(&mut self.buffer) {
                Ok(len) => len,
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    continue;
                }
                Err(e) if e.kind() == ErrorKind::ConnectionRefused => {
                    // ICMP port unreachable surfaces on the next read of a connected socket
                    trace!(source = %self.name, "Relay not reachable yet");
                    continue;
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(ContractError::receive(&self.name, e.to_string())),
            };

            let Some(frame) = self.decode(len) else {
                continue;
            };
            if let Some(callback) = self.callback.as_mut() {
                callback(&frame);
            }
        }

        info!(
            source = %self.name,
            received = self.received,
            rejected = self.rejected,
            "Receive loop stopped"
        );
        Ok(())
    }

    fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }
}

/// Resolve `host`, `host:port`, `ip` or `ip:port`
fn resolve(address: &str, default_port: u16) -> Result<SocketAddr, ContractError> {
    if let Ok(addr) = address.parse::<SocketAddr>() {
        return Ok(addr);
    }
    if let Ok(ip) = address.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, default_port));
    }

    let resolved = if address.contains(':') {
        address.to_socket_addrs()
    } else {
        (address, default_port).to_socket_addrs()
    };

    resolved
        .map_err(|e| ContractError::connection(address, e.to_string()))?
        .next()
        .ok_or_else(|| ContractError::connection(address, "address resolved to nothing"))
}
