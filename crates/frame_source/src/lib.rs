//! # Frame Source
//!
//! 动作捕捉帧源。
//!
//! 提供：
//! - `FakeFrameSource`：无需追踪服务器，投递一帧固定数据
//! - `UdpFrameSource`：从中继接收已编码的 `MocapFrame` 数据报
//! - `connect()`：按地址选择实现

mod fake;
mod udp;

use std::time::Duration;

use contracts::{ContractError, FrameSource, WireFormat};
use tracing::info;

pub use fake::{canned_frame, FakeFrameSource};
pub use udp::{UdpFrameSource, SUBSCRIBE_DATAGRAM};

/// Address that selects the fake source
pub const FAKE_ADDRESS: &str = "fake";

/// Port used when the address has none
pub const DEFAULT_PORT: u16 = 1511;

/// Options for `connect`
#[derive(Debug, Clone)]
pub struct SourceOptions {
    /// Datagram payload format
    pub format: WireFormat,
    /// Port appended to addresses without one
    pub default_port: u16,
    /// How often the receive loop checks its stop flag
    pub read_timeout: Duration,
    /// Receive buffer size
    pub max_datagram_size: usize,
}

impl Default for SourceOptions {
    fn default() -> Self {
        Self {
            format: WireFormat::Json,
            default_port: DEFAULT_PORT,
            read_timeout: Duration::from_millis(100),
            max_datagram_size: 65536,
        }
    }
}

/// Connect to a frame source
///
/// `"fake"` yields a single canned frame; anything else is treated as a
/// `host[:port]` address of a frame relay.
///
/// # Errors
/// `ContractError::Connection` if the address cannot be resolved, bound or
/// reached
pub fn connect(
    address: &str,
    options: &SourceOptions,
) -> Result<Box<dyn FrameSource>, ContractError> {
    if address == FAKE_ADDRESS {
        info!("Using fake frame source");
        return Ok(Box::new(FakeFrameSource::single_frame()));
    }

    let source = UdpFrameSource::connect(address, options)?;
    info!(server = %source.server(), format = %options.format, "Connected to frame relay");
    Ok(Box::new(source))
}
