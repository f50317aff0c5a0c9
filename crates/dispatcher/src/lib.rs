//! # Dispatcher
//!
//! 帧分发模块。
//!
//! 负责：
//! - 消费 `MocapFrame`
//! - 按需创建通道（刚体位姿、独立标记点、聚合可视化）
//! - 单条发布失败不影响同帧其余消息
//! - 通过有界队列隔离慢 sink，不阻塞帧源线程

pub mod builder;
pub mod dispatcher;
pub mod error;
pub mod metrics;
pub mod queue;
pub mod registry;
pub mod sinks;
pub mod transport;

pub use builder::{
    mean_marker_size, MessageBuilder, DEFAULT_REFERENCE_FRAME, DEFAULT_VISUALIZATION_NS,
};
pub use contracts::{MocapFrame, TransportSink};
pub use dispatcher::{
    DispatchFailure, DispatchReport, DispatchTarget, Dispatcher, DispatcherBuilder,
    DispatcherConfig,
};
pub use error::DispatcherError;
pub use metrics::{DispatchMetrics, DispatchMetricsSnapshot, MetricsSnapshot, SinkMetrics};
pub use queue::{QueuedSink, SinkWorker};
pub use registry::{ChannelRegistry, TopicScheme, DEFAULT_NAMESPACE};
pub use sinks::{
    Advertised, FileWriter, FileWriterConfig, LogSink, MemorySink, NetworkWriter,
    NetworkWriterConfig, Published,
};
pub use transport::{create_transport, AnySink, Transport, TransportConfig, TransportKind};
