//! Sink implementations
//!
//! `LogSink` and `MemorySink` are synchronous transports. `NetworkWriter`
//! and `FileWriter` are async bus writers meant to sit behind a
//! `QueuedSink`.

mod file;
mod log;
mod memory;
mod network;

pub use self::file::{FileWriter, FileWriterConfig};
pub use self::log::LogSink;
pub use self::memory::{Advertised, MemorySink, Published};
pub use self::network::{NetworkWriter, NetworkWriterConfig};
