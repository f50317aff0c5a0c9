//! # Contracts
//!
//! Frozen interface contracts, defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Uses the tracker timestamp (seconds, f64) as the only clock
//! - `frame_number` is optional, used for diagnostics

mod channel;
mod codec;
mod error;
mod frame;
mod frame_source;
mod message;
mod sink;

pub use channel::{ChannelHandle, ChannelKey, ChannelKind};
pub use codec::WireFormat;
pub use error::*;
pub use frame::*;
pub use frame_source::{FrameCallback, FrameSource, StopHandle};
pub use message::*;
pub use sink::*;
