//! Relay orchestration module.

mod relay;
mod stats;

pub use relay::{Relay, RelayConfig};
pub use stats::RelayStats;
