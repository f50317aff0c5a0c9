//! Sink traits - Dispatcher output interface
//!
//! `TransportSink` is what the dispatcher calls, synchronously, from inside
//! the frame callback. `BusWriter` is the async side that actually moves
//! bytes, driven by a worker off the callback thread.

use serde::{Deserialize, Serialize};

use crate::{ChannelHandle, ContractError, OutboundMessage};

/// Publish/subscribe transport as seen by the dispatcher
///
/// Both methods run on the frame source's receive thread and must return
/// promptly; slow work belongs behind a queue.
pub trait TransportSink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Make a newly created channel externally visible
    ///
    /// # Errors
    /// Returns `ContractError::Advertise` when the bus rejects the channel
    fn advertise(
        &mut self,
        channel: &ChannelHandle,
        message_type: &'static str,
    ) -> Result<(), ContractError>;

    /// Publish one message on a channel
    ///
    /// # Errors
    /// Returns `ContractError::Publish`; the caller treats it as a
    /// per-entity failure
    fn publish(
        &mut self,
        channel: &ChannelHandle,
        message: &OutboundMessage,
    ) -> Result<(), ContractError>;
}

impl<T: TransportSink + ?Sized> TransportSink for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn advertise(
        &mut self,
        channel: &ChannelHandle,
        message_type: &'static str,
    ) -> Result<(), ContractError> {
        (**self).advertise(channel, message_type)
    }

    fn publish(
        &mut self,
        channel: &ChannelHandle,
        message: &OutboundMessage,
    ) -> Result<(), ContractError> {
        (**self).publish(channel, message)
    }
}

/// Unit of work handed to a bus writer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BusEnvelope {
    /// A channel became visible
    Advertise { topic: String, message_type: String },
    /// A message was published on a channel
    Publish {
        topic: String,
        message: OutboundMessage,
    },
}

impl BusEnvelope {
    pub fn topic(&self) -> &str {
        match self {
            Self::Advertise { topic, .. } | Self::Publish { topic, .. } => topic,
        }
    }
}

/// Async bus writer
///
/// All writer implementations must implement this trait.
#[trait_variant::make(BusWriter: Send)]
pub trait LocalBusWriter {
    /// Writer name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Write one envelope
    ///
    /// # Errors
    /// Returns write error (should include context)
    async fn write(&mut self, envelope: &BusEnvelope) -> Result<(), ContractError>;

    /// Flush buffer (if any)
    async fn flush(&mut self) -> Result<(), ContractError>;

    /// Close writer
    async fn close(&mut self) -> Result<(), ContractError>;
}
