//! MemorySink - records everything in order, with failure injection

use std::collections::HashSet;

use contracts::{ChannelHandle, ContractError, OutboundMessage, TransportSink};

/// An advertised channel
#[derive(Debug, Clone, PartialEq)]
pub struct Advertised {
    pub topic: String,
    pub message_type: &'static str,
}

/// A published message
#[derive(Debug, Clone, PartialEq)]
pub struct Published {
    pub topic: String,
    pub message: OutboundMessage,
}

/// In-memory bus
///
/// Useful for embedding and for tests: topics can be marked to fail on
/// advertise or publish.
#[derive(Debug, Default)]
pub struct MemorySink {
    name: String,
    advertised: Vec<Advertised>,
    published: Vec<Published>,
    failed_publish_attempts: usize,
    fail_advertise: HashSet<String>,
    fail_publish: HashSet<String>,
}

impl MemorySink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Make every advertise of `topic` fail
    pub fn fail_advertise_on(&mut self, topic: impl Into<String>) {
        self.fail_advertise.insert(topic.into());
    }

    /// Make every publish on `topic` fail
    pub fn fail_publishes_on(&mut self, topic: impl Into<String>) {
        self.fail_publish.insert(topic.into());
    }

    pub fn clear_failures(&mut self) {
        self.fail_advertise.clear();
        self.fail_publish.clear();
    }

    pub fn advertised(&self) -> &[Advertised] {
        &self.advertised
    }

    pub fn published(&self) -> &[Published] {
        &self.published
    }

    /// Publishes on a given topic, in order
    pub fn published_on<'a>(
        &'a self,
        topic: &'a str,
    ) -> impl Iterator<Item = &'a OutboundMessage> + 'a {
        self.published
            .iter()
            .filter(move |p| p.topic == topic)
            .map(|p| &p.message)
    }

    /// Publish attempts rejected by failure injection
    pub fn failed_publish_attempts(&self) -> usize {
        self.failed_publish_attempts
    }
}

impl TransportSink for MemorySink {
    fn name(&self) -> &str {
        &self.name
    }

    fn advertise(
        &mut self,
        channel: &ChannelHandle,
        message_type: &'static str,
    ) -> Result<(), ContractError> {
        if self.fail_advertise.contains(channel.topic()) {
            return Err(ContractError::advertise(&self.name, channel.topic(), "injected failure"));
        }
        self.advertised.push(Advertised {
            topic: channel.topic().to_string(),
            message_type,
        });
        Ok(())
    }

    fn publish(
        &mut self,
        channel: &ChannelHandle,
        message: &OutboundMessage,
    ) -> Result<(), ContractError> {
        if self.fail_publish.contains(channel.topic()) {
            self.failed_publish_attempts += 1;
            return Err(ContractError::publish(&self.name, channel.topic(), "injected failure"));
        }
        self.published.push(Published {
            topic: channel.topic().to_string(),
            message: message.clone(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{Header, PointStamped, Stamp, Vector3};

    fn point() -> OutboundMessage {
        PointStamped {
            header: Header {
                frame_id: "mocap_motive".to_string(),
                stamp: Stamp::default(),
            },
            point: Vector3::default(),
        }
        .into()
    }

    #[test]
    fn test_records_in_order() {
        let mut sink = MemorySink::new("mem");
        let a = ChannelHandle::new(0, "/a");
        let b = ChannelHandle::new(1, "/b");

        sink.advertise(&a, PointStamped::TYPE_NAME).unwrap();
        sink.publish(&b, &point()).unwrap();
        sink.publish(&a, &point()).unwrap();

        assert_eq!(sink.advertised().len(), 1);
        assert_eq!(sink.published()[0].topic, "/b");
        assert_eq!(sink.published_on("/a").count(), 1);
    }

    #[test]
    fn test_injected_publish_failure() {
        let mut sink = MemorySink::new("mem");
        sink.fail_publishes_on("/a");

        let result = sink.publish(&ChannelHandle::new(0, "/a"), &point());
        assert!(matches!(result, Err(ContractError::Publish { .. })));
        assert_eq!(sink.failed_publish_attempts(), 1);
        assert!(sink.published().is_empty());
    }
}
