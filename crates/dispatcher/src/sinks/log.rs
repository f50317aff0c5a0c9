//! LogSink - logs advertisements and message summaries via tracing

use contracts::{ChannelHandle, ContractError, OutboundMessage, TransportSink};
use tracing::{debug, info};

/// Sink that logs instead of publishing, for debugging
pub struct LogSink {
    name: String,
}

impl LogSink {
    /// Create a new LogSink with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    fn log_message_summary(&self, channel: &ChannelHandle, message: &OutboundMessage) {
        let stamp = message.header().stamp;
        match message {
            OutboundMessage::Pose(m) => debug!(
                sink = %self.name,
                topic = %channel,
                secs = stamp.secs,
                nsecs = stamp.nsecs,
                x = m.pose.position.x,
                y = m.pose.position.y,
                z = m.pose.position.z,
                "Pose"
            ),
            OutboundMessage::Point(m) => debug!(
                sink = %self.name,
                topic = %channel,
                secs = stamp.secs,
                nsecs = stamp.nsecs,
                x = m.point.x,
                y = m.point.y,
                z = m.point.z,
                "Point"
            ),
            OutboundMessage::Visualization(m) => debug!(
                sink = %self.name,
                topic = %channel,
                secs = stamp.secs,
                nsecs = stamp.nsecs,
                points = m.points.len(),
                scale = m.scale.x,
                "Visualization"
            ),
        }
    }
}

impl TransportSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn advertise(
        &mut self,
        channel: &ChannelHandle,
        message_type: &'static str,
    ) -> Result<(), ContractError> {
        info!(sink = %self.name, topic = %channel, message_type, "Advertised");
        Ok(())
    }

    fn publish(
        &mut self,
        channel: &ChannelHandle,
        message: &OutboundMessage,
    ) -> Result<(), ContractError> {
        self.log_message_summary(channel, message);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{Header, Pose, PoseStamped, Quaternion, Stamp, Vector3};

    #[test]
    fn test_log_sink_publish() {
        let mut sink = LogSink::new("test_log");
        let channel = ChannelHandle::new(0, "/mocap/rigid_bodies/0/pose");
        let message = OutboundMessage::Pose(PoseStamped {
            header: Header {
                frame_id: "mocap_motive".to_string(),
                stamp: Stamp { secs: 1, nsecs: 0 },
            },
            pose: Pose {
                position: Vector3::default(),
                orientation: Quaternion::IDENTITY,
            },
        });

        assert!(sink.advertise(&channel, PoseStamped::TYPE_NAME).is_ok());
        assert!(sink.publish(&channel, &message).is_ok());
    }

    #[test]
    fn test_log_sink_name() {
        let sink = LogSink::new("my_logger");
        assert_eq!(sink.name(), "my_logger");
    }
}
