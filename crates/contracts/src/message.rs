//! Outbound bus messages
//!
//! Stamped pose, stamped point and sphere-list visualization marker, laid out
//! the way robotics buses conventionally carry them.

use serde::{Deserialize, Serialize};

use crate::{Quaternion, Vector3};

/// Timestamp split into whole seconds and nanoseconds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Stamp {
    pub secs: u32,
    pub nsecs: u32,
}

impl Stamp {
    /// Convert float seconds into a stamp.
    ///
    /// Negative or non-finite input clamps to zero; input beyond `u32::MAX`
    /// seconds saturates.
    pub fn from_secs_f64(t: f64) -> Self {
        if !t.is_finite() || t <= 0.0 {
            return Self::default();
        }
        if t >= u32::MAX as f64 {
            return Self {
                secs: u32::MAX,
                nsecs: 0,
            };
        }
        let secs = t.trunc();
        // Rounding can land on exactly one second
        let nsecs = (((t - secs) * 1e9).round() as u32).min(999_999_999);
        Self {
            secs: secs as u32,
            nsecs,
        }
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.secs as f64 + self.nsecs as f64 * 1e-9
    }
}

/// Message header
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Header {
    /// Reference frame the payload is expressed in
    pub frame_id: String,
    pub stamp: Stamp,
}

/// Position plus orientation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vector3,
    pub orientation: Quaternion,
}

/// Stamped rigid-body pose
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseStamped {
    pub header: Header,
    pub pose: Pose,
}

/// Stamped marker position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointStamped {
    pub header: Header,
    pub point: Vector3,
}

/// RGBA colour, components in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorRgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl ColorRgba {
    pub const WHITE: Self = Self {
        r: 1.0,
        g: 1.0,
        b: 1.0,
        a: 1.0,
    };
}

/// Visualization primitive type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerType {
    SphereList,
}

/// Visualization marker (sphere list of every marker in a frame)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualizationMarker {
    pub header: Header,
    pub ns: String,
    pub id: i32,
    pub marker_type: MarkerType,
    pub points: Vec<Vector3>,
    pub scale: Vector3,
    pub color: ColorRgba,
}

/// Any message the dispatcher publishes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutboundMessage {
    Pose(PoseStamped),
    Point(PointStamped),
    Visualization(VisualizationMarker),
}

impl OutboundMessage {
    /// Message type name, as advertised alongside a topic
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Pose(_) => PoseStamped::TYPE_NAME,
            Self::Point(_) => PointStamped::TYPE_NAME,
            Self::Visualization(_) => VisualizationMarker::TYPE_NAME,
        }
    }

    pub fn header(&self) -> &Header {
        match self {
            Self::Pose(m) => &m.header,
            Self::Point(m) => &m.header,
            Self::Visualization(m) => &m.header,
        }
    }
}

impl PoseStamped {
    pub const TYPE_NAME: &'static str = "geometry_msgs/PoseStamped";
}

impl PointStamped {
    pub const TYPE_NAME: &'static str = "geometry_msgs/PointStamped";
}

impl VisualizationMarker {
    pub const TYPE_NAME: &'static str = "visualization_msgs/Marker";
}

impl From<PoseStamped> for OutboundMessage {
    fn from(m: PoseStamped) -> Self {
        Self::Pose(m)
    }
}

impl From<PointStamped> for OutboundMessage {
    fn from(m: PointStamped) -> Self {
        Self::Point(m)
    }
}

impl From<VisualizationMarker> for OutboundMessage {
    fn from(m: VisualizationMarker) -> Self {
        Self::Visualization(m)
    }
}
