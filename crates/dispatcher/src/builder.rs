//! MessageBuilder - frame entities to stamped bus messages
//!
//! Pure mapping: the same inputs always produce identical messages.

use contracts::{
    ColorRgba, ContractError, Header, LabelledMarker, MarkerType, Pose, PoseStamped,
    PointStamped, RigidBody, Stamp, Vector3, VisualizationMarker,
};

/// Default reference frame for all published messages
pub const DEFAULT_REFERENCE_FRAME: &str = "mocap_motive";

/// Default namespace of the aggregate visualization marker
pub const DEFAULT_VISUALIZATION_NS: &str = "python_natnet";

/// Builds stamped messages for one reference frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageBuilder {
    reference_frame: String,
    visualization_ns: String,
}

impl Default for MessageBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_REFERENCE_FRAME, DEFAULT_VISUALIZATION_NS)
    }
}

impl MessageBuilder {
    pub fn new(reference_frame: impl Into<String>, visualization_ns: impl Into<String>) -> Self {
        Self {
            reference_frame: reference_frame.into(),
            visualization_ns: visualization_ns.into(),
        }
    }

    pub fn reference_frame(&self) -> &str {
        &self.reference_frame
    }

    fn header(&self, timestamp: f64) -> Header {
        Header {
            frame_id: self.reference_frame.clone(),
            stamp: Stamp::from_secs_f64(timestamp),
        }
    }

    /// Stamped pose, position and orientation copied verbatim
    pub fn build_pose(&self, timestamp: f64, body: &RigidBody) -> PoseStamped {
        PoseStamped {
            header: self.header(timestamp),
            pose: Pose {
                position: body.position,
                orientation: body.orientation,
            },
        }
    }

    /// Stamped marker position
    ///
    /// Defined for any marker; the dispatcher only calls it for standalone ones.
    pub fn build_point(&self, timestamp: f64, marker: &LabelledMarker) -> PointStamped {
        PointStamped {
            header: self.header(timestamp),
            point: marker.position,
        }
    }

    /// Sphere list over every marker in the frame
    ///
    /// Scale is the mean marker size on all three axes.
    ///
    /// # Errors
    /// `ContractError::DegenerateFrame` for an empty marker slice; callers
    /// are expected to skip empty frames before getting here.
    pub fn build_aggregate_visualization(
        &self,
        timestamp: f64,
        markers: &[LabelledMarker],
    ) -> Result<VisualizationMarker, ContractError> {
        let mean_size = mean_marker_size(markers)
            .ok_or(ContractError::DegenerateFrame { timestamp })?;

        Ok(VisualizationMarker {
            header: self.header(timestamp),
            ns: self.visualization_ns.clone(),
            id: 0,
            marker_type: MarkerType::SphereList,
            points: markers.iter().map(|m| m.position).collect(),
            scale: Vector3::splat(mean_size),
            color: ColorRgba::WHITE,
        })
    }
}

/// Arithmetic mean of marker sizes, `None` when empty
pub fn mean_marker_size(markers: &[LabelledMarker]) -> Option<f64> {
    if markers.is_empty() {
        return None;
    }
    let total: f64 = markers.iter().map(|m| m.size).sum();
    Some(total / markers.len() as f64)
}
