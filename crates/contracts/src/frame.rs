//! MocapFrame - FrameSource output
//!
//! One timestamped snapshot of everything the tracker currently sees.

use serde::{Deserialize, Serialize};

/// Motion-capture frame
///
/// Produced once per tracking cycle, consumed synchronously by the
/// dispatcher and dropped afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MocapFrame {
    /// Tracker timestamp (seconds, monotonic per source)
    pub timestamp: f64,

    /// Optional tracker frame counter (diagnostics only)
    #[serde(default)]
    pub frame_number: Option<u64>,

    /// Tracked rigid bodies; the index is the entity identity
    #[serde(default)]
    pub rigid_bodies: Vec<RigidBody>,

    /// Labelled markers, standalone and model-owned
    #[serde(default)]
    pub labelled_markers: Vec<LabelledMarker>,
}

impl MocapFrame {
    /// Create an empty frame at the given timestamp
    pub fn new(timestamp: f64) -> Self {
        Self {
            timestamp,
            frame_number: None,
            rigid_bodies: Vec::new(),
            labelled_markers: Vec::new(),
        }
    }

    pub fn with_rigid_bodies(mut self, rigid_bodies: Vec<RigidBody>) -> Self {
        self.rigid_bodies = rigid_bodies;
        self
    }

    pub fn with_markers(mut self, markers: Vec<LabelledMarker>) -> Self {
        self.labelled_markers = markers;
        self
    }

    /// Iterate markers that are not attached to a tracked model
    pub fn standalone_markers(&self) -> impl Iterator<Item = &LabelledMarker> {
        self.labelled_markers.iter().filter(|m| m.is_standalone())
    }
}

/// Tracked rigid body (6-DoF pose)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RigidBody {
    /// Position (tracker units, y-up)
    pub position: Vector3,

    /// Orientation (unit quaternion)
    pub orientation: Quaternion,
}

/// Individually identified marker
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabelledMarker {
    /// Marker ID, stable across frames for standalone markers
    pub marker_id: i32,

    /// Owning model ID, `0` when standalone
    pub model_id: i32,

    /// Position
    pub position: Vector3,

    /// Estimated marker size
    pub size: f64,
}

impl LabelledMarker {
    /// Model ID sentinel for markers not attached to any tracked model
    pub const NO_MODEL: i32 = 0;

    #[inline]
    pub fn is_standalone(&self) -> bool {
        self.model_id == Self::NO_MODEL
    }
}

/// 3D vector
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    #[inline]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Same value on every axis
    #[inline]
    pub const fn splat(v: f64) -> Self {
        Self::new(v, v, v)
    }
}

/// Quaternion (x, y, z, w)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Quaternion {
    pub const IDENTITY: Self = Self::new(0.0, 0.0, 0.0, 1.0);

    #[inline]
    pub const fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Self { x, y, z, w }
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}
