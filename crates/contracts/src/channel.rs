//! Channel identity - keys, kinds and cheap-to-clone handles
//!
//! A channel is an addressable publish target on the bus. Handles carry their
//! topic as `Arc<str>` so the dispatcher can hand them out on every frame
//! without allocating.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Kind of entity a keyed channel carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    RigidBody,
    Marker,
}

impl ChannelKind {
    /// Stable label used in logs and metric labels
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RigidBody => "rigid_body",
            Self::Marker => "marker",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Registry key: entity kind plus its identity within that kind.
///
/// Rigid bodies are keyed by their index in the frame, standalone markers by
/// their `marker_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKey {
    RigidBody(usize),
    Marker(i32),
}

impl ChannelKey {
    #[inline]
    pub fn kind(&self) -> ChannelKind {
        match self {
            Self::RigidBody(_) => ChannelKind::RigidBody,
            Self::Marker(_) => ChannelKind::Marker,
        }
    }
}

impl fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RigidBody(index) => write!(f, "rigid_body[{index}]"),
            Self::Marker(id) => write!(f, "marker[{id}]"),
        }
    }
}

/// Opaque handle to an advertised channel.
///
/// Cloning only bumps a reference count. Two handles are equal when they
/// name the same arena slot and topic.
///
/// # Examples
/// ```
/// use contracts::ChannelHandle;
///
/// let handle = ChannelHandle::new(0, "/mocap/rigid_bodies/0/pose");
/// let copy = handle.clone();
/// assert_eq!(handle, copy);
/// assert_eq!(copy.topic(), "/mocap/rigid_bodies/0/pose");
/// ```
#[derive(Clone)]
pub struct ChannelHandle {
    slot: usize,
    topic: Arc<str>,
}

impl ChannelHandle {
    /// Create a handle for the given arena slot and topic.
    #[inline]
    pub fn new(slot: usize, topic: impl Into<Arc<str>>) -> Self {
        Self {
            slot,
            topic: topic.into(),
        }
    }

    /// Arena slot the handle was created in.
    #[inline]
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Fully qualified topic name.
    #[inline]
    pub fn topic(&self) -> &str {
        &self.topic
    }
}

impl fmt::Display for ChannelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.topic)
    }
}

impl fmt::Debug for ChannelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChannelHandle({}, {:?})", self.slot, self.topic)
    }
}

impl PartialEq for ChannelHandle {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.slot == other.slot
            && (Arc::ptr_eq(&self.topic, &other.topic) || self.topic == other.topic)
    }
}

impl Eq for ChannelHandle {}

impl Hash for ChannelHandle {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.slot.hash(state);
        self.topic.hash(state);
    }
}

// Serialised as the bare topic; the slot is process-local.
impl Serialize for ChannelHandle {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.topic)
    }
}

impl<'de> Deserialize<'de> for ChannelHandle {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let topic = String::deserialize(deserializer)?;
        Ok(Self::new(0, topic))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_clone_is_cheap() {
        let h1 = ChannelHandle::new(3, "/mocap/markers/5");
        let h2 = h1.clone();

        assert_eq!(h1.topic().as_ptr(), h2.topic().as_ptr());
        assert_eq!(h2.slot(), 3);
    }

    #[test]
    fn test_key_kind() {
        assert_eq!(ChannelKey::RigidBody(2).kind(), ChannelKind::RigidBody);
        assert_eq!(ChannelKey::Marker(-1).kind(), ChannelKind::Marker);
        assert_eq!(ChannelKind::Marker.as_str(), "marker");
    }

    #[test]
    fn test_rigid_body_and_marker_keys_do_not_collide() {
        let mut map: HashMap<ChannelKey, &str> = HashMap::new();
        map.insert(ChannelKey::RigidBody(1), "body");
        map.insert(ChannelKey::Marker(1), "marker");

        assert_eq!(map.len(), 2);
        assert_eq!(map[&ChannelKey::RigidBody(1)], "body");
    }

    #[test]
    fn test_key_display() {
        assert_eq!(ChannelKey::RigidBody(0).to_string(), "rigid_body[0]");
        assert_eq!(ChannelKey::Marker(42).to_string(), "marker[42]");
    }

    #[test]
    fn test_serde() {
        let handle = ChannelHandle::new(7, "/mocap/markers/vis");
        let json = serde_json::to_string(&handle).unwrap();
        assert_eq!(json, "\"/mocap/markers/vis\"");

        let parsed: ChannelHandle = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.topic(), handle.topic());
    }
}
