//! ChannelRegistry - entity identity to channel handle
//!
//! Arena + index: handles live in a `Vec` in creation order, and a
//! `HashMap` maps each key to its arena slot. Entries are never removed or
//! reassigned, so a key resolves to the same handle for the lifetime of the
//! registry.

use std::collections::HashMap;

use contracts::{
    ChannelHandle, ChannelKey, ChannelKind, ContractError, PointStamped, PoseStamped,
    TransportSink, VisualizationMarker,
};
use tracing::{debug, info};

/// Default topic namespace
pub const DEFAULT_NAMESPACE: &str = "mocap";

/// Topic naming for a namespace
///
/// - rigid body `i` → `/<ns>/rigid_bodies/<i>/pose`
/// - standalone marker `id` → `/<ns>/markers/<id>`
/// - aggregate visualization → `/<ns>/markers/vis`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicScheme {
    prefix: String,
}

impl TopicScheme {
    /// Surrounding slashes are ignored; an empty namespace puts topics at the root.
    pub fn new(namespace: &str) -> Self {
        let trimmed = namespace.trim_matches('/');
        let prefix = if trimmed.is_empty() {
            String::new()
        } else {
            format!("/{}", trimmed)
        };
        Self { prefix }
    }

    pub fn topic_for(&self, key: ChannelKey) -> String {
        match key {
            ChannelKey::RigidBody(index) => format!("{}/rigid_bodies/{}/pose", self.prefix, index),
            ChannelKey::Marker(id) => format!("{}/markers/{}", self.prefix, id),
        }
    }

    pub fn visualization_topic(&self) -> String {
        format!("{}/markers/vis", self.prefix)
    }
}

impl Default for TopicScheme {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE)
    }
}

fn message_type_for(kind: ChannelKind) -> &'static str {
    match kind {
        ChannelKind::RigidBody => PoseStamped::TYPE_NAME,
        ChannelKind::Marker => PointStamped::TYPE_NAME,
    }
}

#[derive(Debug)]
struct Entry {
    /// `None` for the unkeyed aggregate channel
    key: Option<ChannelKey>,
    handle: ChannelHandle,
}

/// Grow-only map from entity identity to channel
#[derive(Debug, Default)]
pub struct ChannelRegistry {
    scheme: TopicScheme,
    arena: Vec<Entry>,
    index: HashMap<ChannelKey, usize>,
    visualization: Option<usize>,
}

impl ChannelRegistry {
    pub fn new(scheme: TopicScheme) -> Self {
        Self {
            scheme,
            arena: Vec::new(),
            index: HashMap::new(),
            visualization: None,
        }
    }

    pub fn scheme(&self) -> &TopicScheme {
        &self.scheme
    }

    /// Return the channel for `key`, advertising it on first use.
    ///
    /// Nothing is stored when advertising fails, so the next call retries.
    ///
    /// # Errors
    /// Propagates the sink's advertise error
    pub fn ensure<S>(
        &mut self,
        key: ChannelKey,
        sink: &mut S,
    ) -> Result<ChannelHandle, ContractError>
    where
        S: TransportSink + ?Sized,
    {
        if let Some(&slot) = self.index.get(&key) {
            return Ok(self.arena[slot].handle.clone());
        }

        let handle = ChannelHandle::new(self.arena.len(), self.scheme.topic_for(key));
        sink.advertise(&handle, message_type_for(key.kind()))?;

        self.index.insert(key, handle.slot());
        self.arena.push(Entry {
            key: Some(key),
            handle: handle.clone(),
        });

        observability::record_channel_created(key.kind());
        info!(
            sink = %sink.name(),
            key = %key,
            topic = %handle,
            "Channel created"
        );

        Ok(handle)
    }

    /// Return the aggregate visualization channel, advertising it on first use.
    pub fn ensure_visualization<S>(
        &mut self,
        sink: &mut S,
    ) -> Result<ChannelHandle, ContractError>
    where
        S: TransportSink + ?Sized,
    {
        if let Some(slot) = self.visualization {
            return Ok(self.arena[slot].handle.clone());
        }

        let handle = ChannelHandle::new(self.arena.len(), self.scheme.visualization_topic());
        sink.advertise(&handle, VisualizationMarker::TYPE_NAME)?;

        self.visualization = Some(handle.slot());
        self.arena.push(Entry {
            key: None,
            handle: handle.clone(),
        });

        debug!(sink = %sink.name(), topic = %handle, "Visualization channel created");

        Ok(handle)
    }

    /// Look up without creating
    pub fn get(&self, key: ChannelKey) -> Option<&ChannelHandle> {
        self.index.get(&key).map(|&slot| &self.arena[slot].handle)
    }

    pub fn visualization(&self) -> Option<&ChannelHandle> {
        self.visualization.map(|slot| &self.arena[slot].handle)
    }

    /// Number of keyed channels
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Number of keyed channels of one kind
    pub fn count(&self, kind: ChannelKind) -> usize {
        self.index.keys().filter(|k| k.kind() == kind).count()
    }

    /// Keyed channels in creation order
    pub fn iter(&self) -> impl Iterator<Item = (ChannelKey, &ChannelHandle)> {
        self.arena
            .iter()
            .filter_map(|entry| entry.key.map(|key| (key, &entry.handle)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinks::MemorySink;

    #[test]
    fn test_topic_scheme() {
        let scheme = TopicScheme::new("/mocap/");
        assert_eq!(scheme.topic_for(ChannelKey::RigidBody(3)), "/mocap/rigid_bodies/3/pose");
        assert_eq!(scheme.topic_for(ChannelKey::Marker(12)), "/mocap/markers/12");
        assert_eq!(scheme.visualization_topic(), "/mocap/markers/vis");

        let root = TopicScheme::new("");
        assert_eq!(root.topic_for(ChannelKey::Marker(1)), "/markers/1");
    }

    #[test]
    fn test_ensure_creates_once() {
        let mut registry = ChannelRegistry::default();
        let mut sink = MemorySink::new("mem");

        let first = registry.ensure(ChannelKey::RigidBody(0), &mut sink).unwrap();
        let second = registry.ensure(ChannelKey::RigidBody(0), &mut sink).unwrap();

        assert_eq!(first, second);
        assert_eq!(registry.len(), 1);
        assert_eq!(sink.advertised().len(), 1);
        assert_eq!(sink.advertised()[0].message_type, PoseStamped::TYPE_NAME);
    }

    #[test]
    fn test_kinds_are_separate_namespaces() {
        let mut registry = ChannelRegistry::default();
        let mut sink = MemorySink::new("mem");

        let body = registry.ensure(ChannelKey::RigidBody(1), &mut sink).unwrap();
        let marker = registry.ensure(ChannelKey::Marker(1), &mut sink).unwrap();

        assert_ne!(body, marker);
        assert_eq!(registry.count(ChannelKind::RigidBody), 1);
        assert_eq!(registry.count(ChannelKind::Marker), 1);
        assert_eq!(sink.advertised()[1].message_type, PointStamped::TYPE_NAME);
    }

    #[test]
    fn test_failed_advertise_is_not_stored() {
        let mut registry = ChannelRegistry::default();
        let mut sink = MemorySink::new("mem");
        sink.fail_advertise_on("/mocap/markers/5");

        let result = registry.ensure(ChannelKey::Marker(5), &mut sink);
        assert!(matches!(result, Err(ContractError::Advertise { .. })));
        assert!(registry.get(ChannelKey::Marker(5)).is_none());

        sink.clear_failures();
        let handle = registry.ensure(ChannelKey::Marker(5), &mut sink).unwrap();
        assert_eq!(handle.topic(), "/mocap/markers/5");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_visualization_channel_is_unkeyed() {
        let mut registry = ChannelRegistry::default();
        let mut sink = MemorySink::new("mem");

        let vis = registry.ensure_visualization(&mut sink).unwrap();
        let again = registry.ensure_visualization(&mut sink).unwrap();
        let body = registry.ensure(ChannelKey::RigidBody(0), &mut sink).unwrap();

        assert_eq!(vis, again);
        assert_eq!(vis.topic(), "/mocap/markers/vis");
        assert_ne!(vis.slot(), body.slot());
        assert_eq!(registry.len(), 1);
        assert_eq!(sink.advertised().len(), 2);
    }

    #[test]
    fn test_iter_in_creation_order() {
        let mut registry = ChannelRegistry::default();
        let mut sink = MemorySink::new("mem");

        registry.ensure(ChannelKey::Marker(9), &mut sink).unwrap();
        registry.ensure_visualization(&mut sink).unwrap();
        registry.ensure(ChannelKey::RigidBody(0), &mut sink).unwrap();

        let keys: Vec<ChannelKey> = registry.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![ChannelKey::Marker(9), ChannelKey::RigidBody(0)]);
    }
}
