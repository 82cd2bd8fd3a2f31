// ── Hub sink seam and resource registry ──
//
// The host protocol that exposes mirrored resources upstream is an
// external collaborator; the bridge only needs these three operations.
// The registry is the bridge's own view of what has been registered,
// with a secondary index from vendor device id to hub ids for push
// resolution.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::info;

use crate::model::{FieldValue, ResourceDescriptor, ResourceId};

/// The host-protocol sink consumed by the bridge.
///
/// Registration is throttled through the discovery queue — callers never
/// invoke `register_resource` in a burst.
pub trait HubSink: Send + Sync {
    fn register_resource(&self, descriptor: &ResourceDescriptor);
    fn publish_value(&self, id: &ResourceId, field: &'static str, value: FieldValue);
    fn remove_resource(&self, id: &ResourceId);
}

/// Sink that logs upstream traffic; installed by the daemon when no
/// host transport is wired in.
#[derive(Debug, Default)]
pub struct TracingSink;

impl HubSink for TracingSink {
    fn register_resource(&self, descriptor: &ResourceDescriptor) {
        info!(id = %descriptor.id, kind = ?descriptor.kind, name = %descriptor.name, "register resource");
    }

    fn publish_value(&self, id: &ResourceId, field: &'static str, value: FieldValue) {
        info!(%id, field, %value, "publish");
    }

    fn remove_resource(&self, id: &ResourceId) {
        info!(%id, "remove resource");
    }
}

// ── Registry ────────────────────────────────────────────────────────

/// Registered resources, indexed by hub id and by vendor device id.
#[derive(Default)]
pub struct Registry {
    by_id: DashMap<ResourceId, Arc<ResourceDescriptor>>,
    by_device: DashMap<String, Vec<ResourceId>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a descriptor. Returns `false` if the id was already present.
    pub fn insert(&self, descriptor: ResourceDescriptor) -> bool {
        if self.by_id.contains_key(&descriptor.id) {
            return false;
        }
        self.by_device
            .entry(descriptor.device_id.clone())
            .or_default()
            .push(descriptor.id.clone());
        self.by_id
            .insert(descriptor.id.clone(), Arc::new(descriptor));
        true
    }

    /// Remove a descriptor and clean up the device index.
    pub fn remove(&self, id: &ResourceId) -> Option<Arc<ResourceDescriptor>> {
        let (_, removed) = self.by_id.remove(id)?;
        if let Some(mut ids) = self.by_device.get_mut(&removed.device_id) {
            ids.retain(|other| other != id);
        }
        Some(removed)
    }

    pub fn get(&self, id: &ResourceId) -> Option<Arc<ResourceDescriptor>> {
        self.by_id.get(id).map(|r| Arc::clone(r.value()))
    }

    pub fn contains(&self, id: &ResourceId) -> bool {
        self.by_id.contains_key(id)
    }

    /// All hub ids sharing the given vendor device id.
    pub fn resources_for_device(&self, device_id: &str) -> Vec<ResourceId> {
        self.by_device
            .get(device_id)
            .map(|ids| ids.clone())
            .unwrap_or_default()
    }

    /// All registered hub ids.
    pub fn ids(&self) -> Vec<ResourceId> {
        self.by_id.iter().map(|r| r.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
