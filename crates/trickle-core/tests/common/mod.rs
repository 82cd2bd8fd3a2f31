// Shared fixtures for core integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use serde_json::json;

use trickle_core::{
    Capabilities, FieldValue, HubSink, Registry, ResourceDescriptor, ResourceId, ResourceKind,
    StateMirror,
};

/// Hub sink that records every upstream call for assertions.
#[derive(Default)]
pub struct RecordingSink {
    pub registered: Mutex<Vec<ResourceId>>,
    pub published: Mutex<Vec<(ResourceId, &'static str, FieldValue)>>,
    pub removed: Mutex<Vec<ResourceId>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn publish_count(&self) -> usize {
        self.published.lock().expect("sink lock").len()
    }

    pub fn registered_count(&self) -> usize {
        self.registered.lock().expect("sink lock").len()
    }

    pub fn clear_published(&self) {
        self.published.lock().expect("sink lock").clear();
    }

    /// Last value published for a field of a resource.
    pub fn value_of(&self, id: &ResourceId, field: &str) -> Option<FieldValue> {
        self.published
            .lock()
            .expect("sink lock")
            .iter()
            .rev()
            .find(|(rid, f, _)| rid == id && *f == field)
            .map(|(_, _, v)| *v)
    }

    /// Fields published (in order) for a resource.
    pub fn fields_published(&self, id: &ResourceId) -> Vec<&'static str> {
        self.published
            .lock()
            .expect("sink lock")
            .iter()
            .filter(|(rid, _, _)| rid == id)
            .map(|(_, f, _)| *f)
            .collect()
    }
}

impl HubSink for RecordingSink {
    fn register_resource(&self, descriptor: &ResourceDescriptor) {
        self.registered
            .lock()
            .expect("sink lock")
            .push(descriptor.id.clone());
    }

    fn publish_value(&self, id: &ResourceId, field: &'static str, value: FieldValue) {
        self.published
            .lock()
            .expect("sink lock")
            .push((id.clone(), field, value));
    }

    fn remove_resource(&self, id: &ResourceId) {
        self.removed.lock().expect("sink lock").push(id.clone());
    }
}

/// A controller descriptor for device `dev-1` with MAC `009d6b123456`.
pub fn controller_descriptor() -> ResourceDescriptor {
    ResourceDescriptor::controller(&json!({
        "id": "dev-1",
        "macAddress": "009d6b123456",
        "name": "Front Yard",
        "zones": [
            { "id": "z-1", "zoneNumber": 1, "name": "Lawn", "enabled": true },
        ],
        "scheduleRules": [],
        "flexScheduleRules": []
    }))
    .expect("controller descriptor")
}

/// A vacuum descriptor with the given blid suffix and device id.
pub fn vacuum_descriptor(device_id: &str, blid: &str) -> ResourceDescriptor {
    ResourceDescriptor {
        id: ResourceId::vacuum(blid),
        kind: ResourceKind::Vacuum,
        name: format!("Vacuum {blid}"),
        parent: None,
        device_id: device_id.to_owned(),
        vendor_id: device_id.to_owned(),
        capabilities: Capabilities::default(),
        raw: json!({}),
    }
}

/// Register a descriptor directly, bypassing the discovery queue.
pub fn register(registry: &Registry, mirror: &StateMirror, descriptor: ResourceDescriptor) {
    mirror.create(&descriptor.id);
    registry.insert(descriptor);
}
