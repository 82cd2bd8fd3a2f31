// ── State mirror ──
//
// Per-resource record of what was last published, plus a per-device
// cache of the fetched documents. Zones and schedules share their
// controller's documents, so the fetch cache is keyed by vendor device
// id while publish state is keyed by hub id.
//
// Locking: one async mutex per resource entry (a sync pass is the
// atomic unit — concurrent passes for the same resource serialize,
// different resources never block each other), one per device cache.
// A pass always locks its entry before the device cache; entries are
// distinct per resource, so the ordering is deadlock-free.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::config::FetchGate;
use crate::model::{FieldValue, ResourceId};

/// Publish-side state for one resource.
#[derive(Debug, Default)]
pub struct MirrorEntry {
    /// Field name → value last handed to the hub sink.
    pub last_published: HashMap<&'static str, FieldValue>,
}

/// One cached remote document plus its fetch time.
#[derive(Debug)]
pub struct CachedDoc {
    pub doc: Value,
    pub fetched_at: Option<Instant>,
}

impl Default for CachedDoc {
    fn default() -> Self {
        Self {
            doc: Value::Null,
            fetched_at: None,
        }
    }
}

impl CachedDoc {
    /// Whether a sync pass should hit the remote for this document.
    ///
    /// Empty cache → always. Otherwise: a forced (or push-triggered)
    /// fetch is honored once the minimum inter-force interval has
    /// passed; an unforced pass reuses the cache until the hard
    /// staleness ceiling, after which a fetch happens unconditionally.
    pub fn should_fetch(&self, want_fetch: bool, gate: &FetchGate) -> bool {
        let Some(fetched_at) = self.fetched_at else {
            return true;
        };
        let age = fetched_at.elapsed();
        (want_fetch && age > gate.min_force_interval) || age > gate.stale_ceiling
    }

    /// Record a successful fetch.
    pub fn store(&mut self, doc: Value) {
        self.doc = doc;
        self.fetched_at = Some(Instant::now());
    }
}

/// Fetched documents shared by every resource of one vendor device.
#[derive(Debug, Default)]
pub struct DeviceCache {
    /// Primary device document (or vacuum reported-state document).
    pub primary: CachedDoc,
    /// Currently-running-schedule document (irrigation only).
    pub schedule: CachedDoc,
}

/// The bridge's per-resource cache of last-known remote state.
#[derive(Default)]
pub struct StateMirror {
    entries: DashMap<ResourceId, Arc<Mutex<MirrorEntry>>>,
    devices: DashMap<String, Arc<Mutex<DeviceCache>>>,
}

impl StateMirror {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the entry for a newly registered resource.
    pub fn create(&self, id: &ResourceId) {
        self.entries
            .entry(id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(MirrorEntry::default())));
    }

    /// Drop a resource's entry when it is removed.
    pub fn remove(&self, id: &ResourceId) {
        self.entries.remove(id);
    }

    /// The per-resource entry, if the resource is registered.
    pub fn entry(&self, id: &ResourceId) -> Option<Arc<Mutex<MirrorEntry>>> {
        self.entries.get(id).map(|r| Arc::clone(r.value()))
    }

    /// The shared fetch cache for a vendor device, created on demand.
    pub fn device_cache(&self, device_id: &str) -> Arc<Mutex<DeviceCache>> {
        self.devices
            .entry(device_id.to_owned())
            .or_insert_with(|| Arc::new(Mutex::new(DeviceCache::default())))
            .clone()
    }
}
