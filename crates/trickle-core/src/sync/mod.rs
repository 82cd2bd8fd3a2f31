// ── Synchronizer ──
//
// One sync pass: fetch (or reuse) the resource's remote documents,
// evaluate its field table, publish only what changed. The per-resource
// mirror lock is held for the whole pass, so a push-triggered sync and
// a scheduler-triggered sync for the same resource serialize; passes
// for different resources run freely in parallel.

pub mod fields;

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, warn};

use trickle_api::CloudClient;

use crate::config::FetchGate;
use crate::error::SyncError;
use crate::hub::{HubSink, Registry};
use crate::mirror::StateMirror;
use crate::model::{FieldValue, ResourceDescriptor, ResourceId, ResourceKind};
use self::fields::{DocView, fields_for};

pub struct Synchronizer {
    client: CloudClient,
    registry: Arc<Registry>,
    mirror: Arc<StateMirror>,
    sink: Arc<dyn HubSink>,
    gate: FetchGate,
}

impl Synchronizer {
    pub fn new(
        client: CloudClient,
        registry: Arc<Registry>,
        mirror: Arc<StateMirror>,
        sink: Arc<dyn HubSink>,
        gate: FetchGate,
    ) -> Self {
        Self {
            client,
            registry,
            mirror,
            sink,
            gate,
        }
    }

    /// Synchronize one resource.
    ///
    /// `force` republishes every mapped field regardless of the cached
    /// value; `via_push` requests a fresh fetch (subject to the gate)
    /// without forcing republication. A transient remote failure leaves
    /// the mirror untouched and must not be escalated by callers.
    pub async fn sync(
        &self,
        id: &ResourceId,
        force: bool,
        via_push: bool,
    ) -> Result<(), SyncError> {
        let desc = self
            .registry
            .get(id)
            .ok_or_else(|| SyncError::UnknownResource(id.clone()))?;
        let entry = self
            .mirror
            .entry(id)
            .ok_or_else(|| SyncError::UnknownResource(id.clone()))?;

        // Per-resource atomic unit: the pass holds this for its duration.
        let mut entry = entry.lock().await;

        let cache = self.mirror.device_cache(&desc.device_id);
        let mut cache = cache.lock().await;

        let want_fetch = force || via_push;

        // ── Primary document ─────────────────────────────────────────
        if cache.primary.should_fetch(want_fetch, &self.gate) {
            let fetched = match desc.kind {
                ResourceKind::Vacuum => self.client.get_vacuum_state(&desc.device_id).await,
                _ => self.client.get_device(&desc.device_id).await,
            };
            match fetched {
                Ok((rate_limit, doc)) => {
                    debug!(device_id = %desc.device_id, %rate_limit, "fetched device state");
                    cache.primary.store(doc);
                }
                Err(e) => {
                    // Expected and frequent; the next pass retries.
                    warn!(%id, error = %e, "device state fetch failed");
                    return Err(SyncError::Transient(e));
                }
            }
        }

        // ── Secondary document (currently running schedule) ──────────
        // Fails independently: primary-derived fields still publish.
        if desc.kind != ResourceKind::Vacuum
            && cache.schedule.should_fetch(want_fetch, &self.gate)
        {
            match self.client.get_current_schedule(&desc.device_id).await {
                Ok((rate_limit, doc)) => {
                    debug!(device_id = %desc.device_id, %rate_limit, "fetched current schedule");
                    cache.schedule.store(doc);
                }
                Err(e) => {
                    warn!(%id, error = %e, "current schedule fetch failed, reusing cache");
                }
            }
        }

        // ── Diff and publish ─────────────────────────────────────────
        let subject = resolve_subject(&desc, &cache.primary.doc);
        let view = DocView {
            subject,
            device: &cache.primary.doc,
            schedule: &cache.schedule.doc,
            subject_id: &desc.vendor_id,
            now_ms: Utc::now().timestamp_millis(),
        };

        let mut published = 0usize;
        for spec in fields_for(desc.kind, desc.capabilities) {
            let next = match (spec.extract)(&view) {
                Some(value) => value,
                None => {
                    // Absent field: fall back to the inactive default if
                    // the field was ever published, otherwise leave the
                    // registration-time default alone unless forced.
                    if !entry.last_published.contains_key(spec.name) && !force {
                        continue;
                    }
                    spec.default
                }
            };

            let changed = entry.last_published.get(spec.name) != Some(&next);
            if force || changed {
                self.sink.publish_value(id, spec.name, next);
                entry.last_published.insert(spec.name, next);
                published += 1;
            }
        }

        debug!(%id, published, force, via_push, "sync pass complete");
        Ok(())
    }

    /// Last published value of a field.
    pub async fn last_published(&self, id: &ResourceId, field: &str) -> Option<FieldValue> {
        let entry = self.mirror.entry(id)?;
        let entry = entry.lock().await;
        entry.last_published.get(field).copied()
    }
}

/// Locate the resource's own nested document inside the fetched primary.
///
/// Sub-resources re-resolve against the *fresh* document each pass; the
/// discovery-time copy is only a fallback for documents that no longer
/// list them.
fn resolve_subject<'a>(desc: &'a ResourceDescriptor, primary: &'a Value) -> &'a Value {
    let find_in = |key: &str| -> Option<&'a Value> {
        primary
            .get(key)?
            .as_array()?
            .iter()
            .find(|entry| entry.get("id").and_then(Value::as_str) == Some(desc.vendor_id.as_str()))
    };

    match desc.kind {
        ResourceKind::Controller => primary,
        ResourceKind::Zone => find_in("zones").unwrap_or(&desc.raw),
        ResourceKind::Schedule => find_in("scheduleRules").unwrap_or(&desc.raw),
        ResourceKind::FlexSchedule => find_in("flexScheduleRules").unwrap_or(&desc.raw),
        ResourceKind::Vacuum => primary
            .get("state")
            .and_then(|s| s.get("reported"))
            .unwrap_or(primary),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Capabilities;
    use serde_json::json;

    #[test]
    fn subject_resolution_prefers_fresh_document() {
        let controller = ResourceDescriptor::controller(&json!({
            "id": "dev-1", "macAddress": "009d6b123456", "name": "Front Yard"
        }))
        .expect("controller descriptor");
        let zone = ResourceDescriptor::zone(
            &controller,
            &json!({ "id": "z-1", "zoneNumber": 1, "enabled": false }),
        )
        .expect("zone descriptor");

        let fresh = json!({
            "zones": [{ "id": "z-1", "zoneNumber": 1, "enabled": true }]
        });
        let subject = resolve_subject(&zone, &fresh);
        assert_eq!(subject.get("enabled"), Some(&json!(true)));

        // Zone dropped from the device doc: fall back to discovery copy.
        let without = json!({ "zones": [] });
        let subject = resolve_subject(&zone, &without);
        assert_eq!(subject.get("enabled"), Some(&json!(false)));
    }

    #[test]
    fn vacuum_subject_unwraps_reported_state() {
        let desc = ResourceDescriptor {
            id: ResourceId::vacuum("6945841021309640"),
            kind: ResourceKind::Vacuum,
            name: "Upstairs".into(),
            parent: None,
            device_id: "dev-9".into(),
            vendor_id: "dev-9".into(),
            capabilities: Capabilities::default(),
            raw: json!({}),
        };

        let doc = json!({ "state": { "reported": { "batPct": 88 } } });
        assert_eq!(resolve_subject(&desc, &doc).get("batPct"), Some(&json!(88)));

        // Already-unwrapped documents pass through.
        let flat = json!({ "batPct": 42 });
        assert_eq!(resolve_subject(&desc, &flat).get("batPct"), Some(&json!(42)));
    }
}
