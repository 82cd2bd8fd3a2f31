// ── Discovery queue ──
//
// A fresh discovery produces a burst of new resources; registering them
// all at once makes the hub sink unresponsive. The queue turns the
// burst into a trickle: a single consumer task sleeps one drain
// interval, registers exactly one entry, and re-arms while entries
// remain. An enqueue while the timer is armed resets it — there is
// never more than one pending drain.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::config::DRAIN_INTERVAL_RANGE;
use crate::hub::{HubSink, Registry};
use crate::mirror::StateMirror;
use crate::model::{ResourceDescriptor, ResourceKind};
use crate::sync::Synchronizer;

struct QueueEntry {
    descriptor: ResourceDescriptor,
    queued_at: tokio::time::Instant,
}

pub struct DiscoveryQueue {
    registry: Arc<Registry>,
    pending: Mutex<VecDeque<QueueEntry>>,
    notify: Notify,
    interval: Duration,
}

impl DiscoveryQueue {
    /// Create a queue draining one entry per `interval_secs`.
    ///
    /// Out-of-range intervals are rejected and the default (1 s) kept.
    pub fn new(registry: Arc<Registry>, interval_secs: u64) -> Self {
        let interval_secs = if DRAIN_INTERVAL_RANGE.contains(&interval_secs) {
            interval_secs
        } else {
            error!(
                configured = interval_secs,
                "drain interval outside permissible range of 0-60 seconds, defaulting to 1"
            );
            1
        };

        Self {
            registry,
            pending: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            interval: Duration::from_secs(interval_secs),
        }
    }

    /// Queue a resource for registration.
    ///
    /// Idempotent by id: already-registered and already-queued resources
    /// are skipped. Returns whether the descriptor was accepted.
    pub fn enqueue(&self, descriptor: ResourceDescriptor) -> bool {
        if self.registry.contains(&descriptor.id) {
            debug!(id = %descriptor.id, "already registered, skipping enqueue");
            return false;
        }

        {
            let mut pending = self.pending.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            if pending.iter().any(|queued| queued.descriptor.id == descriptor.id) {
                debug!(id = %descriptor.id, "already queued, skipping enqueue");
                return false;
            }
            debug!(id = %descriptor.id, name = %descriptor.name, "queued for registration");
            pending.push_back(QueueEntry {
                descriptor,
                queued_at: tokio::time::Instant::now(),
            });
        }

        self.notify.notify_one();
        true
    }

    fn take_next(&self) -> Option<ResourceDescriptor> {
        let entry = self
            .pending
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .pop_front()?;
        debug!(
            id = %entry.descriptor.id,
            waited = ?entry.queued_at.elapsed(),
            "draining queue entry"
        );
        Some(entry.descriptor)
    }

    pub fn is_empty(&self) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    async fn changed(&self) {
        self.notify.notified().await;
    }
}

/// Spawn the single drain consumer for a queue.
///
/// Runs until cancelled. Each cycle: wait for a non-empty queue, sleep
/// one drain interval (restarted by any enqueue), then register exactly
/// one entry.
pub fn spawn_drain_task(
    queue: Arc<DiscoveryQueue>,
    registry: Arc<Registry>,
    mirror: Arc<StateMirror>,
    sink: Arc<dyn HubSink>,
    sync: Arc<Synchronizer>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            // Idle until there is work.
            loop {
                let changed = queue.changed();
                if !queue.is_empty() {
                    break;
                }
                tokio::select! {
                    () = cancel.cancelled() => return,
                    () = changed => {}
                }
            }

            // One armed delay at a time; an enqueue re-arms it.
            loop {
                tokio::select! {
                    () = cancel.cancelled() => return,
                    () = tokio::time::sleep(queue.interval()) => break,
                    () = queue.changed() => {}
                }
            }

            if let Some(descriptor) = queue.take_next() {
                register_one(&queue, &registry, &mirror, sink.as_ref(), &sync, descriptor);
            }

            if queue.is_empty() {
                debug!("no resources pending registration");
            }
        }
    })
}

/// Register a single drained descriptor and kick off its first sync.
fn register_one(
    queue: &Arc<DiscoveryQueue>,
    registry: &Arc<Registry>,
    mirror: &Arc<StateMirror>,
    sink: &dyn HubSink,
    sync: &Arc<Synchronizer>,
    descriptor: ResourceDescriptor,
) {
    if registry.contains(&descriptor.id) {
        // Raced with another registration path; the entry is consumed.
        debug!(id = %descriptor.id, "already registered, dropping queue entry");
        return;
    }

    info!(id = %descriptor.id, kind = ?descriptor.kind, name = %descriptor.name, "registering resource");
    sink.register_resource(&descriptor);
    mirror.create(&descriptor.id);

    let is_controller = descriptor.kind.is_controller();
    let children = if is_controller {
        child_descriptors(&descriptor)
    } else {
        Vec::new()
    };

    let id = descriptor.id.clone();
    registry.insert(descriptor);

    for child in children {
        queue.enqueue(child);
    }

    // First pass publishes every field at its freshly fetched value.
    let sync = Arc::clone(sync);
    tokio::spawn(async move {
        if let Err(e) = sync.sync(&id, true, false).await {
            debug!(%id, error = %e, "initial sync failed");
        }
    });
}

/// Walk a controller's discovery-time document for its sub-resources.
///
/// Each category is isolated: a malformed zone list does not prevent
/// schedule discovery from proceeding.
pub fn child_descriptors(controller: &ResourceDescriptor) -> Vec<ResourceDescriptor> {
    let mut children = Vec::new();

    let categories: [(&str, ResourceKind); 3] = [
        ("zones", ResourceKind::Zone),
        ("scheduleRules", ResourceKind::Schedule),
        ("flexScheduleRules", ResourceKind::FlexSchedule),
    ];

    for (key, kind) in categories {
        let Some(entries) = controller.raw.get(key).and_then(serde_json::Value::as_array) else {
            debug!(id = %controller.id, category = key, "no sub-resource list in device document");
            continue;
        };

        let mut added = 0usize;
        for entry in entries {
            let child = match kind {
                ResourceKind::Zone => ResourceDescriptor::zone(controller, entry),
                _ => ResourceDescriptor::schedule(controller, entry, kind),
            };
            match child {
                Some(child) => {
                    children.push(child);
                    added += 1;
                }
                None => {
                    error!(id = %controller.id, category = key, "sub-resource entry missing required fields");
                }
            }
        }
        info!(id = %controller.id, category = key, count = added, "discovered sub-resources");
    }

    children
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{Capabilities, ResourceId};
    use serde_json::json;

    fn controller_with_children() -> ResourceDescriptor {
        ResourceDescriptor::controller(&json!({
            "id": "dev-1",
            "macAddress": "009d6b123456",
            "name": "Front Yard",
            "zones": [
                { "id": "z-1", "zoneNumber": 1, "name": "Lawn" },
                { "id": "z-2", "zoneNumber": 2, "name": "Beds" },
            ],
            "scheduleRules": [
                { "id": "aaaa-bb", "name": "Morning" },
            ],
            "flexScheduleRules": "not-a-list"
        }))
        .unwrap()
    }

    #[test]
    fn child_discovery_isolates_malformed_categories() {
        let children = child_descriptors(&controller_with_children());
        // Two zones and one schedule survive the broken flex list.
        assert_eq!(children.len(), 3);
        assert_eq!(
            children.iter().filter(|c| c.kind == ResourceKind::Zone).count(),
            2
        );
        assert_eq!(
            children.iter().filter(|c| c.kind == ResourceKind::Schedule).count(),
            1
        );
    }

    #[test]
    fn enqueue_is_idempotent_against_queue_and_registry() {
        let registry = Arc::new(Registry::new());
        let queue = DiscoveryQueue::new(Arc::clone(&registry), 1);
        let desc = controller_with_children();

        assert!(queue.enqueue(desc.clone()));
        assert!(!queue.enqueue(desc.clone()));
        assert_eq!(queue.len(), 1);

        // Registered elsewhere → not queued again even when absent.
        let desc2 = ResourceDescriptor {
            id: ResourceId::new("rm1021309640"),
            kind: ResourceKind::Vacuum,
            name: "Upstairs".into(),
            parent: None,
            device_id: "dev-9".into(),
            vendor_id: "dev-9".into(),
            capabilities: Capabilities::default(),
            raw: json!({}),
        };
        registry.insert(desc2.clone());
        assert!(!queue.enqueue(desc2));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn out_of_range_interval_falls_back_to_default() {
        let registry = Arc::new(Registry::new());
        let queue = DiscoveryQueue::new(registry, 600);
        assert_eq!(queue.interval(), Duration::from_secs(1));

        let registry = Arc::new(Registry::new());
        let queue = DiscoveryQueue::new(registry, 0);
        assert_eq!(queue.interval(), Duration::from_secs(0));
    }
}
