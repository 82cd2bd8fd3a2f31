// ── Bridge ──
//
// Full lifecycle management for the device bridge: account resolution,
// discovery, the periodic unforced sync scheduler, the discovery-queue
// drain task, and host command routing. Cheaply cloneable via
// `Arc<BridgeInner>`.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use trickle_api::CloudClient;

use crate::command::{Command, CommandRunner};
use crate::config::BridgeConfig;
use crate::discovery::{DiscoveryQueue, spawn_drain_task};
use crate::error::{CoreError, SyncError};
use crate::hub::{HubSink, Registry};
use crate::mirror::StateMirror;
use crate::model::{ResourceDescriptor, ResourceId};
use crate::push::PushState;
use crate::reconcile::{SubscriptionReconciler, SubscriptionSpec};
use crate::sync::Synchronizer;

/// The authenticated session context.
///
/// Created at discovery start and replaced wholesale on
/// re-authentication — never partially mutated.
#[derive(Debug, Clone)]
pub struct ApiContext {
    pub person_id: String,
}

/// The main entry point for embedding the bridge.
#[derive(Clone)]
pub struct Bridge {
    inner: Arc<BridgeInner>,
}

struct BridgeInner {
    config: BridgeConfig,
    client: CloudClient,
    context: Mutex<Option<ApiContext>>,
    registry: Arc<Registry>,
    mirror: Arc<StateMirror>,
    sink: Arc<dyn HubSink>,
    sync: Arc<Synchronizer>,
    queue: Arc<DiscoveryQueue>,
    reconciler: SubscriptionReconciler,
    commands: CommandRunner,
    cancel: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Bridge {
    /// Assemble a bridge. Does not spawn anything — call
    /// [`start()`](Self::start) to run background tasks and
    /// [`discover()`](Self::discover) to populate resources.
    pub fn new(config: BridgeConfig, client: CloudClient, sink: Arc<dyn HubSink>) -> Self {
        let registry = Arc::new(Registry::new());
        let mirror = Arc::new(StateMirror::new());
        let sync = Arc::new(Synchronizer::new(
            client.clone(),
            Arc::clone(&registry),
            Arc::clone(&mirror),
            Arc::clone(&sink),
            config.gate,
        ));
        let queue = Arc::new(DiscoveryQueue::new(
            Arc::clone(&registry),
            config.drain_interval.as_secs(),
        ));
        let reconciler = SubscriptionReconciler::new(client.clone());
        let commands = CommandRunner::new(client.clone(), config.command_attempts);

        Self {
            inner: Arc::new(BridgeInner {
                config,
                client,
                context: Mutex::new(None),
                registry,
                mirror,
                sink,
                sync,
                queue,
                reconciler,
                commands,
                cancel: CancellationToken::new(),
                tasks: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.inner.config
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.inner.registry
    }

    pub fn synchronizer(&self) -> &Arc<Synchronizer> {
        &self.inner.sync
    }

    /// State handed to the webhook router.
    pub fn push_state(&self) -> PushState {
        PushState {
            registry: Arc::clone(&self.inner.registry),
            sync: Arc::clone(&self.inner.sync),
        }
    }

    /// Current session context, if discovery has run.
    pub async fn context(&self) -> Option<ApiContext> {
        self.inner.context.lock().await.clone()
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Spawn the background tasks: the discovery-queue drain consumer
    /// and the periodic unforced sync scheduler.
    pub async fn start(&self) {
        let mut tasks = self.inner.tasks.lock().await;

        tasks.push(spawn_drain_task(
            Arc::clone(&self.inner.queue),
            Arc::clone(&self.inner.registry),
            Arc::clone(&self.inner.mirror),
            Arc::clone(&self.inner.sink),
            Arc::clone(&self.inner.sync),
            self.inner.cancel.child_token(),
        ));

        let interval = self.inner.config.poll_interval;
        if !interval.is_zero() {
            let bridge = self.clone();
            let cancel = self.inner.cancel.child_token();
            tasks.push(tokio::spawn(scheduler_task(bridge, cancel)));
        }

        info!("bridge background tasks started");
    }

    /// Cancel background tasks and wait for them to finish.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        let mut tasks = self.inner.tasks.lock().await;
        for task in tasks.drain(..) {
            let _ = task.await;
        }
        debug!("bridge shut down");
    }

    // ── Discovery ────────────────────────────────────────────────────

    /// Resolve the account, walk its devices, queue new resources for
    /// registration, and converge each controller's push subscription.
    ///
    /// Per-device failures are isolated — one unreachable device never
    /// blocks discovery of the rest.
    pub async fn discover(&self) -> Result<(), CoreError> {
        let (rate_limit, me) = self.inner.client.get_self().await?;
        debug!(person_id = %me.id, %rate_limit, "resolved account id");

        // Replace the session context wholesale.
        *self.inner.context.lock().await = Some(ApiContext {
            person_id: me.id.clone(),
        });

        let (rate_limit, person) = self.inner.client.get_person(&me.id).await?;
        info!(devices = person.devices.len(), %rate_limit, "discovery found devices");

        let desired = SubscriptionSpec::all_events(self.inner.config.webhook_url.clone());

        for device in &person.devices {
            let doc = match serde_json::to_value(device) {
                Ok(doc) => doc,
                Err(e) => {
                    error!(device_id = %device.id, error = %e, "device document not serializable");
                    continue;
                }
            };

            if device.blid.is_some() {
                self.discover_vacuum(&doc, &device.id).await;
            } else {
                match ResourceDescriptor::controller(&doc) {
                    Some(descriptor) => {
                        self.inner.queue.enqueue(descriptor);
                    }
                    None => {
                        warn!(device_id = %device.id, "controller document missing id or MAC");
                        continue;
                    }
                }

                // Make sure the backend will deliver push events for
                // this device before its resources go live.
                if let Err(e) = self.inner.reconciler.reconcile(&device.id, &desired).await {
                    error!(device_id = %device.id, error = %e, "subscription reconciliation failed");
                }
            }
        }

        Ok(())
    }

    /// Vacuum discovery needs the reported-state document for
    /// capability detection; an unreachable robot is skipped until the
    /// next discovery pass.
    async fn discover_vacuum(&self, doc: &serde_json::Value, device_id: &str) {
        match self.inner.client.get_vacuum_state(device_id).await {
            Ok((rate_limit, state)) => {
                debug!(device_id, %rate_limit, "fetched vacuum state for discovery");
                let reported = state
                    .get("state")
                    .and_then(|s| s.get("reported"))
                    .unwrap_or(&state);
                match ResourceDescriptor::vacuum(doc, reported) {
                    Some(descriptor) => {
                        self.inner.queue.enqueue(descriptor);
                    }
                    None => warn!(device_id, "vacuum document missing id or blid"),
                }
            }
            Err(e) => {
                warn!(device_id, error = %e, "vacuum state fetch failed during discovery");
            }
        }
    }

    // ── Sync entry points ────────────────────────────────────────────

    /// Host-initiated query: forced sync, republishing every field.
    pub async fn query(&self, id: &ResourceId) -> Result<(), SyncError> {
        self.inner.sync.sync(id, true, false).await
    }

    /// Forced sync across every registered resource.
    pub async fn query_all(&self) {
        for id in self.inner.registry.ids() {
            let sync = Arc::clone(&self.inner.sync);
            tokio::spawn(async move {
                if let Err(e) = sync.sync(&id, true, false).await {
                    debug!(%id, error = %e, "query sync failed");
                }
            });
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Route a host command to its resource. Returns `true` on success;
    /// failures never raise past this boundary.
    pub async fn execute(&self, id: &ResourceId, command: &Command) -> bool {
        let Some(descriptor) = self.inner.registry.get(id) else {
            error!(%id, ?command, "command for unknown resource");
            return false;
        };
        self.inner.commands.run(&descriptor, command).await
    }

    // ── Removal ──────────────────────────────────────────────────────

    /// Remove a resource from the hub, the registry, and the mirror.
    pub async fn remove_resource(&self, id: &ResourceId) {
        self.inner.sink.remove_resource(id);
        self.inner.registry.remove(id);
        self.inner.mirror.remove(id);
        info!(%id, "resource removed");
    }
}

/// Periodic unforced pass over all registered resources.
///
/// Syncs are spawned per resource so one slow device cannot stall the
/// rest; the per-resource mirror lock already serializes same-resource
/// races with push-triggered syncs.
async fn scheduler_task(bridge: Bridge, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(bridge.inner.config.poll_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            () = cancel.cancelled() => return,
            _ = ticker.tick() => {}
        }

        let ids = bridge.inner.registry.ids();
        debug!(resources = ids.len(), "scheduler pass");
        for id in ids {
            let sync = Arc::clone(&bridge.inner.sync);
            tokio::spawn(async move {
                if let Err(e) = sync.sync(&id, false, false).await {
                    debug!(%id, error = %e, "scheduled sync failed");
                }
            });
        }
    }
}
