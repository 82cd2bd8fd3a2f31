// trickle-core: differential state synchronization engine between the
// vendor cloud (trickle-api) and a local automation hub.

pub mod bridge;
pub mod command;
pub mod config;
pub mod discovery;
pub mod error;
pub mod hub;
pub mod mirror;
pub mod model;
pub mod push;
pub mod reconcile;
pub mod sync;

// ── Primary re-exports ──────────────────────────────────────────────
pub use bridge::{ApiContext, Bridge};
pub use command::{Command, CommandRunner, FanSpeed, PassMode};
pub use config::{BridgeConfig, FetchGate};
pub use discovery::DiscoveryQueue;
pub use error::{CoreError, ReconcileError, SyncError};
pub use hub::{HubSink, Registry, TracingSink};
pub use mirror::StateMirror;
pub use model::{Capabilities, FieldValue, ResourceDescriptor, ResourceId, ResourceKind};
pub use push::{PushState, router};
pub use reconcile::{SubscriptionReconciler, SubscriptionSpec};
pub use sync::Synchronizer;
