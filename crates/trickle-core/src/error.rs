// ── Core error types ──
//
// The bridge's error taxonomy. Transient failures are expected and
// frequent (the cloud drops connections routinely); they are logged and
// left for the next natural sync attempt, never escalated to the hub as
// a resource failure. The `From<trickle_api::Error>` impls translate
// transport-layer errors into this taxonomy.

use thiserror::Error;

use crate::model::ResourceId;

/// Unified error type for bridge lifecycle operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Missing or invalid required settings — fatal at startup.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// API key rejected by the cloud.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// Expected, frequent remote failure (network, 5xx, quota). Safe to
    /// ignore; the next scheduled pass retries naturally.
    #[error("Transient remote failure: {0}")]
    Transient(#[source] trickle_api::Error),

    /// A remote document did not have the expected shape.
    #[error("Malformed remote document: {what}")]
    Malformed { what: String },

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
}

/// Error from a single synchronization pass.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The resource id is not registered with the bridge.
    #[error("resource not registered: {0}")]
    UnknownResource(ResourceId),

    /// The primary remote fetch failed and no usable document exists.
    /// Callers must not escalate this — the mirror is untouched and the
    /// next sync retries.
    #[error("transient remote failure: {0}")]
    Transient(#[source] trickle_api::Error),
}

/// Error from a subscription reconciliation pass.
///
/// Only the initial listing aborts a pass; individual create/update/delete
/// failures are logged and scanning continues.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("subscription listing failed for device {device_id}: {source}")]
    List {
        device_id: String,
        #[source]
        source: trickle_api::Error,
    },
}

impl From<trickle_api::Error> for CoreError {
    fn from(err: trickle_api::Error) -> Self {
        match err {
            trickle_api::Error::Authentication { message } => Self::Authentication { message },
            trickle_api::Error::InvalidUrl(e) => Self::Config {
                message: format!("invalid URL: {e}"),
            },
            trickle_api::Error::Tls(message) => Self::Config {
                message: format!("TLS error: {message}"),
            },
            trickle_api::Error::Deserialization { message, .. } => Self::Malformed { what: message },
            // Transport, RateLimited, and 5xx Api errors all land here;
            // quota metadata is logged at the call site.
            other => Self::Transient(other),
        }
    }
}
