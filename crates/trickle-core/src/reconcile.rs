// ── Subscription reconciler ──
//
// Converges the cloud's webhook configuration for a device onto the
// bridge's desired spec with the minimal set of mutating calls. Pure
// reconcile-on-call: no state survives between passes, so a crashed or
// partially failed pass is simply retried end-to-end by the next
// discovery.

use tracing::{debug, error, info};

use trickle_api::types::Webhook;
use trickle_api::{CloudClient, EventType};

use crate::error::ReconcileError;

/// The `externalId` marking a webhook as bridge-owned.
pub const BRIDGE_EXTERNAL_ID: &str = "bridge";

/// The backend accepts this event type on create/update but never echoes
/// it back in listings, so a missing entry is treated as satisfied.
const UNRETURNABLE: EventType = EventType::WaterBudget;

/// Desired notification configuration for a device.
#[derive(Debug, Clone)]
pub struct SubscriptionSpec {
    /// Externally reachable URL the cloud should POST events to.
    pub target_url: String,
    /// Event types the bridge wants delivered.
    pub event_types: Vec<EventType>,
}

impl SubscriptionSpec {
    /// The full event set the bridge subscribes to.
    pub fn all_events(target_url: impl Into<String>) -> Self {
        Self {
            target_url: target_url.into(),
            event_types: EventType::ALL.to_vec(),
        }
    }

    /// Whether an existing webhook already satisfies this spec.
    fn satisfied_by(&self, webhook: &Webhook) -> bool {
        self.url_matches(webhook) && self.events_satisfied(webhook)
    }

    /// The cloud may append path segments to the stored URL, so match on
    /// containment rather than equality.
    fn url_matches(&self, webhook: &Webhook) -> bool {
        webhook
            .url
            .as_deref()
            .is_some_and(|url| url.contains(&self.target_url))
    }

    fn events_satisfied(&self, webhook: &Webhook) -> bool {
        self.event_types
            .iter()
            .filter(|et| **et != UNRETURNABLE)
            .all(|et| webhook.has_event(*et))
    }
}

pub struct SubscriptionReconciler {
    client: CloudClient,
}

impl SubscriptionReconciler {
    pub fn new(client: CloudClient) -> Self {
        Self { client }
    }

    /// Converge the device's webhooks onto `desired`.
    ///
    /// Single scan over the listing: the first bridge-owned entry is
    /// updated in place when it drifted, later bridge-owned entries
    /// (duplicates from a prior partial failure or race) are deleted
    /// unconditionally, and a missing entry is created. A failed update
    /// in step one skips the create for this pass — the next discovery
    /// retries end-to-end. An already-converged device costs exactly one
    /// listing call and zero mutations.
    pub async fn reconcile(
        &self,
        device_id: &str,
        desired: &SubscriptionSpec,
    ) -> Result<(), ReconcileError> {
        let (rate_limit, webhooks) =
            self.client
                .list_webhooks(device_id)
                .await
                .map_err(|source| ReconcileError::List {
                    device_id: device_id.to_owned(),
                    source,
                })?;
        debug!(device_id, %rate_limit, count = webhooks.len(), "listed webhooks");

        // Id of the bridge-owned webhook kept by this pass. Set even when
        // its repair call fails, so the create step is skipped and the
        // next discovery retries end-to-end.
        let mut matched: Option<String> = None;

        for webhook in &webhooks {
            if webhook.external_id.as_deref() != Some(BRIDGE_EXTERNAL_ID) {
                continue;
            }

            if let Some(ref kept) = matched {
                // A duplicate bridge-owned webhook; the first one wins.
                info!(
                    device_id,
                    duplicate = %webhook.id,
                    kept = %kept,
                    "deleting duplicate bridge webhook"
                );
                match self.client.delete_webhook(&webhook.id).await {
                    Ok(rate_limit) => {
                        debug!(webhook_id = %webhook.id, %rate_limit, "deleted webhook");
                    }
                    Err(e) => {
                        error!(webhook_id = %webhook.id, error = %e, "webhook delete failed");
                    }
                }
                continue;
            }

            if desired.satisfied_by(webhook) {
                debug!(device_id, webhook_id = %webhook.id, "webhook already converged");
            } else {
                info!(
                    device_id,
                    webhook_id = %webhook.id,
                    url = webhook.url.as_deref().unwrap_or(""),
                    desired = %desired.target_url,
                    "updating drifted bridge webhook"
                );
                match self
                    .client
                    .update_webhook(
                        &webhook.id,
                        BRIDGE_EXTERNAL_ID,
                        &desired.target_url,
                        &desired.event_types,
                    )
                    .await
                {
                    Ok(rate_limit) => {
                        debug!(webhook_id = %webhook.id, %rate_limit, "updated webhook");
                    }
                    Err(e) => {
                        error!(webhook_id = %webhook.id, error = %e, "webhook update failed");
                    }
                }
            }
            matched = Some(webhook.id.clone());
        }

        if matched.is_none() {
            info!(device_id, url = %desired.target_url, "creating bridge webhook");
            match self
                .client
                .create_webhook(
                    device_id,
                    BRIDGE_EXTERNAL_ID,
                    &desired.target_url,
                    &desired.event_types,
                )
                .await
            {
                Ok((rate_limit, created)) => {
                    debug!(webhook_id = %created.id, %rate_limit, "created webhook");
                }
                Err(e) => {
                    error!(device_id, error = %e, "webhook create failed");
                }
            }
        }

        Ok(())
    }
}
