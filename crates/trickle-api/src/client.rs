// Hand-crafted async HTTP client for the vendor cloud API (v1).
//
// Auth: `Authorization: Bearer` API key on every request.
// Every response carries `x-ratelimit-*` quota headers which are parsed
// and returned alongside the payload — callers log them, nothing blocks
// on them.

use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::debug;
use url::Url;

use crate::Error;
use crate::rate_limit::RateLimit;
use crate::types::{self, EventType, PersonId, Webhook, WebhookEventType};

// ── Error response shape from the cloud API ──────────────────────────

#[derive(serde::Deserialize)]
struct ErrorEntry {
    #[serde(default)]
    message: Option<String>,
}

#[derive(serde::Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    errors: Vec<ErrorEntry>,
}

// ── Client ───────────────────────────────────────────────────────────

/// Async client for the vendor cloud API.
///
/// Cheap to clone; holds a connection-pooled `reqwest::Client`.
#[derive(Clone)]
pub struct CloudClient {
    http: reqwest::Client,
    base_url: Url,
}

impl CloudClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build from an API key and transport config.
    ///
    /// Injects `Authorization: Bearer …` as a default header on every
    /// request.
    pub fn from_api_key(
        base_url: &str,
        api_key: &secrecy::SecretString,
        transport: &crate::TransportConfig,
    ) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        let mut auth_value = HeaderValue::from_str(&format!("Bearer {}", api_key.expose_secret()))
            .map_err(|e| Error::Authentication {
                message: format!("invalid API key header value: {e}"),
            })?;
        auth_value.set_sensitive(true);
        headers.insert("Authorization", auth_value);

        let http = transport.build_client_with_headers(headers)?;
        let base_url = Self::normalize_base_url(base_url)?;

        Ok(Self { http, base_url })
    }

    /// Wrap an existing `reqwest::Client` (caller manages auth headers).
    pub fn from_reqwest(base_url: &str, http: reqwest::Client) -> Result<Self, Error> {
        let base_url = Self::normalize_base_url(base_url)?;
        Ok(Self { http, base_url })
    }

    /// Ensure the base URL ends with `/` so relative joins work.
    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let mut url = Url::parse(raw)?;
        let path = url.path().trim_end_matches('/').to_owned();
        url.set_path(&format!("{path}/"));
        Ok(url)
    }

    // ── URL builder ──────────────────────────────────────────────────

    fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<(RateLimit, T), Error> {
        let url = self.url(path)?;
        debug!("GET {url}");

        let resp = self.http.get(url).send().await?;
        self.handle_response(resp).await
    }

    async fn put<B: Serialize + Sync>(&self, path: &str, body: &B) -> Result<RateLimit, Error> {
        let url = self.url(path)?;
        debug!("PUT {url}");

        let resp = self.http.put(url).json(body).send().await?;
        self.handle_empty(resp).await
    }

    async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<(RateLimit, T), Error> {
        let url = self.url(path)?;
        debug!("POST {url}");

        let resp = self.http.post(url).json(body).send().await?;
        self.handle_response(resp).await
    }

    async fn post_no_response<B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<RateLimit, Error> {
        let url = self.url(path)?;
        debug!("POST {url}");

        let resp = self.http.post(url).json(body).send().await?;
        self.handle_empty(resp).await
    }

    async fn delete(&self, path: &str) -> Result<RateLimit, Error> {
        let url = self.url(path)?;
        debug!("DELETE {url}");

        let resp = self.http.delete(url).send().await?;
        self.handle_empty(resp).await
    }

    // ── Response handling ────────────────────────────────────────────

    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<(RateLimit, T), Error> {
        let status = resp.status();
        let rate_limit = RateLimit::from_headers(resp.headers());

        if status.is_success() {
            let body = resp.text().await?;
            let parsed = serde_json::from_str(&body).map_err(|e| {
                let preview = &body[..body.len().min(200)];
                Error::Deserialization {
                    message: format!("{e} (body preview: {preview:?})"),
                    body,
                }
            })?;
            Ok((rate_limit, parsed))
        } else {
            Err(self.parse_error(status, rate_limit, resp).await)
        }
    }

    async fn handle_empty(&self, resp: reqwest::Response) -> Result<RateLimit, Error> {
        let status = resp.status();
        let rate_limit = RateLimit::from_headers(resp.headers());

        if status.is_success() {
            Ok(rate_limit)
        } else {
            Err(self.parse_error(status, rate_limit, resp).await)
        }
    }

    #[allow(clippy::unused_self)]
    async fn parse_error(
        &self,
        status: reqwest::StatusCode,
        rate_limit: RateLimit,
        resp: reqwest::Response,
    ) -> Error {
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Error::Authentication {
                message: "API key rejected".into(),
            };
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Error::RateLimited {
                remaining: rate_limit.remaining.unwrap_or(0),
                reset: rate_limit.reset.unwrap_or_else(|| "<unknown>".into()),
            };
        }

        let raw = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&raw)
            .ok()
            .and_then(|e| e.errors.into_iter().next())
            .and_then(|e| e.message)
            .unwrap_or_else(|| {
                if raw.is_empty() {
                    status.to_string()
                } else {
                    raw
                }
            });

        Error::Api {
            status: status.as_u16(),
            message,
        }
    }

    // ━━ Public API ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    // ── Account ──────────────────────────────────────────────────────

    /// Resolve the account id for the configured API key.
    pub async fn get_self(&self) -> Result<(RateLimit, PersonId), Error> {
        self.get("person/info").await
    }

    /// Fetch the full account document (devices, zones, schedules).
    pub async fn get_person(&self, person_id: &str) -> Result<(RateLimit, types::Person), Error> {
        self.get(&format!("person/{person_id}")).await
    }

    // ── Device state (raw documents — the sync engine diffs these) ───

    /// Fetch the current device document.
    pub async fn get_device(&self, device_id: &str) -> Result<(RateLimit, Value), Error> {
        self.get(&format!("device/{device_id}")).await
    }

    /// Fetch the device's currently running schedule (empty object when idle).
    pub async fn get_current_schedule(
        &self,
        device_id: &str,
    ) -> Result<(RateLimit, Value), Error> {
        self.get(&format!("device/{device_id}/current_schedule"))
            .await
    }

    /// Fetch a vacuum's reported-state document.
    pub async fn get_vacuum_state(&self, device_id: &str) -> Result<(RateLimit, Value), Error> {
        self.get(&format!("vacuum/{device_id}/state")).await
    }

    // ── Device commands ──────────────────────────────────────────────

    /// Enable the device (schedules, weather intelligence, ...).
    pub async fn device_on(&self, device_id: &str) -> Result<RateLimit, Error> {
        self.put("device/on", &json!({ "id": device_id })).await
    }

    /// Disable the device.
    pub async fn device_off(&self, device_id: &str) -> Result<RateLimit, Error> {
        self.put("device/off", &json!({ "id": device_id })).await
    }

    /// Stop all watering on the device.
    pub async fn stop_water(&self, device_id: &str) -> Result<RateLimit, Error> {
        self.put("device/stop_water", &json!({ "id": device_id }))
            .await
    }

    /// Set a rain delay for the given duration in seconds.
    pub async fn rain_delay(&self, device_id: &str, seconds: u64) -> Result<RateLimit, Error> {
        self.put(
            "device/rain_delay",
            &json!({ "id": device_id, "duration": seconds }),
        )
        .await
    }

    // ── Zone / schedule commands ─────────────────────────────────────

    /// Start watering a zone for the given duration in seconds.
    pub async fn start_zone(&self, zone_id: &str, seconds: u64) -> Result<RateLimit, Error> {
        self.put("zone/start", &json!({ "id": zone_id, "duration": seconds }))
            .await
    }

    /// Start a schedule rule.
    pub async fn start_schedule(&self, schedule_id: &str) -> Result<RateLimit, Error> {
        self.put("schedulerule/start", &json!({ "id": schedule_id }))
            .await
    }

    /// Skip a schedule rule's next run.
    pub async fn skip_schedule(&self, schedule_id: &str) -> Result<RateLimit, Error> {
        self.put("schedulerule/skip", &json!({ "id": schedule_id }))
            .await
    }

    /// Set a schedule rule's seasonal adjustment (fraction, e.g. `0.2` = +20%).
    pub async fn seasonal_adjustment(
        &self,
        schedule_id: &str,
        adjustment: f64,
    ) -> Result<RateLimit, Error> {
        self.put(
            "schedulerule/seasonal_adjustment",
            &json!({ "id": schedule_id, "adjustment": adjustment }),
        )
        .await
    }

    // ── Vacuum commands ──────────────────────────────────────────────

    /// Send a mission command (`start`, `stop`, `pause`, `resume`, `dock`).
    pub async fn send_vacuum_command(
        &self,
        device_id: &str,
        command: &str,
    ) -> Result<RateLimit, Error> {
        self.post_no_response(
            &format!("vacuum/{device_id}/command"),
            &json!({ "command": command }),
        )
        .await
    }

    /// Set a vacuum preference key (`binPause`, `twoPass`, `openOnly`, ...).
    pub async fn set_vacuum_preference(
        &self,
        device_id: &str,
        key: &str,
        value: bool,
    ) -> Result<RateLimit, Error> {
        self.put(
            &format!("vacuum/{device_id}/preference"),
            &json!({ "key": key, "value": value }),
        )
        .await
    }

    // ── Notification webhooks ────────────────────────────────────────

    /// List the webhooks registered for a device.
    pub async fn list_webhooks(
        &self,
        device_id: &str,
    ) -> Result<(RateLimit, Vec<Webhook>), Error> {
        self.get(&format!("notification/{device_id}/webhook")).await
    }

    /// Create a webhook for a device.
    pub async fn create_webhook(
        &self,
        device_id: &str,
        external_id: &str,
        url: &str,
        event_types: &[EventType],
    ) -> Result<(RateLimit, Webhook), Error> {
        self.post(
            "notification/webhook",
            &json!({
                "device": { "id": device_id },
                "externalId": external_id,
                "url": url,
                "eventTypes": wire_event_types(event_types),
            }),
        )
        .await
    }

    /// Update a webhook in place. This is a full replacement — URL and
    /// event types are both rewritten.
    pub async fn update_webhook(
        &self,
        webhook_id: &str,
        external_id: &str,
        url: &str,
        event_types: &[EventType],
    ) -> Result<RateLimit, Error> {
        self.put(
            "notification/webhook",
            &json!({
                "id": webhook_id,
                "externalId": external_id,
                "url": url,
                "eventTypes": wire_event_types(event_types),
            }),
        )
        .await
    }

    /// Delete a webhook.
    pub async fn delete_webhook(&self, webhook_id: &str) -> Result<RateLimit, Error> {
        self.delete(&format!("notification/webhook/{webhook_id}"))
            .await
    }
}

fn wire_event_types(event_types: &[EventType]) -> Vec<WebhookEventType> {
    event_types.iter().copied().map(WebhookEventType::from).collect()
}
