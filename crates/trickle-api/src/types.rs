//! Response types for the vendor cloud REST API (v1).
//!
//! All types match the JSON documents returned by the public API.
//! Field names use camelCase via `#[serde(rename_all = "camelCase")]`.
//! Documents the sync engine diffs field-by-field (device state, current
//! schedule, vacuum state) are fetched as raw `serde_json::Value` instead —
//! only the shapes discovery and reconciliation navigate are typed here.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ── Account ──────────────────────────────────────────────────────────

/// Account id — from `GET /person/info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonId {
    pub id: String,
}

/// Full account document — from `GET /person/{id}`.
///
/// Contains every device on the account with nested zones and schedule
/// rules; discovery walks this once per pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: String,
    pub username: Option<String>,
    #[serde(default)]
    pub devices: Vec<Device>,
}

// ── Devices ──────────────────────────────────────────────────────────

/// Device overview as embedded in the account document.
///
/// `product_class` discriminates irrigation controllers from vacuums;
/// older accounts omit it, which means controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub id: String,
    pub name: String,
    pub mac_address: Option<String>,
    /// `ONLINE` / `OFFLINE`.
    pub status: Option<String>,
    pub product_class: Option<String>,
    /// Robot blid for vacuum-class devices.
    pub blid: Option<String>,
    #[serde(default)]
    pub zones: Vec<Zone>,
    #[serde(default)]
    pub schedule_rules: Vec<ScheduleRule>,
    #[serde(default)]
    pub flex_schedule_rules: Vec<ScheduleRule>,
    /// Catch-all for state fields the sync engine reads from the raw
    /// per-device document instead.
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// Irrigation zone as embedded in a device document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Zone {
    pub id: String,
    pub name: String,
    pub zone_number: u32,
    #[serde(default)]
    pub enabled: bool,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// Watering schedule rule (fixed or flex) as embedded in a device document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleRule {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

// ── Notifications ────────────────────────────────────────────────────

/// Push-event types the cloud can deliver to a webhook.
///
/// The numeric ids are the wire representation used when creating or
/// updating a webhook; listings echo them back with `name` populated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    DeviceStatus,
    RainDelay,
    WeatherIntelligence,
    WaterBudget,
    ScheduleStatus,
    ZoneStatus,
    RainSensorDetection,
    ZoneDelta,
    Delta,
}

impl EventType {
    /// Every event type, in wire-id order.
    pub const ALL: [Self; 9] = [
        Self::DeviceStatus,
        Self::RainDelay,
        Self::WeatherIntelligence,
        Self::WaterBudget,
        Self::ScheduleStatus,
        Self::ZoneStatus,
        Self::RainSensorDetection,
        Self::ZoneDelta,
        Self::Delta,
    ];

    /// Numeric wire id.
    pub fn id(self) -> u32 {
        match self {
            Self::DeviceStatus => 5,
            Self::RainDelay => 6,
            Self::WeatherIntelligence => 7,
            Self::WaterBudget => 8,
            Self::ScheduleStatus => 9,
            Self::ZoneStatus => 10,
            Self::RainSensorDetection => 11,
            Self::ZoneDelta => 12,
            Self::Delta => 14,
        }
    }

    /// Wire name as echoed back by webhook listings.
    pub fn name(self) -> &'static str {
        match self {
            Self::DeviceStatus => "DEVICE_STATUS",
            Self::RainDelay => "RAIN_DELAY",
            Self::WeatherIntelligence => "WEATHER_INTELLIGENCE",
            Self::WaterBudget => "WATER_BUDGET",
            Self::ScheduleStatus => "SCHEDULE_STATUS",
            Self::ZoneStatus => "ZONE_STATUS",
            Self::RainSensorDetection => "RAIN_SENSOR_DETECTION",
            Self::ZoneDelta => "ZONE_DELTA",
            Self::Delta => "DELTA",
        }
    }
}

/// Event-type reference inside a webhook document.
///
/// Create/update payloads carry only `id`; listings carry both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookEventType {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl From<EventType> for WebhookEventType {
    fn from(et: EventType) -> Self {
        Self {
            id: Some(et.id().to_string()),
            name: None,
        }
    }
}

/// Webhook registration — from `GET /notification/{deviceId}/webhook`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Webhook {
    pub id: String,
    pub external_id: Option<String>,
    pub url: Option<String>,
    #[serde(default)]
    pub event_types: Vec<WebhookEventType>,
}

impl Webhook {
    /// Whether this webhook's event list names the given type.
    pub fn has_event(&self, et: EventType) -> bool {
        self.event_types
            .iter()
            .any(|e| e.name.as_deref() == Some(et.name()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    #[allow(clippy::unwrap_used)]
    fn person_document_with_nested_devices() {
        let doc = json!({
            "id": "person-1",
            "username": "gardener",
            "devices": [{
                "id": "dev-1",
                "name": "Front Yard",
                "macAddress": "AA:BB:CC:11:22:33",
                "status": "ONLINE",
                "on": true,
                "zones": [
                    {"id": "z-1", "name": "Lawn", "zoneNumber": 1, "enabled": true}
                ],
                "scheduleRules": [
                    {"id": "sr-1", "name": "Morning", "enabled": true, "totalDuration": 600}
                ]
            }]
        });

        let person: Person = serde_json::from_value(doc).unwrap();
        assert_eq!(person.devices.len(), 1);
        let dev = &person.devices[0];
        assert_eq!(dev.zones[0].zone_number, 1);
        assert_eq!(dev.schedule_rules[0].name, "Morning");
        // `on` lands in the catch-all, not a typed field.
        assert_eq!(dev.extra.get("on"), Some(&json!(true)));
    }

    #[test]
    fn event_type_names_round_trip_listing_shape() {
        let wh = Webhook {
            id: "wh-1".into(),
            external_id: Some("bridge".into()),
            url: Some("https://example.net:3001".into()),
            event_types: vec![WebhookEventType {
                id: Some("6".into()),
                name: Some("RAIN_DELAY".into()),
            }],
        };
        assert!(wh.has_event(EventType::RainDelay));
        assert!(!wh.has_event(EventType::ZoneStatus));
    }
}
