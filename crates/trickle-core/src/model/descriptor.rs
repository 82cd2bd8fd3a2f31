// ── Resource descriptors ──
//
// A descriptor is created once at discovery and never mutated. It
// carries everything later stages need: the derived hub id, the vendor
// ids used for remote calls, and the raw discovery-time document that
// child discovery walks.

use serde_json::Value;

use super::ResourceId;

/// What kind of remote resource a descriptor mirrors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Controller,
    Zone,
    Schedule,
    FlexSchedule,
    Vacuum,
}

impl ResourceKind {
    /// Controller-class resources own sub-resources and a webhook
    /// subscription.
    pub fn is_controller(self) -> bool {
        matches!(self, Self::Controller)
    }
}

/// Feature set detected from a vacuum's capability map at discovery.
///
/// Drives a flat field-table dispatch — a robot reporting `carpetBoost`
/// gets the fan-speed fields, one reporting `pose` the position fields,
/// with no family subtypes involved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub bin_full_detect: bool,
    pub pose: bool,
    pub carpet_boost: bool,
}

impl Capabilities {
    /// Read the `cap` map of a reported-state document. A capability is
    /// present only when its key exists with value `1`.
    pub fn from_reported(reported: &Value) -> Self {
        let cap = |name: &str| {
            reported
                .get("cap")
                .and_then(|c| c.get(name))
                .and_then(Value::as_i64)
                == Some(1)
        };
        Self {
            bin_full_detect: cap("binFullDetect"),
            pose: cap("pose"),
            carpet_boost: cap("carpetBoost"),
        }
    }
}

/// Immutable description of a discovered remote resource.
#[derive(Debug, Clone)]
pub struct ResourceDescriptor {
    /// Derived hub id (bounded, stable).
    pub id: ResourceId,
    pub kind: ResourceKind,
    /// Human-readable name reported by the vendor.
    pub name: String,
    /// Hub id of the owning controller, for sub-resources.
    pub parent: Option<ResourceId>,
    /// Vendor device UUID — the id push payloads and state fetches use.
    pub device_id: String,
    /// Vendor id of the resource itself (zone id, schedule rule id;
    /// equals `device_id` for controllers and vacuums).
    pub vendor_id: String,
    /// Vacuum capability set; default (all off) for irrigation kinds.
    pub capabilities: Capabilities,
    /// Raw vendor document captured at discovery.
    pub raw: Value,
}

impl ResourceDescriptor {
    /// Build a controller descriptor from its raw device document.
    ///
    /// Returns `None` when the document lacks the fields an id can be
    /// derived from.
    pub fn controller(doc: &Value) -> Option<Self> {
        let device_id = doc.get("id")?.as_str()?.to_owned();
        let mac = doc.get("macAddress")?.as_str()?;
        let name = doc
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or(mac)
            .to_owned();

        Some(Self {
            id: ResourceId::controller(mac),
            kind: ResourceKind::Controller,
            name,
            parent: None,
            vendor_id: device_id.clone(),
            device_id,
            capabilities: Capabilities::default(),
            raw: doc.clone(),
        })
    }

    /// Build a zone descriptor from a zone entry of a device document.
    pub fn zone(controller: &Self, doc: &Value) -> Option<Self> {
        let zone_id = doc.get("id")?.as_str()?.to_owned();
        let zone_number = u32::try_from(doc.get("zoneNumber")?.as_i64()?).ok()?;
        let name = doc
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or(&zone_id)
            .to_owned();

        Some(Self {
            id: ResourceId::zone(&controller.id, zone_number),
            kind: ResourceKind::Zone,
            name,
            parent: Some(controller.id.clone()),
            device_id: controller.device_id.clone(),
            vendor_id: zone_id,
            capabilities: Capabilities::default(),
            raw: doc.clone(),
        })
    }

    /// Build a schedule (or flex schedule) descriptor from a rule entry.
    pub fn schedule(controller: &Self, doc: &Value, kind: ResourceKind) -> Option<Self> {
        let rule_id = doc.get("id")?.as_str()?.to_owned();
        let name = doc
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or(&rule_id)
            .to_owned();

        Some(Self {
            id: ResourceId::schedule(&controller.id, &rule_id),
            kind,
            name,
            parent: Some(controller.id.clone()),
            device_id: controller.device_id.clone(),
            vendor_id: rule_id,
            capabilities: Capabilities::default(),
            raw: doc.clone(),
        })
    }

    /// Build a vacuum descriptor from its device entry and reported state.
    pub fn vacuum(doc: &Value, reported: &Value) -> Option<Self> {
        let device_id = doc.get("id")?.as_str()?.to_owned();
        let blid = doc.get("blid")?.as_str()?;
        let name = doc
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or(blid)
            .to_owned();

        Some(Self {
            id: ResourceId::vacuum(blid),
            kind: ResourceKind::Vacuum,
            name,
            parent: None,
            vendor_id: device_id.clone(),
            device_id,
            capabilities: Capabilities::from_reported(reported),
            raw: doc.clone(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn controller_descriptor_derives_id_from_mac() {
        let doc = json!({
            "id": "dev-1",
            "macAddress": "009D6B123456",
            "name": "Front Yard",
            "zones": []
        });
        let desc = ResourceDescriptor::controller(&doc).unwrap();
        assert_eq!(desc.id.as_str(), "009d6b123456");
        assert_eq!(desc.device_id, "dev-1");
        assert_eq!(desc.vendor_id, "dev-1");
        assert!(desc.kind.is_controller());
    }

    #[test]
    fn controller_descriptor_requires_mac() {
        let doc = json!({ "id": "dev-1", "name": "No MAC" });
        assert!(ResourceDescriptor::controller(&doc).is_none());
    }

    #[test]
    fn zone_descriptor_points_at_parent_device() {
        let controller = ResourceDescriptor::controller(&json!({
            "id": "dev-1", "macAddress": "009d6b123456", "name": "Front Yard"
        }))
        .unwrap();

        let zone = ResourceDescriptor::zone(
            &controller,
            &json!({ "id": "z-1", "zoneNumber": 3, "name": "Beds" }),
        )
        .unwrap();

        assert_eq!(zone.id.as_str(), "009d6b1234563");
        assert_eq!(zone.parent.as_ref(), Some(&controller.id));
        assert_eq!(zone.device_id, "dev-1");
        assert_eq!(zone.vendor_id, "z-1");
    }

    #[test]
    fn capabilities_from_reported_cap_map() {
        let reported = json!({ "cap": { "pose": 1, "binFullDetect": 1, "carpetBoost": 0 } });
        let caps = Capabilities::from_reported(&reported);
        assert!(caps.pose);
        assert!(caps.bin_full_detect);
        assert!(!caps.carpet_boost);

        // Missing map means no capabilities at all.
        assert_eq!(
            Capabilities::from_reported(&json!({})),
            Capabilities::default()
        );
    }
}
