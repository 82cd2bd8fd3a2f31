// ── Resource identity ──
//
// Hub addresses are bounded to 14 characters, so every id is derived
// deterministically from vendor identifiers and squeezed into that
// budget: controller = bare MAC, zone = MAC + zone number, schedule =
// MAC + last 2 chars of the rule UUID, vacuum = "rm" + last 10 of the
// robot blid. Ids are immutable once assigned.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum id length accepted by the hub's addressing scheme.
pub const MAX_ID_LEN: usize = 14;

/// Stable, bounded identifier for a mirrored resource.
///
/// Lowercase alphanumeric, at most [`MAX_ID_LEN`] bytes. Over-long
/// inputs keep their suffix — the discriminating part of every
/// derivation scheme lives at the end.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceId(String);

impl ResourceId {
    /// Normalize a raw identifier: lowercase, alphanumerics only,
    /// truncated from the front to the hub's length bound.
    pub fn new(raw: impl AsRef<str>) -> Self {
        let cleaned: String = raw
            .as_ref()
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .map(|c| c.to_ascii_lowercase())
            .collect();

        let start = cleaned.len().saturating_sub(MAX_ID_LEN);
        Self(cleaned[start..].to_owned())
    }

    /// Controller id: the device MAC address, bare and lowercased.
    pub fn controller(mac: &str) -> Self {
        Self::new(mac)
    }

    /// Zone id: controller MAC followed by the zone number.
    pub fn zone(controller: &Self, zone_number: u32) -> Self {
        Self::new(format!("{}{zone_number}", controller.0))
    }

    /// Schedule id: controller MAC followed by the last two characters
    /// of the rule's UUID.
    pub fn schedule(controller: &Self, rule_id: &str) -> Self {
        let suffix: String = rule_id
            .chars()
            .rev()
            .take(2)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        Self::new(format!("{}{suffix}", controller.0))
    }

    /// Vacuum id: `rm` followed by the last ten characters of the blid.
    pub fn vacuum(blid: &str) -> Self {
        let suffix: String = blid
            .chars()
            .rev()
            .take(10)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        Self::new(format!("rm{suffix}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn controller_id_is_bare_lowercase_mac() {
        let id = ResourceId::controller("00:9D:6B:12:34:56");
        assert_eq!(id.as_str(), "009d6b123456");
    }

    #[test]
    fn zone_id_appends_zone_number() {
        let controller = ResourceId::controller("009d6b123456");
        assert_eq!(
            ResourceId::zone(&controller, 7).as_str(),
            "009d6b1234567"
        );
    }

    #[test]
    fn schedule_id_keeps_rule_suffix() {
        let controller = ResourceId::controller("009d6b123456");
        let id = ResourceId::schedule(&controller, "0e7bc382-61e5-4c1d-ae5b-f9a3c1442fab");
        assert_eq!(id.as_str(), "009d6b123456ab");
        assert_eq!(id.as_str().len(), MAX_ID_LEN);
    }

    #[test]
    fn vacuum_id_from_blid() {
        let id = ResourceId::vacuum("6945841021309640");
        assert_eq!(id.as_str(), "rm1021309640");
    }

    #[test]
    fn overlong_input_keeps_suffix() {
        let id = ResourceId::new("aaaaaaaaaaaaaaaaaaaaaaaa42");
        assert_eq!(id.as_str().len(), MAX_ID_LEN);
        assert!(id.as_str().ends_with("42"));
    }

    #[test]
    fn ids_are_stable_across_derivations() {
        let a = ResourceId::controller("00:9d:6b:12:34:56");
        let b = ResourceId::controller("009D6B123456");
        assert_eq!(a, b);
    }
}
