// ── Runtime bridge configuration ──
//
// These types describe *how* the bridge runs. They carry connection
// tuning but never touch disk — the binary's config crate constructs a
// `BridgeConfig` and hands it in.

use std::time::Duration;

/// Bounds for the discovery-queue drain interval, in seconds.
pub const DRAIN_INTERVAL_RANGE: std::ops::RangeInclusive<u64> = 0..=60;

/// Gate controlling when a sync pass actually fetches from the cloud.
///
/// The thresholds are empirical: the 5 s floor keeps a hub-side query
/// storm from hammering the API, the hard ceiling bounds how stale a
/// mirror can get when no push events arrive.
#[derive(Debug, Clone, Copy)]
pub struct FetchGate {
    /// Minimum age before a forced or push-triggered fetch is honored.
    pub min_force_interval: Duration,
    /// Age past which a fetch happens unconditionally.
    pub stale_ceiling: Duration,
}

impl Default for FetchGate {
    fn default() -> Self {
        Self {
            min_force_interval: Duration::from_secs(5),
            stale_ceiling: Duration::from_secs(3600),
        }
    }
}

/// Configuration for a running bridge.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Externally reachable webhook endpoint, e.g.
    /// `https://home.example.net:3001` — what the cloud is told to call.
    pub webhook_url: String,
    /// Seconds between discovery-queue drains (one registration each).
    pub drain_interval: Duration,
    /// Seconds between unforced scheduler passes over all resources.
    pub poll_interval: Duration,
    /// Fetch gating thresholds.
    pub gate: FetchGate,
    /// Attempts per remote command (no backoff between attempts).
    pub command_attempts: u32,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            webhook_url: "http://localhost:3001".into(),
            drain_interval: Duration::from_secs(1),
            poll_interval: Duration::from_secs(60),
            gate: FetchGate::default(),
            command_attempts: 2,
        }
    }
}
