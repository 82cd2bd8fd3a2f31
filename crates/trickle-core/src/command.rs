// ── Host command routing ──
//
// Write operations the hub can issue against a mirrored resource. Each
// command maps to one or two vendor calls, retried up to the configured
// attempt count with no backoff, and reports a plain success flag back
// to the host — state changes arrive through push events, so a
// successful command never triggers its own sync.

use tracing::{error, info};

use trickle_api::CloudClient;

use crate::model::{ResourceDescriptor, ResourceKind};

/// Cleaning-pass setting for position-tracking vacuums.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassMode {
    One,
    Two,
    Automatic,
}

/// Fan-speed setting for carpet-boost vacuums.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanSpeed {
    Eco,
    Automatic,
    Performance,
}

/// All write operations routable to a mirrored resource.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    // ── Controller ───────────────────────────────────────────────────
    Enable,
    Disable,
    StopWater,
    RainDelay { minutes: u64 },

    // ── Zone ─────────────────────────────────────────────────────────
    StartZone { minutes: u64 },

    // ── Schedule ─────────────────────────────────────────────────────
    StartSchedule,
    SkipSchedule,
    SeasonalAdjustment { percent: f64 },

    // ── Vacuum ───────────────────────────────────────────────────────
    StartCleaning,
    StopCleaning,
    PauseCleaning,
    ResumeCleaning,
    Dock,
    SetBinFinish { finish: bool },
    SetPasses { passes: PassMode },
    SetEdgeClean { enabled: bool },
    SetFanSpeed { speed: FanSpeed },
}

impl Command {
    /// Whether this command is meaningful for the given resource kind.
    pub fn applies_to(&self, kind: ResourceKind) -> bool {
        match self {
            Self::Enable | Self::Disable | Self::StopWater | Self::RainDelay { .. } => {
                kind == ResourceKind::Controller
            }
            Self::StartZone { .. } => kind == ResourceKind::Zone,
            Self::StartSchedule | Self::SeasonalAdjustment { .. } | Self::SkipSchedule => {
                matches!(kind, ResourceKind::Schedule | ResourceKind::FlexSchedule)
            }
            Self::StartCleaning
            | Self::StopCleaning
            | Self::PauseCleaning
            | Self::ResumeCleaning
            | Self::Dock
            | Self::SetBinFinish { .. }
            | Self::SetPasses { .. }
            | Self::SetEdgeClean { .. }
            | Self::SetFanSpeed { .. } => kind == ResourceKind::Vacuum,
        }
    }
}

/// Executes commands against the cloud with the bridge's retry policy.
pub struct CommandRunner {
    client: CloudClient,
    attempts: u32,
}

impl CommandRunner {
    pub fn new(client: CloudClient, attempts: u32) -> Self {
        Self {
            client,
            attempts: attempts.max(1),
        }
    }

    /// Run a command against a resource. Returns `true` on success.
    ///
    /// Failures are retried immediately up to the attempt budget; after
    /// that the failure is reported to the caller and nothing else —
    /// at-most-`attempts` semantics, not exactly-once.
    pub async fn run(&self, descriptor: &ResourceDescriptor, command: &Command) -> bool {
        if !command.applies_to(descriptor.kind) {
            error!(
                id = %descriptor.id,
                kind = ?descriptor.kind,
                ?command,
                "command not applicable to resource kind"
            );
            return false;
        }

        if let Command::StartZone { minutes: 0 } = command {
            error!(id = %descriptor.id, "zone start requested with zero duration");
            return false;
        }

        info!(id = %descriptor.id, ?command, "command received");

        let mut tries = 0;
        while tries < self.attempts {
            match self.dispatch(descriptor, command).await {
                Ok(()) => return true,
                Err(e) => {
                    error!(id = %descriptor.id, ?command, error = %e, "command attempt failed");
                    tries += 1;
                }
            }
        }
        false
    }

    async fn dispatch(
        &self,
        descriptor: &ResourceDescriptor,
        command: &Command,
    ) -> Result<(), trickle_api::Error> {
        let device = descriptor.device_id.as_str();
        let vendor = descriptor.vendor_id.as_str();

        let rate_limit = match command {
            Command::Enable => self.client.device_on(device).await?,
            Command::Disable => self.client.device_off(device).await?,
            Command::StopWater => self.client.stop_water(device).await?,
            Command::RainDelay { minutes } => {
                self.client.rain_delay(device, minutes * 60).await?
            }

            Command::StartZone { minutes } => {
                self.client.start_zone(vendor, minutes * 60).await?
            }

            Command::StartSchedule => self.client.start_schedule(vendor).await?,
            Command::SkipSchedule => self.client.skip_schedule(vendor).await?,
            Command::SeasonalAdjustment { percent } => {
                self.client
                    .seasonal_adjustment(vendor, percent / 100.0)
                    .await?
            }

            Command::StartCleaning => self.client.send_vacuum_command(device, "start").await?,
            Command::StopCleaning => self.client.send_vacuum_command(device, "stop").await?,
            Command::PauseCleaning => self.client.send_vacuum_command(device, "pause").await?,
            Command::ResumeCleaning => self.client.send_vacuum_command(device, "resume").await?,
            Command::Dock => self.client.send_vacuum_command(device, "dock").await?,

            Command::SetBinFinish { finish } => {
                self.client
                    .set_vacuum_preference(device, "binPause", *finish)
                    .await?
            }
            Command::SetPasses { passes } => {
                match passes {
                    PassMode::One => {
                        self.client
                            .set_vacuum_preference(device, "noAutoPasses", true)
                            .await?;
                        self.client
                            .set_vacuum_preference(device, "twoPass", false)
                            .await?
                    }
                    PassMode::Two => {
                        self.client
                            .set_vacuum_preference(device, "noAutoPasses", true)
                            .await?;
                        self.client
                            .set_vacuum_preference(device, "twoPass", true)
                            .await?
                    }
                    PassMode::Automatic => {
                        self.client
                            .set_vacuum_preference(device, "noAutoPasses", false)
                            .await?
                    }
                }
            }
            Command::SetEdgeClean { enabled } => {
                self.client
                    .set_vacuum_preference(device, "openOnly", !enabled)
                    .await?
            }
            Command::SetFanSpeed { speed } => {
                let (carpet_boost, vac_high) = match speed {
                    FanSpeed::Eco => (false, false),
                    FanSpeed::Automatic => (true, false),
                    FanSpeed::Performance => (false, true),
                };
                self.client
                    .set_vacuum_preference(device, "carpetBoost", carpet_boost)
                    .await?;
                self.client
                    .set_vacuum_preference(device, "vacHigh", vac_high)
                    .await?
            }
        };

        tracing::debug!(id = %descriptor.id, %rate_limit, "command accepted");
        Ok(())
    }
}
