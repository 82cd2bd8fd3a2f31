//! Configuration for the trickle daemon.
//!
//! TOML file + `TRICKLE_`-prefixed environment variables, merged through
//! figment. Validation happens once at startup; a missing API key or
//! webhook host is fatal, an out-of-range drain interval is logged and
//! replaced by the default.

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

use trickle_core::{BridgeConfig, FetchGate, config::DRAIN_INTERVAL_RANGE};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("missing required setting '{field}' (set it in the config file or as TRICKLE_{env})")]
    Missing { field: String, env: String },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── Settings as written ─────────────────────────────────────────────

/// Raw settings as they appear in `trickle.toml` / the environment.
#[derive(Debug, Deserialize, Serialize)]
pub struct Settings {
    /// Cloud API key. Required.
    pub api_key: Option<String>,

    /// Cloud API base URL.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Externally reachable host name for the webhook endpoint. Required —
    /// the cloud must be able to call back through the router/firewall.
    pub host: Option<String>,

    /// Webhook listen/advertise port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// TLS certificate chain (PEM). Webhooks are served over HTTPS when
    /// both this and `key_file` are set.
    pub cert_file: Option<PathBuf>,

    /// TLS private key (PEM).
    pub key_file: Option<PathBuf>,

    /// Seconds between discovery-queue registrations (0-60).
    #[serde(default = "default_drain_interval")]
    pub drain_interval_secs: u64,

    /// Seconds between unforced sync passes over all resources.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Minimum age before a forced fetch is honored.
    #[serde(default = "default_min_force_interval")]
    pub min_force_interval_secs: u64,

    /// Cache age past which a fetch happens unconditionally.
    #[serde(default = "default_stale_ceiling")]
    pub stale_ceiling_secs: u64,

    /// Attempts per remote command, no backoff between them.
    #[serde(default = "default_command_attempts")]
    pub command_attempts: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_api_url(),
            host: None,
            port: default_port(),
            cert_file: None,
            key_file: None,
            drain_interval_secs: default_drain_interval(),
            poll_interval_secs: default_poll_interval(),
            min_force_interval_secs: default_min_force_interval(),
            stale_ceiling_secs: default_stale_ceiling(),
            command_attempts: default_command_attempts(),
        }
    }
}

fn default_api_url() -> String {
    "https://api.rach.io/1/public".into()
}
fn default_port() -> u16 {
    3001
}
fn default_drain_interval() -> u64 {
    1
}
fn default_poll_interval() -> u64 {
    60
}
fn default_min_force_interval() -> u64 {
    5
}
fn default_stale_ceiling() -> u64 {
    3600
}
fn default_command_attempts() -> u32 {
    2
}

// ── Loading ─────────────────────────────────────────────────────────

/// Load settings from the given TOML file (if any) and the environment.
pub fn load(path: Option<&Path>) -> Result<Settings, ConfigError> {
    let mut figment = Figment::new().merge(Serialized::defaults(Settings::default()));

    if let Some(path) = path {
        figment = figment.merge(Toml::file(path));
    } else {
        figment = figment.merge(Toml::file("trickle.toml"));
    }

    let settings: Settings = figment.merge(Env::prefixed("TRICKLE_")).extract()?;
    Ok(settings)
}

// ── Resolution ──────────────────────────────────────────────────────

/// TLS material for the webhook listener.
#[derive(Debug, Clone)]
pub struct TlsPaths {
    pub cert_file: PathBuf,
    pub key_file: PathBuf,
}

/// Fully validated runtime configuration.
#[derive(Debug)]
pub struct ResolvedConfig {
    pub bridge: BridgeConfig,
    pub api_url: String,
    pub api_key: SecretString,
    pub bind_port: u16,
    pub tls: Option<TlsPaths>,
}

/// Validate raw settings into a runtime configuration.
pub fn resolve(settings: Settings) -> Result<ResolvedConfig, ConfigError> {
    let api_key = settings.api_key.ok_or_else(|| ConfigError::Missing {
        field: "api_key".into(),
        env: "API_KEY".into(),
    })?;

    let host = settings.host.ok_or_else(|| ConfigError::Missing {
        field: "host".into(),
        env: "HOST".into(),
    })?;

    url::Url::parse(&settings.api_url).map_err(|e| ConfigError::Validation {
        field: "api_url".into(),
        reason: format!("invalid URL: {e}"),
    })?;

    let tls = match (settings.cert_file, settings.key_file) {
        (Some(cert_file), Some(key_file)) => Some(TlsPaths { cert_file, key_file }),
        (None, None) => None,
        _ => {
            return Err(ConfigError::Validation {
                field: "cert_file/key_file".into(),
                reason: "both must be set to enable TLS".into(),
            });
        }
    };

    let drain_interval_secs = if DRAIN_INTERVAL_RANGE.contains(&settings.drain_interval_secs) {
        settings.drain_interval_secs
    } else {
        error!(
            configured = settings.drain_interval_secs,
            "drain_interval_secs outside permissible range of 0-60, defaulting to 1"
        );
        default_drain_interval()
    };

    let scheme = if tls.is_some() { "https" } else { "http" };
    let webhook_url = format!("{scheme}://{host}:{port}", port = settings.port);

    Ok(ResolvedConfig {
        bridge: BridgeConfig {
            webhook_url,
            drain_interval: Duration::from_secs(drain_interval_secs),
            poll_interval: Duration::from_secs(settings.poll_interval_secs),
            gate: FetchGate {
                min_force_interval: Duration::from_secs(settings.min_force_interval_secs),
                stale_ceiling: Duration::from_secs(settings.stale_ceiling_secs),
            },
            command_attempts: settings.command_attempts,
        },
        api_url: settings.api_url,
        api_key: SecretString::from(api_key),
        bind_port: settings.port,
        tls,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Write;

    fn base_settings() -> Settings {
        Settings {
            api_key: Some("key-123".into()),
            host: Some("home.example.net".into()),
            ..Settings::default()
        }
    }

    #[test]
    fn resolve_builds_plain_http_webhook_url() {
        let resolved = resolve(base_settings()).unwrap();
        assert_eq!(resolved.bridge.webhook_url, "http://home.example.net:3001");
        assert_eq!(resolved.bridge.drain_interval, Duration::from_secs(1));
        assert_eq!(resolved.bridge.command_attempts, 2);
        assert!(resolved.tls.is_none());
    }

    #[test]
    fn tls_paths_switch_the_scheme() {
        let mut settings = base_settings();
        settings.cert_file = Some("/etc/trickle/cert.pem".into());
        settings.key_file = Some("/etc/trickle/key.pem".into());

        let resolved = resolve(settings).unwrap();
        assert_eq!(resolved.bridge.webhook_url, "https://home.example.net:3001");
        assert!(resolved.tls.is_some());
    }

    #[test]
    fn half_configured_tls_is_rejected() {
        let mut settings = base_settings();
        settings.cert_file = Some("/etc/trickle/cert.pem".into());
        assert!(matches!(
            resolve(settings),
            Err(ConfigError::Validation { .. })
        ));
    }

    #[test]
    fn missing_api_key_is_fatal() {
        let mut settings = base_settings();
        settings.api_key = None;
        let err = resolve(settings).unwrap_err();
        assert!(matches!(err, ConfigError::Missing { ref field, .. } if field == "api_key"));
    }

    #[test]
    fn missing_host_is_fatal() {
        let mut settings = base_settings();
        settings.host = None;
        assert!(matches!(resolve(settings), Err(ConfigError::Missing { .. })));
    }

    #[test]
    fn out_of_range_drain_interval_keeps_default() {
        let mut settings = base_settings();
        settings.drain_interval_secs = 300;
        let resolved = resolve(settings).unwrap();
        assert_eq!(resolved.bridge.drain_interval, Duration::from_secs(1));
    }

    #[test]
    fn load_merges_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "api_key = \"from-file\"\nhost = \"hub.example.net\"\nport = 8443\npoll_interval_secs = 120"
        )
        .unwrap();

        let settings = load(Some(file.path())).unwrap();
        assert_eq!(settings.api_key.as_deref(), Some("from-file"));
        assert_eq!(settings.port, 8443);
        assert_eq!(settings.poll_interval_secs, 120);
        // Untouched settings keep their defaults.
        assert_eq!(settings.stale_ceiling_secs, 3600);
    }
}
