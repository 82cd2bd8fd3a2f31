use thiserror::Error;

/// Top-level error type for the `trickle-api` crate.
///
/// Covers every failure mode against the vendor cloud: authentication,
/// transport, structured API errors, and quota rejection.
/// `trickle-core` maps these into its own taxonomy — consumers of the
/// bridge never see these directly.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// API key rejected by the cloud (401).
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, TLS, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS material could not be loaded or applied.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Quota ───────────────────────────────────────────────────────
    /// Call rejected by the cloud's rate limiter (429). The remote is the
    /// sole authority on quota; the client never throttles locally.
    #[error("Rate limited -- {remaining} requests remaining until {reset}")]
    RateLimited { remaining: u32, reset: String },

    // ── API ─────────────────────────────────────────────────────────
    /// Structured error from the cloud API.
    #[error("API error (HTTP {status}): {message}")]
    Api { message: String, status: u16 },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this is a transient failure — expected, frequent,
    /// and safe to leave for the next natural sync attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::RateLimited { .. } => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            Self::Api { status: 404, .. } => true,
            _ => false,
        }
    }
}
