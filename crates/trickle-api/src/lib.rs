// trickle-api: Async Rust client for the irrigation/vacuum cloud REST API.

pub mod client;
pub mod error;
pub mod rate_limit;
pub mod transport;
pub mod types;

pub use client::CloudClient;
pub use error::Error;
pub use rate_limit::RateLimit;
pub use transport::{TlsMode, TransportConfig};
pub use types::{EventType, Person, PersonId, Webhook};
