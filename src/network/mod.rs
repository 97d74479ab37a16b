// Network module
// Relay and direct TTS clients, plus the connectivity probe

pub mod direct;
pub mod endpoint;
pub mod probe;
pub mod relay;

use std::time::Duration;

use reqwest::Client;
use tracing::warn;

pub use direct::DirectThirdParty;
pub use endpoint::{FetchedAudio, TtsEndpoint};
pub use probe::ConnectivityProbe;
pub use relay::ProxyRelay;

/// Endpoint locations and per-step timeouts
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub relay_url: String,
    pub direct_url: String,
    pub direct_clients: Vec<String>,
    pub probe_timeout: Duration,
    pub direct_probe_timeout: Duration,
    pub fetch_timeout: Duration,
    pub user_agent: String,
}

/// Shared HTTP client carrying the configured user agent
pub fn http_client(user_agent: &str) -> Client {
    match Client::builder().user_agent(user_agent).build() {
        Ok(client) => client,
        Err(e) => {
            warn!(error = %e, "Failed to build HTTP client, using defaults");
            Client::new()
        }
    }
}
