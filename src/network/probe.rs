// Cheap, timeout-bounded reachability check for the network audio path
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use super::endpoint::TtsEndpoint;
use crate::debug_log::DebugLog;
use crate::error::AudioError;

pub struct ConnectivityProbe {
    relay: Arc<dyn TtsEndpoint>,
    direct: Arc<dyn TtsEndpoint>,
    relay_timeout: Duration,
    direct_timeout: Duration,
}

impl ConnectivityProbe {
    pub fn new(
        relay: Arc<dyn TtsEndpoint>,
        direct: Arc<dyn TtsEndpoint>,
        relay_timeout: Duration,
        direct_timeout: Duration,
    ) -> Self {
        Self {
            relay,
            direct,
            relay_timeout,
            direct_timeout,
        }
    }

    /// Relay first, then the direct endpoint. True on the first success.
    pub async fn check(&self, log: &mut DebugLog) -> bool {
        log.push("Testing proxy relay...");
        match Self::attempt(self.relay.as_ref(), self.relay_timeout).await {
            Ok(()) => {
                log.push("Proxy relay reachable");
                info!("Proxy relay reachable");
                return true;
            }
            Err(e) => log.push(format!("Proxy relay check failed: {}", e)),
        }

        log.push("Testing direct TTS access...");
        match Self::attempt(self.direct.as_ref(), self.direct_timeout).await {
            Ok(()) => {
                log.push("Direct TTS reachable");
                info!("Direct TTS reachable");
                true
            }
            Err(e) => {
                log.push(format!("Direct TTS check failed: {}", e));
                log.push("All TTS services unreachable");
                info!("Network audio path unreachable");
                false
            }
        }
    }

    async fn attempt(endpoint: &dyn TtsEndpoint, timeout: Duration) -> Result<(), AudioError> {
        match tokio::time::timeout(timeout, endpoint.ping()).await {
            Ok(result) => result,
            Err(_) => Err(AudioError::ProbeTimeout {
                kind: endpoint.kind(),
                after: timeout,
            }),
        }
    }
}
