// Application state management
use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use crate::audio::{select_synthesizer, SpeechSynthesizer};
use crate::cache::CacheStore;
use crate::network::{http_client, ConnectivityProbe, DirectThirdParty, ProxyRelay, TtsEndpoint};
use crate::preload::PreloadOrchestrator;
use crate::resolver::SourceChain;
use crate::settings::AppSettings;

/// One cache, one chain and one orchestrator shared by every caller
pub struct AppState {
    pub settings: AppSettings,
    pub app_dir: PathBuf,
    pub cache: Arc<CacheStore>,
    pub chain: Arc<SourceChain>,
    pub orchestrator: PreloadOrchestrator,
}

impl AppState {
    /// Wire the real endpoints, cache database and synthesizer
    pub fn new(app_dir: PathBuf, settings: AppSettings) -> Self {
        let network = settings.network_config();
        let client = http_client(&network.user_agent);

        let relay: Arc<dyn TtsEndpoint> = Arc::new(ProxyRelay::new(
            client.clone(),
            network.relay_url.clone(),
            network.fetch_timeout,
        ));
        let direct: Arc<dyn TtsEndpoint> = Arc::new(DirectThirdParty::new(
            client,
            network.direct_url.clone(),
            network.direct_clients.clone(),
            network.fetch_timeout,
            network.direct_probe_timeout,
        ));

        let cache = Arc::new(CacheStore::open(
            app_dir.join(&settings.cache.file_name),
            settings.cache_max_age(),
            settings.cache_max_bytes(),
        ));

        let synthesizer = select_synthesizer(settings.synthesis.backend, &settings.synthesis.command);
        info!(
            synthesizer = synthesizer.name(),
            cache = cache.is_available(),
            locale = %settings.language.locale,
            "Audio engine ready"
        );

        Self::from_parts(app_dir, settings, cache, relay, direct, synthesizer)
    }

    pub fn from_parts(
        app_dir: PathBuf,
        settings: AppSettings,
        cache: Arc<CacheStore>,
        relay: Arc<dyn TtsEndpoint>,
        direct: Arc<dyn TtsEndpoint>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
    ) -> Self {
        let network = settings.network_config();

        let chain = Arc::new(
            SourceChain::new(
                Arc::clone(&cache),
                Arc::clone(&relay),
                Arc::clone(&direct),
                synthesizer,
                settings.language.locale,
                network.fetch_timeout,
            )
            .with_speech_rate(settings.synthesis.rate),
        );
        let probe = Arc::new(ConnectivityProbe::new(
            relay,
            direct,
            network.probe_timeout,
            network.direct_probe_timeout,
        ));
        let orchestrator =
            PreloadOrchestrator::new(Arc::clone(&chain), probe, settings.preload_config());

        Self {
            settings,
            app_dir,
            cache,
            chain,
            orchestrator,
        }
    }
}
