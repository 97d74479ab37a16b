// Settings management and persistence
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::audio::{Locale, SynthesisBackend};
use crate::network::NetworkConfig;
use crate::preload::PreloadConfig;

const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

/// Language settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguageSettings {
    pub locale: Locale, // "en" or "zh-CN"
}

impl Default for LanguageSettings {
    fn default() -> Self {
        Self {
            locale: Locale::English,
        }
    }
}

/// TTS endpoints and timeouts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkSettings {
    pub relay_url: String,
    pub direct_url: String,
    pub direct_clients: Vec<String>, // Tried in order, e.g. "tw-ob", "gtx"
    pub probe_timeout_ms: u64,
    pub direct_probe_timeout_ms: u64,
    pub fetch_timeout_ms: u64,
    pub user_agent: String,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            relay_url: "http://localhost:3000/api/tts-proxy".to_string(),
            direct_url: "https://translate.google.com/translate_tts".to_string(),
            direct_clients: vec!["tw-ob".to_string(), "gtx".to_string()],
            probe_timeout_ms: 3000,
            direct_probe_timeout_ms: 2000,
            fetch_timeout_ms: 3000,
            user_agent: BROWSER_USER_AGENT.to_string(),
        }
    }
}

/// Audio cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub file_name: String,
    pub max_age_days: i64,
    pub max_size_mb: u64, // 0 disables the limit
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            file_name: "audio_cache.db".to_string(),
            max_age_days: 7,
            max_size_mb: 100,
        }
    }
}

/// Bulk preload tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreloadSettings {
    pub canary_size: usize,
    pub canary_failure_threshold: f64, // 0.0-1.0
    pub global_failure_threshold: f64, // 0.0-1.0
    pub pacing_ms: u64,
    pub fallback_pacing_ms: u64,
    pub fallback_pacing_every: usize,
}

impl Default for PreloadSettings {
    fn default() -> Self {
        Self {
            canary_size: 3,
            canary_failure_threshold: 0.7,
            global_failure_threshold: 0.7,
            pacing_ms: 200,
            fallback_pacing_ms: 50,
            fallback_pacing_every: 10,
        }
    }
}

/// On-device voice settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisSettings {
    pub backend: SynthesisBackend,
    pub command: String,
    pub rate: f32, // 1.0 is the engine's normal speed
}

impl Default for SynthesisSettings {
    fn default() -> Self {
        Self {
            backend: SynthesisBackend::Auto,
            command: "espeak".to_string(),
            rate: 0.8,
        }
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub version: i32, // Settings schema version for future migrations
    pub language: LanguageSettings,
    pub network: NetworkSettings,
    pub cache: CacheSettings,
    pub preload: PreloadSettings,
    pub synthesis: SynthesisSettings,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            version: 1,
            language: LanguageSettings::default(),
            network: NetworkSettings::default(),
            cache: CacheSettings::default(),
            preload: PreloadSettings::default(),
            synthesis: SynthesisSettings::default(),
        }
    }
}

impl AppSettings {
    /// Get the settings file path
    pub fn get_settings_path(app_dir: &Path) -> PathBuf {
        app_dir.join("settings.json")
    }

    /// Load settings from file, or return defaults if file doesn't exist
    pub fn load(app_dir: &Path) -> Result<Self> {
        let path = Self::get_settings_path(app_dir);

        if !path.exists() {
            info!("No settings file found, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read settings file: {}", path.display()))?;

        let settings: AppSettings = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse settings: {}", path.display()))?;

        info!(path = ?path, "Loaded settings");
        Ok(settings.validated())
    }

    /// Save settings to file
    pub fn save(&self, app_dir: &Path) -> Result<()> {
        // Ensure directory exists
        fs::create_dir_all(app_dir).context("Failed to create settings directory")?;

        let path = Self::get_settings_path(app_dir);
        let content = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;

        fs::write(&path, content)
            .with_context(|| format!("Failed to write settings file: {}", path.display()))?;

        info!(path = ?path, "Saved settings");
        Ok(())
    }

    /// Clamp out-of-range values back into something usable
    fn validated(mut self) -> Self {
        let preload = &mut self.preload;
        for threshold in [
            &mut preload.canary_failure_threshold,
            &mut preload.global_failure_threshold,
        ] {
            if !(0.0..=1.0).contains(&*threshold) {
                warn!(value = *threshold, "Failure threshold out of range, clamping");
                *threshold = threshold.clamp(0.0, 1.0);
            }
        }
        if self.cache.max_age_days <= 0 {
            warn!(value = self.cache.max_age_days, "Invalid cache max age, using default");
            self.cache.max_age_days = CacheSettings::default().max_age_days;
        }
        if self.synthesis.rate.is_nan() || self.synthesis.rate <= 0.0 {
            self.synthesis.rate = SynthesisSettings::default().rate;
        }
        self
    }

    pub fn network_config(&self) -> NetworkConfig {
        let n = &self.network;
        NetworkConfig {
            relay_url: n.relay_url.clone(),
            direct_url: n.direct_url.clone(),
            direct_clients: n.direct_clients.clone(),
            probe_timeout: Duration::from_millis(n.probe_timeout_ms),
            direct_probe_timeout: Duration::from_millis(n.direct_probe_timeout_ms),
            fetch_timeout: Duration::from_millis(n.fetch_timeout_ms),
            user_agent: n.user_agent.clone(),
        }
    }

    pub fn preload_config(&self) -> PreloadConfig {
        let p = &self.preload;
        PreloadConfig {
            canary_size: p.canary_size,
            canary_failure_threshold: p.canary_failure_threshold,
            global_failure_threshold: p.global_failure_threshold,
            pacing: Duration::from_millis(p.pacing_ms),
            fallback_pacing: Duration::from_millis(p.fallback_pacing_ms),
            fallback_pacing_every: p.fallback_pacing_every,
        }
    }

    pub fn cache_max_age(&self) -> chrono::Duration {
        chrono::Duration::days(self.cache.max_age_days)
    }

    /// Size limit in bytes, `None` when unlimited
    pub fn cache_max_bytes(&self) -> Option<u64> {
        match self.cache.max_size_mb {
            0 => None,
            mb => Some(mb * 1024 * 1024),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("wordvoice-settings-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = temp_dir("missing");
        let settings = AppSettings::load(&dir).unwrap();
        assert_eq!(settings.version, 1);
        assert_eq!(settings.cache.max_age_days, 7);
        assert_eq!(settings.network.direct_clients, vec!["tw-ob", "gtx"]);
    }

    #[test]
    fn test_save_and_load() {
        let dir = temp_dir("roundtrip");
        let mut settings = AppSettings::default();
        settings.language.locale = Locale::Chinese;
        settings.preload.canary_size = 5;
        settings.save(&dir).unwrap();

        let loaded = AppSettings::load(&dir).unwrap();
        assert_eq!(loaded.language.locale, Locale::Chinese);
        assert_eq!(loaded.preload.canary_size, 5);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = temp_dir("partial");
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            AppSettings::get_settings_path(&dir),
            r#"{"language":{"locale":"zh-CN"},"preload":{"pacing_ms":0}}"#,
        )
        .unwrap();

        let loaded = AppSettings::load(&dir).unwrap();
        assert_eq!(loaded.language.locale, Locale::Chinese);
        assert_eq!(loaded.preload.pacing_ms, 0);
        assert_eq!(loaded.preload.canary_size, 3);
        assert_eq!(loaded.synthesis.command, "espeak");
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let dir = temp_dir("invalid");
        fs::create_dir_all(&dir).unwrap();
        fs::write(AppSettings::get_settings_path(&dir), "{ not json").unwrap();
        assert!(AppSettings::load(&dir).is_err());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_out_of_range_values_clamped() {
        let mut settings = AppSettings::default();
        settings.preload.global_failure_threshold = 1.5;
        settings.cache.max_age_days = 0;
        let settings = settings.validated();
        assert_eq!(settings.preload.global_failure_threshold, 1.0);
        assert_eq!(settings.cache.max_age_days, 7);
    }

    #[test]
    fn test_derived_configs() {
        let settings = AppSettings::default();
        let network = settings.network_config();
        assert_eq!(network.probe_timeout, Duration::from_secs(3));
        assert_eq!(network.direct_probe_timeout, Duration::from_secs(2));

        let preload = settings.preload_config();
        assert_eq!(preload.pacing, Duration::from_millis(200));
        assert_eq!(settings.cache_max_bytes(), Some(100 * 1024 * 1024));
    }
}
