// Persistent, time-bounded store of resolved pronunciations.
//
// Entries are keyed by normalized word text and live for `max_age` (seven
// days by default). Expired rows stay on disk until a sweep removes them but
// are never returned by `get`.
//
// The store never fails its caller. If the database cannot be opened or
// written, operations log a warning and report "nothing happened", so an
// unusable store behaves like an empty one.

use std::path::PathBuf;
use std::sync::OnceLock;

use chrono::{DateTime, Duration, TimeZone, Utc};
use regex::Regex;
use tracing::{debug, warn};

use crate::audio::{AudioPayload, AudioSourceKind};
use crate::db::connection::DatabaseConnection;
use crate::db::models::{CacheEntry, CacheMetadata, CacheRow, StorageUsage};
use crate::db::operations::DbOperations;
use crate::error::AudioError;

pub const DEFAULT_MAX_AGE_DAYS: i64 = 7;

pub struct CacheStore {
    db: Option<DatabaseConnection>,
    max_age: Duration,
}

fn whitespace_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"\s+").unwrap())
}

/// Cache key for a word: trimmed, lowercased, inner whitespace collapsed
pub fn normalize_key(word: &str) -> String {
    whitespace_regex()
        .replace_all(word.trim(), " ")
        .to_lowercase()
}

impl CacheStore {
    /// Open (or create) the cache database. Never fails: an unopenable
    /// database yields a store that is permanently unavailable.
    pub fn open(path: PathBuf, max_age: Duration, max_bytes: Option<u64>) -> Self {
        let db = match DatabaseConnection::new(path.clone()) {
            Ok(db) => db,
            Err(e) => {
                warn!(path = ?path, error = %e, "Audio cache unavailable, continuing without it");
                return Self::disabled();
            }
        };

        if let Some(limit) = max_bytes {
            if let Err(e) = db.set_size_limit(limit) {
                warn!(error = %e, "Failed to apply audio cache size limit");
            }
        }

        debug!(path = ?path, "Audio cache opened");
        Self::from_connection(db, max_age)
    }

    pub fn from_connection(db: DatabaseConnection, max_age: Duration) -> Self {
        Self {
            db: Some(db),
            max_age,
        }
    }

    /// Cache backed by a private in-memory database
    pub fn in_memory(max_age: Duration) -> Self {
        match DatabaseConnection::in_memory() {
            Ok(db) => Self::from_connection(db, max_age),
            Err(e) => {
                warn!(error = %e, "In-memory audio cache unavailable");
                Self::disabled()
            }
        }
    }

    /// A store where every operation degrades
    pub fn disabled() -> Self {
        Self {
            db: None,
            max_age: Duration::days(DEFAULT_MAX_AGE_DAYS),
        }
    }

    pub fn is_available(&self) -> bool {
        self.db.is_some()
    }

    fn is_fresh(&self, stored_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now - stored_at < self.max_age
    }

    async fn run<T, F>(&self, op: F) -> Result<T, AudioError>
    where
        F: FnOnce(&DatabaseConnection) -> Result<T, anyhow::Error> + Send + 'static,
        T: Send + 'static,
    {
        let Some(db) = self.db.clone() else {
            return Err(AudioError::CacheUnavailable("cache store is not open".to_string()));
        };

        // Spawn blocking task to keep SQLite off the async workers
        tokio::task::spawn_blocking(move || op(&db))
            .await
            .map_err(|e| AudioError::CacheUnavailable(format!("task join error: {}", e)))?
            .map_err(|e| AudioError::CacheUnavailable(e.to_string()))
    }

    /// Store a payload for `word`, replacing any previous entry.
    pub async fn try_put(
        &self,
        word: &str,
        payload: &AudioPayload,
        source: AudioSourceKind,
    ) -> Result<(), AudioError> {
        self.try_put_at(word, payload, source, Utc::now()).await
    }

    pub(crate) async fn try_put_at(
        &self,
        word: &str,
        payload: &AudioPayload,
        source: AudioSourceKind,
        stored_at: DateTime<Utc>,
    ) -> Result<(), AudioError> {
        let row = CacheRow {
            word: normalize_key(word),
            payload: payload.bytes.clone(),
            content_type: payload.content_type.clone(),
            checksum: payload.checksum(),
            source: source.as_str().to_string(),
            stored_at: stored_at.timestamp_millis(),
            success: true,
        };
        self.run(move |db| DbOperations::upsert_cache_entry(db, &row)).await
    }

    pub async fn put(&self, word: &str, payload: &AudioPayload, source: AudioSourceKind) -> bool {
        match self.try_put(word, payload, source).await {
            Ok(()) => {
                debug!(word, bytes = payload.len(), %source, "Cached audio");
                true
            }
            Err(e) => {
                warn!(word, error = %e, "Failed to cache audio");
                false
            }
        }
    }

    /// Look up a fresh entry. Expired or corrupted rows read as a miss.
    pub async fn lookup(&self, word: &str) -> Result<Option<CacheEntry>, AudioError> {
        let key = normalize_key(word);
        let row = self
            .run(move |db| DbOperations::get_cache_row(db, &key))
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let Some(stored_at) = Utc.timestamp_millis_opt(row.stored_at).single() else {
            return Ok(None);
        };
        if !self.is_fresh(stored_at, Utc::now()) {
            debug!(word = %row.word, "Cache entry expired");
            return Ok(None);
        }
        if blake3::hash(&row.payload).to_hex().as_str() != row.checksum {
            warn!(word = %row.word, "Cache entry failed checksum, ignoring");
            return Ok(None);
        }

        Ok(Some(CacheEntry {
            source: AudioSourceKind::parse(&row.source).unwrap_or(AudioSourceKind::Cached),
            payload: AudioPayload::new(row.payload, row.content_type),
            word: row.word,
            stored_at,
            success: row.success,
        }))
    }

    pub async fn get(&self, word: &str) -> Option<CacheEntry> {
        match self.lookup(word).await {
            Ok(entry) => entry,
            Err(e) => {
                debug!(word, error = %e, "Cache lookup failed");
                None
            }
        }
    }

    /// Delete every entry older than the TTL. Returns how many were removed.
    pub async fn sweep_expired(&self) -> usize {
        let cutoff = (Utc::now() - self.max_age).timestamp_millis();
        match self
            .run(move |db| DbOperations::delete_entries_before(db, cutoff))
            .await
        {
            Ok(removed) => {
                if removed > 0 {
                    debug!(removed, "Swept expired audio cache entries");
                }
                removed
            }
            Err(e) => {
                warn!(error = %e, "Failed to sweep audio cache");
                0
            }
        }
    }

    pub async fn usage(&self) -> StorageUsage {
        self.run(DbOperations::storage_usage)
            .await
            .unwrap_or_default()
    }

    /// Drop all entries and metadata
    pub async fn clear(&self) -> bool {
        match self.run(DbOperations::clear_cache).await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Failed to clear audio cache");
                false
            }
        }
    }

    /// Rows physically present, expired ones included
    pub async fn len(&self) -> usize {
        self.run(DbOperations::count_cache_entries)
            .await
            .unwrap_or(0)
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn store_metadata(&self, metadata: CacheMetadata) -> bool {
        match self
            .run(move |db| DbOperations::store_metadata(db, &metadata))
            .await
        {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Failed to store cache metadata");
                false
            }
        }
    }

    pub async fn metadata(&self) -> Option<CacheMetadata> {
        self.run(DbOperations::get_metadata).await.ok().flatten()
    }
}
