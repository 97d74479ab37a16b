// Data models
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::audio::{AudioPayload, AudioSourceKind};

/// One cached pronunciation
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub word: String,
    pub payload: AudioPayload,
    pub source: AudioSourceKind,
    pub stored_at: DateTime<Utc>,
    pub success: bool,
}

/// Raw row, before checksum verification
#[derive(Debug, Clone)]
pub struct CacheRow {
    pub word: String,
    pub payload: Vec<u8>,
    pub content_type: String,
    pub checksum: String,
    pub source: String,
    pub stored_at: i64,
    pub success: bool,
}

/// Summary of the last preload run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheMetadata {
    pub schema_version: i64,
    pub last_updated: DateTime<Utc>,
    pub total_words: usize,
    pub successful_words: usize,
}

/// Best-effort storage accounting, zero/zero when unknown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageUsage {
    pub used: u64,
    pub quota: u64,
}
