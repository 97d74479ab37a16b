use chrono::{TimeZone, Utc};
use rusqlite::{params, OptionalExtension};

use crate::db::connection::DatabaseConnection;
use crate::db::models::{CacheMetadata, CacheRow, StorageUsage};

/// Database operations for the audio cache
pub struct DbOperations;

impl DbOperations {
    /// Insert or replace the entry for a word
    pub fn upsert_cache_entry(
        db: &DatabaseConnection,
        row: &CacheRow,
    ) -> Result<(), anyhow::Error> {
        let conn = db.get_connection();
        let conn = conn.lock();

        conn.execute(
            "INSERT INTO audio_cache (word, payload, content_type, checksum, source, stored_at, success)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(word) DO UPDATE SET
                payload = excluded.payload,
                content_type = excluded.content_type,
                checksum = excluded.checksum,
                source = excluded.source,
                stored_at = excluded.stored_at,
                success = excluded.success",
            params![
                row.word,
                row.payload,
                row.content_type,
                row.checksum,
                row.source,
                row.stored_at,
                row.success,
            ],
        )?;

        Ok(())
    }

    /// Get the raw entry for a word, expired or not
    pub fn get_cache_row(
        db: &DatabaseConnection,
        word: &str,
    ) -> Result<Option<CacheRow>, anyhow::Error> {
        let conn = db.get_connection();
        let conn = conn.lock();

        let row = conn
            .query_row(
                "SELECT word, payload, content_type, checksum, source, stored_at, success
                 FROM audio_cache
                 WHERE word = ?1",
                params![word],
                |row| {
                    Ok(CacheRow {
                        word: row.get(0)?,
                        payload: row.get(1)?,
                        content_type: row.get(2)?,
                        checksum: row.get(3)?,
                        source: row.get(4)?,
                        stored_at: row.get(5)?,
                        success: row.get(6)?,
                    })
                },
            )
            .optional()?;

        Ok(row)
    }

    /// Delete every entry stored at or before `cutoff_ms`
    pub fn delete_entries_before(
        db: &DatabaseConnection,
        cutoff_ms: i64,
    ) -> Result<usize, anyhow::Error> {
        let conn = db.get_connection();
        let conn = conn.lock();

        let removed = conn.execute(
            "DELETE FROM audio_cache WHERE stored_at <= ?1",
            params![cutoff_ms],
        )?;

        Ok(removed)
    }

    /// Number of rows physically present, including expired ones
    pub fn count_cache_entries(db: &DatabaseConnection) -> Result<usize, anyhow::Error> {
        let conn = db.get_connection();
        let conn = conn.lock();

        let count: i64 = conn.query_row("SELECT COUNT(*) FROM audio_cache", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Drop all entries and the metadata row
    pub fn clear_cache(db: &DatabaseConnection) -> Result<(), anyhow::Error> {
        let conn = db.get_connection();
        let mut conn = conn.lock();

        let tx = conn.transaction()?;
        tx.execute("DELETE FROM audio_cache", [])?;
        tx.execute("DELETE FROM cache_metadata", [])?;
        tx.commit()?;

        Ok(())
    }

    pub fn store_metadata(
        db: &DatabaseConnection,
        metadata: &CacheMetadata,
    ) -> Result<(), anyhow::Error> {
        let conn = db.get_connection();
        let conn = conn.lock();

        conn.execute(
            "INSERT OR REPLACE INTO cache_metadata (id, schema_version, last_updated, total_words, successful_words)
             VALUES (1, ?1, ?2, ?3, ?4)",
            params![
                metadata.schema_version,
                metadata.last_updated.timestamp_millis(),
                metadata.total_words as i64,
                metadata.successful_words as i64,
            ],
        )?;

        Ok(())
    }

    pub fn get_metadata(db: &DatabaseConnection) -> Result<Option<CacheMetadata>, anyhow::Error> {
        let conn = db.get_connection();
        let conn = conn.lock();

        let row = conn
            .query_row(
                "SELECT schema_version, last_updated, total_words, successful_words
                 FROM cache_metadata WHERE id = 1",
                [],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, i64>(3)?,
                    ))
                },
            )
            .optional()?;

        Ok(row.and_then(|(version, updated, total, successful)| {
            Some(CacheMetadata {
                schema_version: version,
                last_updated: Utc.timestamp_millis_opt(updated).single()?,
                total_words: total.max(0) as usize,
                successful_words: successful.max(0) as usize,
            })
        }))
    }

    /// Bytes used by the database and the configured ceiling
    pub fn storage_usage(db: &DatabaseConnection) -> Result<StorageUsage, anyhow::Error> {
        let conn = db.get_connection();
        let conn = conn.lock();

        let page_size: i64 = conn.query_row("PRAGMA page_size", [], |row| row.get(0))?;
        let page_count: i64 = conn.query_row("PRAGMA page_count", [], |row| row.get(0))?;
        let max_pages: i64 = conn.query_row("PRAGMA max_page_count", [], |row| row.get(0))?;

        Ok(StorageUsage {
            used: (page_size * page_count).max(0) as u64,
            quota: (page_size as u64).saturating_mul(max_pages.max(0) as u64),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(word: &str, stored_at: i64) -> CacheRow {
        CacheRow {
            word: word.to_string(),
            payload: vec![1, 2, 3],
            content_type: "audio/mpeg".to_string(),
            checksum: blake3::hash(&[1, 2, 3]).to_hex().to_string(),
            source: "proxy-relay".to_string(),
            stored_at,
            success: true,
        }
    }

    #[test]
    fn test_upsert_overwrites() {
        let db = DatabaseConnection::in_memory().unwrap();
        DbOperations::upsert_cache_entry(&db, &row("apple", 10)).unwrap();
        let mut newer = row("apple", 20);
        newer.payload = vec![9];
        DbOperations::upsert_cache_entry(&db, &newer).unwrap();

        let stored = DbOperations::get_cache_row(&db, "apple").unwrap().unwrap();
        assert_eq!(stored.payload, vec![9]);
        assert_eq!(stored.stored_at, 20);
        assert_eq!(DbOperations::count_cache_entries(&db).unwrap(), 1);
    }

    #[test]
    fn test_delete_before_cutoff() {
        let db = DatabaseConnection::in_memory().unwrap();
        DbOperations::upsert_cache_entry(&db, &row("old", 100)).unwrap();
        DbOperations::upsert_cache_entry(&db, &row("edge", 200)).unwrap();
        DbOperations::upsert_cache_entry(&db, &row("new", 300)).unwrap();

        assert_eq!(DbOperations::delete_entries_before(&db, 200).unwrap(), 2);
        assert!(DbOperations::get_cache_row(&db, "new").unwrap().is_some());
        assert!(DbOperations::get_cache_row(&db, "old").unwrap().is_none());
    }

    #[test]
    fn test_metadata_roundtrip_and_clear() {
        let db = DatabaseConnection::in_memory().unwrap();
        let metadata = CacheMetadata {
            schema_version: 1,
            last_updated: Utc.timestamp_millis_opt(1_700_000_000_000).unwrap(),
            total_words: 10,
            successful_words: 7,
        };
        DbOperations::store_metadata(&db, &metadata).unwrap();
        assert_eq!(DbOperations::get_metadata(&db).unwrap(), Some(metadata));

        DbOperations::upsert_cache_entry(&db, &row("apple", 1)).unwrap();
        DbOperations::clear_cache(&db).unwrap();
        assert_eq!(DbOperations::get_metadata(&db).unwrap(), None);
        assert_eq!(DbOperations::count_cache_entries(&db).unwrap(), 0);
    }

    #[test]
    fn test_storage_usage_reports_pages() {
        let db = DatabaseConnection::in_memory().unwrap();
        db.set_size_limit(1024 * 1024).unwrap();
        let usage = DbOperations::storage_usage(&db).unwrap();
        assert!(usage.used > 0);
        assert!(usage.quota <= 1024 * 1024);
        assert!(usage.quota >= usage.used);
    }
}
