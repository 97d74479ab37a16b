// Database migrations
use anyhow::Result;
use rusqlite::Connection;

/// Bumped whenever the audio cache layout changes
pub const SCHEMA_VERSION: i64 = 1;

pub fn run_migrations(conn: &Connection) -> Result<()> {
    let current: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

    // Older layouts are disposable: the cache can always be refilled
    if current != 0 && current != SCHEMA_VERSION {
        conn.execute("DROP TABLE IF EXISTS audio_cache", [])?;
        conn.execute("DROP TABLE IF EXISTS cache_metadata", [])?;
    }

    // Create audio cache table, keyed by normalized word
    conn.execute(
        "CREATE TABLE IF NOT EXISTS audio_cache (
            word TEXT PRIMARY KEY NOT NULL,
            payload BLOB NOT NULL,
            content_type TEXT NOT NULL,
            checksum TEXT NOT NULL,
            source TEXT NOT NULL,
            stored_at INTEGER NOT NULL,
            success BOOLEAN NOT NULL DEFAULT 1
        )",
        [],
    )?;

    // Create metadata table (single row)
    conn.execute(
        "CREATE TABLE IF NOT EXISTS cache_metadata (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            schema_version INTEGER NOT NULL,
            last_updated INTEGER NOT NULL,
            total_words INTEGER NOT NULL,
            successful_words INTEGER NOT NULL
        )",
        [],
    )?;

    // Index for the TTL sweep
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_audio_cache_stored_at ON audio_cache(stored_at)",
        [],
    )?;

    conn.execute_batch(&format!("PRAGMA user_version = {}", SCHEMA_VERSION))?;

    Ok(())
}
