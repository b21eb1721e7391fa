// Database migrations
use rusqlite::Connection;
use anyhow::Result;

pub fn run_migrations(conn: &Connection) -> Result<()> {
    // Key-value store for client state (progress counters, access grants)
    conn.execute(
        "CREATE TABLE IF NOT EXISTS kv_store (
            key TEXT PRIMARY KEY NOT NULL,
            value TEXT NOT NULL,
            updated_at INTEGER NOT NULL
        )",
        [],
    )?;

    // Indexed content library
    conn.execute(
        "CREATE TABLE IF NOT EXISTS posts (
            id TEXT PRIMARY KEY NOT NULL,
            title TEXT NOT NULL,
            kind TEXT NOT NULL,
            is_premium BOOLEAN DEFAULT 0,
            blocks TEXT NOT NULL,
            file_path TEXT NOT NULL,
            date_added INTEGER NOT NULL,
            date_modified INTEGER NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_posts_file_path ON posts(file_path)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_posts_kind ON posts(kind)",
        [],
    )?;

    Ok(())
}
