use r2d2::{CustomizeConnection, Pool};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;

use crate::error::Result;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Sets per-connection pragmas; `foreign_keys` is off by default in SQLite
/// and the message cascade depends on it.
#[derive(Debug)]
struct SqlitePragmaCustomizer {
    busy_timeout_ms: u64,
}

impl CustomizeConnection<Connection, rusqlite::Error> for SqlitePragmaCustomizer {
    fn on_acquire(&self, conn: &mut Connection) -> std::result::Result<(), rusqlite::Error> {
        conn.execute_batch(&format!(
            "PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = {};
             PRAGMA synchronous = NORMAL;",
            self.busy_timeout_ms
        ))
    }
}

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS threads (
        id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        created_at INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS messages (
        id TEXT PRIMARY KEY,
        thread_id TEXT NOT NULL,
        role TEXT NOT NULL CHECK(role IN ('user','assistant')),
        content TEXT NOT NULL,
        created_at INTEGER NOT NULL,
        FOREIGN KEY (thread_id) REFERENCES threads(id) ON DELETE CASCADE
    );

    CREATE INDEX IF NOT EXISTS idx_messages_thread_created
        ON messages(thread_id, created_at);
";

/// Open (creating if needed) the database file, configure the pool and
/// apply the schema.
pub fn open_pool(path: &Path, pool_size: u32, busy_timeout_ms: u64) -> Result<DbPool> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    tracing::info!(path = %path.display(), pool_size, "Opening SQLite database");

    let manager = SqliteConnectionManager::file(path);
    let pool = Pool::builder()
        .max_size(pool_size)
        .connection_timeout(Duration::from_millis(busy_timeout_ms.max(1_000)))
        .connection_customizer(Box::new(SqlitePragmaCustomizer { busy_timeout_ms }))
        .build(manager)?;

    {
        let conn = pool.get()?;
        // Database-wide setting, only needs to run once
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        migrate(&conn)?;
    }

    tracing::debug!("SQLite schema ready");
    Ok(pool)
}

pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}
