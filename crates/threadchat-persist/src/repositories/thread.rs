use rusqlite::{params, Row};

use crate::db::DbPool;
use crate::error::Result;
use threadchat_types::Thread;

const THREAD_COLUMNS: &str = "id, title, created_at";

fn row_to_thread(row: &Row) -> rusqlite::Result<Thread> {
    Ok(Thread {
        id: row.get(0)?,
        title: row.get(1)?,
        created_at: row.get(2)?,
    })
}

#[derive(Clone)]
pub struct ThreadRepository {
    pool: DbPool,
}

impl ThreadRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create a new thread with a fresh id and the current timestamp.
    /// The stored title is the trimmed input.
    pub fn create(&self, title: &str) -> Result<Thread> {
        let thread = Thread {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.trim().to_string(),
            created_at: chrono::Utc::now().timestamp_millis(),
        };

        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO threads (id, title, created_at) VALUES (?1, ?2, ?3)",
            params![thread.id, thread.title, thread.created_at],
        )?;

        tracing::debug!(thread_id = %thread.id, "Thread created");
        Ok(thread)
    }

    /// All threads, newest first.
    pub fn list(&self) -> Result<Vec<Thread>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {THREAD_COLUMNS} FROM threads ORDER BY created_at DESC, rowid DESC"
        ))?;
        let threads = stmt
            .query_map([], row_to_thread)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(threads)
    }

    pub fn get(&self, id: &str) -> Result<Option<Thread>> {
        let conn = self.pool.get()?;
        match conn.query_row(
            &format!("SELECT {THREAD_COLUMNS} FROM threads WHERE id = ?1"),
            params![id],
            row_to_thread,
        ) {
            Ok(thread) => Ok(Some(thread)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Returns false, without touching anything, when the thread does not exist.
    pub fn update_title(&self, id: &str, title: &str) -> Result<bool> {
        let conn = self.pool.get()?;
        let rows = conn.execute(
            "UPDATE threads SET title = ?2 WHERE id = ?1",
            params![id, title.trim()],
        )?;
        Ok(rows > 0)
    }

    /// Delete a thread and, through the foreign key cascade, its messages.
    /// Returns whether a row was actually removed.
    pub fn delete(&self, id: &str) -> Result<bool> {
        let conn = self.pool.get()?;
        let rows = conn.execute("DELETE FROM threads WHERE id = ?1", params![id])?;
        if rows > 0 {
            tracing::debug!(thread_id = %id, "Thread deleted");
        }
        Ok(rows > 0)
    }
}
