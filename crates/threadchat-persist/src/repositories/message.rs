use rusqlite::types::Type;
use rusqlite::{params, Row};

use crate::db::DbPool;
use crate::error::{PersistError, Result};
use threadchat_types::{Message, MessageRole};

fn row_to_message(row: &Row) -> rusqlite::Result<Message> {
    let role: String = row.get(2)?;
    let role = role
        .parse::<MessageRole>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?;

    Ok(Message {
        id: row.get(0)?,
        thread_id: row.get(1)?,
        role,
        content: row.get(3)?,
        created_at: row.get(4)?,
    })
}

#[derive(Clone)]
pub struct MessageRepository {
    pool: DbPool,
}

impl MessageRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Append a message to a thread. Fails with `ThreadNotFound` when the
    /// thread does not exist; the check and the insert share a transaction.
    pub fn create(&self, thread_id: &str, role: MessageRole, content: &str) -> Result<Message> {
        let message = Message {
            id: uuid::Uuid::new_v4().to_string(),
            thread_id: thread_id.to_string(),
            role,
            content: content.to_string(),
            created_at: chrono::Utc::now().timestamp_millis(),
        };

        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;

        let exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM threads WHERE id = ?1)",
            params![thread_id],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(PersistError::ThreadNotFound(thread_id.to_string()));
        }

        tx.execute(
            "INSERT INTO messages (id, thread_id, role, content, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                message.id,
                message.thread_id,
                message.role.as_str(),
                message.content,
                message.created_at
            ],
        )?;
        tx.commit()?;

        tracing::debug!(
            thread_id = %message.thread_id,
            message_id = %message.id,
            role = %message.role,
            "Message saved"
        );
        Ok(message)
    }

    /// Messages of a thread in conversation order. Insertion order breaks
    /// ties between messages created in the same millisecond.
    pub fn list_by_thread(&self, thread_id: &str) -> Result<Vec<Message>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT id, thread_id, role, content, created_at
             FROM messages
             WHERE thread_id = ?1
             ORDER BY created_at ASC, rowid ASC",
        )?;
        let messages = stmt
            .query_map(params![thread_id], row_to_message)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(messages)
    }

    /// Returns whether any message was removed.
    pub fn delete_by_thread(&self, thread_id: &str) -> Result<bool> {
        let conn = self.pool.get()?;
        let rows = conn.execute(
            "DELETE FROM messages WHERE thread_id = ?1",
            params![thread_id],
        )?;
        Ok(rows > 0)
    }
}
