use async_trait::async_trait;
use std::path::Path;

use crate::builder::PersistClientBuilder;
use crate::db::{self, DbPool};
use crate::error::{PersistError, Result};
use crate::repositories::{MessageRepository, ThreadRepository};
use crate::trait_client::PersistenceClient;
use threadchat_types::{Message, MessageRole, Thread};

#[derive(Clone)]
pub struct PersistClient {
    pool: DbPool,
    thread_repo: ThreadRepository,
    message_repo: MessageRepository,
}

impl PersistClient {
    pub fn new(path: impl AsRef<Path>, pool_size: u32, busy_timeout_ms: u64) -> Result<Self> {
        let pool = db::open_pool(path.as_ref(), pool_size, busy_timeout_ms)?;
        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: DbPool) -> Self {
        Self {
            thread_repo: ThreadRepository::new(pool.clone()),
            message_repo: MessageRepository::new(pool.clone()),
            pool,
        }
    }

    pub fn builder() -> PersistClientBuilder {
        PersistClientBuilder::new()
    }

    pub fn threads(&self) -> &ThreadRepository {
        &self.thread_repo
    }

    pub fn messages(&self) -> &MessageRepository {
        &self.message_repo
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Run a synchronous repository call off the async runtime.
    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(PersistClient) -> Result<T> + Send + 'static,
    {
        let client = self.clone();
        tokio::task::spawn_blocking(move || f(client))
            .await
            .map_err(|e| PersistError::Internal(format!("Blocking task failed: {}", e)))?
    }
}

#[async_trait]
impl PersistenceClient for PersistClient {
    async fn create_thread(&self, title: &str) -> Result<Thread> {
        let title = title.to_string();
        self.blocking(move |c| c.threads().create(&title)).await
    }

    async fn list_threads(&self) -> Result<Vec<Thread>> {
        self.blocking(|c| c.threads().list()).await
    }

    async fn get_thread(&self, thread_id: &str) -> Result<Option<Thread>> {
        let thread_id = thread_id.to_string();
        self.blocking(move |c| c.threads().get(&thread_id)).await
    }

    async fn update_thread_title(&self, thread_id: &str, title: &str) -> Result<bool> {
        let thread_id = thread_id.to_string();
        let title = title.to_string();
        self.blocking(move |c| c.threads().update_title(&thread_id, &title))
            .await
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<bool> {
        let thread_id = thread_id.to_string();
        self.blocking(move |c| c.threads().delete(&thread_id)).await
    }

    async fn create_message(
        &self,
        thread_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<Message> {
        let thread_id = thread_id.to_string();
        let content = content.to_string();
        self.blocking(move |c| c.messages().create(&thread_id, role, &content))
            .await
    }

    async fn get_messages(&self, thread_id: &str) -> Result<Vec<Message>> {
        let thread_id = thread_id.to_string();
        self.blocking(move |c| c.messages().list_by_thread(&thread_id))
            .await
    }

    async fn delete_messages(&self, thread_id: &str) -> Result<bool> {
        let thread_id = thread_id.to_string();
        self.blocking(move |c| c.messages().delete_by_thread(&thread_id))
            .await
    }

    async fn ping(&self) -> Result<()> {
        self.blocking(|c| {
            let conn = c.pool().get()?;
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
            Ok(())
        })
        .await
    }
}
