use async_trait::async_trait;

use crate::error::Result;
use threadchat_types::{Message, MessageRole, Thread};

/// Trait for chat persistence operations
///
/// Implementations provide thread and message CRUD. The HTTP layer only
/// talks to this trait so a store can be swapped in tests.
#[async_trait]
pub trait PersistenceClient: Send + Sync {
    /// Create a new thread
    async fn create_thread(&self, title: &str) -> Result<Thread>;

    /// List all threads, newest first
    async fn list_threads(&self) -> Result<Vec<Thread>>;

    /// Get a thread by ID
    async fn get_thread(&self, thread_id: &str) -> Result<Option<Thread>>;

    /// Rename a thread; false when it does not exist
    async fn update_thread_title(&self, thread_id: &str, title: &str) -> Result<bool>;

    /// Delete a thread and its messages; false when it does not exist
    async fn delete_thread(&self, thread_id: &str) -> Result<bool>;

    /// Append a message to an existing thread
    async fn create_message(
        &self,
        thread_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<Message>;

    /// Get all messages for a thread in conversation order
    async fn get_messages(&self, thread_id: &str) -> Result<Vec<Message>>;

    /// Delete all messages of a thread, keeping the thread
    async fn delete_messages(&self, thread_id: &str) -> Result<bool>;

    /// Check that the store is reachable
    async fn ping(&self) -> Result<()>;
}
