//! Client-side driver for one chat turn.
//!
//! By default the server only stores what it is told to store, so the
//! session saves the user message, relays the streamed reply, saves the
//! finished reply and names a fresh thread after its first answer. Against a
//! server that persists turns itself (see [`ChatSession::with_server_persistence`])
//! the session leaves both saves to the server and only reloads.

use async_trait::async_trait;
use futures::StreamExt;
use std::fmt;
use std::str::FromStr;

use threadchat_types::{derive_title, ChatTurn, Message, MessageRole, Thread, DEFAULT_THREAD_TITLE};

use crate::api::TextStream;
use crate::error::{ClientError, Result};

/// Operations the session needs from the service
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn list_threads(&self) -> Result<Vec<Thread>>;

    async fn create_thread(&self, title: &str) -> Result<Thread>;

    async fn rename_thread(&self, thread_id: &str, title: &str) -> Result<()>;

    async fn delete_thread(&self, thread_id: &str) -> Result<()>;

    async fn list_messages(&self, thread_id: &str) -> Result<Vec<Message>>;

    async fn create_message(
        &self,
        thread_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<Message>;

    async fn stream_chat(&self, thread_id: &str, turns: &[ChatTurn]) -> Result<TextStream>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    SendingUserMessage,
    StreamingReply,
    PersistingReply,
    Error(String),
}

/// Which turns go to `POST /chat`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HistoryMode {
    /// Only the message just typed
    #[default]
    LatestTurn,
    /// Every persisted message of the thread, the new one included
    FullThread,
}

impl FromStr for HistoryMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "latest" | "latest_turn" => Ok(Self::LatestTurn),
            "full" | "full_thread" => Ok(Self::FullThread),
            other => Err(format!(
                "unknown history mode '{}', expected 'latest' or 'full'",
                other
            )),
        }
    }
}

impl fmt::Display for HistoryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LatestTurn => f.write_str("latest"),
            Self::FullThread => f.write_str("full"),
        }
    }
}

/// What a completed turn produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    pub reply: String,
    /// Title given to the thread by this turn, if any
    pub title: Option<String>,
    /// Set when the reply streamed fine but could not be saved
    pub persist_error: Option<String>,
}

pub struct ChatSession<B> {
    backend: B,
    history: HistoryMode,
    server_persists: bool,
    threads: Vec<Thread>,
    selected: Option<String>,
    messages: Vec<Message>,
    pending_reply: String,
    state: TurnState,
}

impl<B: ChatBackend> ChatSession<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            history: HistoryMode::default(),
            server_persists: false,
            threads: Vec::new(),
            selected: None,
            messages: Vec::new(),
            pending_reply: String::new(),
            state: TurnState::Idle,
        }
    }

    pub fn with_history_mode(mut self, history: HistoryMode) -> Self {
        self.history = history;
        self
    }

    /// Set when `POST /chat` saves the user turn and the reply on its own;
    /// the session then never calls `create_message` during a turn.
    pub fn with_server_persistence(mut self, enabled: bool) -> Self {
        self.server_persists = enabled;
        self
    }

    pub fn server_persistence(&self) -> bool {
        self.server_persists
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn history_mode(&self) -> HistoryMode {
        self.history
    }

    pub fn state(&self) -> &TurnState {
        &self.state
    }

    pub fn threads(&self) -> &[Thread] {
        &self.threads
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Reply text received so far for the turn in flight
    pub fn pending_reply(&self) -> &str {
        &self.pending_reply
    }

    pub fn selected_thread(&self) -> Option<&Thread> {
        let id = self.selected.as_deref()?;
        self.threads.iter().find(|t| t.id == id)
    }

    /// Load threads and select the newest one, creating a placeholder
    /// thread when there are none.
    pub async fn bootstrap(&mut self) -> Result<()> {
        self.refresh_threads().await?;

        if self.threads.is_empty() {
            let thread = self.backend.create_thread(DEFAULT_THREAD_TITLE).await?;
            tracing::info!(thread_id = %thread.id, "Created initial thread");
            self.threads.push(thread);
        }

        let newest = self.threads[0].id.clone();
        self.select_thread(&newest).await
    }

    pub async fn refresh_threads(&mut self) -> Result<()> {
        self.threads = self.backend.list_threads().await?;
        Ok(())
    }

    pub async fn select_thread(&mut self, thread_id: &str) -> Result<()> {
        if !self.threads.iter().any(|t| t.id == thread_id) {
            self.refresh_threads().await?;
        }

        let messages = self.backend.list_messages(thread_id).await?;
        self.selected = Some(thread_id.to_string());
        self.messages = messages;
        self.pending_reply.clear();
        self.state = TurnState::Idle;
        Ok(())
    }

    pub async fn new_thread(&mut self) -> Result<Thread> {
        let thread = self.backend.create_thread(DEFAULT_THREAD_TITLE).await?;
        self.refresh_threads().await?;
        self.select_thread(&thread.id).await?;
        Ok(thread)
    }

    pub async fn rename_thread(&mut self, thread_id: &str, title: &str) -> Result<()> {
        let title = title.trim();
        self.backend.rename_thread(thread_id, title).await?;
        self.set_local_title(thread_id, title);
        Ok(())
    }

    /// Delete a thread; deleting the selected one leaves nothing selected.
    pub async fn delete_thread(&mut self, thread_id: &str) -> Result<()> {
        self.backend.delete_thread(thread_id).await?;
        self.threads.retain(|t| t.id != thread_id);

        if self.selected.as_deref() == Some(thread_id) {
            self.selected = None;
            self.messages.clear();
            self.pending_reply.clear();
            self.state = TurnState::Idle;
        }
        Ok(())
    }

    /// Run one chat turn for the selected thread.
    ///
    /// `on_chunk` sees every piece of reply text as it arrives. Failing to
    /// save the user message, to open the stream, or mid-stream leaves the
    /// session in `TurnState::Error` with nothing further saved.
    pub async fn submit<F>(&mut self, input: &str, mut on_chunk: F) -> Result<TurnOutcome>
    where
        F: FnMut(&str) + Send,
    {
        let content = input.trim();
        if content.is_empty() {
            return Err(ClientError::EmptyInput);
        }
        let thread_id = self.selected.clone().ok_or(ClientError::NoThreadSelected)?;

        let first_reply = !self
            .messages
            .iter()
            .any(|m| m.role == MessageRole::Assistant);

        self.pending_reply.clear();
        self.state = TurnState::SendingUserMessage;

        if !self.server_persists {
            let user_message = match self
                .backend
                .create_message(&thread_id, MessageRole::User, content)
                .await
            {
                Ok(message) => message,
                Err(e) => return Err(self.fail(e)),
            };
            self.messages.push(user_message);
        }

        let turns: Vec<ChatTurn> = match self.history {
            HistoryMode::LatestTurn => vec![ChatTurn::user(content)],
            HistoryMode::FullThread => {
                let mut turns: Vec<ChatTurn> = self.messages.iter().map(ChatTurn::from).collect();
                if self.server_persists {
                    turns.push(ChatTurn::user(content));
                }
                turns
            }
        };

        let mut stream = match self.backend.stream_chat(&thread_id, &turns).await {
            Ok(stream) => stream,
            Err(e) => return Err(self.fail(e)),
        };

        self.state = TurnState::StreamingReply;
        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(text) => {
                    self.pending_reply.push_str(&text);
                    on_chunk(&text);
                }
                Err(e) => return Err(self.fail(e)),
            }
        }

        self.state = TurnState::PersistingReply;
        let reply = std::mem::take(&mut self.pending_reply);

        let persist_error = if reply.is_empty() {
            tracing::warn!(thread_id = %thread_id, "Empty reply, nothing to save");
            None
        } else if self.server_persists {
            None
        } else {
            match self
                .backend
                .create_message(&thread_id, MessageRole::Assistant, &reply)
                .await
            {
                Ok(_) => None,
                Err(e) => {
                    tracing::error!(thread_id = %thread_id, "Failed to save reply: {}", e);
                    Some(e.to_string())
                }
            }
        };

        let title = if first_reply {
            self.name_thread(&thread_id, &reply).await
        } else {
            None
        };

        match self.backend.list_messages(&thread_id).await {
            Ok(messages) => self.messages = messages,
            Err(e) => tracing::warn!(thread_id = %thread_id, "Failed to reload messages: {}", e),
        }

        self.state = match &persist_error {
            Some(message) => TurnState::Error(message.clone()),
            None => TurnState::Idle,
        };

        Ok(TurnOutcome {
            reply,
            title,
            persist_error,
        })
    }

    /// Replace the placeholder title with one derived from the first reply.
    async fn name_thread(&mut self, thread_id: &str, reply: &str) -> Option<String> {
        let current = self.threads.iter().find(|t| t.id == thread_id)?;
        if current.title != DEFAULT_THREAD_TITLE {
            return None;
        }

        let title = derive_title(reply)?;
        match self.backend.rename_thread(thread_id, &title).await {
            Ok(()) => {
                self.set_local_title(thread_id, &title);
                Some(title)
            }
            Err(e) => {
                tracing::warn!(thread_id = %thread_id, "Failed to set thread title: {}", e);
                None
            }
        }
    }

    fn set_local_title(&mut self, thread_id: &str, title: &str) {
        if let Some(thread) = self.threads.iter_mut().find(|t| t.id == thread_id) {
            thread.title = title.to_string();
        }
    }

    fn fail(&mut self, err: ClientError) -> ClientError {
        tracing::error!("Chat turn failed: {}", err);
        self.pending_reply.clear();
        self.state = TurnState::Error(err.to_string());
        err
    }
}
