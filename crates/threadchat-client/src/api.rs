use async_trait::async_trait;
use futures::{Stream, StreamExt};
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::json;
use std::pin::Pin;
use std::time::Duration;

use threadchat_types::{ChatTurn, Message, MessageRole, Thread};

use crate::error::{ClientError, Result};
use crate::orchestrator::ChatBackend;

/// Reply text as it arrives, already decoded to UTF-8.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Deserialize)]
struct CreateMessageResponse {
    message: Message,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    /// Whether `POST /chat` saves turns itself
    #[serde(default)]
    pub persist_turns: bool,
}

/// HTTP client for the threadchat service
#[derive(Clone)]
pub struct ApiClient {
    http_client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http_client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn health(&self) -> Result<HealthStatus> {
        let response = self.http_client.get(self.url("/health")).send().await?;
        Ok(check(response).await?.json().await?)
    }
}

/// Turn a non-2xx response into `ClientError::Api`, using the server's
/// `{"error": ...}` message when there is one.
async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ErrorBody>(&text) {
        Ok(body) => body.error,
        Err(_) => text,
    };

    Err(ClientError::Api {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl ChatBackend for ApiClient {
    async fn list_threads(&self) -> Result<Vec<Thread>> {
        let response = self.http_client.get(self.url("/threads")).send().await?;
        Ok(check(response).await?.json().await?)
    }

    async fn create_thread(&self, title: &str) -> Result<Thread> {
        let response = self
            .http_client
            .post(self.url("/threads"))
            .json(&json!({ "title": title }))
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    async fn rename_thread(&self, thread_id: &str, title: &str) -> Result<()> {
        let response = self
            .http_client
            .put(self.url(&format!("/threads/{}", thread_id)))
            .json(&json!({ "title": title }))
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<()> {
        let response = self
            .http_client
            .delete(self.url(&format!("/threads/{}", thread_id)))
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn list_messages(&self, thread_id: &str) -> Result<Vec<Message>> {
        let response = self
            .http_client
            .get(self.url("/messages"))
            .query(&[("threadId", thread_id)])
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    async fn create_message(
        &self,
        thread_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<Message> {
        let response = self
            .http_client
            .post(self.url("/messages"))
            .json(&json!({ "threadId": thread_id, "role": role, "content": content }))
            .send()
            .await?;
        let body: CreateMessageResponse = check(response).await?.json().await?;
        Ok(body.message)
    }

    async fn stream_chat(&self, thread_id: &str, turns: &[ChatTurn]) -> Result<TextStream> {
        let response = self
            .http_client
            .post(self.url("/chat"))
            .json(&json!({ "threadId": thread_id, "messages": turns }))
            .send()
            .await
            .map_err(reply_error)?;
        let response = check(response).await?;

        tracing::debug!(thread_id = %thread_id, "Reply stream opened");
        Ok(decode_text_stream(response.bytes_stream()))
    }
}

/// Once the request reached the server, any failure is a broken reply.
fn reply_error(err: reqwest::Error) -> ClientError {
    if err.is_connect() || err.is_builder() || err.is_timeout() {
        ClientError::Http(err)
    } else {
        ClientError::Stream(err.to_string())
    }
}

/// Decode a byte stream into text chunks without splitting multi-byte
/// characters across chunk boundaries.
fn decode_text_stream<S, B, E>(bytes: S) -> TextStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    Box::pin(async_stream::stream! {
        let mut bytes = Box::pin(bytes);
        let mut decoder = Utf8Decoder::default();
        let mut failed = false;

        while let Some(item) = bytes.next().await {
            match item {
                Ok(chunk) => {
                    let text = decoder.push(chunk.as_ref());
                    if !text.is_empty() {
                        yield Ok(text);
                    }
                }
                Err(e) => {
                    failed = true;
                    yield Err(ClientError::Stream(e.to_string()));
                    break;
                }
            }
        }

        if !failed {
            let rest = decoder.finish();
            if !rest.is_empty() {
                yield Ok(rest);
            }
        }
    })
}

#[derive(Default)]
struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    fn push(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);

        match std::str::from_utf8(&self.pending) {
            Ok(text) => {
                let text = text.to_string();
                self.pending.clear();
                text
            }
            // Incomplete character at the end; keep it for the next chunk
            Err(e) if e.error_len().is_none() => {
                let valid = e.valid_up_to();
                let text = String::from_utf8_lossy(&self.pending[..valid]).into_owned();
                self.pending.drain(..valid);
                text
            }
            Err(_) => self.finish(),
        }
    }

    fn finish(&mut self) -> String {
        let text = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        text
    }
}
