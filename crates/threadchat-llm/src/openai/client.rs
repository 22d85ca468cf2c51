use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use serde::Serialize;

use crate::streaming::parse_chat_sse_stream;
use crate::traits::{ChatClient, ChatOptions, ChatRequest, EventStream};
use crate::types::Message;

pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// Chat Completions client for OpenAI and compatible gateways.
///
/// Point it at another provider with [`OpenAIClient::with_base_url`].
pub struct OpenAIClient {
    http: reqwest::Client,
    base_url: String,
}

impl OpenAIClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let bearer = HeaderValue::try_from(format!("Bearer {}", api_key.into()))
            .context("API key contains characters not allowed in a header")?;

        let mut defaults = HeaderMap::new();
        defaults.insert(header::AUTHORIZATION, bearer);

        let http = reqwest::Client::builder()
            .default_headers(defaults)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            base_url: OPENAI_API_BASE.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send(&self, body: &CompletionBody<'_>) -> Result<reqwest::Response> {
        let endpoint = format!("{}/chat/completions", self.base_url);
        let response = self
            .http
            .post(&endpoint)
            .json(body)
            .send()
            .await
            .with_context(|| format!("Request to {} failed", endpoint))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let detail = response
            .text()
            .await
            .unwrap_or_else(|e| format!("<unreadable body: {}>", e));
        anyhow::bail!("Provider returned {}: {}", status, detail)
    }
}

/// Request body for `POST /chat/completions`
#[derive(Debug, Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: &'a [Message],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
}

impl<'a> CompletionBody<'a> {
    fn new(request: &'a ChatRequest, stream: bool) -> Self {
        let ChatOptions {
            temperature,
            max_tokens,
        } = request.options;

        // Reasoning models reject temperature and take max_completion_tokens
        let reasoning = ["o1", "o3", "gpt-5"]
            .iter()
            .any(|prefix| request.model.starts_with(prefix));

        Self {
            model: &request.model,
            messages: &request.messages,
            stream,
            temperature: temperature.filter(|_| !reasoning),
            max_tokens: max_tokens.filter(|_| !reasoning),
            max_completion_tokens: max_tokens.filter(|_| reasoning),
        }
    }
}

#[async_trait]
impl ChatClient for OpenAIClient {
    async fn chat_stream(&self, request: ChatRequest) -> Result<EventStream> {
        tracing::debug!(
            model = %request.model,
            messages = request.messages.len(),
            "Opening chat completion stream"
        );

        let response = self.send(&CompletionBody::new(&request, true)).await?;
        Ok(parse_chat_sse_stream(response))
    }
}
