use anyhow::{Context, Result};
use std::sync::Arc;

use threadchat_llm::{ChatClient, ChatOptions, ChatRequest, EventStream, Message};
use threadchat_types::{ChatTurn, MessageRole};

use crate::config::LlmConfig;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

pub const DEFAULT_SYSTEM_PROMPT: &str = "\
You are a helpful general-purpose AI assistant. Follow these guidelines:

1. Answer accurately and stick to facts.
2. Explain concepts in clear, simple language.
3. Give complete answers with enough context to be useful.
4. Format with markdown:
   - fenced code blocks with a language tag, e.g. ```rust
   - `inline code` for identifiers and short snippets
   - numbered or bulleted lists where they help
   - **bold** for key terms
   - [text](url) for links
   - #, ##, ### headings to organize longer answers
5. If you do not know something, say so instead of guessing.
6. Focus on solving the user's actual problem and stay on the question asked.

Keep a professional, friendly tone.";

/// Wraps a [`ChatClient`] with the fixed system instruction and model
/// settings used for every chat turn.
pub struct CompletionGateway {
    client: Arc<dyn ChatClient>,
    model: String,
    options: ChatOptions,
    system_prompt: String,
}

impl CompletionGateway {
    pub fn new(client: Arc<dyn ChatClient>) -> Self {
        Self {
            client,
            model: DEFAULT_MODEL.to_string(),
            options: ChatOptions::default(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }

    pub fn from_config(client: Arc<dyn ChatClient>, config: &LlmConfig) -> Self {
        let mut gateway = Self::new(client)
            .with_model(config.model.clone())
            .with_options(config.chat_options());
        if let Some(prompt) = &config.system_prompt {
            gateway = gateway.with_system_prompt(prompt.clone());
        }
        gateway
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_options(mut self, options: ChatOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Provider messages for a turn: the system instruction followed by the
    /// submitted turns in order.
    pub fn build_messages(&self, turns: &[ChatTurn]) -> Vec<Message> {
        let mut messages = Vec::with_capacity(turns.len() + 1);
        messages.push(Message::system(self.system_prompt.clone()));
        messages.extend(turns.iter().map(|turn| match turn.role {
            MessageRole::User => Message::human(turn.content.clone()),
            MessageRole::Assistant => Message::ai(turn.content.clone()),
        }));
        messages
    }

    /// Open a completion stream. Errors here mean the provider could not be
    /// reached or refused the request; nothing has been streamed yet.
    pub async fn stream_reply(&self, turns: &[ChatTurn]) -> Result<EventStream> {
        let request = ChatRequest::new(self.model.clone(), self.build_messages(turns))
            .with_options(self.options);

        tracing::debug!(
            model = %self.model,
            turns = turns.len(),
            "Opening completion stream"
        );

        self.client
            .chat_stream(request)
            .await
            .context("Failed to open completion stream")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct NoopClient;

    #[async_trait]
    impl ChatClient for NoopClient {
        async fn chat_stream(&self, _request: ChatRequest) -> Result<EventStream> {
            anyhow::bail!("provider down")
        }
    }

    #[test]
    fn test_system_prompt_comes_first() {
        let gateway = CompletionGateway::new(Arc::new(NoopClient));
        let messages =
            gateway.build_messages(&[ChatTurn::user("Hi"), ChatTurn::assistant("Hello")]);

        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0], Message::system(DEFAULT_SYSTEM_PROMPT));
        assert_eq!(messages[1], Message::human("Hi"));
        assert_eq!(messages[2], Message::ai("Hello"));
    }

    #[test]
    fn test_config_overrides() {
        let config = LlmConfig {
            model: "gpt-4o".to_string(),
            temperature: Some(0.2),
            max_tokens: None,
            system_prompt: Some("Be terse.".to_string()),
        };
        let gateway = CompletionGateway::from_config(Arc::new(NoopClient), &config);

        assert_eq!(gateway.model(), "gpt-4o");
        assert_eq!(gateway.system_prompt(), "Be terse.");
    }

    #[tokio::test]
    async fn test_provider_failure_surfaces() {
        let gateway = CompletionGateway::new(Arc::new(NoopClient));
        let err = match gateway.stream_reply(&[ChatTurn::user("Hi")]).await {
            Ok(_) => panic!("expected failure"),
            Err(e) => e,
        };

        assert!(format!("{:#}", err).contains("provider down"));
    }
}
