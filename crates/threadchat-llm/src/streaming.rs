use anyhow::{Context, Result};
use reqwest::Response;
use serde::{Deserialize, Serialize};

use crate::buffer_utils::{parse_sse_stream, SseLineParser};
use crate::traits::EventStream;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Message {
        content: String,
    },

    Done {
        #[serde(skip_serializing_if = "Option::is_none")]
        finish_reason: Option<String>,
    },
}

// Only the fields the relay needs; everything else in a chunk is ignored.
#[derive(Debug, Deserialize)]
struct CompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    content: Option<String>,
}

impl From<CompletionChunk> for Vec<StreamEvent> {
    fn from(chunk: CompletionChunk) -> Self {
        let Some(choice) = chunk.choices.into_iter().next() else {
            return Vec::new();
        };

        let text = choice
            .delta
            .content
            .filter(|content| !content.is_empty())
            .map(|content| StreamEvent::Message { content });
        let done = choice.finish_reason.map(|reason| StreamEvent::Done {
            finish_reason: Some(reason),
        });

        text.into_iter().chain(done).collect()
    }
}

/// Parses Chat Completions `data:` payloads
pub struct ChatChunkParser;

impl SseLineParser for ChatChunkParser {
    fn parse_data_line(&self, data: &str) -> Result<Vec<StreamEvent>> {
        let chunk: CompletionChunk = serde_json::from_str(data)
            .with_context(|| format!("Malformed stream chunk: {}", data))?;
        Ok(chunk.into())
    }
}

pub fn parse_chat_sse_stream(response: Response) -> EventStream {
    parse_sse_stream(response.bytes_stream(), ChatChunkParser)
}
