pub mod types;
pub mod traits;
pub mod streaming;
pub mod buffer_utils;
pub mod openai;
pub mod config;

pub use traits::{ChatClient, ChatOptions, ChatRequest, EventStream};

pub use streaming::StreamEvent;
pub use buffer_utils::SseLineBuffer;
pub use openai::OpenAIClient;
pub use config::{ClientFactory, OpenAIConfig};
pub use types::Message;
