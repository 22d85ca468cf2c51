pub mod api;
pub mod error;
pub mod orchestrator;

pub use api::{ApiClient, TextStream};
pub use error::{ClientError, Result};
pub use orchestrator::{ChatBackend, ChatSession, HistoryMode, TurnOutcome, TurnState};
