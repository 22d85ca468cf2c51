pub mod models;
pub mod title;

pub use models::{ChatTurn, Message, MessageRole, ParseRoleError, Thread};
pub use title::{derive_title, DEFAULT_THREAD_TITLE, TITLE_MAX_CHARS};
