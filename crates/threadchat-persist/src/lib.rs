pub mod db;
pub mod repositories;
pub mod client;
pub mod trait_client;
pub mod error;
pub mod builder;

pub use threadchat_types::{Message, MessageRole, Thread};
pub use repositories::{ThreadRepository, MessageRepository};
pub use client::PersistClient;
pub use trait_client::PersistenceClient;
pub use error::PersistError;
pub use builder::PersistClientBuilder;
pub use db::DbPool;
