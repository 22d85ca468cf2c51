use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Reply stream interrupted: {0}")]
    Stream(String),

    #[error("No thread selected")]
    NoThreadSelected,

    #[error("Message is empty")]
    EmptyInput,
}

impl ClientError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::Api { status: 404, .. })
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
