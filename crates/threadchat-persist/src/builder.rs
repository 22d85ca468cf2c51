use std::path::PathBuf;

use crate::error::{PersistError, Result};
use crate::PersistClient;

pub struct PersistClientBuilder {
    path: Option<PathBuf>,
    pool_size: u32,
    busy_timeout_ms: u64,
}

impl PersistClientBuilder {
    pub fn new() -> Self {
        Self {
            path: None,
            pool_size: 8,
            busy_timeout_ms: 5_000,
        }
    }

    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn pool_size(mut self, size: u32) -> Self {
        self.pool_size = size.max(1);
        self
    }

    pub fn busy_timeout_ms(mut self, timeout: u64) -> Self {
        self.busy_timeout_ms = timeout;
        self
    }

    pub fn build(self) -> Result<PersistClient> {
        let path = self
            .path
            .ok_or_else(|| PersistError::Internal("database path is required".to_string()))?;

        PersistClient::new(path, self.pool_size, self.busy_timeout_ms)
    }
}

impl Default for PersistClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
