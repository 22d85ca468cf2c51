use std::sync::Arc;

use threadchat_persist::PersistenceClient;

use crate::config::Config;
use crate::gateway::CompletionGateway;

/// Shared application state passed to all handlers
///
/// The store sits behind the `PersistenceClient` trait so tests can run the
/// router against any implementation.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub persist: Arc<dyn PersistenceClient>,
    pub gateway: Arc<CompletionGateway>,
}

impl AppState {
    pub fn new(
        config: Config,
        persist: Arc<dyn PersistenceClient>,
        gateway: CompletionGateway,
    ) -> Self {
        Self {
            config: Arc::new(config),
            persist,
            gateway: Arc::new(gateway),
        }
    }
}
