use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use threadchat_api::{build_router, config::Config, gateway::CompletionGateway, state::AppState};
use threadchat_llm::{ClientFactory, OpenAIConfig};
use threadchat_persist::PersistClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let config =
        Config::load().map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    init_logging(&config);

    tracing::info!("Starting threadchat API server");
    tracing::info!("Config loaded: {}:{}", config.server.host, config.server.port);

    // Initialize persistence client
    let persist = PersistClient::builder()
        .path(&config.database.path)
        .pool_size(config.database.pool_size)
        .busy_timeout_ms(config.database.busy_timeout_ms)
        .build()?;

    tracing::info!(path = %config.database.path, "Database ready");

    // Initialize LLM client
    let mut llm_config = OpenAIConfig::new(config.openai_api_key.clone());
    if let Some(base_url) = &config.openai_base_url {
        tracing::info!(base_url = %base_url, "Using custom completion endpoint");
        llm_config = llm_config.with_base_url(base_url.clone());
    }
    let chat_client = ClientFactory::create_chat_client(llm_config)?;
    let gateway = CompletionGateway::from_config(chat_client, &config.llm);

    tracing::info!(
        model = %gateway.model(),
        persist_turns = config.chat.persist_turns,
        "Completion gateway ready"
    );

    let state = Arc::new(AppState::new(config.clone(), Arc::new(persist), gateway));

    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Health check: http://{}/health", addr);
    tracing::info!("API docs: http://{}/api-docs/openapi.json", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

fn init_logging(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.logging.format.as_str() {
        "json" => {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }
}
