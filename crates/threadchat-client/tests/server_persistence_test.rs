use async_trait::async_trait;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use threadchat_api::{build_router, config::Config, gateway::CompletionGateway, state::AppState};
use threadchat_client::{ApiClient, ChatBackend, ChatSession, ClientError, TurnState};
use threadchat_llm::{ChatClient, ChatRequest, EventStream, StreamEvent};
use threadchat_persist::PersistClient;
use threadchat_types::MessageRole;

/// Provider double that replays fixed chunks, optionally breaking at the end
struct ScriptedClient {
    chunks: Vec<&'static str>,
    break_stream: bool,
}

#[async_trait]
impl ChatClient for ScriptedClient {
    async fn chat_stream(&self, _request: ChatRequest) -> anyhow::Result<EventStream> {
        let mut events: Vec<anyhow::Result<StreamEvent>> = self
            .chunks
            .iter()
            .map(|c| {
                Ok(StreamEvent::Message {
                    content: c.to_string(),
                })
            })
            .collect();
        events.push(if self.break_stream {
            Err(anyhow::anyhow!("connection reset"))
        } else {
            Ok(StreamEvent::Done {
                finish_reason: Some("stop".to_string()),
            })
        });
        Ok(Box::pin(futures::stream::iter(events)))
    }
}

struct Server {
    addr: SocketAddr,
    db_path: PathBuf,
}

impl Drop for Server {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm"] {
            let mut file = self.db_path.clone().into_os_string();
            file.push(suffix);
            let _ = std::fs::remove_file(file);
        }
    }
}

impl Server {
    fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

fn config(persist_turns: bool) -> Config {
    let toml = format!(
        r#"
        [server]
        host = "127.0.0.1"
        port = 0

        [cors]
        enabled = true
        origins = ["*"]

        [database]
        path = "unused.db"
        pool_size = 2
        busy_timeout_ms = 1000

        [llm]
        model = "gpt-4o-mini"

        [chat]
        persist_turns = {persist_turns}

        [logging]
        level = "debug"
        format = "pretty"
        "#
    );
    toml::from_str(&toml).unwrap()
}

async fn spawn_server(provider: ScriptedClient, persist_turns: bool) -> Server {
    let db_path = std::env::temp_dir().join(format!(
        "threadchat_client_test_{}.db",
        uuid::Uuid::new_v4()
    ));
    let persist = PersistClient::builder()
        .path(&db_path)
        .pool_size(2)
        .build()
        .unwrap();
    let state = Arc::new(AppState::new(
        config(persist_turns),
        Arc::new(persist),
        CompletionGateway::new(Arc::new(provider)),
    ));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, build_router(state)).await.unwrap();
    });

    Server { addr, db_path }
}

async fn connect(server: &Server) -> ChatSession<ApiClient> {
    let client = ApiClient::new(server.url()).unwrap();
    let health = client.health().await.unwrap();
    let mut session = ChatSession::new(client).with_server_persistence(health.persist_turns);
    session.bootstrap().await.unwrap();
    session
}

#[tokio::test]
async fn test_turn_is_saved_once_when_server_persists() {
    let server = spawn_server(
        ScriptedClient {
            chunks: vec!["Hello", " there"],
            break_stream: false,
        },
        true,
    )
    .await;
    let mut session = connect(&server).await;
    assert!(session.server_persistence());
    let thread_id = session.selected_thread().unwrap().id.clone();

    let outcome = session.submit("Hi", |_| {}).await.unwrap();
    assert_eq!(outcome.reply, "Hello there");
    assert!(outcome.persist_error.is_none());

    let stored = session.backend().list_messages(&thread_id).await.unwrap();
    let stored: Vec<_> = stored.iter().map(|m| (m.role, m.content.as_str())).collect();
    assert_eq!(
        stored,
        vec![
            (MessageRole::User, "Hi"),
            (MessageRole::Assistant, "Hello there"),
        ]
    );
    assert_eq!(session.messages().len(), 2);
    assert_eq!(*session.state(), TurnState::Idle);
}

#[tokio::test]
async fn test_client_saves_turn_when_server_does_not() {
    let server = spawn_server(
        ScriptedClient {
            chunks: vec!["Sure"],
            break_stream: false,
        },
        false,
    )
    .await;
    let mut session = connect(&server).await;
    assert!(!session.server_persistence());
    let thread_id = session.selected_thread().unwrap().id.clone();

    session.submit("Hi", |_| {}).await.unwrap();

    let stored = session.backend().list_messages(&thread_id).await.unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[1].content, "Sure");
}

#[tokio::test]
async fn test_break_before_first_chunk_is_a_stream_error() {
    let server = spawn_server(
        ScriptedClient {
            chunks: vec![],
            break_stream: true,
        },
        true,
    )
    .await;
    let mut session = connect(&server).await;
    let thread_id = session.selected_thread().unwrap().id.clone();

    let err = session.submit("Hi", |_| {}).await.unwrap_err();

    assert!(matches!(err, ClientError::Stream(_)), "got {err:?}");
    assert!(matches!(session.state(), TurnState::Error(_)));
    let stored = session.backend().list_messages(&thread_id).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].role, MessageRole::User);
}
