use std::collections::HashSet;
use std::path::PathBuf;

use threadchat_persist::{MessageRole, PersistClient, PersistError, PersistenceClient};

struct TempDb {
    path: PathBuf,
}

impl TempDb {
    fn new() -> Self {
        let path =
            std::env::temp_dir().join(format!("threadchat_test_{}.db", uuid::Uuid::new_v4()));
        Self { path }
    }

    fn client(&self) -> PersistClient {
        PersistClient::builder()
            .path(&self.path)
            .pool_size(2)
            .build()
            .unwrap()
    }
}

impl Drop for TempDb {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm"] {
            let mut file = self.path.clone().into_os_string();
            file.push(suffix);
            let _ = std::fs::remove_file(file);
        }
    }
}

#[test]
fn test_create_thread_trims_title_and_assigns_id() {
    let db = TempDb::new();
    let client = db.client();

    let thread = client.threads().create("  Trip planning  ").unwrap();

    assert_eq!(thread.title, "Trip planning");
    assert!(!thread.id.is_empty());
    assert!(thread.created_at > 0);

    let fetched = client.threads().get(&thread.id).unwrap().unwrap();
    assert_eq!(fetched, thread);
}

#[test]
fn test_list_threads_newest_first() {
    let db = TempDb::new();
    let client = db.client();

    let first = client.threads().create("first").unwrap();
    let second = client.threads().create("second").unwrap();
    let third = client.threads().create("third").unwrap();

    let ids: Vec<String> = client
        .threads()
        .list()
        .unwrap()
        .into_iter()
        .map(|t| t.id)
        .collect();

    assert_eq!(ids, vec![third.id, second.id, first.id]);
}

#[test]
fn test_get_unknown_thread_is_none() {
    let db = TempDb::new();
    let client = db.client();

    assert!(client.threads().get("missing").unwrap().is_none());
}

#[test]
fn test_update_title() {
    let db = TempDb::new();
    let client = db.client();
    let thread = client.threads().create("New Chat").unwrap();

    assert!(client.threads().update_title(&thread.id, " Renamed ").unwrap());
    assert_eq!(
        client.threads().get(&thread.id).unwrap().unwrap().title,
        "Renamed"
    );

    assert!(!client.threads().update_title("missing", "x").unwrap());
    assert_eq!(client.threads().list().unwrap().len(), 1);
}

#[test]
fn test_messages_in_insertion_order() {
    let db = TempDb::new();
    let client = db.client();
    let thread = client.threads().create("t").unwrap();

    for i in 0..5 {
        let role = if i % 2 == 0 {
            MessageRole::User
        } else {
            MessageRole::Assistant
        };
        client
            .messages()
            .create(&thread.id, role, &format!("message {i}"))
            .unwrap();
    }

    let messages = client.messages().list_by_thread(&thread.id).unwrap();
    let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();

    assert_eq!(
        contents,
        vec!["message 0", "message 1", "message 2", "message 3", "message 4"]
    );
    assert_eq!(messages[1].role, MessageRole::Assistant);
    assert!(messages.iter().all(|m| m.thread_id == thread.id));
}

#[test]
fn test_message_content_stored_verbatim() {
    let db = TempDb::new();
    let client = db.client();
    let thread = client.threads().create("t").unwrap();
    let content = "  line one\n\n```rust\nfn main() {}\n```\n  ";

    client
        .messages()
        .create(&thread.id, MessageRole::User, content)
        .unwrap();

    let messages = client.messages().list_by_thread(&thread.id).unwrap();
    assert_eq!(messages[0].content, content);
}

#[test]
fn test_message_for_unknown_thread_rejected() {
    let db = TempDb::new();
    let client = db.client();

    let err = client
        .messages()
        .create("missing", MessageRole::User, "hi")
        .unwrap_err();

    assert!(matches!(err, PersistError::ThreadNotFound(id) if id == "missing"));
    assert!(client.messages().list_by_thread("missing").unwrap().is_empty());
}

#[test]
fn test_messages_isolated_per_thread() {
    let db = TempDb::new();
    let client = db.client();
    let a = client.threads().create("a").unwrap();
    let b = client.threads().create("b").unwrap();

    client.messages().create(&a.id, MessageRole::User, "for a").unwrap();
    client.messages().create(&b.id, MessageRole::User, "for b").unwrap();

    let in_a = client.messages().list_by_thread(&a.id).unwrap();
    assert_eq!(in_a.len(), 1);
    assert_eq!(in_a[0].content, "for a");
}

#[test]
fn test_interleaved_writes_keep_per_thread_order() {
    let db = TempDb::new();
    let client = db.client();
    let a = client.threads().create("a").unwrap();
    let b = client.threads().create("b").unwrap();

    for (thread, content) in [(&a, "A1"), (&b, "B1"), (&a, "A2"), (&b, "B2"), (&a, "A3")] {
        client
            .messages()
            .create(&thread.id, MessageRole::User, content)
            .unwrap();
    }

    let in_a: Vec<String> = client
        .messages()
        .list_by_thread(&a.id)
        .unwrap()
        .into_iter()
        .map(|m| m.content)
        .collect();
    assert_eq!(in_a, vec!["A1", "A2", "A3"]);

    let in_b: Vec<String> = client
        .messages()
        .list_by_thread(&b.id)
        .unwrap()
        .into_iter()
        .map(|m| m.content)
        .collect();
    assert_eq!(in_b, vec!["B1", "B2"]);
}

#[test]
fn test_ids_are_unique() {
    let db = TempDb::new();
    let client = db.client();

    let thread_ids: HashSet<String> = (0..50)
        .map(|i| client.threads().create(&format!("t{i}")).unwrap().id)
        .collect();
    assert_eq!(thread_ids.len(), 50);

    let thread = client.threads().create("busy").unwrap();
    let message_ids: HashSet<String> = (0..50)
        .map(|i| {
            client
                .messages()
                .create(&thread.id, MessageRole::User, &format!("m{i}"))
                .unwrap()
                .id
        })
        .collect();
    assert_eq!(message_ids.len(), 50);
    assert!(!thread_ids.contains(&thread.id));
}

#[test]
fn test_delete_thread_cascades_to_messages() {
    let db = TempDb::new();
    let client = db.client();
    let thread = client.threads().create("t").unwrap();
    client.messages().create(&thread.id, MessageRole::User, "hi").unwrap();
    client
        .messages()
        .create(&thread.id, MessageRole::Assistant, "hello")
        .unwrap();

    assert!(client.threads().delete(&thread.id).unwrap());

    assert!(client.threads().get(&thread.id).unwrap().is_none());
    assert!(client.messages().list_by_thread(&thread.id).unwrap().is_empty());

    let conn = client.pool().get().unwrap();
    let orphaned: i64 = conn
        .query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))
        .unwrap();
    assert_eq!(orphaned, 0);
}

#[test]
fn test_delete_unknown_thread_reports_false() {
    let db = TempDb::new();
    let client = db.client();
    let kept = client.threads().create("kept").unwrap();

    assert!(!client.threads().delete("missing").unwrap());
    assert_eq!(client.threads().list().unwrap(), vec![kept]);
}

#[test]
fn test_delete_messages_keeps_thread() {
    let db = TempDb::new();
    let client = db.client();
    let thread = client.threads().create("t").unwrap();
    client.messages().create(&thread.id, MessageRole::User, "hi").unwrap();

    assert!(client.messages().delete_by_thread(&thread.id).unwrap());
    assert!(!client.messages().delete_by_thread(&thread.id).unwrap());

    assert!(client.threads().get(&thread.id).unwrap().is_some());
    assert!(client.messages().list_by_thread(&thread.id).unwrap().is_empty());
}

#[test]
fn test_data_survives_reopen() {
    let db = TempDb::new();
    let thread_id = {
        let client = db.client();
        let thread = client.threads().create("durable").unwrap();
        client
            .messages()
            .create(&thread.id, MessageRole::User, "remember me")
            .unwrap();
        thread.id
    };

    let reopened = db.client();
    let messages = reopened.messages().list_by_thread(&thread_id).unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].content, "remember me");
}

#[tokio::test]
async fn test_async_client_round_trip() {
    let db = TempDb::new();
    let client = db.client();

    client.ping().await.unwrap();

    let thread = client.create_thread("New Chat").await.unwrap();
    client
        .create_message(&thread.id, MessageRole::User, "What is Rust?")
        .await
        .unwrap();
    assert!(client
        .update_thread_title(&thread.id, "What is Rust?")
        .await
        .unwrap());

    let threads = client.list_threads().await.unwrap();
    assert_eq!(threads.len(), 1);
    assert_eq!(threads[0].title, "What is Rust?");

    let messages = client.get_messages(&thread.id).await.unwrap();
    assert_eq!(messages.len(), 1);

    let err = client
        .create_message("missing", MessageRole::Assistant, "x")
        .await
        .unwrap_err();
    assert!(matches!(err, PersistError::ThreadNotFound(_)));

    assert!(client.delete_thread(&thread.id).await.unwrap());
    assert!(client.get_thread(&thread.id).await.unwrap().is_none());
    assert!(!client.delete_messages(&thread.id).await.unwrap());
}
