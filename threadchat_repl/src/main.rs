mod command;

use anyhow::{Context, Result};
use std::io::Write;
use std::ops::ControlFlow;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use threadchat_client::{ApiClient, ChatSession, HistoryMode};
use threadchat_types::MessageRole;

use command::{Command, HELP};

const DEFAULT_URL: &str = "http://127.0.0.1:3000";

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Quiet by default so log lines do not interleave with streamed text
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let url = std::env::var("THREADCHAT_URL").unwrap_or_else(|_| DEFAULT_URL.to_string());
    let history: HistoryMode = match std::env::var("THREADCHAT_HISTORY") {
        Ok(value) => value.parse().map_err(|e: String| anyhow::anyhow!(e))?,
        Err(_) => HistoryMode::default(),
    };

    let client = ApiClient::new(&url)?;
    let health = client
        .health()
        .await
        .with_context(|| format!("threadchat server not reachable at {}", url))?;

    println!("threadchat {} ({}) at {}", health.version, health.status, url);
    println!("History mode: {}. Type /help for commands.\n", history);
    if health.persist_turns {
        tracing::info!("Server saves chat turns; skipping client-side saves");
    }

    let mut session = ChatSession::new(client)
        .with_history_mode(history)
        .with_server_persistence(health.persist_turns);
    session.bootstrap().await?;
    print_selected(&session);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt(&session)?;
        let Some(line) = lines.next_line().await? else {
            break;
        };

        let command = match Command::parse(&line) {
            Ok(command) => command,
            Err(message) => {
                println!("{}", message);
                continue;
            }
        };

        match run(&mut session, command).await {
            Ok(ControlFlow::Break(())) => break,
            Ok(ControlFlow::Continue(())) => {}
            Err(e) => println!("error: {:#}", e),
        }
    }

    println!("Bye.");
    Ok(())
}

type Session = ChatSession<ApiClient>;

async fn run(session: &mut Session, command: Command) -> Result<ControlFlow<()>> {
    match command {
        Command::Empty => {}
        Command::Help => println!("{}", HELP),
        Command::Quit => return Ok(ControlFlow::Break(())),
        Command::Say(text) => {
            let outcome = session
                .submit(&text, |chunk| {
                    print!("{}", chunk);
                    let _ = std::io::stdout().flush();
                })
                .await?;
            println!("\n");

            if let Some(error) = outcome.persist_error {
                println!("warning: reply was not saved: {}", error);
            }
            if let Some(title) = outcome.title {
                println!("(thread named \"{}\")", title);
            }
        }
        Command::New => {
            session.new_thread().await?;
            print_selected(session);
        }
        Command::List => {
            session.refresh_threads().await?;
            list_threads(session);
        }
        Command::Switch(target) => {
            let id = resolve_thread(session, &target)?;
            session.select_thread(&id).await?;
            print_selected(session);
        }
        Command::Rename(title) => {
            let id = selected_id(session)?;
            session.rename_thread(&id, &title).await?;
            println!("Renamed to \"{}\"", title.trim());
        }
        Command::Delete(target) => {
            let id = match target {
                Some(target) => resolve_thread(session, &target)?,
                None => selected_id(session)?,
            };
            session.delete_thread(&id).await?;
            println!("Deleted {}", id);
            if session.selected_thread().is_none() {
                println!("No thread selected; use /list and /switch, or /new.");
            }
        }
        Command::History => {
            selected_id(session)?;
            for message in session.messages() {
                let who = match message.role {
                    MessageRole::User => "you",
                    MessageRole::Assistant => "assistant",
                };
                println!("[{}] {}\n", who, message.content);
            }
        }
    }
    Ok(ControlFlow::Continue(()))
}

fn prompt(session: &Session) -> Result<()> {
    let title = session
        .selected_thread()
        .map(|t| t.title.as_str())
        .unwrap_or("no thread");
    print!("{}> ", title);
    std::io::stdout().flush()?;
    Ok(())
}

fn print_selected(session: &Session) {
    if let Some(thread) = session.selected_thread() {
        println!(
            "Thread \"{}\" ({} messages)\n",
            thread.title,
            session.messages().len()
        );
    }
}

fn list_threads(session: &Session) {
    let selected = session.selected_thread().map(|t| t.id.clone());
    for (i, thread) in session.threads().iter().enumerate() {
        let marker = if selected.as_deref() == Some(thread.id.as_str()) {
            "*"
        } else {
            " "
        };
        println!("{} {:>2}. {}  [{}]", marker, i + 1, thread.title, thread.id);
    }
}

fn selected_id(session: &Session) -> Result<String> {
    session
        .selected_thread()
        .map(|t| t.id.clone())
        .context("no thread selected")
}

/// Accept a 1-based list number or a thread id.
fn resolve_thread(session: &Session, target: &str) -> Result<String> {
    if let Ok(n) = target.parse::<usize>() {
        return session
            .threads()
            .get(n.wrapping_sub(1))
            .map(|t| t.id.clone())
            .with_context(|| format!("no thread number {}", n));
    }

    session
        .threads()
        .iter()
        .find(|t| t.id == target)
        .map(|t| t.id.clone())
        .with_context(|| format!("no thread with id {}", target))
}
