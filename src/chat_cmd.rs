//! `aibook chat`: terminal front-end for [`ChatSession`].
//!
//! With a query argument the command asks once and exits. Without one it
//! reads lines from stdin; lines starting with `/` are commands:
//!
//! | Command | Effect |
//! |---------|--------|
//! | `/select <text>` | publish `<text>` as the current page selection |
//! | `/clear-selection` | publish an empty selection |
//! | `/mode` | toggle selected-text-only mode |
//! | `/status` | show the mode and the tracked selection |
//! | `/quit` | leave |

use aibook_core::models::{ChatMessage, Role};
use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::chat::{ChatSession, ChatTransport, QueryOutcome};
use crate::config::Config;
use crate::error::SubmitError;
use crate::selection::SelectionHub;

/// A parsed REPL line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplInput {
    Ask(String),
    Select(String),
    ClearSelection,
    ToggleMode,
    Status,
    Quit,
    Unknown(String),
    Blank,
}

impl ReplInput {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return ReplInput::Blank;
        }
        let Some(command) = line.strip_prefix('/') else {
            return ReplInput::Ask(line.to_string());
        };
        let (name, rest) = match command.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (command, ""),
        };
        match name {
            "select" => ReplInput::Select(rest.to_string()),
            "clear-selection" => ReplInput::ClearSelection,
            "mode" => ReplInput::ToggleMode,
            "status" => ReplInput::Status,
            "quit" | "exit" => ReplInput::Quit,
            other => ReplInput::Unknown(other.to_string()),
        }
    }
}

/// Run `aibook chat`.
pub async fn run_chat(
    config: &Config,
    query: Option<String>,
    selected_text: Option<String>,
) -> Result<()> {
    let mut session =
        ChatSession::from_config(&config.chat).context("Failed to build chat client")?;
    tracing::debug!(endpoint = %session.transport().endpoint(), "chat session ready");

    match query {
        Some(query) => {
            let scoped = selected_text.is_some();
            let outcome = session
                .submit_query(&query, scoped, selected_text.as_deref())
                .await;
            report_submit(outcome)?;
            if let Some(reply) = session.messages().last() {
                print_message(reply);
            }
            Ok(())
        }
        None => repl(session, selected_text).await,
    }
}

async fn repl<T: ChatTransport>(
    mut session: ChatSession<T>,
    initial_selection: Option<String>,
) -> Result<()> {
    let hub = SelectionHub::new();
    session.mount(&hub);
    if let Some(selection) = initial_selection {
        hub.publish(&selection);
    }

    for message in session.messages() {
        print_message(message);
    }
    println!("(commands: /select <text>, /clear-selection, /mode, /status, /quit)");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        match ReplInput::parse(&line) {
            ReplInput::Blank => {}
            ReplInput::Quit => break,
            ReplInput::Select(text) => {
                hub.publish(&text);
                match session.selected_text() {
                    Some(sel) => println!("selection: {}", sel),
                    None => println!("selection cleared"),
                }
            }
            ReplInput::ClearSelection => {
                hub.publish("");
                println!("selection cleared");
            }
            ReplInput::ToggleMode => {
                session.toggle_selected_text_mode();
                println!("{}", status_line(&session));
            }
            ReplInput::Status => println!("{}", status_line(&session)),
            ReplInput::Unknown(name) => eprintln!("unknown command: /{}", name),
            ReplInput::Ask(text) => {
                let before = session.messages().len();
                match session.submit(&text).await {
                    Ok(_) => {
                        for message in &session.messages()[before..] {
                            if message.role == Role::Assistant {
                                print_message(message);
                            }
                        }
                    }
                    Err(e) => eprintln!("{}", e),
                }
            }
        }
    }

    session.unmount();
    Ok(())
}

fn status_line<T: ChatTransport>(session: &ChatSession<T>) -> String {
    let mode = if session.selected_text_mode() { "on" } else { "off" };
    let selection = match (session.is_mounted(), session.selected_text()) {
        (false, _) => "not tracked".to_string(),
        (true, None) => "none".to_string(),
        (true, Some(text)) => format!("{:?}", text),
    };
    format!("selected-text mode: {}, selection: {}", mode, selection)
}

fn report_submit(outcome: std::result::Result<QueryOutcome, SubmitError>) -> Result<()> {
    match outcome? {
        QueryOutcome::Success => {}
        QueryOutcome::Failure => tracing::debug!("chat request failed, apology shown"),
        QueryOutcome::Stale => tracing::debug!("chat reply superseded"),
    }
    Ok(())
}

fn print_message(message: &ChatMessage) {
    let who = match message.role {
        Role::User => "you",
        Role::Assistant => "assistant",
    };
    println!("{}> {}", who, message.content);
    if let Some(citations) = message.citations.as_deref().filter(|c| !c.is_empty()) {
        println!("  sources:");
        for citation in citations {
            println!("    - {}", citation);
        }
    }
}
