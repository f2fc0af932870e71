//! Local preview server.
//!
//! Serves the indexer's artifact to a locally running site and offers a
//! chat endpoint with the same wire contract as the remote RAG service, so
//! the chat client can be exercised end to end without network access.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (status, version, timestamp) |
//! | `GET`  | `/book-content.json` | The artifact as loaded at startup |
//! | `GET`  | `/search?q=&limit=` | Case-insensitive substring lookup |
//! | `POST` | `/chat` | `{query, use_selected_text, selected_text?}` → `{response, citations}` |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "query must not be empty" } }
//! ```
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so the site's dev server
//! on another port can call it from the browser.

use aibook_core::models::{ChatReply, ChatRequest, ContentRecord};
use aibook_core::search::{filter_records, match_any_term};
use anyhow::Context;
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;

/// Upper bound on `query` length accepted by `/chat`.
pub const MAX_QUERY_CHARS: usize = 1000;

const MAX_SOURCES: usize = 5;
const CONTEXT_SOURCES: usize = 3;
const MIN_TERM_CHARS: usize = 3;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    records: Arc<Vec<ContentRecord>>,
}

/// Build the router over an already loaded artifact.
pub fn router(records: Vec<ContentRecord>) -> Router {
    let state = AppState {
        records: Arc::new(records),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/book-content.json", get(handle_content))
        .route("/search", get(handle_search))
        .route("/chat", post(handle_chat))
        .layer(cors)
        .with_state(state)
}

/// Starts the preview server on `[server].bind`.
///
/// Fails if the artifact cannot be read; run `aibook index` first.
pub async fn run_server(config: &Config, artifact: Option<&Path>) -> anyhow::Result<()> {
    let artifact = artifact.unwrap_or(config.output.path.as_path());
    let text = std::fs::read_to_string(artifact).with_context(|| {
        format!(
            "Failed to read artifact {} (run `aibook index` first)",
            artifact.display()
        )
    })?;
    let records: Vec<ContentRecord> = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse artifact {}", artifact.display()))?;

    tracing::info!(
        records = records.len(),
        artifact = %artifact.display(),
        "loaded book content"
    );

    let app = router(records);
    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind))?;

    println!("Preview server listening on http://{}", config.server.bind);
    axum::serve(listener, app).await?;
    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    timestamp: DateTime<Utc>,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
    })
}

// ============ GET /book-content.json ============

async fn handle_content(State(state): State<AppState>) -> Json<Vec<ContentRecord>> {
    Json(state.records.as_ref().clone())
}

// ============ GET /search ============

#[derive(Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: String,
    limit: Option<usize>,
}

async fn handle_search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Json<Vec<ContentRecord>> {
    let mut hits = filter_records(state.records.as_ref().clone(), &params.q);
    if let Some(limit) = params.limit {
        hits.truncate(limit);
    }
    Json(hits)
}

// ============ POST /chat ============

#[derive(Serialize)]
struct ChatResponseBody {
    response: String,
    citations: Vec<String>,
    query: String,
    timestamp: DateTime<Utc>,
}

async fn handle_chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponseBody>, AppError> {
    let Json(request) = payload.map_err(|rejection| bad_request(rejection.body_text()))?;
    let len = request.query.chars().count();
    if request.query.trim().is_empty() {
        return Err(bad_request("query must not be empty"));
    }
    if len > MAX_QUERY_CHARS {
        return Err(bad_request(format!(
            "query must be at most {} characters (got {})",
            MAX_QUERY_CHARS, len
        )));
    }

    tracing::info!(query = %truncate_chars(&request.query, 50), "chat query");
    let reply = answer_locally(&state.records, &request);

    Ok(Json(ChatResponseBody {
        response: reply.response,
        citations: reply.citations,
        query: request.query,
        timestamp: Utc::now(),
    }))
}

/// Answer a chat request from the artifact alone.
///
/// Selected-text requests with a non-blank selection are answered from the
/// selection. Otherwise the first records (in artifact order) mentioning
/// any query term are cited.
pub fn answer_locally(records: &[ContentRecord], request: &ChatRequest) -> ChatReply {
    let selected = request
        .selected_text
        .as_deref()
        .filter(|s| request.use_selected_text && !s.trim().is_empty());
    if let Some(selected) = selected {
        return ChatReply {
            response: format!(
                "Based on the selected text: {}..., here's the answer to your question about '{}'.",
                truncate_chars(selected, 200),
                request.query
            ),
            citations: vec!["Selected Text Only".to_string()],
        };
    }

    let hits: Vec<&ContentRecord> = match_any_term(records, &request.query, MIN_TERM_CHARS)
        .into_iter()
        .take(MAX_SOURCES)
        .collect();

    if hits.is_empty() {
        return ChatReply {
            response: format!(
                "I couldn't find relevant information in the book about '{}'. Please check other chapters or ask a different question.",
                request.query
            ),
            citations: Vec::new(),
        };
    }

    let context = hits
        .iter()
        .take(CONTEXT_SOURCES)
        .map(|r| r.content.trim())
        .collect::<Vec<_>>()
        .join(" ");
    let citations = hits
        .iter()
        .map(|r| format!("Module: {}, Chapter: {}", r.module, r.chapter))
        .collect();

    ChatReply {
        response: format!(
            "Based on the book content: {}..., here's the answer to your question about '{}'.",
            truncate_chars(&context, 500),
            request.query
        ),
        citations,
    }
}

fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records() -> Vec<ContentRecord> {
        vec![
            ContentRecord::new("intro", "Welcome", "An overview.", "Introduction", "intro"),
            ContentRecord::new(
                "module-1/1.1-nodes",
                "Nodes",
                "A node publishes on topics.",
                "Module 1: Robotic Nervous System (ROS 2)",
                "nodes",
            ),
        ]
    }

    #[test]
    fn test_selected_text_answer() {
        let req = ChatRequest::new("What does this mean?", true, Some("QoS profiles"));
        let reply = answer_locally(&records(), &req);
        assert!(reply.response.contains("QoS profiles"));
        assert_eq!(reply.citations, vec!["Selected Text Only"]);
    }

    #[test]
    fn test_blank_selection_falls_back_to_content() {
        let req = ChatRequest {
            query: "What are topics?".to_string(),
            use_selected_text: true,
            selected_text: Some("  ".to_string()),
        };
        let reply = answer_locally(&records(), &req);
        assert_ne!(reply.citations, vec!["Selected Text Only"]);
        assert_eq!(
            reply.citations,
            vec!["Module: Module 1: Robotic Nervous System (ROS 2), Chapter: nodes"]
        );
    }

    #[test]
    fn test_cites_matching_records() {
        let req = ChatRequest::new("What are topics?", false, None);
        let reply = answer_locally(&records(), &req);
        assert_eq!(
            reply.citations,
            vec!["Module: Module 1: Robotic Nervous System (ROS 2), Chapter: nodes"]
        );
        assert!(reply.response.contains("publishes on topics"));
    }

    #[test]
    fn test_no_match_reply() {
        let req = ChatRequest::new("quaternions", false, None);
        let reply = answer_locally(&records(), &req);
        assert!(reply.citations.is_empty());
        assert!(reply.response.contains("couldn't find"));
    }

    #[test]
    fn test_truncate_chars_is_utf8_safe() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("hi", 10), "hi");
    }
}
