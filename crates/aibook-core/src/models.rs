//! Core data models shared by the indexer, the lookup utility, the preview
//! server and the chat client.
//!
//! [`ContentRecord`] is the unit written to the JSON artifact. The chat
//! types mirror the wire contract of the remote RAG endpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// URL prefix under which the static site routes documentation pages.
pub const DOCS_ROUTE_PREFIX: &str = "/docs/";

/// One normalized, indexable documentation page.
///
/// Field order is the order the artifact is serialized in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRecord {
    pub id: String,
    pub title: String,
    pub content: String,
    pub module: String,
    pub chapter: String,
    pub path: String,
}

impl ContentRecord {
    /// Build a record, deriving `path` from `id`.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
        module: impl Into<String>,
        chapter: impl Into<String>,
    ) -> Self {
        let id = id.into();
        let path = format!("{}{}", DOCS_ROUTE_PREFIX, id);
        Self {
            id,
            title: title.into(),
            content: content.into(),
            module: module.into(),
            chapter: chapter.into(),
            path,
        }
    }

    /// Derive a record id from a path relative to the content root.
    ///
    /// Backslashes are normalized to `/` and the final extension of the
    /// last segment is stripped. Dots in directory names are left alone.
    ///
    /// ```rust
    /// use aibook_core::models::ContentRecord;
    ///
    /// assert_eq!(ContentRecord::id_for("module-3\\3.2-perception.md"), "module-3/3.2-perception");
    /// assert_eq!(ContentRecord::id_for("intro.mdx"), "intro");
    /// ```
    pub fn id_for(relative_path: &str) -> String {
        let normalized = relative_path.replace('\\', "/");
        let (dir, file) = match normalized.rfind('/') {
            Some(pos) => (&normalized[..=pos], &normalized[pos + 1..]),
            None => ("", normalized.as_str()),
        };
        let stem = match file.rfind('.') {
            Some(pos) if pos > 0 => &file[..pos],
            _ => file,
        };
        format!("{}{}", dir, stem)
    }
}

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A message in an in-memory chat session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub content: String,
    pub role: Role,
    pub timestamp: DateTime<Utc>,
    /// Only set on assistant replies produced by a successful call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citations: Option<Vec<String>>,
}

/// Request body sent to the chat endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub query: String,
    pub use_selected_text: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_text: Option<String>,
}

impl ChatRequest {
    /// Build a request payload.
    ///
    /// The selection only scopes the request when `use_selected_text_only`
    /// is set and the selection is non-blank; otherwise it is left out of
    /// the payload entirely.
    pub fn new(
        query: impl Into<String>,
        use_selected_text_only: bool,
        selected_text: Option<&str>,
    ) -> Self {
        let selected = selected_text
            .filter(|s| !s.trim().is_empty())
            .filter(|_| use_selected_text_only)
            .map(str::to_string);
        Self {
            query: query.into(),
            use_selected_text: selected.is_some(),
            selected_text: selected,
        }
    }
}

/// Reply body returned by the chat endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    pub response: String,
    #[serde(default)]
    pub citations: Vec<String>,
}
