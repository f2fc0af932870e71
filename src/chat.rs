//! Chat client for the book's RAG endpoint.
//!
//! A [`ChatSession`] owns one in-memory conversation. Each submission
//! appends exactly one user message, sends one request, and appends exactly
//! one assistant message when the request resolves: the reply on success,
//! the fixed [`APOLOGY_MESSAGE`] on any failure (the error itself is only
//! logged).
//!
//! ```text
//! Idle ──submit──▶ Sending ──reply──▶ Success ─┐
//!                     │                        ├──▶ Idle
//!                     └────error────▶ Failure ─┘
//! ```
//!
//! While `Sending`, further submissions are refused with
//! [`SubmitError::Busy`]. Underneath, the [`ConversationLog`] tags every
//! request with a sequence number and only applies the reply to the most
//! recent one, so a late reply can never land after a newer question even
//! if a caller drives the log directly.

use aibook_core::models::{ChatMessage, ChatReply, ChatRequest, Role};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

use crate::config::ChatConfig;
use crate::error::{ChatError, SubmitError};
use crate::selection::{SelectionHub, SelectionSlot, SelectionSubscription};

pub const APOLOGY_MESSAGE: &str =
    "Sorry, I encountered an error processing your request. Please try again in a moment.";

// ═══════════════════════════════════════════════════════════════════════
// Transport
// ═══════════════════════════════════════════════════════════════════════

/// One request/response exchange with a chat backend.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(&self, request: &ChatRequest) -> Result<ChatReply, ChatError>;
}

/// JSON-over-HTTP transport to a fixed endpoint.
///
/// Any non-2xx status is a failure; the body of an error response is not
/// inspected.
pub struct HttpChatTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpChatTransport {
    pub fn new(endpoint: impl Into<String>, timeout: Option<Duration>) -> Result<Self, ChatError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            endpoint: endpoint.into(),
        })
    }

    pub fn from_config(config: &ChatConfig) -> Result<Self, ChatError> {
        Self::new(
            config.endpoint.clone(),
            config.timeout_secs.map(Duration::from_secs),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ChatTransport for HttpChatTransport {
    async fn send(&self, request: &ChatRequest) -> Result<ChatReply, ChatError> {
        let resp = self.client.post(&self.endpoint).json(request).send().await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ChatError::Status(status.as_u16()));
        }

        let bytes = resp.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ChatError::Decode(e.to_string()))
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Conversation log
// ═══════════════════════════════════════════════════════════════════════

/// Time-derived message ids, strictly increasing within a session.
#[derive(Debug, Default)]
struct MessageIds {
    last: i64,
}

impl MessageIds {
    fn next(&mut self, now: DateTime<Utc>) -> String {
        let millis = now.timestamp_millis();
        self.last = if millis > self.last { millis } else { self.last + 1 };
        self.last.to_string()
    }
}

/// Handle for a request issued through [`ConversationLog::ask`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    seq: u64,
}

impl Ticket {
    pub fn seq(&self) -> u64 {
        self.seq
    }
}

/// Append-only message list with request fencing.
#[derive(Debug, Default)]
pub struct ConversationLog {
    messages: Vec<ChatMessage>,
    ids: MessageIds,
    latest_seq: u64,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Append an assistant message that answers no request (e.g. a greeting).
    pub fn announce(&mut self, content: impl Into<String>) {
        self.push(Role::Assistant, content.into(), None);
    }

    /// Append the user's question and issue a ticket for its reply.
    pub fn ask(&mut self, query: impl Into<String>) -> Ticket {
        self.push(Role::User, query.into(), None);
        self.latest_seq += 1;
        Ticket {
            seq: self.latest_seq,
        }
    }

    /// Whether `ticket` is the most recently issued one.
    pub fn is_current(&self, ticket: Ticket) -> bool {
        ticket.seq == self.latest_seq
    }

    /// Apply the outcome for `ticket`.
    ///
    /// Returns `None` (and appends nothing) when a newer ticket has been
    /// issued since; that reply is stale.
    pub fn resolve(
        &mut self,
        ticket: Ticket,
        outcome: Result<ChatReply, ChatError>,
    ) -> Option<&ChatMessage> {
        if !self.is_current(ticket) {
            tracing::warn!(
                seq = ticket.seq,
                latest = self.latest_seq,
                "discarding stale chat reply"
            );
            return None;
        }

        match outcome {
            Ok(reply) => self.push(Role::Assistant, reply.response, Some(reply.citations)),
            Err(e) => {
                tracing::warn!(error = %e, "chat request failed");
                self.push(Role::Assistant, APOLOGY_MESSAGE.to_string(), None)
            }
        }
        self.messages.last()
    }

    fn push(&mut self, role: Role, content: String, citations: Option<Vec<String>>) {
        let now = Utc::now();
        self.messages.push(ChatMessage {
            id: self.ids.next(now),
            content,
            role,
            timestamp: now,
            citations,
        });
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Session
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatState {
    Idle,
    Sending,
}

/// How a submission resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOutcome {
    Success,
    Failure,
    /// Superseded by a newer request; nothing was appended.
    Stale,
}

/// A request that has been recorded but not yet resolved.
#[derive(Debug)]
pub struct PendingQuery {
    ticket: Ticket,
    request: ChatRequest,
}

impl PendingQuery {
    pub fn request(&self) -> &ChatRequest {
        &self.request
    }

    pub fn ticket(&self) -> Ticket {
        self.ticket
    }
}

/// One chat widget instance.
pub struct ChatSession<T: ChatTransport> {
    transport: T,
    log: ConversationLog,
    state: ChatState,
    selected_text_mode: bool,
    selection: Arc<SelectionSlot>,
    subscription: Option<SelectionSubscription>,
}

impl ChatSession<HttpChatTransport> {
    /// Session against the configured endpoint, greeting included.
    pub fn from_config(config: &ChatConfig) -> Result<Self, ChatError> {
        let transport = HttpChatTransport::from_config(config)?;
        Ok(Self::new(transport, config.greeting.as_deref()))
    }
}

impl<T: ChatTransport> ChatSession<T> {
    pub fn new(transport: T, greeting: Option<&str>) -> Self {
        let mut log = ConversationLog::new();
        if let Some(greeting) = greeting.filter(|g| !g.trim().is_empty()) {
            log.announce(greeting);
        }
        Self {
            transport,
            log,
            state: ChatState::Idle,
            selected_text_mode: false,
            selection: Arc::new(SelectionSlot::new()),
            subscription: None,
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        self.log.messages()
    }

    pub fn state(&self) -> ChatState {
        self.state
    }

    pub fn is_pending(&self) -> bool {
        self.state == ChatState::Sending
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    // ── selection ────────────────────────────────────────────────────

    /// Start tracking selections published on `hub`.
    ///
    /// Re-mounting replaces the previous registration.
    pub fn mount(&mut self, hub: &SelectionHub) {
        self.subscription = Some(hub.subscribe(self.selection.clone()));
    }

    /// Stop tracking selections and forget the current one.
    pub fn unmount(&mut self) {
        self.subscription = None;
        self.selection.clear();
    }

    pub fn is_mounted(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn selected_text(&self) -> Option<String> {
        self.selection.get()
    }

    pub fn selected_text_mode(&self) -> bool {
        self.selected_text_mode
    }

    pub fn toggle_selected_text_mode(&mut self) -> bool {
        self.selected_text_mode = !self.selected_text_mode;
        self.selected_text_mode
    }

    // ── submission ───────────────────────────────────────────────────

    /// Record the question and move to `Sending`.
    pub fn begin(
        &mut self,
        text: &str,
        use_selected_text_only: bool,
        selected_text: Option<&str>,
    ) -> Result<PendingQuery, SubmitError> {
        if text.trim().is_empty() {
            return Err(SubmitError::EmptyQuery);
        }
        if self.state == ChatState::Sending {
            return Err(SubmitError::Busy);
        }

        let request = ChatRequest::new(text, use_selected_text_only, selected_text);
        let ticket = self.log.ask(text);
        self.state = ChatState::Sending;
        Ok(PendingQuery { ticket, request })
    }

    /// Apply the outcome of `pending` and return to `Idle`.
    pub fn finish(
        &mut self,
        pending: PendingQuery,
        outcome: Result<ChatReply, ChatError>,
    ) -> QueryOutcome {
        let succeeded = outcome.is_ok();
        let applied = self.log.resolve(pending.ticket, outcome).is_some();
        self.state = ChatState::Idle;
        match (applied, succeeded) {
            (false, _) => QueryOutcome::Stale,
            (true, true) => QueryOutcome::Success,
            (true, false) => QueryOutcome::Failure,
        }
    }

    /// Send `text`, optionally scoped to `selected_text`.
    pub async fn submit_query(
        &mut self,
        text: &str,
        use_selected_text_only: bool,
        selected_text: Option<&str>,
    ) -> Result<QueryOutcome, SubmitError> {
        let pending = self.begin(text, use_selected_text_only, selected_text)?;
        tracing::debug!(
            seq = pending.ticket().seq(),
            scoped = pending.request().use_selected_text,
            "sending chat request"
        );
        let outcome = self.transport.send(pending.request()).await;
        Ok(self.finish(pending, outcome))
    }

    /// Send `text` using the session's own mode toggle and tracked selection.
    pub async fn submit(&mut self, text: &str) -> Result<QueryOutcome, SubmitError> {
        let selection = self.selection.get();
        let mode = self.selected_text_mode;
        self.submit_query(text, mode, selection.as_deref()).await
    }
}
