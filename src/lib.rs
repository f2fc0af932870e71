//! # aibook
//!
//! Tooling for the Embodied AI Systems Book site: a build-time content
//! indexer, runtime lookup, a RAG chat client, and a local preview server.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌─────────────┐   ┌──────────────────────┐
//! │  docs/*.md  │──▶│   Indexer   │──▶│ book-content.json    │
//! │  (+ YAML)   │   │ title/module│   │ (artifact)           │
//! └─────────────┘   └─────────────┘   └──────────┬───────────┘
//!                                                │
//!                      ┌─────────────────────────┼───────────────┐
//!                      ▼                         ▼               ▼
//!                 ┌──────────┐            ┌────────────┐   ┌──────────┐
//!                 │  Lookup  │            │  Preview   │◀──│   Chat   │
//!                 │ (search) │            │  server    │   │  client  │
//!                 └──────────┘            └────────────┘   └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! aibook index                    # docs/ → static/book-content.json
//! aibook search "gazebo"          # substring lookup over the artifact
//! aibook serve                    # local /health, /search, /chat
//! aibook chat "What is ROS2?"     # ask the configured endpoint
//! aibook stats                    # per-module breakdown of the artifact
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`loader`] | Markdown discovery under the content root |
//! | [`indexer`] | Record extraction and atomic artifact write |
//! | [`progress`] | Index progress reporting |
//! | [`lookup`] | Artifact fetch and substring search |
//! | [`chat`] | Chat session, transport, and request fencing |
//! | [`selection`] | Page selection events and scoped listeners |
//! | [`chat_cmd`] | Terminal chat front-end |
//! | [`server`] | Local preview HTTP server |
//! | [`stats`] | Artifact statistics |
//! | [`error`] | Typed library errors |
//!
//! Pure logic (frontmatter, title/module/chapter resolution, matching, and
//! the data model) lives in the `aibook-core` crate.

pub mod chat;
pub mod chat_cmd;
pub mod config;
pub mod error;
pub mod indexer;
pub mod loader;
pub mod lookup;
pub mod progress;
pub mod selection;
pub mod server;
pub mod stats;
