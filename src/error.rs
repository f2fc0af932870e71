//! Typed errors for the indexer and the chat client.
//!
//! Command entry points wrap these in `anyhow::Error`; the library keeps
//! them typed so callers can tell a per-file failure from a fatal one and
//! a busy session from a transport error.

use std::path::PathBuf;
use thiserror::Error;

/// Why a single content file could not become a record.
#[derive(Error, Debug)]
pub enum FileFailureKind {
    #[error("read failed: {0}")]
    Read(#[from] std::io::Error),

    #[error("duplicate id '{id}' (already produced by {first})")]
    DuplicateId { id: String, first: String },
}

/// A per-file failure, reported without stopping the run.
#[derive(Error, Debug)]
#[error("{relative_path}: {kind}")]
pub struct FileFailure {
    pub relative_path: String,
    pub path: PathBuf,
    #[source]
    pub kind: FileFailureKind,
}

/// Failure of one chat round trip. Never shown to the user verbatim.
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("chat endpoint returned status {0}")]
    Status(u16),

    #[error("could not decode chat reply: {0}")]
    Decode(String),
}

/// Why a submission was refused before anything was sent.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitError {
    #[error("query must not be empty")]
    EmptyQuery,

    #[error("a request is already pending")]
    Busy,
}
