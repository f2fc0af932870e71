//! # aibook core
//!
//! Shared, I/O-free logic for the book tooling: content record and chat
//! message models, frontmatter splitting, title/module/chapter resolution,
//! and case-insensitive content filtering.
//!
//! This crate contains no tokio, reqwest, filesystem I/O, or other
//! native-only dependencies. Everything here is a pure function of its
//! inputs, which keeps the indexer's resolution rules testable without
//! touching the disk.

pub mod frontmatter;
pub mod models;
pub mod resolve;
pub mod search;
