//! Runtime lookup over the indexer's artifact.
//!
//! The artifact can be fetched from the running site (`http(s)://` source)
//! or read from disk. Lookups never fail: any fetch, status or parse error
//! is logged and turned into an empty result.

use aibook_core::models::ContentRecord;
use aibook_core::search::filter_records;
use anyhow::{bail, Context, Result};
use std::path::PathBuf;

use crate::config::Config;

/// Where the artifact lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSource {
    Url(String),
    Path(PathBuf),
}

impl ContentSource {
    pub fn parse(source: &str) -> Self {
        if source.starts_with("http://") || source.starts_with("https://") {
            ContentSource::Url(source.to_string())
        } else {
            ContentSource::Path(PathBuf::from(source))
        }
    }
}

impl std::fmt::Display for ContentSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContentSource::Url(url) => write!(f, "{}", url),
            ContentSource::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

async fn load(source: &ContentSource) -> Result<Vec<ContentRecord>> {
    match source {
        ContentSource::Url(url) => {
            let resp = reqwest::get(url).await?;
            if !resp.status().is_success() {
                bail!("fetch {} returned {}", url, resp.status());
            }
            Ok(resp.json::<Vec<ContentRecord>>().await?)
        }
        ContentSource::Path(path) => {
            let text = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            Ok(serde_json::from_str(&text)?)
        }
    }
}

/// All records from `source`, or an empty list if it cannot be loaded.
pub async fn get_book_content(source: &ContentSource) -> Vec<ContentRecord> {
    match load(source).await {
        Ok(records) => records,
        Err(e) => {
            tracing::error!(source = %source, error = %e, "Failed to fetch book content");
            Vec::new()
        }
    }
}

/// Records whose title, content or module contain `query` (any case).
pub async fn search_book_content(source: &ContentSource, query: &str) -> Vec<ContentRecord> {
    filter_records(get_book_content(source).await, query)
}

/// Run `aibook search`.
pub async fn run_search(
    config: &Config,
    query: &str,
    source: Option<String>,
    limit: Option<usize>,
    json: bool,
) -> Result<()> {
    let source = ContentSource::parse(&source.unwrap_or_else(|| config.lookup_source()));
    let mut hits = search_book_content(&source, query).await;
    if let Some(limit) = limit {
        hits.truncate(limit);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&hits)?);
        return Ok(());
    }

    if hits.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, record) in hits.iter().enumerate() {
        println!("{}. {}", i + 1, record.title);
        println!("    module: {}", record.module);
        println!("    chapter: {}", record.chapter);
        println!("    path: {}", record.path);
    }
    Ok(())
}
