//! Content indexer: markdown tree → JSON artifact.
//!
//! Coordinates the one-shot build flow: discovery → frontmatter split →
//! title/module/chapter resolution → record assembly → atomic write.
//!
//! A file that cannot be read (or that collides with an earlier id) is
//! recorded as a [`FileFailure`] and the run continues with the remaining
//! files. In strict mode the first such failure aborts the run instead.
//! Either way the artifact is written through a temporary sibling file and
//! renamed into place, so a failed run never leaves a partial artifact.

use aibook_core::frontmatter::split_frontmatter;
use aibook_core::models::ContentRecord;
use aibook_core::resolve::{resolve, ModuleCatalog};
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::{Config, ContentConfig};
use crate::error::{FileFailure, FileFailureKind};
use crate::loader::{discover_markdown, MarkdownFile};
use crate::progress::{IndexProgressEvent, IndexProgressReporter, NoProgress};

/// Outcome of an index run.
#[derive(Debug, Default)]
pub struct IndexReport {
    /// Records in artifact order.
    pub records: Vec<ContentRecord>,
    /// Files that produced no record.
    pub failures: Vec<FileFailure>,
    /// Non-fatal problems with files that still produced a record.
    pub warnings: Vec<String>,
}

/// Per-run switches, usually from the CLI.
#[derive(Debug, Clone, Default)]
pub struct IndexOptions {
    pub root: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub strict: bool,
    pub dry_run: bool,
}

/// Build a record for one file.
///
/// Returns the record plus a warning when the frontmatter block was
/// present but unreadable.
pub fn index_file(
    file: &MarkdownFile,
    catalog: &ModuleCatalog,
) -> std::result::Result<(ContentRecord, Option<String>), FileFailureKind> {
    let text = std::fs::read_to_string(&file.path)?;
    let parsed = split_frontmatter(&text);

    let warning = parsed
        .error
        .as_ref()
        .map(|e| format!("{}: frontmatter ignored: {}", file.relative_path, e));

    let resolved = resolve(&file.relative_path, &parsed.metadata, &parsed.body, catalog);
    let record = ContentRecord::new(
        ContentRecord::id_for(&file.relative_path),
        resolved.title,
        parsed.body,
        resolved.module,
        resolved.chapter,
    );
    Ok((record, warning))
}

/// Discover and index every markdown file below `content.root`.
pub fn build_index(
    content: &ContentConfig,
    catalog: &ModuleCatalog,
    strict: bool,
    reporter: &dyn IndexProgressReporter,
) -> Result<IndexReport> {
    reporter.report(IndexProgressEvent::Discovering {
        root: content.root.display().to_string(),
    });
    let files = discover_markdown(content)?;
    let total = files.len() as u64;

    let mut report = IndexReport::default();
    let mut seen: HashMap<String, String> = HashMap::new();

    for (i, file) in files.iter().enumerate() {
        let outcome = index_file(file, catalog).and_then(|(record, warning)| {
            match seen.get(&record.id) {
                Some(first) => Err(FileFailureKind::DuplicateId {
                    id: record.id.clone(),
                    first: first.clone(),
                }),
                None => Ok((record, warning)),
            }
        });

        match outcome {
            Ok((record, warning)) => {
                if let Some(w) = warning {
                    tracing::warn!("{}", w);
                    report.warnings.push(w);
                }
                seen.insert(record.id.clone(), file.relative_path.clone());
                report.records.push(record);
            }
            Err(kind) => {
                let failure = FileFailure {
                    relative_path: file.relative_path.clone(),
                    path: file.path.clone(),
                    kind,
                };
                if strict {
                    return Err(anyhow::Error::new(failure).context("index aborted (strict mode)"));
                }
                tracing::warn!(error = %failure, "skipping file");
                report.failures.push(failure);
            }
        }

        reporter.report(IndexProgressEvent::Indexing {
            n: i as u64 + 1,
            total,
        });
    }

    Ok(report)
}

/// Serialize `records` and atomically replace the artifact at `path`.
pub fn write_artifact(path: &Path, records: &[ContentRecord], pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(records)?
    } else {
        serde_json::to_string(records)?
    };

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent)
        .with_context(|| format!("Failed to create {}", parent.display()))?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "book-content.json".to_string());
    let tmp_path = parent.join(format!(".{}.tmp-{}", file_name, std::process::id()));

    let written = (|| -> std::io::Result<()> {
        let mut tmp = std::fs::File::create(&tmp_path)?;
        tmp.write_all(json.as_bytes())?;
        tmp.sync_all()?;
        std::fs::rename(&tmp_path, path)
    })();

    if let Err(e) = written {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(e).with_context(|| format!("Failed to write {}", path.display()));
    }
    Ok(())
}

/// Run `aibook index`: build, write, and print a summary.
pub fn run_index(
    config: &Config,
    opts: &IndexOptions,
    reporter: &dyn IndexProgressReporter,
) -> Result<IndexReport> {
    let mut content = config.content.clone();
    if let Some(root) = &opts.root {
        content.root = root.clone();
    }
    let output = opts
        .output
        .clone()
        .unwrap_or_else(|| config.output.path.clone());
    let strict = opts.strict || config.index.strict;
    let catalog = config.modules.catalog()?;

    let report = build_index(&content, &catalog, strict, reporter)?;

    tracing::info!(
        count = report.records.len(),
        "Processed {} documentation files",
        report.records.len()
    );

    if opts.dry_run {
        println!("index {} (dry-run)", content.root.display());
    } else {
        write_artifact(&output, &report.records, config.output.pretty)?;
        println!("index {}", content.root.display());
    }
    println!("  processed: {} files", report.records.len());
    println!("  failed: {}", report.failures.len());
    for failure in &report.failures {
        println!("    {}", failure);
    }
    println!("  warnings: {}", report.warnings.len());
    for warning in &report.warnings {
        println!("    {}", warning);
    }
    if !opts.dry_run {
        println!("  output: {}", output.display());
    }
    println!("ok");

    Ok(report)
}

/// [`build_index`] with no progress output, for callers that only need
/// the records.
pub fn collect_records(content: &ContentConfig, catalog: &ModuleCatalog) -> Result<IndexReport> {
    build_index(content, catalog, false, &NoProgress)
}
