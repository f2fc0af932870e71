//! Markdown discovery under the content root.
//!
//! Walks the root recursively (no depth limit), keeps files with a markdown
//! extension that pass the include/exclude globs, and returns them sorted by
//! their `/`-normalized relative path so the artifact order does not depend
//! on the platform's directory listing order.

use anyhow::{bail, Context, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::ContentConfig;

pub const MARKDOWN_EXTENSIONS: &[&str] = &["md", "mdx", "markdown"];

/// A discovered markdown file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkdownFile {
    pub path: PathBuf,
    /// Path below the root, always `/`-separated.
    pub relative_path: String,
}

/// Discover every markdown file below `content.root`.
///
/// Fails if the root is missing or any directory cannot be read; there is
/// no partial result.
pub fn discover_markdown(content: &ContentConfig) -> Result<Vec<MarkdownFile>> {
    let root = &content.root;
    if !root.exists() {
        bail!("Content root does not exist: {}", root.display());
    }
    if !root.is_dir() {
        bail!("Content root is not a directory: {}", root.display());
    }

    let include_set = build_globset(&content.include_globs)?;
    let exclude_set = build_globset(&content.exclude_globs)?;

    let mut files = Vec::new();

    let walker = WalkDir::new(root).follow_links(content.follow_symlinks);
    for entry in walker {
        let entry = entry.with_context(|| format!("Failed to walk {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        if !is_markdown(path) {
            continue;
        }

        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = normalize(relative);

        if exclude_set.is_match(&rel_str) {
            continue;
        }
        if !include_set.is_match(&rel_str) {
            continue;
        }

        files.push(MarkdownFile {
            path: path.to_path_buf(),
            relative_path: rel_str,
        });
    }

    files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));

    tracing::debug!(root = %root.display(), count = files.len(), "discovered markdown files");
    Ok(files)
}

pub fn is_markdown(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            MARKDOWN_EXTENSIONS
                .iter()
                .any(|m| e.eq_ignore_ascii_case(m))
        })
        .unwrap_or(false)
}

fn normalize(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Globs match case-insensitively, like [`is_markdown`].
fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .with_context(|| format!("Invalid glob: {}", pattern))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn content(root: &Path) -> ContentConfig {
        ContentConfig {
            root: root.to_path_buf(),
            ..Default::default()
        }
    }

    #[test]
    fn test_recursive_sorted_discovery() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("module-2/deep/deeper")).unwrap();
        fs::create_dir_all(root.join("module-1")).unwrap();
        fs::write(root.join("module-2/2.1-gazebo.md"), "g").unwrap();
        fs::write(root.join("module-2/deep/deeper/notes.mdx"), "n").unwrap();
        fs::write(root.join("module-1/1.1-nodes.md"), "n").unwrap();
        fs::write(root.join("intro.md"), "i").unwrap();
        fs::write(root.join("diagram.png"), "x").unwrap();
        fs::write(root.join("notes.txt"), "x").unwrap();

        let files = discover_markdown(&content(root)).unwrap();
        let rels: Vec<&str> = files.iter().map(|f| f.relative_path.as_str()).collect();
        assert_eq!(
            rels,
            vec![
                "intro.md",
                "module-1/1.1-nodes.md",
                "module-2/2.1-gazebo.md",
                "module-2/deep/deeper/notes.mdx",
            ]
        );
    }

    #[test]
    fn test_default_and_configured_excludes() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join(".git/info")).unwrap();
        fs::create_dir_all(root.join("drafts")).unwrap();
        fs::write(root.join(".git/info/notes.md"), "x").unwrap();
        fs::write(root.join("drafts/wip.md"), "x").unwrap();
        fs::write(root.join("keep.md"), "x").unwrap();

        let mut cfg = content(root);
        cfg.exclude_globs.push("drafts/**".to_string());
        let files = discover_markdown(&cfg).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].relative_path, "keep.md");
    }

    #[test]
    fn test_build_dirs_inside_docs_are_indexed() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("module-3/target")).unwrap();
        fs::create_dir_all(root.join("node_modules")).unwrap();
        fs::write(root.join("module-3/target/3.4-target-tracking.md"), "t").unwrap();
        fs::write(root.join("node_modules/notes.md"), "n").unwrap();
        fs::write(root.join("intro.md"), "i").unwrap();

        let files = discover_markdown(&content(root)).unwrap();
        let rels: Vec<&str> = files.iter().map(|f| f.relative_path.as_str()).collect();
        assert_eq!(
            rels,
            vec![
                "intro.md",
                "module-3/target/3.4-target-tracking.md",
                "node_modules/notes.md",
            ]
        );
    }

    #[test]
    fn test_upper_case_extensions_are_discovered() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        fs::write(root.join("README.MD"), "r").unwrap();
        fs::write(root.join("Guide.Markdown"), "g").unwrap();
        fs::write(root.join("intro.md"), "i").unwrap();
        fs::write(root.join("intro.md.bak"), "b").unwrap();

        let files = discover_markdown(&content(root)).unwrap();
        let rels: Vec<&str> = files.iter().map(|f| f.relative_path.as_str()).collect();
        assert_eq!(rels, vec!["Guide.Markdown", "README.MD", "intro.md"]);
    }

    #[test]
    fn test_missing_root_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let err = discover_markdown(&content(&tmp.path().join("nope"))).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[cfg(unix)]
    #[test]
    fn test_unwalkable_entry_fails_without_partial_result() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("module-1")).unwrap();
        fs::write(root.join("module-1/1.1-nodes.md"), "n").unwrap();
        std::os::unix::fs::symlink(root.join("absent"), root.join("module-1/dangling")).unwrap();

        let mut cfg = content(root);
        cfg.follow_symlinks = true;
        let err = discover_markdown(&cfg).unwrap_err();
        assert!(err.to_string().contains("Failed to walk"));
    }
}
