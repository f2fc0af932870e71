//! Frontmatter splitting.
//!
//! A markdown file may open with a YAML block fenced by `---` lines:
//!
//! ```text
//! ---
//! title: ROS 2 Basics
//! sidebar_position: 2
//! ---
//! # Nodes and Topics
//! ...
//! ```
//!
//! [`split_frontmatter`] separates that block from the body. Parsing never
//! fails: a missing or unterminated block leaves the text untouched, and a
//! block that is not a valid YAML mapping degrades to empty metadata with
//! the parser message kept in [`ParsedMarkdown::error`].

use std::collections::BTreeMap;

use serde_json::Value;

/// Schema-free frontmatter mapping.
pub type Metadata = BTreeMap<String, Value>;

const DELIMITER: &str = "---";

/// Result of splitting a markdown file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedMarkdown {
    pub metadata: Metadata,
    pub body: String,
    /// Whether a delimited block was found, valid or not.
    pub has_block: bool,
    /// Set when a block was found but could not be read as a mapping.
    pub error: Option<String>,
}

/// Separate the frontmatter block (if any) from the body text.
///
/// ```rust
/// use aibook_core::frontmatter::split_frontmatter;
///
/// let parsed = split_frontmatter("---\ntitle: Hello\n---\n# Body\n");
/// assert_eq!(parsed.metadata["title"], "Hello");
/// assert_eq!(parsed.body, "# Body\n");
/// ```
pub fn split_frontmatter(text: &str) -> ParsedMarkdown {
    let unchanged = || ParsedMarkdown {
        body: text.to_string(),
        ..Default::default()
    };

    let input = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut lines = input.split_inclusive('\n');
    let first = match lines.next() {
        Some(line) => line,
        None => return unchanged(),
    };
    if !is_delimiter(first) {
        return unchanged();
    }

    let mut offset = first.len();
    let block_start = offset;
    let mut block_end = None;
    for line in lines {
        if is_delimiter(line) {
            block_end = Some((offset, offset + line.len()));
            break;
        }
        offset += line.len();
    }

    let (yaml_end, body_start) = match block_end {
        Some(bounds) => bounds,
        None => return unchanged(),
    };

    let yaml = &input[block_start..yaml_end];
    let body = input[body_start..].to_string();

    match parse_block(yaml) {
        Ok(metadata) => ParsedMarkdown {
            metadata,
            body,
            has_block: true,
            error: None,
        },
        Err(message) => ParsedMarkdown {
            metadata: Metadata::new(),
            body,
            has_block: true,
            error: Some(message),
        },
    }
}

fn is_delimiter(line: &str) -> bool {
    line.trim_end() == DELIMITER
}

fn parse_block(yaml: &str) -> Result<Metadata, String> {
    if yaml.trim().is_empty() {
        return Ok(Metadata::new());
    }

    let doc: serde_yaml::Value = serde_yaml::from_str(yaml).map_err(|e| e.to_string())?;
    let mapping = match doc {
        serde_yaml::Value::Mapping(m) => m,
        serde_yaml::Value::Null => return Ok(Metadata::new()),
        other => {
            return Err(format!(
                "frontmatter is not a mapping (found {})",
                yaml_kind(&other)
            ))
        }
    };

    let mut metadata = Metadata::new();
    for (key, value) in mapping {
        let key = match key {
            serde_yaml::Value::String(s) => s,
            serde_yaml::Value::Number(n) => n.to_string(),
            serde_yaml::Value::Bool(b) => b.to_string(),
            _ => continue,
        };
        // Nested maps with non-string keys have no JSON form.
        if let Ok(json) = serde_json::to_value(&value) {
            metadata.insert(key, json);
        }
    }
    Ok(metadata)
}

fn yaml_kind(value: &serde_yaml::Value) -> &'static str {
    match value {
        serde_yaml::Value::Null => "null",
        serde_yaml::Value::Bool(_) => "a boolean",
        serde_yaml::Value::Number(_) => "a number",
        serde_yaml::Value::String(_) => "a string",
        serde_yaml::Value::Sequence(_) => "a sequence",
        serde_yaml::Value::Mapping(_) => "a mapping",
        serde_yaml::Value::Tagged(_) => "a tagged value",
    }
}
