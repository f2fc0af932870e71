//! Title, module and chapter resolution.
//!
//! [`resolve`] is a pure function from a file's relative path, its
//! frontmatter and its body to the three display labels carried by a
//! [`ContentRecord`](crate::models::ContentRecord). Each label follows a
//! fixed priority list where the first match wins:
//!
//! | Label | 1st | 2nd | 3rd |
//! |-------|-----|-----|-----|
//! | title | frontmatter `title` | first `# heading` | title-cased file stem |
//! | module | `module-N` path segment | filename keyword | default label |
//! | chapter | `<n>.<n>-<slug>` stem | file stem | |

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::frontmatter::Metadata;

/// Labels used when no configuration overrides them.
pub const BUILTIN_MODULES: &[(u32, &str)] = &[
    (1, "Module 1: Robotic Nervous System (ROS 2)"),
    (2, "Module 2: Digital Twin (Gazebo + Unity)"),
    (3, "Module 3: AI-Robot Brain (NVIDIA Isaac)"),
    (4, "Module 4: Vision-Language-Action (VLA)"),
];

pub const DEFAULT_MODULE_LABEL: &str = "Introduction";

/// Filename keywords that predate the `module-N` directory layout.
const LEGACY_KEYWORDS: &[(&[&str], u32)] = &[(&["ros2", "basics"], 1), (&["digital", "twin"], 2)];

/// Closed set of module labels, keyed by module number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleCatalog {
    labels: BTreeMap<u32, String>,
    default_label: String,
}

impl Default for ModuleCatalog {
    fn default() -> Self {
        Self {
            labels: BUILTIN_MODULES
                .iter()
                .map(|(n, label)| (*n, label.to_string()))
                .collect(),
            default_label: DEFAULT_MODULE_LABEL.to_string(),
        }
    }
}

impl ModuleCatalog {
    /// Built-in catalog extended (or overridden) by `labels`.
    pub fn with_overrides(
        labels: impl IntoIterator<Item = (u32, String)>,
        default_label: Option<String>,
    ) -> Self {
        let mut catalog = Self::default();
        catalog.labels.extend(labels);
        if let Some(default_label) = default_label {
            catalog.default_label = default_label;
        }
        catalog
    }

    pub fn label(&self, number: u32) -> Option<&str> {
        self.labels.get(&number).map(String::as_str)
    }

    pub fn default_label(&self) -> &str {
        &self.default_label
    }

    /// Every label a record may carry, default last.
    pub fn all_labels(&self) -> impl Iterator<Item = &str> {
        self.labels
            .values()
            .map(String::as_str)
            .chain(std::iter::once(self.default_label.as_str()))
    }
}

/// The three resolved labels for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub title: String,
    pub module: String,
    pub chapter: String,
}

/// Resolve title, module and chapter for a file.
///
/// `relative_path` is the path below the content root, with either
/// separator.
///
/// ```rust
/// use aibook_core::frontmatter::Metadata;
/// use aibook_core::resolve::{resolve, ModuleCatalog};
///
/// let r = resolve(
///     "module-3/3.2-perception.md",
///     &Metadata::new(),
///     "Sensors first.",
///     &ModuleCatalog::default(),
/// );
/// assert_eq!(r.module, "Module 3: AI-Robot Brain (NVIDIA Isaac)");
/// assert_eq!(r.chapter, "perception");
/// assert_eq!(r.title, "3.2 Perception");
/// ```
pub fn resolve(
    relative_path: &str,
    metadata: &Metadata,
    body: &str,
    catalog: &ModuleCatalog,
) -> Resolved {
    let normalized = relative_path.replace('\\', "/");
    let file_name = normalized.rsplit('/').next().unwrap_or(&normalized);
    let stem = file_stem(file_name);

    Resolved {
        title: resolve_title(metadata, body, stem),
        module: resolve_module(&normalized, file_name, catalog),
        chapter: resolve_chapter(stem),
    }
}

/// Title from frontmatter, then the first level-1 heading, then the stem.
pub fn resolve_title(metadata: &Metadata, body: &str, stem: &str) -> String {
    if let Some(title) = metadata.get("title").and_then(scalar_text) {
        return title;
    }
    if let Some(heading) = first_h1(body) {
        return heading;
    }
    title_case(stem)
}

/// Module label from a `module-N` segment, then legacy filename keywords.
pub fn resolve_module(relative_path: &str, file_name: &str, catalog: &ModuleCatalog) -> String {
    for segment in relative_path.split('/') {
        if let Some(label) = module_number(segment).and_then(|n| catalog.label(n)) {
            return label.to_string();
        }
    }

    let lower = file_name.to_lowercase();
    for (keywords, number) in LEGACY_KEYWORDS {
        if keywords.iter().any(|k| lower.contains(k)) {
            if let Some(label) = catalog.label(*number) {
                return label.to_string();
            }
        }
    }

    catalog.default_label().to_string()
}

/// Chapter slug from a `<n>.<n>-<slug>` stem, else the stem itself.
pub fn resolve_chapter(stem: &str) -> String {
    match chapter_pattern().captures(stem) {
        Some(caps) => caps[1].replace('-', " "),
        None => stem.to_string(),
    }
}

fn module_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^module-(\d+)(?:[-_].*)?$").expect("valid module regex"))
}

fn chapter_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+\.\d+-(.+)$").expect("valid chapter regex"))
}

fn module_number(segment: &str) -> Option<u32> {
    let segment = file_stem(segment);
    module_pattern()
        .captures(&segment.to_lowercase())
        .and_then(|caps| caps[1].parse().ok())
}

fn file_stem(file_name: &str) -> &str {
    match file_name.rfind('.') {
        Some(pos) if pos > 0 => &file_name[..pos],
        _ => file_name,
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// First `# heading` line outside fenced code blocks.
fn first_h1(body: &str) -> Option<String> {
    let mut fence: Option<&str> = None;
    for line in body.lines() {
        let trimmed = line.trim_start();
        if let Some(open) = fence {
            if trimmed.starts_with(open) {
                fence = None;
            }
            continue;
        }
        if trimmed.starts_with("```") {
            fence = Some("```");
            continue;
        }
        if trimmed.starts_with("~~~") {
            fence = Some("~~~");
            continue;
        }

        let rest = match line.strip_prefix('#') {
            Some(rest) => rest,
            None => continue,
        };
        if !rest.starts_with(char::is_whitespace) {
            continue;
        }
        let text = rest.trim();
        if !text.is_empty() {
            return Some(text.to_string());
        }
    }
    None
}

/// `no-heading_file` → `No Heading File`.
///
/// Upper-cases every letter that starts a word, where a word is a run of
/// alphanumerics; the rest of each word is left as written.
pub fn title_case(stem: &str) -> String {
    let spaced = stem.replace(['-', '_'], " ");
    let mut out = String::with_capacity(spaced.len());
    let mut in_word = false;
    for c in spaced.chars() {
        if c.is_alphanumeric() {
            if in_word {
                out.push(c);
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}
