//! TOML configuration.
//!
//! Every section is optional; a missing section takes the defaults below,
//! so an empty file (or no file at all) describes the stock book layout:
//!
//! ```toml
//! [content]
//! root = "docs"
//! include_globs = ["**/*.md", "**/*.mdx", "**/*.markdown"]
//! exclude_globs = ["**/.git/**"]
//! follow_symlinks = false
//!
//! [output]
//! path = "static/book-content.json"
//! pretty = true
//!
//! [index]
//! strict = false
//!
//! [modules]
//! default = "Introduction"
//! [modules.labels]
//! 5 = "Module 5: Capstone"
//!
//! [chat]
//! endpoint = "https://rizwana-riaz-robotic-era.hf.space/chat"
//! # timeout_secs = 30
//!
//! [lookup]
//! # source = "http://localhost:3000/book-content.json"
//!
//! [server]
//! bind = "127.0.0.1:8000"
//! ```

use aibook_core::resolve::ModuleCatalog;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub content: ContentConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub modules: ModulesConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub lookup: LookupConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ContentConfig {
    #[serde(default = "default_root")]
    pub root: PathBuf,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    /// Replaces the default entirely when set.
    #[serde(default = "default_exclude_globs")]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            include_globs: default_include_globs(),
            exclude_globs: default_exclude_globs(),
            follow_symlinks: false,
        }
    }
}

fn default_root() -> PathBuf {
    PathBuf::from("docs")
}

fn default_include_globs() -> Vec<String> {
    vec![
        "**/*.md".to_string(),
        "**/*.mdx".to_string(),
        "**/*.markdown".to_string(),
    ]
}

fn default_exclude_globs() -> Vec<String> {
    vec!["**/.git/**".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_output_path")]
    pub path: PathBuf,
    #[serde(default = "default_true")]
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
            pretty: true,
        }
    }
}

fn default_output_path() -> PathBuf {
    PathBuf::from("static/book-content.json")
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct IndexConfig {
    /// Abort on the first per-file failure instead of reporting it.
    #[serde(default)]
    pub strict: bool,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ModulesConfig {
    #[serde(default)]
    pub default: Option<String>,
    /// Module number (as a string key) → label.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl ModulesConfig {
    pub fn catalog(&self) -> Result<ModuleCatalog> {
        let mut labels = Vec::with_capacity(self.labels.len());
        for (key, label) in &self.labels {
            let number: u32 = key
                .trim()
                .parse()
                .with_context(|| format!("modules.labels key '{}' is not a module number", key))?;
            if label.trim().is_empty() {
                bail!("modules.labels.{} must not be empty", key);
            }
            labels.push((number, label.clone()));
        }
        Ok(ModuleCatalog::with_overrides(labels, self.default.clone()))
    }
}

pub const DEFAULT_CHAT_ENDPOINT: &str = "https://rizwana-riaz-robotic-era.hf.space/chat";

pub const DEFAULT_GREETING: &str =
    "Hello! I'm your AI assistant for the Embodied AI Systems Book. Ask me anything about the content!";

#[derive(Debug, Deserialize, Clone)]
pub struct ChatConfig {
    #[serde(default = "default_chat_endpoint")]
    pub endpoint: String,
    /// Unset means the HTTP client's own behavior (no explicit timeout).
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default = "default_greeting")]
    pub greeting: Option<String>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            endpoint: default_chat_endpoint(),
            timeout_secs: None,
            greeting: default_greeting(),
        }
    }
}

fn default_chat_endpoint() -> String {
    DEFAULT_CHAT_ENDPOINT.to_string()
}

fn default_greeting() -> Option<String> {
    Some(DEFAULT_GREETING.to_string())
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct LookupConfig {
    /// Artifact URL or path. Defaults to `output.path`.
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}

impl Config {
    /// Where lookups read the artifact from.
    pub fn lookup_source(&self) -> String {
        self.lookup
            .source
            .clone()
            .unwrap_or_else(|| self.output.path.display().to_string())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

/// Load `path`, or fall back to defaults when it does not exist and
/// `required` is false.
pub fn load_or_default(path: &Path, required: bool) -> Result<Config> {
    if !required && !path.exists() {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        return Ok(Config::default());
    }
    load_config(path)
}

fn validate(config: &Config) -> Result<()> {
    if config.content.include_globs.is_empty() {
        bail!("content.include_globs must not be empty");
    }

    let endpoint = config.chat.endpoint.as_str();
    if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
        bail!(
            "chat.endpoint must be an http(s) URL, got '{}'",
            config.chat.endpoint
        );
    }
    if config.chat.timeout_secs == Some(0) {
        bail!("chat.timeout_secs must be > 0 when set");
    }

    if config.server.bind.trim().is_empty() {
        bail!("server.bind must not be empty");
    }

    config.modules.catalog()?;
    Ok(())
}
