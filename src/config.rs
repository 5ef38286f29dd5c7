use serde::Deserialize;
use std::fs;
use std::path::Path;

static DEFAULT_CONFIG: &str = include_str!("default_config.toml");

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub markdown: MarkdownConfig,
    pub editing: EditingConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct MarkdownConfig {
    /// Wrap styled runs of normal paragraphs in Markdown markers when encoding.
    pub inline_styles: bool,
    /// Font family applied to `code` segments, and recognised as code when encoding.
    pub code_font: String,
    pub table_placeholder: String,
    pub toc_placeholder: String,
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        Self {
            inline_styles: false,
            code_font: "Courier New".to_string(),
            table_placeholder: "<!-- table -->".to_string(),
            toc_placeholder: "<!-- table of contents -->".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct EditingConfig {
    /// Require the fetched revision to still be current when a batch is applied.
    pub check_revision: bool,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct LogConfig {
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl Config {
    /// The defaults shipped in `default_config.toml`.
    pub fn compiled_default() -> Self {
        toml::from_str(DEFAULT_CONFIG).unwrap_or_default()
    }

    /// Load config from a TOML file, or return defaults if not found.
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(content) => Self::parse(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring invalid config {}: {}", path.display(), e);
                Self::compiled_default()
            }),
            Err(_) => Self::compiled_default(),
        }
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}
