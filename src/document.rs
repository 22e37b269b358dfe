//! Reading story documents from disk. JSON and YAML are accepted; the
//! extension decides, with JSON as the fallback.

use anyhow::{Context, Result};
use serde_json::Value;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
}

impl DocumentFormat {
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                DocumentFormat::Yaml
            }
            _ => DocumentFormat::Json,
        }
    }
}

pub fn parse_document(text: &str, format: DocumentFormat) -> Result<Value> {
    match format {
        DocumentFormat::Json => serde_json::from_str(text).context("invalid JSON document"),
        DocumentFormat::Yaml => serde_yaml::from_str(text).context("invalid YAML document"),
    }
}

pub fn load_document(path: &Path) -> Result<Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    parse_document(&text, DocumentFormat::for_path(path))
        .with_context(|| format!("parsing {}", path.display()))
}
