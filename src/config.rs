use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use crate::providers::{AnthropicProvider, LLMProvider, OpenAIProvider};

pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmBackend {
    Anthropic,
    OpenAI,
}

impl LlmBackend {
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anthropic" => Some(LlmBackend::Anthropic),
            "openai" => Some(LlmBackend::OpenAI),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub port: u16,
    pub llm: Option<LlmBackend>,
    pub model: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            anthropic_api_key: None,
            port: DEFAULT_PORT,
            llm: None,
            model: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.overlay(|key| std::env::var(key).ok());
        config
    }

    /// Load a TOML file, then let environment variables override it.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let mut config: Config = toml::from_str(&text)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        config.overlay(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn overlay(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup("OPENAI_API_KEY") {
            self.openai_api_key = Some(key);
        }
        if let Some(key) = lookup("ANTHROPIC_API_KEY") {
            self.anthropic_api_key = Some(key);
        }
        if let Some(port) = lookup("AGENT_STORY_PORT") {
            match port.parse() {
                Ok(port) => self.port = port,
                Err(_) => log::warn!("ignoring invalid AGENT_STORY_PORT {:?}", port),
            }
        }
        if let Some(backend) = lookup("AGENT_STORY_LLM") {
            match LlmBackend::from_str(&backend) {
                Some(backend) => self.llm = Some(backend),
                None => log::warn!("ignoring unknown AGENT_STORY_LLM {:?}", backend),
            }
        }
        if let Some(model) = lookup("AGENT_STORY_MODEL") {
            self.model = Some(model);
        }
    }

    /// The configured backend, or the first one with an API key.
    pub fn backend(&self) -> Option<LlmBackend> {
        self.llm.or_else(|| {
            if self.anthropic_api_key.is_some() {
                Some(LlmBackend::Anthropic)
            } else if self.openai_api_key.is_some() {
                Some(LlmBackend::OpenAI)
            } else {
                None
            }
        })
    }

    pub fn llm_provider(&self) -> Result<Arc<dyn LLMProvider>> {
        let backend = self
            .backend()
            .context("no LLM configured; set ANTHROPIC_API_KEY or OPENAI_API_KEY")?;
        let provider: Arc<dyn LLMProvider> = match backend {
            LlmBackend::Anthropic => {
                let key = self
                    .anthropic_api_key
                    .clone()
                    .context("AGENT_STORY_LLM=anthropic requires ANTHROPIC_API_KEY")?;
                let provider = AnthropicProvider::new(key);
                match &self.model {
                    Some(model) => Arc::new(provider.with_model(model.clone())),
                    None => Arc::new(provider),
                }
            }
            LlmBackend::OpenAI => {
                let key = self
                    .openai_api_key
                    .clone()
                    .context("AGENT_STORY_LLM=openai requires OPENAI_API_KEY")?;
                let provider = OpenAIProvider::new(key);
                match &self.model {
                    Some(model) => Arc::new(provider.with_model(model.clone())),
                    None => Arc::new(provider),
                }
            }
        };
        Ok(provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn overlaid(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let mut config = Config::default();
        config.overlay(|key| vars.get(key).cloned());
        config
    }

    #[test]
    fn test_defaults() {
        let config = overlaid(&[]);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.backend(), None);
        assert!(config.llm_provider().is_err());
    }

    #[test]
    fn test_backend_falls_back_to_available_key() {
        let config = overlaid(&[("OPENAI_API_KEY", "sk-test")]);
        assert_eq!(config.backend(), Some(LlmBackend::OpenAI));
        assert!(config.llm_provider().is_ok());

        let both = overlaid(&[("OPENAI_API_KEY", "a"), ("ANTHROPIC_API_KEY", "b")]);
        assert_eq!(both.backend(), Some(LlmBackend::Anthropic));
    }

    #[test]
    fn test_explicit_backend_needs_its_key() {
        let config = overlaid(&[("AGENT_STORY_LLM", "OpenAI"), ("ANTHROPIC_API_KEY", "b")]);
        assert_eq!(config.backend(), Some(LlmBackend::OpenAI));
        assert!(config.llm_provider().is_err());
    }

    #[test]
    fn test_invalid_port_is_ignored() {
        assert_eq!(overlaid(&[("AGENT_STORY_PORT", "eighty")]).port, DEFAULT_PORT);
        assert_eq!(overlaid(&[("AGENT_STORY_PORT", "8080")]).port, 8080);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port = 4100\nllm = \"anthropic\"\nmodel = \"claude-3-haiku\"").unwrap();

        let config: Config = toml::from_str(&std::fs::read_to_string(file.path()).unwrap()).unwrap();
        assert_eq!(config.port, 4100);
        assert_eq!(config.llm, Some(LlmBackend::Anthropic));
        assert_eq!(config.model.as_deref(), Some("claude-3-haiku"));
        assert_eq!(config.openai_api_key, None);
    }

    #[test]
    fn test_from_file_missing() {
        assert!(Config::from_file(Path::new("/nonexistent/agent-story.toml")).is_err());
    }
}
