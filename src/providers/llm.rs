use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;

const ANTHROPIC_MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Who said a line of an authoring conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A chat completion backend. The system prompt travels separately from the
/// conversation since providers place it differently.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    async fn complete(&self, system: &str, messages: Vec<Message>) -> Result<String>;
}

/// Generation settings shared by the hosted providers. Story drafts and
/// edit actions are JSON, so the default temperature is low.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sampling {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for Sampling {
    fn default() -> Self {
        Self {
            max_tokens: 4096,
            temperature: 0.2,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    role: String,
    content: String,
}

impl From<Message> for WireMessage {
    fn from(message: Message) -> Self {
        Self {
            role: message.role.as_str().to_string(),
            content: message.content,
        }
    }
}

/// Decode a JSON reply, turning an HTTP failure into an error carrying the
/// vendor's body.
async fn read_reply<T: DeserializeOwned>(response: reqwest::Response, vendor: &str) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        anyhow::bail!("{} returned {}: {}", vendor, status, body);
    }
    response
        .json()
        .await
        .with_context(|| format!("decoding {} reply", vendor))
}

#[derive(Debug, Clone)]
pub struct AnthropicProvider {
    api_key: String,
    model: String,
    sampling: Sampling,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    system: &'a str,
    messages: Vec<WireMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct AnthropicReply {
    content: Vec<AnthropicBlock>,
}

#[derive(Deserialize)]
struct AnthropicBlock {
    #[serde(default)]
    text: Option<String>,
}

impl AnthropicProvider {
    pub const DEFAULT_MODEL: &'static str = "claude-3-5-sonnet-20240620";

    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            model: Self::DEFAULT_MODEL.to_string(),
            sampling: Sampling::default(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_model(mut self, model: String) -> Self {
        self.model = model;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.sampling.max_tokens = max_tokens;
        self
    }

    pub fn with_sampling(mut self, sampling: Sampling) -> Self {
        self.sampling = sampling;
        self
    }
}

#[async_trait]
impl LLMProvider for AnthropicProvider {
    async fn complete(&self, system: &str, messages: Vec<Message>) -> Result<String> {
        log::debug!("anthropic: {} turns to {}", messages.len(), self.model);
        let request = AnthropicRequest {
            model: &self.model,
            system,
            messages: messages.into_iter().map(WireMessage::from).collect(),
            max_tokens: self.sampling.max_tokens,
            temperature: self.sampling.temperature,
        };

        let response = self
            .client
            .post(ANTHROPIC_MESSAGES_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .context("sending request to Anthropic")?;

        let reply: AnthropicReply = read_reply(response, "Anthropic").await?;
        let text: String = reply.content.into_iter().filter_map(|b| b.text).collect();
        if text.trim().is_empty() {
            anyhow::bail!("Anthropic reply had no text");
        }
        Ok(text)
    }
}

/// Any endpoint speaking the OpenAI chat completions protocol.
#[derive(Debug, Clone)]
pub struct OpenAIProvider {
    api_key: String,
    model: String,
    base_url: String,
    sampling: Sampling,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatReply {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: WireMessage,
}

impl OpenAIProvider {
    pub const DEFAULT_MODEL: &'static str = "gpt-4o";

    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            model: Self::DEFAULT_MODEL.to_string(),
            base_url: OPENAI_BASE_URL.to_string(),
            sampling: Sampling::default(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_model(mut self, model: String) -> Self {
        self.model = model;
        self
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_sampling(mut self, sampling: Sampling) -> Self {
        self.sampling = sampling;
        self
    }
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    async fn complete(&self, system: &str, messages: Vec<Message>) -> Result<String> {
        log::debug!("openai: {} turns to {}", messages.len(), self.model);
        let conversation = std::iter::once(WireMessage {
            role: "system".to_string(),
            content: system.to_string(),
        })
        .chain(messages.into_iter().map(WireMessage::from))
        .collect();

        let request = ChatRequest {
            model: &self.model,
            messages: conversation,
            max_tokens: self.sampling.max_tokens,
            temperature: self.sampling.temperature,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("sending request to OpenAI")?;

        let reply: ChatReply = read_reply(response, "OpenAI").await?;
        reply
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .context("OpenAI reply had no choices")
    }
}

/// Scripted provider for tests: replays queued responses in order and
/// records every conversation it was sent.
pub struct MockLLMProvider {
    responses: Mutex<VecDeque<Result<String, String>>>,
    requests: Mutex<Vec<(String, Vec<Message>)>>,
}

impl MockLLMProvider {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_response(response: impl Into<String>) -> Self {
        let provider = Self::new();
        provider.push_response(response);
        provider
    }

    pub fn with_failure(message: impl Into<String>) -> Self {
        let provider = Self::new();
        if let Ok(mut responses) = provider.responses.lock() {
            responses.push_back(Err(message.into()));
        }
        provider
    }

    pub fn push_response(&self, response: impl Into<String>) {
        if let Ok(mut responses) = self.responses.lock() {
            responses.push_back(Ok(response.into()));
        }
    }

    pub fn requests(&self) -> Vec<(String, Vec<Message>)> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

impl Default for MockLLMProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LLMProvider for MockLLMProvider {
    async fn complete(&self, system: &str, messages: Vec<Message>) -> Result<String> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push((system.to_string(), messages));
        }
        let next = self
            .responses
            .lock()
            .map_err(|_| anyhow::anyhow!("mock provider poisoned"))?
            .pop_front();
        match next {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(anyhow::anyhow!(message)),
            None => anyhow::bail!("mock provider has no scripted response"),
        }
    }
}
