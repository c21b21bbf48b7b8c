//! Completion capability: the HTTP client for hosted chat models.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GenerationError {
    #[error("Authentication failed: {0}")]
    Authentication(String),
    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Request timed out: {0}")]
    Timeout(String),
    #[error("API error (HTTP {status}): {body}")]
    Api { status: u16, body: String },
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
    #[error("The model returned no content")]
    EmptyCompletion,
    #[error("Failed to build prompt: {0}")]
    Prompt(String),
    #[error("Unsupported LLM provider: {0}")]
    Unsupported(String),
    #[error("Generation aborted unexpectedly")]
    Panicked,
}

impl GenerationError {
    /// Failures worth another attempt at the transport level.
    pub fn is_transient(&self) -> bool {
        match self {
            GenerationError::Network(_) | GenerationError::Timeout(_) => true,
            GenerationError::Api { status, .. } => matches!(status, 502..=504),
            _ => false,
        }
    }
}

impl From<reqwest::Error> for GenerationError {
    fn from(err: reqwest::Error) -> Self {
        // Request URLs never reach messages shown to users or written to logs.
        let err = err.without_url();
        if err.is_timeout() {
            GenerationError::Timeout(err.to_string())
        } else if err.is_decode() {
            GenerationError::MalformedResponse(err.to_string())
        } else {
            GenerationError::Network(err.to_string())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl CompletionRequest {
    pub fn system_prompt(&self) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
    }

    pub fn user_prompt(&self) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
    }
}

/// Anything that turns a completion request into the first choice's text.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, GenerationError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Provider {
    #[default]
    OpenAi,
    Gemini,
}

impl Provider {
    pub fn as_str(self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Gemini => "gemini",
        }
    }

    pub fn default_base_url(self) -> &'static str {
        match self {
            Provider::OpenAi => OPENAI_BASE_URL,
            Provider::Gemini => GEMINI_BASE_URL,
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            Provider::OpenAi => "gpt-3.5-turbo",
            Provider::Gemini => "gemini-1.5-flash",
        }
    }
}

impl FromStr for Provider {
    type Err = GenerationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAi),
            "gemini" => Ok(Provider::Gemini),
            other => Err(GenerationError::Unsupported(other.to_string())),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Retry and timeout policy applied to every outgoing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportPolicy {
    pub max_retries: u32,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub backoff: Duration,
}

impl Default for TransportPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(30),
            backoff: Duration::from_millis(500),
        }
    }
}

#[derive(Clone, PartialEq)]
pub struct LlmConfig {
    pub provider: Provider,
    pub base_url: String,
    pub model: String,
    pub api_key: String,
    pub transport: TransportPolicy,
}

impl LlmConfig {
    pub fn new(provider: Provider, api_key: impl Into<String>) -> Self {
        Self {
            provider,
            base_url: provider.default_base_url().to_string(),
            model: provider.default_model().to_string(),
            api_key: api_key.into(),
            transport: TransportPolicy::default(),
        }
    }
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("provider", &self.provider)
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &if self.api_key.is_empty() { "<unset>" } else { "<redacted>" })
            .field("transport", &self.transport)
            .finish()
    }
}

pub struct LlmClient {
    config: LlmConfig,
    client: Client,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .connect_timeout(config.transport.connect_timeout)
            .build()
            .map_err(|e| GenerationError::Network(e.to_string()))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    fn endpoint(&self) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        match self.config.provider {
            Provider::OpenAi => format!("{}/chat/completions", base),
            Provider::Gemini => format!("{}/models/{}:generateContent", base, self.config.model),
        }
    }

    async fn send_once(&self, url: &str, payload: &Value) -> Result<String, GenerationError> {
        let mut builder = self
            .client
            .post(url)
            .timeout(self.config.transport.read_timeout)
            .json(payload);

        builder = match self.config.provider {
            Provider::OpenAi => builder.bearer_auth(&self.config.api_key),
            Provider::Gemini => builder.header("x-goog-api-key", self.config.api_key.as_str()),
        };

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, body));
        }

        let response_json: Value = response.json().await?;
        parse_response(self.config.provider, &response_json)
    }
}

#[async_trait]
impl CompletionClient for LlmClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, GenerationError> {
        let provider = self.config.provider;
        let url = self.endpoint();
        let payload = build_payload(provider, &self.config.model, request);
        let policy = self.config.transport;

        info!("Sending request to {} model {}", provider, self.config.model);

        let mut attempt = 0u32;
        loop {
            match self.send_once(&url, &payload).await {
                Ok(text) => return Ok(text),
                Err(err) if err.is_transient() && attempt < policy.max_retries => {
                    attempt += 1;
                    warn!(
                        "Transport failure ({}), retry {}/{}",
                        err, attempt, policy.max_retries
                    );
                    tokio::time::sleep(policy.backoff * attempt).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

fn status_error(status: StatusCode, body: String) -> GenerationError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            GenerationError::Authentication(format!("HTTP {}: {}", status.as_u16(), body))
        }
        StatusCode::TOO_MANY_REQUESTS => GenerationError::RateLimit(body),
        _ => GenerationError::Api { status: status.as_u16(), body },
    }
}

pub fn build_payload(provider: Provider, model: &str, request: &CompletionRequest) -> Value {
    match provider {
        Provider::OpenAi => json!({
            "model": model,
            "messages": request.messages,
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        }),
        Provider::Gemini => {
            let mut payload = json!({
                "contents": [{"role": "user", "parts": [{"text": request.user_prompt().unwrap_or_default()}]}],
                "generationConfig": {
                    "temperature": request.temperature,
                    "maxOutputTokens": request.max_tokens,
                },
            });
            if let Some(system) = request.system_prompt() {
                payload["systemInstruction"] = json!({"parts": [{"text": system}]});
            }
            payload
        }
    }
}

pub fn parse_response(provider: Provider, data: &Value) -> Result<String, GenerationError> {
    let text = match provider {
        Provider::OpenAi => data["choices"][0]["message"]["content"].as_str(),
        Provider::Gemini => data["candidates"][0]["content"]["parts"][0]["text"].as_str(),
    };
    match text {
        Some("") => Err(GenerationError::EmptyCompletion),
        Some(text) => Ok(text.to_string()),
        None => Err(GenerationError::MalformedResponse(format!(
            "Failed to parse LLM response for {}",
            provider
        ))),
    }
}
