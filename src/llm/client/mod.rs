//! LLM client for change summarization.
//!
//! Supports OpenAI-compatible chat completion APIs and Ollama.

mod config;
mod prompts;

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub use config::{LlmConfig, LlmProvider};
pub use prompts::{DEFAULT_DIFF_PROMPT, SYSTEM_INSTRUCTION};

/// Errors that can occur during LLM operations.
#[derive(Debug, Error)]
pub enum LlmError {
    /// No API key configured for a provider that needs one
    #[error("API key not configured for {0}")]
    MissingCredentials(String),
    /// API rejected the credentials
    #[error("Authentication failed: {0}")]
    Authentication(String),
    /// API asked us to slow down
    #[error("Rate limited{}", retry_hint(.retry_after_secs))]
    RateLimited { retry_after_secs: Option<u64> },
    /// Account has no remaining quota or credit
    #[error("Quota exhausted: {0}")]
    QuotaExceeded(String),
    /// Failed to connect to LLM service
    #[error("Connection error: {0}")]
    Connection(String),
    /// API returned an error
    #[error("API error: {0}")]
    Api(String),
    /// Failed to parse response
    #[error("Parse error: {0}")]
    Parse(String),
    /// LLM is disabled
    #[error("LLM is disabled")]
    Disabled,
}

fn retry_hint(retry_after_secs: &Option<u64>) -> String {
    retry_after_secs
        .map(|s| format!(" (retry after {}s)", s))
        .unwrap_or_default()
}

/// Map a failed HTTP response to an error category.
pub fn classify_error_response(
    status: StatusCode,
    body: &str,
    retry_after: Option<&str>,
) -> LlmError {
    let detail = api_error_message(body).unwrap_or_else(|| format!("HTTP {}", status));
    match status.as_u16() {
        401 | 403 => LlmError::Authentication(detail),
        402 => LlmError::QuotaExceeded(detail),
        429 if body.contains("insufficient_quota") => LlmError::QuotaExceeded(detail),
        429 => LlmError::RateLimited {
            retry_after_secs: retry_after.and_then(|s| s.trim().parse().ok()),
        },
        _ => LlmError::Api(format!("HTTP {}: {}", status, detail)),
    }
}

/// Pull `error.message` out of an OpenAI-style error body.
fn api_error_message(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: ErrorDetail,
    }

    #[derive(Deserialize)]
    struct ErrorDetail {
        message: String,
    }

    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .map(|b| b.error.message)
        .filter(|m| !m.is_empty())
}

/// OpenAI chat completion request format.
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// OpenAI chat completion response format.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Ollama API request format.
#[derive(Debug, Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    system: &'a str,
    prompt: &'a str,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

/// Ollama API response format.
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
}

/// LLM client for text completion.
pub struct LlmClient {
    config: LlmConfig,
    client: Client,
}

impl LlmClient {
    /// Create a new LLM client with the given configuration.
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::Connection(e.to_string()))?;

        Ok(Self { config, client })
    }

    /// Get the config.
    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    /// Check that the client is enabled and has the credentials it needs.
    pub fn ensure_ready(&self) -> Result<(), LlmError> {
        self.config.check_ready()
    }

    /// Send a prompt and return the generated text.
    pub async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        self.ensure_ready()?;
        let text = match self.config.provider {
            LlmProvider::OpenAI => self.call_openai(prompt).await?,
            LlmProvider::Ollama => self.call_ollama(prompt).await?,
        };

        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(LlmError::Parse("Empty response".to_string()));
        }
        Ok(text)
    }

    /// Call an OpenAI-compatible chat completion API.
    async fn call_openai(&self, prompt: &str) -> Result<String, LlmError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| LlmError::MissingCredentials(self.config.endpoint().to_string()))?;

        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_INSTRUCTION,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let url = format!("{}/v1/chat/completions", self.config.endpoint());
        debug!("POST {} (model {})", url, self.config.model);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::Connection(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let retry_after = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_string());
            let body = resp.text().await.unwrap_or_default();
            return Err(classify_error_response(status, &body, retry_after.as_deref()));
        }

        let chat: ChatResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        chat.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| LlmError::Parse("No choices in response".to_string()))
    }

    /// Call Ollama API with a prompt.
    async fn call_ollama(&self, prompt: &str) -> Result<String, LlmError> {
        let request = OllamaRequest {
            model: &self.config.model,
            system: SYSTEM_INSTRUCTION,
            prompt,
            stream: false,
            options: OllamaOptions {
                temperature: self.config.temperature,
                num_predict: self.config.max_tokens,
            },
        };

        let url = format!("{}/api/generate", self.config.endpoint());
        debug!("POST {} (model {})", url, self.config.model);
        let resp = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::Connection(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(classify_error_response(status, &body, None));
        }

        let ollama_resp: OllamaResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        Ok(ollama_resp.response)
    }
}
