//! LLM client configuration.

use serde::{Deserialize, Serialize};

use super::prompts::DEFAULT_DIFF_PROMPT;
use super::LlmError;

/// LLM provider type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// OpenAI-compatible API (OpenAI, Groq, Together.ai, etc.)
    #[default]
    OpenAI,
    /// Ollama API (local)
    Ollama,
}

impl LlmProvider {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" | "groq" | "together" => Some(Self::OpenAI),
            "ollama" => Some(Self::Ollama),
            _ => None,
        }
    }

    /// Endpoint used when none is configured.
    pub fn default_endpoint(self) -> &'static str {
        match self {
            Self::OpenAI => "https://api.openai.com",
            Self::Ollama => "http://localhost:11434",
        }
    }

    /// Whether the provider refuses requests without an API key.
    pub fn requires_api_key(self) -> bool {
        matches!(self, Self::OpenAI)
    }
}

/// Configuration for the change summarizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Whether LLM summarization is enabled
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// LLM provider (openai or ollama)
    #[serde(default)]
    pub provider: LlmProvider,
    /// API endpoint (provider default when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// API key for OpenAI-compatible providers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Model to use for summarization
    #[serde(default = "default_model")]
    pub model: String,
    /// Maximum tokens in response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Temperature for generation (0.0 - 1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Custom prompt (uses {url} and {diff} placeholders)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    /// Maximum characters of diff to send to the LLM
    #[serde(default = "default_max_diff_chars")]
    pub max_diff_chars: usize,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_enabled() -> bool {
    true
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_max_tokens() -> u32 {
    512
}

fn default_temperature() -> f32 {
    0.3
}

fn default_max_diff_chars() -> usize {
    12000
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            provider: LlmProvider::default(),
            endpoint: None,
            api_key: None,
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            prompt: None,
            max_diff_chars: default_max_diff_chars(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl LlmConfig {
    /// Apply environment variable overrides.
    ///
    /// Supported env vars:
    /// - `LLM_ENABLED`: "true" or "false"
    /// - `LLM_PROVIDER`: "openai" (default), "groq", "together", or "ollama"
    /// - `LLM_ENDPOINT`: API endpoint (defaults based on provider)
    /// - `LLM_API_KEY`: API key, falling back to `OPENAI_API_KEY`
    /// - `LLM_MODEL`: Model name
    /// - `LLM_MAX_TOKENS`: Maximum tokens in response
    /// - `LLM_TEMPERATURE`: Generation temperature (0.0-1.0)
    /// - `LLM_MAX_DIFF_CHARS`: Max diff chars to send
    /// - `LLM_TIMEOUT`: Request timeout in seconds
    /// - `LLM_PROMPT`: Custom prompt
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("LLM_ENABLED") {
            self.enabled = val.eq_ignore_ascii_case("true") || val == "1";
        }

        let explicit_provider = std::env::var("LLM_PROVIDER").ok();
        if let Some(provider) = explicit_provider.as_deref().and_then(LlmProvider::parse) {
            self.provider = provider;
        }

        if let Ok(endpoint) = std::env::var("LLM_ENDPOINT") {
            self.endpoint = Some(endpoint);
        } else if let Some(provider) = explicit_provider.as_deref() {
            match provider.trim().to_lowercase().as_str() {
                "groq" => self.endpoint = Some("https://api.groq.com/openai".to_string()),
                "together" => self.endpoint = Some("https://api.together.xyz".to_string()),
                _ => {}
            }
        }

        // Explicit API key always wins
        if let Some(key) = non_empty_env("LLM_API_KEY") {
            self.api_key = Some(key);
        } else if self.api_key.is_none() {
            let provider_key = match explicit_provider.as_deref().map(str::trim) {
                Some(p) if p.eq_ignore_ascii_case("groq") => non_empty_env("GROQ_API_KEY"),
                _ => None,
            };
            self.api_key = provider_key.or_else(|| non_empty_env("OPENAI_API_KEY"));
        }

        if let Ok(val) = std::env::var("LLM_MODEL") {
            self.model = val;
        }
        if let Ok(val) = std::env::var("LLM_MAX_TOKENS") {
            if let Ok(n) = val.parse() {
                self.max_tokens = n;
            }
        }
        if let Ok(val) = std::env::var("LLM_TEMPERATURE") {
            if let Ok(t) = val.parse() {
                self.temperature = t;
            }
        }
        if let Ok(val) = std::env::var("LLM_MAX_DIFF_CHARS") {
            if let Ok(n) = val.parse() {
                self.max_diff_chars = n;
            }
        }
        if let Ok(val) = std::env::var("LLM_TIMEOUT") {
            if let Ok(n) = val.parse() {
                self.timeout_secs = n;
            }
        }
        if let Ok(val) = std::env::var("LLM_PROMPT") {
            self.prompt = Some(val);
        }
        self
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = Some(endpoint.to_string());
        self
    }

    pub fn with_api_key(mut self, key: &str) -> Self {
        self.api_key = Some(key.to_string());
        self
    }

    /// Endpoint without a trailing slash.
    pub fn endpoint(&self) -> &str {
        self.endpoint
            .as_deref()
            .unwrap_or_else(|| self.provider.default_endpoint())
            .trim_end_matches('/')
    }

    /// Get the summarization prompt, using custom or default.
    pub fn get_prompt(&self) -> &str {
        self.prompt.as_deref().unwrap_or(DEFAULT_DIFF_PROMPT)
    }

    /// Check that summaries are enabled and the provider has the
    /// credentials it needs.
    pub fn check_ready(&self) -> Result<(), LlmError> {
        if !self.enabled {
            return Err(LlmError::Disabled);
        }
        if self.provider.requires_api_key() && self.api_key.is_none() {
            return Err(LlmError::MissingCredentials(self.endpoint().to_string()));
        }
        Ok(())
    }

    /// Whether summarization can be attempted with this configuration.
    pub fn is_usable(&self) -> bool {
        self.check_ready().is_ok()
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_parse() {
        assert_eq!(LlmProvider::parse("OpenAI"), Some(LlmProvider::OpenAI));
        assert_eq!(LlmProvider::parse("groq"), Some(LlmProvider::OpenAI));
        assert_eq!(LlmProvider::parse(" ollama "), Some(LlmProvider::Ollama));
        assert_eq!(LlmProvider::parse("bard"), None);
    }

    #[test]
    fn test_endpoint_defaults_by_provider() {
        let config = LlmConfig::default();
        assert_eq!(config.endpoint(), "https://api.openai.com");

        let config = LlmConfig {
            provider: LlmProvider::Ollama,
            ..LlmConfig::default()
        };
        assert_eq!(config.endpoint(), "http://localhost:11434");
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let config = LlmConfig::default().with_endpoint("http://localhost:8080/");
        assert_eq!(config.endpoint(), "http://localhost:8080");
    }

    #[test]
    fn test_usable_requires_key_for_openai() {
        let config = LlmConfig::default();
        assert!(!config.is_usable());
        assert!(config.clone().with_api_key("sk-test").is_usable());

        let ollama = LlmConfig {
            provider: LlmProvider::Ollama,
            ..LlmConfig::default()
        };
        assert!(ollama.is_usable());

        let disabled = LlmConfig {
            enabled: false,
            ..LlmConfig::default().with_api_key("sk-test")
        };
        assert!(!disabled.is_usable());
    }

    #[test]
    fn test_check_ready_errors() {
        assert!(matches!(
            LlmConfig::default().check_ready(),
            Err(LlmError::MissingCredentials(ref endpoint)) if endpoint == "https://api.openai.com"
        ));
        let disabled = LlmConfig {
            enabled: false,
            ..LlmConfig::default()
        };
        assert!(matches!(disabled.check_ready(), Err(LlmError::Disabled)));
    }

    #[test]
    fn test_deserialize_partial_toml() {
        let config: LlmConfig = toml::from_str(
            r#"
            provider = "ollama"
            model = "llama3.2"
            "#,
        )
        .unwrap();
        assert_eq!(config.provider, LlmProvider::Ollama);
        assert_eq!(config.model, "llama3.2");
        assert!(config.enabled);
        assert_eq!(config.max_diff_chars, 12000);
    }

    #[test]
    fn test_default_prompt_has_placeholders() {
        let config = LlmConfig::default();
        assert!(config.get_prompt().contains("{diff}"));
        assert!(config.get_prompt().contains("{url}"));
    }
}
