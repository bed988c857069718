//! LLM client configuration.

use serde::{Deserialize, Serialize};

use super::prompts::DEFAULT_EXTRACTION_PROMPT;

/// LLM provider type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// Ollama API (local, default)
    #[default]
    Ollama,
    /// OpenAI-compatible API (OpenAI, Groq, Together.ai, etc.)
    OpenAI,
}

impl LlmProvider {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "ollama" => Some(Self::Ollama),
            "openai" | "groq" | "together" => Some(Self::OpenAI),
            _ => None,
        }
    }
}

/// Configuration for the extraction LLM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Whether `/extract` may call the model at all
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub provider: LlmProvider,
    /// API endpoint (provider-specific defaults apply)
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// API key for OpenAI-compatible providers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Temperature for generation (0.0 - 1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Custom extraction prompt (uses {query} and {content} placeholders)
    #[serde(default)]
    pub extraction_prompt: Option<String>,
    /// Maximum characters of page markdown sent to the model
    #[serde(default = "default_max_content_chars")]
    pub max_content_chars: usize,
    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
}

fn default_enabled() -> bool {
    true
}

fn default_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    "llama3.1:8b".to_string()
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_temperature() -> f32 {
    0.0
}

fn default_max_content_chars() -> usize {
    24000
}

fn default_request_timeout() -> u64 {
    120
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            provider: LlmProvider::default(),
            endpoint: default_endpoint(),
            api_key: None,
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            extraction_prompt: None,
            max_content_chars: default_max_content_chars(),
            request_timeout: default_request_timeout(),
        }
    }
}

impl LlmConfig {
    /// Apply environment variable overrides.
    ///
    /// Supported env vars:
    /// - `LLM_ENABLED`: "true" or "false"
    /// - `LLM_PROVIDER`: "ollama" (default), "openai", "groq", or "together"
    /// - `LLM_ENDPOINT`: API endpoint (defaults based on provider)
    /// - `LLM_API_KEY`: API key for OpenAI-compatible providers
    /// - `LLM_MODEL`, `LLM_MAX_TOKENS`, `LLM_TEMPERATURE`, `LLM_MAX_CONTENT_CHARS`
    /// - `LLM_EXTRACTION_PROMPT`: Custom extraction prompt
    ///
    /// LLM_PROVIDER wins over auto-detection from `GROQ_API_KEY` / `OPENAI_API_KEY`.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("LLM_ENABLED") {
            self.enabled = val.eq_ignore_ascii_case("true") || val == "1";
        }

        let explicit_provider = std::env::var("LLM_PROVIDER").ok();
        if let Some(provider) = explicit_provider.as_deref().and_then(LlmProvider::parse) {
            self.provider = provider;
        }

        let explicit_endpoint = std::env::var("LLM_ENDPOINT").ok();
        if let Some(ref endpoint) = explicit_endpoint {
            self.endpoint = endpoint.clone();
        }

        if let Ok(val) = std::env::var("LLM_API_KEY") {
            self.api_key = Some(val);
        }

        match explicit_provider.map(|p| p.to_lowercase()) {
            Some(provider) => {
                if explicit_endpoint.is_none() {
                    if let Some(endpoint) = provider_endpoint(&provider) {
                        self.endpoint = endpoint.to_string();
                    }
                }
                if self.api_key.is_none() {
                    self.api_key = match provider.as_str() {
                        "groq" => std::env::var("GROQ_API_KEY").ok(),
                        "openai" => std::env::var("OPENAI_API_KEY").ok(),
                        _ => None,
                    };
                }
            }
            None if self.api_key.is_none() => {
                // Auto-detect from available keys
                for (var, provider) in [("GROQ_API_KEY", "groq"), ("OPENAI_API_KEY", "openai")] {
                    if let Ok(key) = std::env::var(var) {
                        self.api_key = Some(key);
                        self.provider = LlmProvider::OpenAI;
                        if explicit_endpoint.is_none() {
                            if let Some(endpoint) = provider_endpoint(provider) {
                                self.endpoint = endpoint.to_string();
                            }
                        }
                        break;
                    }
                }
            }
            None => {}
        }

        if let Ok(val) = std::env::var("LLM_MODEL") {
            self.model = val;
        }
        if let Some(n) = std::env::var("LLM_MAX_TOKENS").ok().and_then(|v| v.parse().ok()) {
            self.max_tokens = n;
        }
        if let Some(t) = std::env::var("LLM_TEMPERATURE").ok().and_then(|v| v.parse().ok()) {
            self.temperature = t;
        }
        if let Some(n) = std::env::var("LLM_MAX_CONTENT_CHARS")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            self.max_content_chars = n;
        }
        if let Ok(val) = std::env::var("LLM_EXTRACTION_PROMPT") {
            self.extraction_prompt = Some(val);
        }
        self
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_string();
        self
    }

    pub fn with_provider(mut self, provider: LlmProvider) -> Self {
        self.provider = provider;
        self
    }

    /// Get the extraction prompt, using custom or default.
    pub fn get_extraction_prompt(&self) -> &str {
        self.extraction_prompt
            .as_deref()
            .unwrap_or(DEFAULT_EXTRACTION_PROMPT)
    }
}

fn provider_endpoint(provider: &str) -> Option<&'static str> {
    match provider {
        "groq" => Some("https://api.groq.com/openai"),
        "openai" => Some("https://api.openai.com"),
        "together" => Some("https://api.together.xyz"),
        _ => None,
    }
}
