//! # Model Selection
//!
//! Provider and model configuration for the AI-assisted analysis path.
//! Each provider reads its API key from the environment when a stage
//! actually calls out, so a missing key only surfaces as a stage
//! falling back to the rule-based path.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Supported LLM providers
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    Anthropic,
    #[serde(rename = "openai")]
    OpenAI,
    Gemini,
    OpenRouter,
    Grok,
    DeepSeek,
}

impl LlmProvider {
    pub fn all() -> Vec<LlmProvider> {
        vec![
            LlmProvider::Anthropic,
            LlmProvider::OpenAI,
            LlmProvider::Gemini,
            LlmProvider::OpenRouter,
            LlmProvider::Grok,
            LlmProvider::DeepSeek,
        ]
    }

    /// Identifier used in config files and env vars.
    pub fn id(&self) -> &'static str {
        match self {
            LlmProvider::Anthropic => "anthropic",
            LlmProvider::OpenAI => "openai",
            LlmProvider::Gemini => "gemini",
            LlmProvider::OpenRouter => "openrouter",
            LlmProvider::Grok => "grok",
            LlmProvider::DeepSeek => "deepseek",
        }
    }

    /// Environment variable holding the provider's API key.
    pub fn api_key_env(&self) -> &'static str {
        match self {
            LlmProvider::Anthropic => "ANTHROPIC_API_KEY",
            LlmProvider::OpenAI => "OPENAI_API_KEY",
            LlmProvider::Gemini => "GEMINI_API_KEY",
            LlmProvider::OpenRouter => "OPENROUTER_API_KEY",
            LlmProvider::Grok => "XAI_API_KEY",
            LlmProvider::DeepSeek => "DEEPSEEK_API_KEY",
        }
    }

    /// Model used when none is configured.
    pub fn default_model(&self) -> &'static str {
        match self {
            LlmProvider::Anthropic => "claude-sonnet-4-20250514",
            LlmProvider::OpenAI => "gpt-4o",
            LlmProvider::Gemini => "gemini-2.0-flash-exp",
            LlmProvider::OpenRouter => "anthropic/claude-3.5-sonnet",
            LlmProvider::Grok => "grok-2",
            LlmProvider::DeepSeek => "deepseek-chat",
        }
    }

    /// Whether this provider supports custom base URL
    pub fn supports_base_url(&self) -> bool {
        matches!(self, LlmProvider::OpenAI)
    }
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for LlmProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        LlmProvider::all()
            .into_iter()
            .find(|p| p.id() == wanted)
            .ok_or_else(|| anyhow::anyhow!("unknown LLM provider '{}'", s))
    }
}

/// Which provider and model the AI path talks to.
///
/// ```rust,ignore
/// use planforge_core::models::{LlmProvider, ModelConfig};
///
/// let config = ModelConfig::with_provider(LlmProvider::OpenAI, "gpt-4o")
///     .with_base_url("http://localhost:11434/v1");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelConfig {
    #[serde(default)]
    pub provider: LlmProvider,
    /// Model name (e.g., "claude-sonnet-4-20250514", "gpt-4o")
    pub model: String,
    /// Optional base URL override for OpenAI-compatible APIs
    #[serde(default)]
    pub base_url: Option<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Anthropic,
            model: "claude-sonnet-4-20250514".to_string(),
            base_url: None,
        }
    }
}

impl ModelConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Self::default()
        }
    }

    pub fn with_provider(provider: LlmProvider, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            base_url: None,
        }
    }

    /// Set base URL (for OpenAI-compatible endpoints)
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// True when the provider's API key is present in the environment.
    pub fn has_credentials(&self) -> bool {
        std::env::var(self.provider.api_key_env())
            .map(|v| !v.trim().is_empty())
            .unwrap_or(false)
    }
}
