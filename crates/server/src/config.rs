//! Server configuration.
//!
//! Sources, lowest to highest precedence: built-in defaults,
//! `.planforge/config.json`, environment (`.env` included), CLI flags.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use planforge_core::config::{CoordinatorConfig, StagePlacement};
use planforge_core::models::{LlmProvider, ModelConfig};
use serde::{Deserialize, Serialize};

pub const CONFIG_PATH: &str = ".planforge/config.json";

/// Port each service listens on by default.
pub const ORCHESTRATOR_PORT: u16 = 9001;
pub const MILESTONE_PORT: u16 = 9002;
pub const TASK_PORT: u16 = 9003;
pub const RESOURCE_PORT: u16 = 9004;

/// Every field optional so files and env can override piecemeal.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct PersistedConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placement: Option<StagePlacement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub milestone_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_timeout_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_deadline_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discovery_ttl_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

impl PersistedConfig {
    /// Read the config file. A missing file yields defaults; a file that
    /// is not valid config is an error for the caller to report.
    pub async fn load(path: &Path) -> anyhow::Result<Self> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => serde_json::from_str(&content)
                .with_context(|| format!("parsing {}", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e).with_context(|| format!("reading {}", path.display())),
        }
    }

    pub async fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content)
            .await
            .with_context(|| format!("writing {}", path.display()))
    }

    /// Fields set in `other` win.
    pub fn merge(&mut self, other: PersistedConfig) {
        macro_rules! take {
            ($($field:ident),*) => {
                $(if other.$field.is_some() {
                    self.$field = other.$field;
                })*
            };
        }
        take!(
            provider,
            model,
            base_url,
            ai_enabled,
            placement,
            milestone_url,
            task_url,
            resource_url,
            call_timeout_ms,
            run_deadline_ms,
            discovery_ttl_ms,
            max_retries,
            log_level
        );
    }

    /// Overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    pub fn apply_env_from(&mut self, get: impl Fn(&str) -> Option<String>) {
        let mut env = PersistedConfig {
            provider: get("PLANFORGE_PROVIDER"),
            model: get("PLANFORGE_MODEL"),
            base_url: get("PLANFORGE_BASE_URL"),
            ai_enabled: get("ENABLE_AI_ANALYSIS").and_then(|v| parse_bool(&v)),
            placement: get("PLANFORGE_PLACEMENT").and_then(|v| parse_placement(&v)),
            milestone_url: get("PLANFORGE_MILESTONE_URL"),
            task_url: get("PLANFORGE_TASK_URL"),
            resource_url: get("PLANFORGE_RESOURCE_URL"),
            call_timeout_ms: get("PLANFORGE_CALL_TIMEOUT_MS").and_then(|v| v.trim().parse().ok()),
            run_deadline_ms: get("PLANFORGE_RUN_DEADLINE_MS").and_then(|v| v.trim().parse().ok()),
            discovery_ttl_ms: get("PLANFORGE_DISCOVERY_TTL_MS").and_then(|v| v.trim().parse().ok()),
            max_retries: get("PLANFORGE_MAX_RETRIES").and_then(|v| v.trim().parse().ok()),
            log_level: get("PLANFORGE_LOG_LEVEL"),
        };
        // PLANFORGE_AI_ENABLED wins over the older ENABLE_AI_ANALYSIS.
        if let Some(enabled) = get("PLANFORGE_AI_ENABLED").and_then(|v| parse_bool(&v)) {
            env.ai_enabled = Some(enabled);
        }
        self.merge(env);
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or("info")
    }

    pub fn to_coordinator_config(&self) -> anyhow::Result<CoordinatorConfig> {
        let mut config = CoordinatorConfig::default();

        let provider = match &self.provider {
            Some(raw) => raw.parse::<LlmProvider>()?,
            None => LlmProvider::default(),
        };
        let model = self
            .model
            .clone()
            .unwrap_or_else(|| provider.default_model().to_string());
        let mut model_config = ModelConfig::with_provider(provider, model);
        if let Some(url) = &self.base_url {
            anyhow::ensure!(
                provider.supports_base_url(),
                "provider '{}' does not support a custom base URL",
                provider
            );
            model_config = model_config.with_base_url(url);
        }
        config.analysis.model = model_config;

        if let Some(enabled) = self.ai_enabled {
            config.analysis.ai_enabled = enabled;
        }
        if let Some(placement) = self.placement {
            config.placement = placement;
        }
        if let Some(url) = &self.milestone_url {
            config.services.milestone = url.clone();
        }
        if let Some(url) = &self.task_url {
            config.services.task = url.clone();
        }
        if let Some(url) = &self.resource_url {
            config.services.resource = url.clone();
        }
        if let Some(ms) = self.call_timeout_ms {
            config.call_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = self.run_deadline_ms {
            config.run_deadline = Duration::from_millis(ms);
        }
        if let Some(ms) = self.discovery_ttl_ms {
            config.discovery_ttl = Duration::from_millis(ms);
        }
        if let Some(retries) = self.max_retries {
            config.retry.max_retries = retries;
        }
        Ok(config)
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_placement(raw: &str) -> Option<StagePlacement> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "local" => Some(StagePlacement::Local),
        "remote" => Some(StagePlacement::Remote),
        _ => None,
    }
}
