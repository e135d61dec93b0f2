//! # Configuration
//!
//! Everything a run needs is threaded through [`CoordinatorConfig`]:
//! service addresses, timeouts, retry policy, and whether stages may
//! try the AI path. Nothing here is read from globals.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::models::ModelConfig;
use crate::skills::StageKind;

/// Serde helper: `Duration` as integer milliseconds.
mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// Base addresses of the worker services.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceEndpoints {
    pub milestone: String,
    pub task: String,
    pub resource: String,
}

impl Default for ServiceEndpoints {
    fn default() -> Self {
        Self {
            milestone: "http://127.0.0.1:9002".to_string(),
            task: "http://127.0.0.1:9003".to_string(),
            resource: "http://127.0.0.1:9004".to_string(),
        }
    }
}

impl ServiceEndpoints {
    /// Address of the service running `stage`, if it is a remote one.
    pub fn address_for(&self, stage: StageKind) -> Option<&str> {
        match stage {
            StageKind::MissionAnalysis => None,
            StageKind::MilestonePlanning => Some(&self.milestone),
            StageKind::TaskBreakdown => Some(&self.task),
            StageKind::ResourceAllocation => Some(&self.resource),
        }
    }
}

/// Where the three worker stages execute.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StagePlacement {
    /// Call the worker services over HTTP.
    #[default]
    Remote,
    /// Run every stage inside this process.
    Local,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Backoff {
    Linear,
    #[default]
    Exponential,
}

/// Bounded retry for transport failures.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    #[serde(with = "duration_ms", rename = "base_delay_ms")]
    pub base_delay: Duration,
    #[serde(with = "duration_ms", rename = "max_delay_ms")]
    pub max_delay: Duration,
    #[serde(default)]
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(4),
            backoff: Backoff::Exponential,
        }
    }
}

impl RetryPolicy {
    /// No retries at all.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay before retry number `retry` (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let retry = retry.max(1);
        let delay = match self.backoff {
            Backoff::Linear => self.base_delay.saturating_mul(retry),
            Backoff::Exponential => {
                let factor = 1u32.checked_shl(retry - 1).unwrap_or(u32::MAX);
                self.base_delay.saturating_mul(factor)
            }
        };
        delay.min(self.max_delay)
    }
}

/// Settings for the AI-vs-fallback split inside every stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnalysisSettings {
    /// When false, stages go straight to rule-based analysis.
    pub ai_enabled: bool,
    /// Upper bound on a single AI attempt.
    #[serde(with = "duration_ms", rename = "ai_timeout_ms")]
    pub ai_timeout: Duration,
    #[serde(default)]
    pub model: ModelConfig,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            ai_enabled: true,
            ai_timeout: Duration::from_secs(15),
            model: ModelConfig::default(),
        }
    }
}

impl AnalysisSettings {
    /// Rule-based only.
    pub fn rules_only() -> Self {
        Self {
            ai_enabled: false,
            ..Self::default()
        }
    }
}

/// Configuration for the coordinator
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CoordinatorConfig {
    #[serde(default)]
    pub services: ServiceEndpoints,
    #[serde(default)]
    pub placement: StagePlacement,
    /// Timeout for one remote attempt.
    #[serde(with = "duration_ms", rename = "call_timeout_ms")]
    pub call_timeout: Duration,
    /// Timeout for fetching a service card.
    #[serde(with = "duration_ms", rename = "discovery_timeout_ms")]
    pub discovery_timeout: Duration,
    /// How long a fetched card stays fresh.
    #[serde(with = "duration_ms", rename = "discovery_ttl_ms")]
    pub discovery_ttl: Duration,
    /// Wall-clock budget for a whole run.
    #[serde(with = "duration_ms", rename = "run_deadline_ms")]
    pub run_deadline: Duration,
    #[serde(default)]
    pub retry: RetryPolicy,
    #[serde(default)]
    pub analysis: AnalysisSettings,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            services: ServiceEndpoints::default(),
            placement: StagePlacement::Remote,
            call_timeout: Duration::from_secs(20),
            discovery_timeout: Duration::from_secs(5),
            discovery_ttl: Duration::from_secs(300),
            run_deadline: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            analysis: AnalysisSettings::default(),
        }
    }
}

impl CoordinatorConfig {
    /// Everything in-process, no AI. Handy for offline runs.
    pub fn local_rules_only() -> Self {
        Self {
            placement: StagePlacement::Local,
            analysis: AnalysisSettings::rules_only(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_backoff_is_capped() {
        let policy = RetryPolicy {
            max_retries: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(350),
            backoff: Backoff::Exponential,
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(350));
        assert_eq!(policy.delay_for(40), Duration::from_millis(350));
    }

    #[test]
    fn test_linear_backoff() {
        let policy = RetryPolicy {
            backoff: Backoff::Linear,
            base_delay: Duration::from_millis(50),
            ..RetryPolicy::default()
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(50));
        assert_eq!(policy.delay_for(3), Duration::from_millis(150));
        assert_eq!(policy.max_attempts(), 3);
    }

    #[test]
    fn test_unbounded_retries_do_not_overflow() {
        let policy = RetryPolicy {
            max_retries: u32::MAX,
            ..RetryPolicy::default()
        };
        assert_eq!(policy.max_attempts(), u32::MAX);
        assert!(policy.delay_for(u32::MAX) <= policy.max_delay);
    }

    #[test]
    fn test_config_roundtrips_through_json() {
        let config = CoordinatorConfig::local_rules_only();
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["run_deadline_ms"], 30_000);
        assert_eq!(json["placement"], "local");

        let back: CoordinatorConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_address_for_stage() {
        let endpoints = ServiceEndpoints::default();
        assert_eq!(endpoints.address_for(StageKind::MissionAnalysis), None);
        assert_eq!(
            endpoints.address_for(StageKind::TaskBreakdown),
            Some("http://127.0.0.1:9003")
        );
    }
}
