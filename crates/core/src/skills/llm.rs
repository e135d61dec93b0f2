//! # LLM Analysis
//!
//! The AI-assisted path of every stage. Each call is a single structured
//! `LlmFunction` round trip; the provider is picked from [`ModelConfig`].
//!
//! Errors are returned as-is. The surrounding [`AnalysisStage`] turns any
//! failure into a rule-based fallback.
//!
//! [`AnalysisStage`]: super::stage::AnalysisStage

use async_trait::async_trait;
use serde::Serialize;

use super::prompts;
use super::stage::AiStrategy;
use super::{ResourceInput, StageContext, TaskInput};
use crate::models::ModelConfig;
use crate::plan::{MilestonePlan, Mission, MissionAnalysis, ResourceAllocation, TaskBreakdown};

/// Run an `LlmFunction` producing `$output_type` against the configured
/// provider. Expands to an `anyhow::Result<$output_type>`.
#[macro_export]
macro_rules! run_llm_function {
    ($config:expr, $output_type:ty, $system_prompt:expr, $input:expr) => {{
        use radkit::agent::LlmFunction;
        use radkit::models::providers::{
            AnthropicLlm, DeepSeekLlm, GeminiLlm, GrokLlm, OpenAILlm, OpenRouterLlm,
        };
        use $crate::models::LlmProvider;

        let config: &$crate::models::ModelConfig = $config;
        let input = $input;
        tracing::debug!(provider = %config.provider, model = %config.model, "LLM call");

        let result: anyhow::Result<$output_type> = match config.provider {
            LlmProvider::Anthropic => {
                let llm = AnthropicLlm::from_env(&config.model)?;
                LlmFunction::<$output_type>::new_with_system_instructions(llm, $system_prompt)
                    .run(input)
                    .await
                    .map_err(Into::into)
            }
            LlmProvider::OpenAI => {
                let mut llm = OpenAILlm::from_env(&config.model)?;
                if let Some(base_url) = &config.base_url {
                    llm = llm.with_base_url(base_url);
                }
                LlmFunction::<$output_type>::new_with_system_instructions(llm, $system_prompt)
                    .run(input)
                    .await
                    .map_err(Into::into)
            }
            LlmProvider::Gemini => {
                let llm = GeminiLlm::from_env(&config.model)?;
                LlmFunction::<$output_type>::new_with_system_instructions(llm, $system_prompt)
                    .run(input)
                    .await
                    .map_err(Into::into)
            }
            LlmProvider::OpenRouter => {
                let llm = OpenRouterLlm::from_env(&config.model)?;
                LlmFunction::<$output_type>::new_with_system_instructions(llm, $system_prompt)
                    .run(input)
                    .await
                    .map_err(Into::into)
            }
            LlmProvider::Grok => {
                let llm = GrokLlm::from_env(&config.model)?;
                LlmFunction::<$output_type>::new_with_system_instructions(llm, $system_prompt)
                    .run(input)
                    .await
                    .map_err(Into::into)
            }
            LlmProvider::DeepSeek => {
                let llm = DeepSeekLlm::from_env(&config.model)?;
                LlmFunction::<$output_type>::new_with_system_instructions(llm, $system_prompt)
                    .run(input)
                    .await
                    .map_err(Into::into)
            }
        };
        result
    }};
}

/// AI analyst for all four stages.
#[derive(Debug, Clone)]
pub struct LlmAnalyst {
    config: ModelConfig,
}

impl LlmAnalyst {
    pub fn new(config: ModelConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Fail fast without a network round trip when no key is configured.
    fn ensure_credentials(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.config.has_credentials(),
            "{} is not set",
            self.config.provider.api_key_env()
        );
        Ok(())
    }
}

/// User message: schedule anchor plus the stage input as JSON.
fn user_message<T: Serialize>(heading: &str, input: &T, ctx: &StageContext) -> anyhow::Result<String> {
    Ok(format!(
        "Project start date: {}\n\n{}:\n{}",
        ctx.start_date.format("%Y-%m-%d"),
        heading,
        serde_json::to_string_pretty(input)?
    ))
}

#[async_trait]
impl AiStrategy<Mission, MissionAnalysis> for LlmAnalyst {
    async fn analyze(&self, mission: &Mission, _ctx: &StageContext) -> anyhow::Result<MissionAnalysis> {
        self.ensure_credentials()?;
        let prompt = format!("Mission:\n{}", mission.text());
        let mut analysis =
            crate::run_llm_function!(&self.config, MissionAnalysis, prompts::MISSION_ANALYST, prompt)?;
        analysis.mission = mission.text().to_string();
        Ok(analysis)
    }
}

#[async_trait]
impl AiStrategy<MissionAnalysis, MilestonePlan> for LlmAnalyst {
    async fn analyze(
        &self,
        analysis: &MissionAnalysis,
        ctx: &StageContext,
    ) -> anyhow::Result<MilestonePlan> {
        self.ensure_credentials()?;
        let prompt = user_message("Mission analysis", analysis, ctx)?;
        crate::run_llm_function!(&self.config, MilestonePlan, prompts::MILESTONE_PLANNER, prompt)
    }
}

#[async_trait]
impl AiStrategy<TaskInput, TaskBreakdown> for LlmAnalyst {
    async fn analyze(&self, input: &TaskInput, ctx: &StageContext) -> anyhow::Result<TaskBreakdown> {
        self.ensure_credentials()?;
        let prompt = user_message("Mission analysis and milestones", input, ctx)?;
        let mut breakdown =
            crate::run_llm_function!(&self.config, TaskBreakdown, prompts::TASK_PLANNER, prompt)?;
        // Milestone references are checked against the plan, not the model's copy.
        breakdown.milestone_names = input.milestones.names();
        Ok(breakdown)
    }
}

#[async_trait]
impl AiStrategy<ResourceInput, ResourceAllocation> for LlmAnalyst {
    async fn analyze(
        &self,
        input: &ResourceInput,
        ctx: &StageContext,
    ) -> anyhow::Result<ResourceAllocation> {
        self.ensure_credentials()?;
        let prompt = user_message("Mission analysis and tasks", input, ctx)?;
        crate::run_llm_function!(&self.config, ResourceAllocation, prompts::RESOURCE_PLANNER, prompt)
    }
}
