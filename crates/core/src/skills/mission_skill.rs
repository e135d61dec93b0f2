//! # Mission Analysis
//!
//! Classifies a mission by complexity and domain, estimates duration and
//! team size, and lists the skills and phases it calls for.

use std::sync::Arc;

use super::heuristics;
use super::llm::LlmAnalyst;
use super::stage::{AnalysisStage, RuleStrategy};
use super::{StageContext, StageKind};
use crate::config::AnalysisSettings;
use crate::plan::{Mission, MissionAnalysis, MAX_WEEKS};

/// Keyword-driven mission analysis.
#[derive(Debug, Clone, Copy, Default)]
pub struct MissionRules;

impl RuleStrategy<Mission, MissionAnalysis> for MissionRules {
    fn compute(&self, mission: &Mission, _ctx: &StageContext) -> MissionAnalysis {
        let text = mission.text();
        let complexity = heuristics::complexity(text);
        let domain = heuristics::domain(text);
        let estimated_weeks = heuristics::explicit_weeks(text)
            .unwrap_or_else(|| complexity.default_weeks())
            .min(MAX_WEEKS);

        let mut required_skills: Vec<String> = heuristics::domain_skills(domain)
            .iter()
            .map(|s| s.to_string())
            .collect();
        for skill in heuristics::mentioned_skills(text) {
            if !required_skills.contains(&skill) {
                required_skills.push(skill);
            }
        }

        MissionAnalysis {
            mission: text.to_string(),
            complexity,
            domain,
            estimated_weeks,
            key_technologies: heuristics::domain_technologies(domain)
                .iter()
                .map(|s| s.to_string())
                .collect(),
            required_skills,
            phases: heuristics::phases(text, complexity),
            risk_factors: heuristics::risk_factors(text, complexity, domain),
            recommended_team_size: complexity.team_size(),
        }
    }
}

pub fn stage(settings: &AnalysisSettings) -> AnalysisStage<Mission, MissionAnalysis> {
    let stage = AnalysisStage::new(StageKind::MissionAnalysis, Arc::new(MissionRules));
    if settings.ai_enabled {
        stage.with_ai(
            Arc::new(LlmAnalyst::new(settings.model.clone())),
            settings.ai_timeout,
        )
    } else {
        stage
    }
}
