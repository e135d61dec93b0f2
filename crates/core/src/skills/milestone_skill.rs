//! # Milestone Planning
//!
//! Turns a mission analysis into an ordered, dated milestone chain.

use std::sync::Arc;

use chrono::{Duration as ChronoDuration, NaiveDate};

use super::llm::LlmAnalyst;
use super::stage::{AnalysisStage, RuleStrategy};
use super::{StageContext, StageKind};
use crate::config::AnalysisSettings;
use crate::plan::milestones::DATE_FORMAT;
use crate::plan::{Milestone, MilestonePlan, MissionAnalysis, PhaseFlags, Priority};

struct PhaseTemplate {
    name: &'static str,
    description: &'static str,
    weight: u32,
    priority: Priority,
    criteria: &'static [&'static str],
    included: fn(&PhaseFlags) -> bool,
}

const PHASES: &[PhaseTemplate] = &[
    PhaseTemplate {
        name: "Planning & Research",
        description: "Project initiation, requirements gathering, and research",
        weight: 2,
        priority: Priority::High,
        criteria: &["Requirements signed off", "Open technical questions answered"],
        included: |f| f.research,
    },
    PhaseTemplate {
        name: "Design & Architecture",
        description: "System design, architecture planning, and technical specifications",
        weight: 2,
        priority: Priority::High,
        criteria: &["Architecture documented", "Data model reviewed"],
        included: |_| true,
    },
    PhaseTemplate {
        name: "Development Phase",
        description: "Core development and implementation of features",
        weight: 4,
        priority: Priority::Medium,
        criteria: &["All planned features implemented", "Code reviewed and merged"],
        included: |f| f.development,
    },
    PhaseTemplate {
        name: "Testing & Quality Assurance",
        description: "Testing, bug fixes, and quality assurance",
        weight: 2,
        priority: Priority::Medium,
        criteria: &["Test suite passing", "No open critical defects"],
        included: |f| f.testing,
    },
    PhaseTemplate {
        name: "Deployment & Launch",
        description: "Deployment, launch preparation, and go-live",
        weight: 1,
        priority: Priority::High,
        criteria: &["Production deployment complete", "Monitoring in place"],
        included: |f| f.deployment,
    },
];

/// Phase-template milestone planning.
#[derive(Debug, Clone, Copy, Default)]
pub struct MilestoneRules;

impl RuleStrategy<MissionAnalysis, MilestonePlan> for MilestoneRules {
    fn compute(&self, analysis: &MissionAnalysis, ctx: &StageContext) -> MilestonePlan {
        let phases: Vec<&PhaseTemplate> = PHASES
            .iter()
            .filter(|p| (p.included)(&analysis.phases))
            .collect();

        let total_weight: u32 = phases.iter().map(|p| p.weight).sum();
        let total_weeks = analysis.schedule_weeks();

        let mut milestones: Vec<Milestone> = Vec::with_capacity(phases.len());
        let mut elapsed_weeks = 0u32;
        for phase in phases {
            let weighted = total_weeks.saturating_mul(phase.weight);
            let share = f64::from(weighted) / f64::from(total_weight.max(1));
            let duration_weeks = (share.round() as u32).max(1);
            elapsed_weeks = elapsed_weeks.saturating_add(duration_weeks);

            let deadline = ctx
                .start_date
                .checked_add_signed(ChronoDuration::weeks(elapsed_weeks as i64))
                .unwrap_or(NaiveDate::MAX);
            milestones.push(Milestone {
                name: phase.name.to_string(),
                description: phase.description.to_string(),
                duration_weeks,
                dependencies: milestones.last().map(|m| vec![m.name.clone()]).unwrap_or_default(),
                deadline: deadline.format(DATE_FORMAT).to_string(),
                success_criteria: phase.criteria.iter().map(|c| c.to_string()).collect(),
                priority: phase.priority,
            });
        }

        MilestonePlan { milestones }
    }
}

pub fn stage(settings: &AnalysisSettings) -> AnalysisStage<MissionAnalysis, MilestonePlan> {
    let stage = AnalysisStage::new(StageKind::MilestonePlanning, Arc::new(MilestoneRules));
    if settings.ai_enabled {
        stage.with_ai(
            Arc::new(LlmAnalyst::new(settings.model.clone())),
            settings.ai_timeout,
        )
    } else {
        stage
    }
}
