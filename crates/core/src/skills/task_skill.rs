//! # Task Breakdown
//!
//! Expands a milestone plan into estimated, skill-tagged tasks.
//!
//! ```text
//! base tasks ─► domain tasks ─► common tasks ─► (deployment)
//! ```
//!
//! Each task depends only on titles listed before it, and is attached to
//! the milestone whose phase it belongs to.

use std::sync::Arc;

use super::llm::LlmAnalyst;
use super::stage::{AnalysisStage, RuleStrategy};
use super::{StageContext, StageKind, TaskInput};
use crate::config::AnalysisSettings;
use crate::plan::{Complexity, MilestonePlan, Priority, ProjectDomain, Task, TaskBreakdown};

/// Delivery phase a task belongs to, in milestone order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Research = 0,
    Design = 1,
    Development = 2,
    Testing = 3,
    Deployment = 4,
}

impl Phase {
    fn milestone_name(self) -> &'static str {
        match self {
            Phase::Research => "Planning & Research",
            Phase::Design => "Design & Architecture",
            Phase::Development => "Development Phase",
            Phase::Testing => "Testing & Quality Assurance",
            Phase::Deployment => "Deployment & Launch",
        }
    }
}

struct TaskTemplate {
    title: &'static str,
    description: &'static str,
    hours: f64,
    complex_hours: f64,
    priority: Priority,
    skills: &'static [&'static str],
    depends_on: &'static [&'static str],
    phase: Phase,
}

const REQUIREMENTS: &str = "Requirements Analysis and Documentation";
const ARCHITECTURE: &str = "Technical Architecture Design";

const BASE_TASKS: &[TaskTemplate] = &[
    TaskTemplate {
        title: REQUIREMENTS,
        description: "Capture functional and non-functional requirements",
        hours: 12.0,
        complex_hours: 16.0,
        priority: Priority::High,
        skills: &["business_analysis", "documentation"],
        depends_on: &[],
        phase: Phase::Research,
    },
    TaskTemplate {
        title: ARCHITECTURE,
        description: "Define components, data flow, and technology choices",
        hours: 16.0,
        complex_hours: 24.0,
        priority: Priority::High,
        skills: &["system_design", "architecture"],
        depends_on: &[REQUIREMENTS],
        phase: Phase::Design,
    },
];

const BLOCKCHAIN_TASKS: &[TaskTemplate] = &[
    TaskTemplate {
        title: "Smart Contract Architecture",
        description: "Design contract boundaries, storage layout, and upgrade path",
        hours: 32.0,
        complex_hours: 32.0,
        priority: Priority::High,
        skills: &["solidity", "blockchain_architecture"],
        depends_on: &[ARCHITECTURE],
        phase: Phase::Design,
    },
    TaskTemplate {
        title: "Smart Contract Development",
        description: "Implement and unit test the contracts",
        hours: 80.0,
        complex_hours: 80.0,
        priority: Priority::High,
        skills: &["solidity", "smart_contract_development"],
        depends_on: &["Smart Contract Architecture"],
        phase: Phase::Development,
    },
    TaskTemplate {
        title: "Security Audit Preparation",
        description: "Threat model, static analysis, and audit package",
        hours: 24.0,
        complex_hours: 24.0,
        priority: Priority::Urgent,
        skills: &["security_audit", "smart_contract_testing"],
        depends_on: &["Smart Contract Development"],
        phase: Phase::Testing,
    },
];

const ECOMMERCE_TASKS: &[TaskTemplate] = &[
    TaskTemplate {
        title: "Payment Gateway Integration",
        description: "Integrate payment provider with refunds and webhooks",
        hours: 40.0,
        complex_hours: 40.0,
        priority: Priority::High,
        skills: &["payment_integration", "security"],
        depends_on: &[ARCHITECTURE],
        phase: Phase::Development,
    },
    TaskTemplate {
        title: "Product Catalog System",
        description: "Products, categories, search, and inventory",
        hours: 48.0,
        complex_hours: 48.0,
        priority: Priority::High,
        skills: &["backend_development", "database_design"],
        depends_on: &[ARCHITECTURE],
        phase: Phase::Development,
    },
    TaskTemplate {
        title: "Shopping Cart & Checkout Flow",
        description: "Cart persistence, checkout steps, and order confirmation",
        hours: 36.0,
        complex_hours: 36.0,
        priority: Priority::Medium,
        skills: &["frontend_development", "ux_design"],
        depends_on: &["Product Catalog System"],
        phase: Phase::Development,
    },
];

const MOBILE_TASKS: &[TaskTemplate] = &[
    TaskTemplate {
        title: "Cross-Platform Framework Setup",
        description: "Project scaffolding, navigation, and build pipeline",
        hours: 16.0,
        complex_hours: 16.0,
        priority: Priority::High,
        skills: &["mobile_development", "react_native"],
        depends_on: &[ARCHITECTURE],
        phase: Phase::Development,
    },
    TaskTemplate {
        title: "Mobile UI/UX Implementation",
        description: "Screens, offline states, and platform conventions",
        hours: 60.0,
        complex_hours: 60.0,
        priority: Priority::Medium,
        skills: &["mobile_ui", "user_experience"],
        depends_on: &["Cross-Platform Framework Setup"],
        phase: Phase::Development,
    },
];

const AI_TASKS: &[TaskTemplate] = &[
    TaskTemplate {
        title: "Data Pipeline and Model Evaluation",
        description: "Collect data, select a model, and define evaluation metrics",
        hours: 40.0,
        complex_hours: 56.0,
        priority: Priority::High,
        skills: &["machine_learning", "data_modeling"],
        depends_on: &[ARCHITECTURE],
        phase: Phase::Development,
    },
];

const IOT_TASKS: &[TaskTemplate] = &[
    TaskTemplate {
        title: "Device Communication Layer",
        description: "Device provisioning, telemetry ingestion, and command channel",
        hours: 40.0,
        complex_hours: 56.0,
        priority: Priority::High,
        skills: &["embedded_systems", "infrastructure"],
        depends_on: &[ARCHITECTURE],
        phase: Phase::Development,
    },
];

const ENTERPRISE_TASKS: &[TaskTemplate] = &[
    TaskTemplate {
        title: "Systems Integration and SSO",
        description: "Connect existing systems and single sign-on",
        hours: 32.0,
        complex_hours: 48.0,
        priority: Priority::High,
        skills: &["integration_testing", "security"],
        depends_on: &[ARCHITECTURE],
        phase: Phase::Development,
    },
];

const WEB_TASKS: &[TaskTemplate] = &[
    TaskTemplate {
        title: "Frontend Pages and Layout",
        description: "Responsive pages, navigation, and shared components",
        hours: 24.0,
        complex_hours: 36.0,
        priority: Priority::Medium,
        skills: &["frontend_development", "ui_design"],
        depends_on: &[ARCHITECTURE],
        phase: Phase::Development,
    },
];

const AUTH_TASK: TaskTemplate = TaskTemplate {
    title: "User Authentication and Authorization",
    description: "Sign-up, login, password reset, and role checks",
    hours: 20.0,
    complex_hours: 32.0,
    priority: Priority::High,
    skills: &["security", "backend_development"],
    depends_on: &[ARCHITECTURE],
    phase: Phase::Development,
};

const COMMON_TASKS: &[TaskTemplate] = &[
    TaskTemplate {
        title: "Database Design and Implementation",
        description: "Schema, migrations, and data access layer",
        hours: 20.0,
        complex_hours: 28.0,
        priority: Priority::High,
        skills: &["database_design", "sql"],
        depends_on: &[ARCHITECTURE],
        phase: Phase::Development,
    },
    TaskTemplate {
        title: "API Development and Integration",
        description: "Service endpoints and client integration",
        hours: 28.0,
        complex_hours: 40.0,
        priority: Priority::High,
        skills: &["api_development", "backend_development"],
        depends_on: &["Database Design and Implementation"],
        phase: Phase::Development,
    },
    TaskTemplate {
        title: "Testing Strategy Implementation",
        description: "Unit, integration, and end-to-end test suites",
        hours: 32.0,
        complex_hours: 32.0,
        priority: Priority::Medium,
        skills: &["testing", "test_automation"],
        depends_on: &["API Development and Integration"],
        phase: Phase::Testing,
    },
];

const DEPLOY_TASK: TaskTemplate = TaskTemplate {
    title: "Deployment Pipeline and Release",
    description: "CI/CD, environment provisioning, and launch checklist",
    hours: 16.0,
    complex_hours: 24.0,
    priority: Priority::High,
    skills: &["devops", "deployment"],
    depends_on: &["Testing Strategy Implementation"],
    phase: Phase::Deployment,
};

fn domain_tasks(domain: ProjectDomain) -> &'static [TaskTemplate] {
    match domain {
        ProjectDomain::Blockchain => BLOCKCHAIN_TASKS,
        ProjectDomain::Ecommerce => ECOMMERCE_TASKS,
        ProjectDomain::Mobile => MOBILE_TASKS,
        ProjectDomain::Ai => AI_TASKS,
        ProjectDomain::Iot => IOT_TASKS,
        ProjectDomain::Enterprise => ENTERPRISE_TASKS,
        ProjectDomain::Web => WEB_TASKS,
        ProjectDomain::General => &[],
    }
}

/// Milestone a phase maps onto. Prefers the phase's own milestone, then
/// falls back to a proportional position in whatever plan was supplied.
fn milestone_for(phase: Phase, plan: &MilestonePlan) -> Option<String> {
    if plan.milestones.is_empty() {
        return None;
    }
    if let Some(m) = plan.milestones.iter().find(|m| m.name == phase.milestone_name()) {
        return Some(m.name.clone());
    }
    let len = plan.milestones.len();
    let index = ((phase as usize) * len / 5).min(len - 1);
    Some(plan.milestones[index].name.clone())
}

fn mentions_auth(text: &str) -> bool {
    let lowered = text.to_lowercase();
    ["auth", "login", "sign-in", "sign in", "account"]
        .iter()
        .any(|t| lowered.contains(t))
}

/// Template-driven task breakdown.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskRules;

impl RuleStrategy<TaskInput, TaskBreakdown> for TaskRules {
    fn compute(&self, input: &TaskInput, _ctx: &StageContext) -> TaskBreakdown {
        let analysis = &input.analysis;
        let complex = analysis.complexity == Complexity::Complex;

        let mut templates: Vec<&TaskTemplate> = BASE_TASKS.iter().collect();
        templates.extend(domain_tasks(analysis.domain).iter());
        if mentions_auth(&analysis.mission) {
            templates.push(&AUTH_TASK);
        }
        templates.extend(COMMON_TASKS.iter());
        if analysis.phases.deployment {
            templates.push(&DEPLOY_TASK);
        }

        let weeks = analysis.schedule_weeks();
        let (scale, demote) = if weeks < 8 {
            (0.8, true)
        } else if weeks > 16 {
            (1.2, false)
        } else {
            (1.0, false)
        };

        let tasks = templates
            .into_iter()
            .map(|t| {
                let base = if complex { t.complex_hours } else { t.hours };
                let priority = if demote && t.priority == Priority::Medium {
                    t.priority.lowered()
                } else {
                    t.priority
                };
                Task {
                    title: t.title.to_string(),
                    description: t.description.to_string(),
                    priority,
                    estimated_hours: (base * scale * 10.0).round() / 10.0,
                    dependencies: t.depends_on.iter().map(|d| d.to_string()).collect(),
                    skills_required: t.skills.iter().map(|s| s.to_string()).collect(),
                    milestone: milestone_for(t.phase, &input.milestones),
                }
            })
            .collect();

        TaskBreakdown {
            tasks,
            milestone_names: input.milestones.names(),
        }
    }
}

pub fn stage(settings: &AnalysisSettings) -> AnalysisStage<TaskInput, TaskBreakdown> {
    let stage = AnalysisStage::new(StageKind::TaskBreakdown, Arc::new(TaskRules));
    if settings.ai_enabled {
        stage.with_ai(
            Arc::new(LlmAnalyst::new(settings.model.clone())),
            settings.ai_timeout,
        )
    } else {
        stage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{Mission, Validate};
    use crate::skills::{MilestoneRules, MissionRules};

    fn breakdown_for(text: &str) -> TaskBreakdown {
        let ctx = StageContext::new("t");
        let analysis = MissionRules.compute(&Mission::new(text).unwrap(), &ctx);
        let milestones = MilestoneRules.compute(&analysis, &ctx);
        TaskRules.compute(&TaskInput { analysis, milestones }, &ctx)
    }

    #[test]
    fn test_blog_breakdown_is_valid() {
        let breakdown = breakdown_for("Create a simple blog with user authentication.");
        assert!(breakdown.validate().is_ok());
        assert!(breakdown
            .tasks
            .iter()
            .any(|t| t.title == "User Authentication and Authorization"));
        // Four-week timeline shrinks estimates.
        let requirements = &breakdown.tasks[0];
        assert_eq!(requirements.estimated_hours, 9.6);
    }

    #[test]
    fn test_research_task_maps_to_nearest_milestone_when_phase_absent() {
        let breakdown = breakdown_for("Create a simple blog");
        assert_eq!(
            breakdown.tasks[0].milestone.as_deref(),
            Some("Design & Architecture")
        );
    }

    #[test]
    fn test_ecommerce_tasks_are_included() {
        let breakdown = breakdown_for("Build an online store with a shopping cart within 20 weeks");
        assert!(breakdown.validate().is_ok());
        let titles: Vec<_> = breakdown.tasks.iter().map(|t| t.title.as_str()).collect();
        assert!(titles.contains(&"Payment Gateway Integration"));
        let testing = breakdown
            .tasks
            .iter()
            .find(|t| t.title == "Testing Strategy Implementation")
            .unwrap();
        assert_eq!(testing.estimated_hours, 38.4);
    }

    #[test]
    fn test_short_timeline_demotes_medium_priorities() {
        let find = |b: &TaskBreakdown| {
            b.tasks
                .iter()
                .find(|t| t.title == "Testing Strategy Implementation")
                .map(|t| t.priority)
        };
        let short = breakdown_for("Create a simple blog");
        assert_eq!(find(&short), Some(Priority::Low));

        let long = breakdown_for("Create a simple blog within 12 weeks");
        assert_eq!(find(&long), Some(Priority::Medium));
    }
}
