//! # Resource Allocation
//!
//! Staffs the task breakdown from the roster, then prices and schedules
//! the result.
//!
//! Members are ranked by how many required skills they bring. Teams are
//! never empty: when too few people match, the remainder is filled from
//! the roster by seniority.

use std::cmp::Reverse;
use std::collections::HashSet;
use std::sync::Arc;

use super::llm::LlmAnalyst;
use super::roster;
use super::stage::{AnalysisStage, RuleStrategy};
use super::{ResourceInput, StageContext, StageKind};
use crate::config::AnalysisSettings;
use crate::plan::{Complexity, Member, ResourceAllocation, Seniority, StaffingPhase, Team};

fn seniority_rank(seniority: Seniority) -> u8 {
    match seniority {
        Seniority::Senior => 0,
        Seniority::Specialist => 1,
        Seniority::Mid => 2,
        Seniority::Analyst => 3,
    }
}

struct Candidate {
    member: Member,
    matched: usize,
}

impl Candidate {
    fn has(&self, skill: &str) -> bool {
        self.member.skills.iter().any(|s| s == skill)
    }
}

/// Roster ordered by skill match, then seniority, then roster order.
fn ranked(required: &HashSet<String>) -> Vec<Candidate> {
    let mut candidates: Vec<Candidate> = roster::available()
        .into_iter()
        .map(|member| {
            let matched = member.skills.iter().filter(|s| required.contains(*s)).count();
            Candidate { member, matched }
        })
        .collect();
    candidates.sort_by_key(|c| (Reverse(c.matched), seniority_rank(c.member.seniority)));
    candidates
}

fn team(name: &str, role: &str, members: Vec<Member>, lead: Option<&str>) -> Team {
    let lead = lead
        .map(str::to_string)
        .or_else(|| members.first().map(|m| m.name.clone()))
        .unwrap_or_default();
    Team {
        name: name.to_string(),
        role: role.to_string(),
        members,
        lead,
    }
}

fn staffing(weeks: u32, headcount: u32) -> Vec<StaffingPhase> {
    let weeks = weeks.max(1);
    let edge = (weeks / 4).max(1);
    let ramp_end = edge;
    let full_end = weeks.saturating_sub(edge).max(ramp_end);
    let reduced = (headcount / 2).max(1);

    [
        ("Ramp-up", 1, ramp_end, reduced),
        ("Full delivery", ramp_end + 1, full_end, headcount),
        ("Stabilization", full_end + 1, weeks, reduced),
    ]
    .into_iter()
    .filter(|(_, start, end, _)| start <= end)
    .map(|(name, start_week, end_week, headcount)| StaffingPhase {
        name: name.to_string(),
        start_week,
        end_week,
        headcount,
    })
    .collect()
}

/// Skill-matching team builder.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResourceRules;

impl ResourceRules {
    fn teams(&self, complexity: Complexity, team_size: u32, candidates: Vec<Candidate>) -> Vec<Team> {
        let size = (team_size.max(1) as usize).min(candidates.len());
        match complexity {
            Complexity::Simple => {
                let members = candidates.into_iter().take(size).map(|c| c.member).collect();
                vec![team("Small Development Team", "Full-stack delivery", members, None)]
            }
            Complexity::Medium => {
                let members = candidates.into_iter().take(size).map(|c| c.member).collect();
                vec![team("Development Team", "Design, build, and ship", members, None)]
            }
            Complexity::Complex => {
                let core_size = size.saturating_sub(2).max(3).min(candidates.len());
                let (core, rest): (Vec<_>, Vec<_>) = candidates
                    .into_iter()
                    .enumerate()
                    .partition(|(i, _)| *i < core_size);

                let lead = core
                    .iter()
                    .find(|(_, c)| c.has("architecture"))
                    .map(|(_, c)| c.member.name.clone());
                let core_members: Vec<Member> = core.into_iter().map(|(_, c)| c.member).collect();
                let mut teams = vec![team(
                    "Core Development Team",
                    "Architecture and feature delivery",
                    core_members,
                    lead.as_deref(),
                )];

                let testers: Vec<Member> = rest
                    .into_iter()
                    .map(|(_, c)| c)
                    .filter(|c| c.has("testing") || c.has("test_automation"))
                    .take(2)
                    .map(|c| c.member)
                    .collect();
                if !testers.is_empty() {
                    teams.push(team(
                        "QA & Testing Team",
                        "Test strategy, automation, and release sign-off",
                        testers,
                        None,
                    ));
                }
                teams
            }
        }
    }
}

impl RuleStrategy<ResourceInput, ResourceAllocation> for ResourceRules {
    fn compute(&self, input: &ResourceInput, _ctx: &StageContext) -> ResourceAllocation {
        let analysis = &input.analysis;

        let mut required: Vec<String> = input.tasks.required_skills();
        for skill in &analysis.required_skills {
            if !required.contains(skill) {
                required.push(skill.clone());
            }
        }
        let required_set: HashSet<String> = required.iter().cloned().collect();

        let teams = self.teams(
            analysis.complexity,
            analysis.recommended_team_size,
            ranked(&required_set),
        );

        let members: Vec<&Member> = teams.iter().flat_map(|t| t.members.iter()).collect();
        let total_members = members.len() as u32;

        let hours_each = input.tasks.total_hours() / f64::from(total_members.max(1));
        let estimated_cost = members
            .iter()
            .map(|m| m.seniority.hourly_rate() * hours_each)
            .sum::<f64>();
        let estimated_cost = (estimated_cost * 100.0).round() / 100.0;

        let covered: HashSet<&str> = members
            .iter()
            .flat_map(|m| m.skills.iter())
            .map(String::as_str)
            .collect();
        let missing: Vec<&str> = required
            .iter()
            .map(String::as_str)
            .filter(|s| !covered.contains(s))
            .collect();
        let skill_coverage = if required.is_empty() {
            1.0
        } else {
            (required.len() - missing.len()) as f64 / required.len() as f64
        };

        let mut recommendations = Vec::new();
        if total_members < 3 {
            recommendations
                .push("Consider adding a team member to reduce single-person dependencies".to_string());
        }
        if total_members > 8 {
            recommendations.push(
                "Large team: budget for coordination overhead and split into sub-teams".to_string(),
            );
        }
        if !missing.is_empty() {
            recommendations.push(format!(
                "Hire or train for uncovered skills: {}",
                missing.join(", ")
            ));
        }
        recommendations.push("Hold short weekly planning and review meetings".to_string());
        recommendations.push("Run the work in two-week agile iterations".to_string());

        ResourceAllocation {
            staffing: staffing(analysis.schedule_weeks(), total_members),
            teams,
            total_members,
            estimated_cost,
            skill_coverage,
            recommendations,
        }
    }
}

pub fn stage(settings: &AnalysisSettings) -> AnalysisStage<ResourceInput, ResourceAllocation> {
    let stage = AnalysisStage::new(StageKind::ResourceAllocation, Arc::new(ResourceRules));
    if settings.ai_enabled {
        stage.with_ai(
            Arc::new(LlmAnalyst::new(settings.model.clone())),
            settings.ai_timeout,
        )
    } else {
        stage
    }
}
