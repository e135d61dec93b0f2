//! Team composition and cost.

use std::collections::HashSet;

use radkit::macros::LLMOutput;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{require_non_empty, require_non_negative, Validate};
use crate::error::ArtifactError;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, LLMOutput,
)]
#[serde(rename_all = "snake_case")]
pub enum Seniority {
    Senior,
    #[default]
    Mid,
    Specialist,
    Analyst,
}

impl Seniority {
    /// Hourly rate used for cost estimates.
    pub fn hourly_rate(self) -> f64 {
        match self {
            Seniority::Senior => 150.0,
            Seniority::Mid => 100.0,
            Seniority::Specialist => 120.0,
            Seniority::Analyst => 90.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, LLMOutput)]
pub struct Member {
    pub name: String,
    #[serde(default)]
    pub seniority: Seniority,
    #[serde(default)]
    pub skills: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, LLMOutput)]
pub struct Team {
    pub name: String,
    pub role: String,
    pub members: Vec<Member>,
    /// Must be the name of one of `members`
    pub lead: String,
}

/// A slice of the schedule and how many people it needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, LLMOutput)]
pub struct StaffingPhase {
    pub name: String,
    pub start_week: u32,
    pub end_week: u32,
    pub headcount: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, LLMOutput)]
pub struct ResourceAllocation {
    pub teams: Vec<Team>,
    /// Sum of team sizes
    pub total_members: u32,
    /// Aggregate cost estimate in USD
    pub estimated_cost: f64,
    /// Fraction of required skills the teams cover, 0.0 to 1.0
    #[serde(default)]
    pub skill_coverage: f64,
    #[serde(default)]
    pub staffing: Vec<StaffingPhase>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

impl ResourceAllocation {
    pub fn member_count(&self) -> u32 {
        self.teams.iter().map(|t| t.members.len() as u32).sum()
    }
}

impl Validate for ResourceAllocation {
    fn validate(&self) -> Result<(), ArtifactError> {
        if self.teams.is_empty() {
            return Err(ArtifactError::Empty("teams"));
        }

        let mut team_names = HashSet::new();
        for team in &self.teams {
            require_non_empty("team name", &team.name)?;
            if !team_names.insert(team.name.as_str()) {
                return Err(ArtifactError::DuplicateName {
                    kind: "team",
                    name: team.name.clone(),
                });
            }
            if team.members.is_empty() {
                return Err(ArtifactError::Empty("team members"));
            }
            if !team.members.iter().any(|m| m.name == team.lead) {
                return Err(ArtifactError::LeadNotMember {
                    team: team.name.clone(),
                    lead: team.lead.clone(),
                });
            }
        }

        let actual = self.member_count();
        if self.total_members != actual {
            return Err(ArtifactError::MemberCountMismatch {
                declared: self.total_members,
                actual,
            });
        }

        require_non_negative("estimated_cost", self.estimated_cost)?;
        require_non_negative("skill_coverage", self.skill_coverage)?;
        if self.skill_coverage > 1.0 {
            return Err(ArtifactError::InvalidValue {
                field: "skill_coverage".into(),
                reason: "must not exceed 1.0".into(),
            });
        }
        Ok(())
    }
}
