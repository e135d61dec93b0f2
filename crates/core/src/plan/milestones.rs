//! Milestone timeline.

use std::collections::HashSet;

use chrono::NaiveDate;
use radkit::macros::LLMOutput;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{require_non_empty, Priority, Validate};
use crate::error::ArtifactError;

/// Date format used for milestone deadlines.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, LLMOutput)]
pub struct Milestone {
    pub name: String,
    pub description: String,
    pub duration_weeks: u32,
    /// Names of milestones that must finish first; only earlier entries
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// ISO date (YYYY-MM-DD)
    pub deadline: String,
    #[serde(default)]
    pub success_criteria: Vec<String>,
    #[serde(default)]
    pub priority: Priority,
}

impl Milestone {
    pub fn deadline_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.deadline, DATE_FORMAT).ok()
    }
}

/// Ordered milestones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, LLMOutput)]
pub struct MilestonePlan {
    pub milestones: Vec<Milestone>,
}

impl MilestonePlan {
    pub fn total_weeks(&self) -> u32 {
        self.milestones.iter().map(|m| m.duration_weeks).sum()
    }

    pub fn names(&self) -> Vec<String> {
        self.milestones.iter().map(|m| m.name.clone()).collect()
    }

    /// Latest deadline across the plan.
    pub fn final_deadline(&self) -> Option<NaiveDate> {
        self.milestones.iter().filter_map(Milestone::deadline_date).max()
    }
}

impl Validate for MilestonePlan {
    fn validate(&self) -> Result<(), ArtifactError> {
        if self.milestones.is_empty() {
            return Err(ArtifactError::Empty("milestones"));
        }

        let mut seen: HashSet<&str> = HashSet::new();
        for milestone in &self.milestones {
            require_non_empty("milestone name", &milestone.name)?;
            if milestone.duration_weeks == 0 {
                return Err(ArtifactError::InvalidValue {
                    field: format!("{}.duration_weeks", milestone.name),
                    reason: "must be at least one week".into(),
                });
            }
            if milestone.deadline_date().is_none() {
                return Err(ArtifactError::InvalidValue {
                    field: format!("{}.deadline", milestone.name),
                    reason: format!("'{}' is not a YYYY-MM-DD date", milestone.deadline),
                });
            }
            // Only names seen so far are valid targets, which rules out
            // forward references and cycles in one pass.
            for dep in &milestone.dependencies {
                if !seen.contains(dep.as_str()) {
                    return Err(ArtifactError::UnresolvedDependency {
                        item: milestone.name.clone(),
                        dependency: dep.clone(),
                    });
                }
            }
            if !seen.insert(milestone.name.as_str()) {
                return Err(ArtifactError::DuplicateName {
                    kind: "milestone",
                    name: milestone.name.clone(),
                });
            }
        }
        Ok(())
    }
}
