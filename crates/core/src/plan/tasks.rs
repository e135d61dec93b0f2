//! Work items derived from a milestone plan.

use std::collections::HashSet;

use radkit::macros::LLMOutput;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{require_non_empty, require_non_negative, Priority, Validate};
use crate::error::ArtifactError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, LLMOutput)]
pub struct Task {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub priority: Priority,
    pub estimated_hours: f64,
    /// Titles of earlier tasks or names of milestones
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Skill identifiers in snake_case
    #[serde(default)]
    pub skills_required: Vec<String>,
    /// Milestone this task delivers into
    #[serde(default)]
    pub milestone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, LLMOutput)]
pub struct TaskBreakdown {
    pub tasks: Vec<Task>,
    /// Milestone names the breakdown was planned against
    #[serde(default)]
    pub milestone_names: Vec<String>,
}

impl TaskBreakdown {
    pub fn total_hours(&self) -> f64 {
        self.tasks.iter().map(|t| t.estimated_hours).sum()
    }

    /// Every distinct skill, in first-seen order.
    pub fn required_skills(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.tasks
            .iter()
            .flat_map(|t| t.skills_required.iter())
            .filter(|s| seen.insert(s.as_str()))
            .cloned()
            .collect()
    }
}

impl Validate for TaskBreakdown {
    fn validate(&self) -> Result<(), ArtifactError> {
        if self.tasks.is_empty() {
            return Err(ArtifactError::Empty("tasks"));
        }

        let milestones: HashSet<&str> = self.milestone_names.iter().map(String::as_str).collect();
        let mut titles: HashSet<&str> = HashSet::new();

        for task in &self.tasks {
            require_non_empty("task title", &task.title)?;
            require_non_negative(&format!("{}.estimated_hours", task.title), task.estimated_hours)?;

            for dep in &task.dependencies {
                if !titles.contains(dep.as_str()) && !milestones.contains(dep.as_str()) {
                    return Err(ArtifactError::UnresolvedDependency {
                        item: task.title.clone(),
                        dependency: dep.clone(),
                    });
                }
            }
            if let Some(milestone) = &task.milestone {
                if !milestones.contains(milestone.as_str()) {
                    return Err(ArtifactError::UnresolvedDependency {
                        item: task.title.clone(),
                        dependency: milestone.clone(),
                    });
                }
            }
            if !titles.insert(task.title.as_str()) {
                return Err(ArtifactError::DuplicateName {
                    kind: "task",
                    name: task.title.clone(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(title: &str, hours: f64, deps: &[&str]) -> Task {
        Task {
            title: title.to_string(),
            description: String::new(),
            priority: Priority::Medium,
            estimated_hours: hours,
            dependencies: deps.iter().map(|d| d.to_string()).collect(),
            skills_required: vec!["testing".into()],
            milestone: None,
        }
    }

    #[test]
    fn test_dependencies_may_name_milestones() {
        let breakdown = TaskBreakdown {
            tasks: vec![task("Schema", 8.0, &["Design"]), task("API", 16.0, &["Schema"])],
            milestone_names: vec!["Design".into()],
        };
        assert!(breakdown.validate().is_ok());
        assert_eq!(breakdown.total_hours(), 24.0);
        assert_eq!(breakdown.required_skills(), vec!["testing".to_string()]);
    }

    #[test]
    fn test_unknown_dependency_is_rejected() {
        let breakdown = TaskBreakdown {
            tasks: vec![task("API", 16.0, &["Schema"]), task("Schema", 8.0, &[])],
            milestone_names: vec![],
        };
        assert!(matches!(
            breakdown.validate(),
            Err(ArtifactError::UnresolvedDependency { .. })
        ));
    }

    #[test]
    fn test_negative_effort_is_rejected() {
        let breakdown = TaskBreakdown {
            tasks: vec![task("API", -1.0, &[])],
            milestone_names: vec![],
        };
        assert!(breakdown.validate().is_err());

        let breakdown = TaskBreakdown {
            tasks: vec![task("API", f64::NAN, &[])],
            milestone_names: vec![],
        };
        assert!(breakdown.validate().is_err());
    }
}
