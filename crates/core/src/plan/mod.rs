//! # Plan Artifacts
//!
//! One artifact per stage, plus the aggregated [`ProjectPlan`].
//!
//! ```text
//! Mission ─► MissionAnalysis ─► MilestonePlan ─► TaskBreakdown ─► ResourceAllocation
//!                    └──────────────┴─────────────────┴──────────────────┴─► ProjectPlan
//! ```
//!
//! Every artifact implements [`Validate`]. AI output that fails validation
//! is discarded in favour of the rule-based path, and remote artifacts are
//! validated again by the coordinator before they are threaded onward.

pub mod milestones;
pub mod mission;
pub mod project;
pub mod resources;
pub mod tasks;

use radkit::macros::LLMOutput;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ArtifactError;

pub use milestones::{Milestone, MilestonePlan};
pub use mission::{Complexity, Mission, MissionAnalysis, PhaseFlags, ProjectDomain, MAX_WEEKS};
pub use project::{ProjectPlan, Provenance};
pub use resources::{Member, ResourceAllocation, Seniority, StaffingPhase, Team};
pub use tasks::{Task, TaskBreakdown};

/// Structural invariants of an artifact.
pub trait Validate {
    fn validate(&self) -> Result<(), ArtifactError>;
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema, LLMOutput,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    /// One step down, bottoming out at `Low`.
    pub fn lowered(self) -> Priority {
        match self {
            Priority::Urgent => Priority::High,
            Priority::High => Priority::Medium,
            Priority::Medium | Priority::Low => Priority::Low,
        }
    }
}

pub(crate) fn require_non_empty(field: &'static str, value: &str) -> Result<(), ArtifactError> {
    if value.trim().is_empty() {
        Err(ArtifactError::Empty(field))
    } else {
        Ok(())
    }
}

pub(crate) fn require_non_negative(field: &str, value: f64) -> Result<(), ArtifactError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ArtifactError::InvalidValue {
            field: field.to_string(),
            reason: format!("{} is not a finite non-negative number", value),
        })
    }
}
