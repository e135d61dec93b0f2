//! The aggregated result of a run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{MilestonePlan, MissionAnalysis, ResourceAllocation, TaskBreakdown};
use crate::skills::{AnalysisPath, StageKind};

/// Which path produced each artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub mission_analysis: AnalysisPath,
    pub milestone_planning: AnalysisPath,
    pub task_breakdown: AnalysisPath,
    pub resource_allocation: AnalysisPath,
}

impl Default for Provenance {
    fn default() -> Self {
        Self {
            mission_analysis: AnalysisPath::Unreported,
            milestone_planning: AnalysisPath::Unreported,
            task_breakdown: AnalysisPath::Unreported,
            resource_allocation: AnalysisPath::Unreported,
        }
    }
}

impl Provenance {
    pub fn get(&self, stage: StageKind) -> &AnalysisPath {
        match stage {
            StageKind::MissionAnalysis => &self.mission_analysis,
            StageKind::MilestonePlanning => &self.milestone_planning,
            StageKind::TaskBreakdown => &self.task_breakdown,
            StageKind::ResourceAllocation => &self.resource_allocation,
        }
    }

    pub fn set(&mut self, stage: StageKind, path: AnalysisPath) {
        let slot = match stage {
            StageKind::MissionAnalysis => &mut self.mission_analysis,
            StageKind::MilestonePlanning => &mut self.milestone_planning,
            StageKind::TaskBreakdown => &mut self.task_breakdown,
            StageKind::ResourceAllocation => &mut self.resource_allocation,
        };
        *slot = path;
    }

    /// Stages that ended up on the rule-based path.
    pub fn fallback_stages(&self) -> Vec<StageKind> {
        StageKind::ORDER
            .into_iter()
            .filter(|s| self.get(*s).is_fallback())
            .collect()
    }
}

/// Final plan handed back to the caller. Never mutated after aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectPlan {
    pub mission: String,
    pub mission_analysis: MissionAnalysis,
    pub milestones: MilestonePlan,
    pub task_breakdown: TaskBreakdown,
    pub resource_allocation: ResourceAllocation,
    pub provenance: Provenance,
    pub summary: String,
    pub created_at: DateTime<Utc>,
}
