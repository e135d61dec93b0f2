//! Folds the four stage artifacts into a [`ProjectPlan`].

use chrono::Utc;

use crate::error::AggregationError;
use crate::plan::{
    MilestonePlan, Mission, MissionAnalysis, ProjectPlan, Provenance, ResourceAllocation,
    TaskBreakdown,
};
use crate::skills::StageKind;

/// Artifacts collected over a run, filled in stage order.
#[derive(Debug, Clone, Default)]
pub struct CollectedArtifacts {
    pub mission_analysis: Option<MissionAnalysis>,
    pub milestones: Option<MilestonePlan>,
    pub task_breakdown: Option<TaskBreakdown>,
    pub resource_allocation: Option<ResourceAllocation>,
}

fn require<T>(artifact: Option<T>, stage: StageKind) -> Result<T, AggregationError> {
    artifact.ok_or(AggregationError::MissingArtifact(stage))
}

pub fn aggregate(
    mission: &Mission,
    artifacts: CollectedArtifacts,
    provenance: Provenance,
) -> Result<ProjectPlan, AggregationError> {
    let mission_analysis = require(artifacts.mission_analysis, StageKind::MissionAnalysis)?;
    let milestones = require(artifacts.milestones, StageKind::MilestonePlanning)?;
    let task_breakdown = require(artifacts.task_breakdown, StageKind::TaskBreakdown)?;
    let resource_allocation = require(artifacts.resource_allocation, StageKind::ResourceAllocation)?;

    let mut summary = format!(
        "{} {} project: {} milestones over {} weeks, {} tasks ({:.0} hours), {} people in {} team(s), estimated cost ${:.0}.",
        mission_analysis.complexity,
        mission_analysis.domain,
        milestones.milestones.len(),
        milestones.total_weeks(),
        task_breakdown.tasks.len(),
        task_breakdown.total_hours(),
        resource_allocation.total_members,
        resource_allocation.teams.len(),
        resource_allocation.estimated_cost,
    );
    let fallbacks = provenance.fallback_stages();
    if !fallbacks.is_empty() {
        let names: Vec<&str> = fallbacks.iter().map(|s| s.as_str()).collect();
        summary.push_str(&format!(" Rule-based analysis used for: {}.", names.join(", ")));
    }

    Ok(ProjectPlan {
        mission: mission.text().to_string(),
        mission_analysis,
        milestones,
        task_breakdown,
        resource_allocation,
        provenance,
        summary,
        created_at: Utc::now(),
    })
}
