//! Runs any stage from a [`StageInput`].

use std::sync::Arc;
use std::time::Duration;

use super::stage::{AiStrategy, AnalysisStage, RuleStrategy};
use super::{
    milestone_skill, mission_skill, resource_skill, task_skill, MilestoneRules, MissionRules,
    ResourceInput, StageArtifact, StageContext, StageInput, StageKind, StageOutcome, TaskInput,
    TaskRules,
};
use crate::config::AnalysisSettings;
use crate::plan::{
    MilestonePlan, Mission, MissionAnalysis, ResourceAllocation, TaskBreakdown,
};

/// The four analysis stages, configured once and shared by workers and
/// the local executor.
#[derive(Clone)]
pub struct StageRunner {
    mission: AnalysisStage<Mission, MissionAnalysis>,
    milestone: AnalysisStage<MissionAnalysis, MilestonePlan>,
    task: AnalysisStage<TaskInput, TaskBreakdown>,
    resource: AnalysisStage<ResourceInput, ResourceAllocation>,
}

impl StageRunner {
    pub fn new(settings: &AnalysisSettings) -> Self {
        Self {
            mission: mission_skill::stage(settings),
            milestone: milestone_skill::stage(settings),
            task: task_skill::stage(settings),
            resource: resource_skill::stage(settings),
        }
    }

    pub fn rules_only() -> Self {
        Self::new(&AnalysisSettings::rules_only())
    }

    /// Swap the mission stage's AI path, e.g. for a specific provider.
    pub fn with_mission_ai(
        mut self,
        ai: Arc<dyn AiStrategy<Mission, MissionAnalysis>>,
        timeout: Duration,
    ) -> Self {
        self.mission = self.mission.with_ai(ai, timeout);
        self
    }

    pub fn ai_enabled(&self, kind: StageKind) -> bool {
        match kind {
            StageKind::MissionAnalysis => self.mission.ai_enabled(),
            StageKind::MilestonePlanning => self.milestone.ai_enabled(),
            StageKind::TaskBreakdown => self.task.ai_enabled(),
            StageKind::ResourceAllocation => self.resource.ai_enabled(),
        }
    }

    pub async fn run(&self, input: &StageInput, ctx: &StageContext) -> StageOutcome {
        match input {
            StageInput::MissionAnalysis(mission) => {
                let result = self.mission.run(mission, ctx).await;
                StageOutcome {
                    artifact: StageArtifact::MissionAnalysis(result.output),
                    path: result.path,
                }
            }
            StageInput::MilestonePlanning(analysis) => {
                let result = self.milestone.run(analysis, ctx).await;
                StageOutcome {
                    artifact: StageArtifact::MilestonePlanning(result.output),
                    path: result.path,
                }
            }
            StageInput::TaskBreakdown(input) => {
                let result = self.task.run(input, ctx).await;
                StageOutcome {
                    artifact: StageArtifact::TaskBreakdown(result.output),
                    path: result.path,
                }
            }
            StageInput::ResourceAllocation(input) => {
                let result = self.resource.run(input, ctx).await;
                StageOutcome {
                    artifact: StageArtifact::ResourceAllocation(result.output),
                    path: result.path,
                }
            }
        }
    }

    /// Input for `kind` built from mission text alone, by running the
    /// earlier stages' rules. Used when a worker receives only text.
    pub fn derive_input(kind: StageKind, mission: &Mission, ctx: &StageContext) -> StageInput {
        if kind == StageKind::MissionAnalysis {
            return StageInput::MissionAnalysis(mission.clone());
        }
        let analysis = MissionRules.compute(mission, ctx);
        if kind == StageKind::MilestonePlanning {
            return StageInput::MilestonePlanning(analysis);
        }
        let milestones = MilestoneRules.compute(&analysis, ctx);
        let task_input = TaskInput {
            analysis,
            milestones,
        };
        if kind == StageKind::TaskBreakdown {
            return StageInput::TaskBreakdown(task_input);
        }
        let tasks = TaskRules.compute(&task_input, ctx);
        StageInput::ResourceAllocation(ResourceInput {
            analysis: task_input.analysis,
            tasks,
        })
    }
}
