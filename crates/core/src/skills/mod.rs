//! # Analysis Skills
//!
//! The four units of analysis and the machinery that runs them.
//!
//! ## Architecture
//!
//! ```text
//! StageRunner
//!   └── AnalysisStage<I, O>          (Idle → AiAttempt → Success | Fallback → Done)
//!         ├── AiStrategy<I, O>       LlmAnalyst (radkit LlmFunction)
//!         └── RuleStrategy<I, O>     MissionRules, MilestoneRules, TaskRules, ResourceRules
//! ```
//!
//! The AI path may fail for any reason. The rule-based path never fails
//! for well-formed input, so a stage always yields an artifact and a flag
//! saying which path produced it.

use std::fmt;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::a2a::Attachment;
use crate::error::ArtifactError;
use crate::plan::{
    MilestonePlan, Mission, MissionAnalysis, ResourceAllocation, TaskBreakdown, Validate,
};

pub mod heuristics;
pub mod llm;
pub mod milestone_skill;
pub mod mission_skill;
pub mod prompts;
pub mod resource_skill;
pub mod roster;
pub mod runner;
pub mod stage;
pub mod task_skill;

pub use llm::LlmAnalyst;
pub use milestone_skill::MilestoneRules;
pub use mission_skill::MissionRules;
pub use resource_skill::ResourceRules;
pub use runner::StageRunner;
pub use stage::{AiStrategy, AnalysisStage, RuleStrategy, StageResult, StageState};
pub use task_skill::TaskRules;

/// One unit of analysis, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    MissionAnalysis,
    MilestonePlanning,
    TaskBreakdown,
    ResourceAllocation,
}

impl StageKind {
    pub const ORDER: [StageKind; 4] = [
        StageKind::MissionAnalysis,
        StageKind::MilestonePlanning,
        StageKind::TaskBreakdown,
        StageKind::ResourceAllocation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StageKind::MissionAnalysis => "mission_analysis",
            StageKind::MilestonePlanning => "milestone_planning",
            StageKind::TaskBreakdown => "task_breakdown",
            StageKind::ResourceAllocation => "resource_allocation",
        }
    }

    /// Short service role name used by the CLI and in logs.
    pub fn service_role(&self) -> &'static str {
        match self {
            StageKind::MissionAnalysis => "orchestrator",
            StageKind::MilestonePlanning => "milestone",
            StageKind::TaskBreakdown => "task",
            StageKind::ResourceAllocation => "resource",
        }
    }

    /// Key under which a response carries this stage's artifact.
    pub fn result_key(&self) -> &'static str {
        match self {
            StageKind::MissionAnalysis => "mission_analysis",
            StageKind::MilestonePlanning => "milestones",
            StageKind::TaskBreakdown => "task_breakdown",
            StageKind::ResourceAllocation => "resource_allocation",
        }
    }

    pub fn next(&self) -> Option<StageKind> {
        match self {
            StageKind::MissionAnalysis => Some(StageKind::MilestonePlanning),
            StageKind::MilestonePlanning => Some(StageKind::TaskBreakdown),
            StageKind::TaskBreakdown => Some(StageKind::ResourceAllocation),
            StageKind::ResourceAllocation => None,
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which path produced an artifact. Informational, never an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "path", rename_all = "snake_case")]
pub enum AnalysisPath {
    Ai,
    Fallback { reason: String },
    /// A remote service did not say.
    Unreported,
}

impl AnalysisPath {
    pub fn fallback(reason: impl Into<String>) -> Self {
        AnalysisPath::Fallback {
            reason: reason.into(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, AnalysisPath::Fallback { .. })
    }
}

/// Run-scoped facts every stage may read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageContext {
    pub run_id: String,
    /// Day the schedule starts from.
    pub start_date: NaiveDate,
}

impl StageContext {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            start_date: Utc::now().date_naive(),
        }
    }

    pub fn with_start_date(mut self, date: NaiveDate) -> Self {
        self.start_date = date;
        self
    }
}

/// What the task breakdown stage consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskInput {
    pub analysis: MissionAnalysis,
    pub milestones: MilestonePlan,
}

/// What the resource allocation stage consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceInput {
    pub analysis: MissionAnalysis,
    pub tasks: TaskBreakdown,
}

/// Input of any stage, keyed by stage.
#[derive(Debug, Clone, PartialEq)]
pub enum StageInput {
    MissionAnalysis(Mission),
    MilestonePlanning(MissionAnalysis),
    TaskBreakdown(TaskInput),
    ResourceAllocation(ResourceInput),
}

impl StageInput {
    pub fn kind(&self) -> StageKind {
        match self {
            StageInput::MissionAnalysis(_) => StageKind::MissionAnalysis,
            StageInput::MilestonePlanning(_) => StageKind::MilestonePlanning,
            StageInput::TaskBreakdown(_) => StageKind::TaskBreakdown,
            StageInput::ResourceAllocation(_) => StageKind::ResourceAllocation,
        }
    }

    /// Mission text the input ultimately derives from.
    pub fn mission_text(&self) -> &str {
        match self {
            StageInput::MissionAnalysis(m) => m.text(),
            StageInput::MilestonePlanning(a) => &a.mission,
            StageInput::TaskBreakdown(t) => &t.analysis.mission,
            StageInput::ResourceAllocation(r) => &r.analysis.mission,
        }
    }

    pub fn to_attachment(&self) -> Result<Attachment, serde_json::Error> {
        let kind = self.kind();
        match self {
            StageInput::MissionAnalysis(m) => Attachment::new(kind, m),
            StageInput::MilestonePlanning(a) => Attachment::new(kind, a),
            StageInput::TaskBreakdown(t) => Attachment::new(kind, t),
            StageInput::ResourceAllocation(r) => Attachment::new(kind, r),
        }
    }

    pub fn from_attachment(attachment: &Attachment) -> Result<Self, serde_json::Error> {
        Ok(match attachment.stage {
            StageKind::MissionAnalysis => StageInput::MissionAnalysis(attachment.decode()?),
            StageKind::MilestonePlanning => StageInput::MilestonePlanning(attachment.decode()?),
            StageKind::TaskBreakdown => StageInput::TaskBreakdown(attachment.decode()?),
            StageKind::ResourceAllocation => StageInput::ResourceAllocation(attachment.decode()?),
        })
    }
}

/// Output of any stage, keyed by stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stage", content = "data", rename_all = "snake_case")]
pub enum StageArtifact {
    MissionAnalysis(MissionAnalysis),
    MilestonePlanning(MilestonePlan),
    TaskBreakdown(TaskBreakdown),
    ResourceAllocation(ResourceAllocation),
}

impl StageArtifact {
    pub fn kind(&self) -> StageKind {
        match self {
            StageArtifact::MissionAnalysis(_) => StageKind::MissionAnalysis,
            StageArtifact::MilestonePlanning(_) => StageKind::MilestonePlanning,
            StageArtifact::TaskBreakdown(_) => StageKind::TaskBreakdown,
            StageArtifact::ResourceAllocation(_) => StageKind::ResourceAllocation,
        }
    }

    pub fn validate(&self) -> Result<(), ArtifactError> {
        match self {
            StageArtifact::MissionAnalysis(a) => a.validate(),
            StageArtifact::MilestonePlanning(m) => m.validate(),
            StageArtifact::TaskBreakdown(t) => t.validate(),
            StageArtifact::ResourceAllocation(r) => r.validate(),
        }
    }

    /// One-line description for reply messages.
    pub fn describe(&self) -> String {
        match self {
            StageArtifact::MissionAnalysis(a) => format!(
                "{} {} project, about {} weeks with {} people",
                a.complexity,
                a.domain,
                a.estimated_weeks,
                a.recommended_team_size
            ),
            StageArtifact::MilestonePlanning(m) => format!(
                "{} milestones over {} weeks",
                m.milestones.len(),
                m.total_weeks()
            ),
            StageArtifact::TaskBreakdown(t) => format!(
                "{} tasks, {:.0} estimated hours",
                t.tasks.len(),
                t.total_hours()
            ),
            StageArtifact::ResourceAllocation(r) => format!(
                "{} teams, {} members, estimated cost ${:.0}",
                r.teams.len(),
                r.total_members,
                r.estimated_cost
            ),
        }
    }
}

/// An artifact plus how it was produced.
#[derive(Debug, Clone, PartialEq)]
pub struct StageOutcome {
    pub artifact: StageArtifact,
    pub path: AnalysisPath,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order_follows_next() {
        let mut walked = vec![StageKind::MissionAnalysis];
        while let Some(next) = walked.last().and_then(|s| s.next()) {
            walked.push(next);
        }
        assert_eq!(walked, StageKind::ORDER.to_vec());
    }

    #[test]
    fn test_analysis_path_wire_shape() {
        let json = serde_json::to_value(AnalysisPath::fallback("ai disabled")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"path": "fallback", "reason": "ai disabled"})
        );
        let ai: AnalysisPath = serde_json::from_value(serde_json::json!({"path": "ai"})).unwrap();
        assert_eq!(ai, AnalysisPath::Ai);
    }

    #[test]
    fn test_stage_kind_display() {
        assert_eq!(StageKind::TaskBreakdown.to_string(), "task_breakdown");
        assert_eq!(StageKind::MilestonePlanning.result_key(), "milestones");
    }
}
