//! # Pipeline Stages
//!
//! The run state machine. Stages only move forward, one at a time, and
//! a failure is terminal.

use serde::{Deserialize, Serialize};

use crate::skills::StageKind;

/// Stage of the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    MissionAnalysis,
    MilestonePlanning,
    TaskBreakdown,
    ResourceAllocation,
    Complete,
    Failed,
}

impl PipelineStage {
    /// The analysis stage this state runs, if any.
    pub fn stage_kind(self) -> Option<StageKind> {
        match self {
            PipelineStage::MissionAnalysis => Some(StageKind::MissionAnalysis),
            PipelineStage::MilestonePlanning => Some(StageKind::MilestonePlanning),
            PipelineStage::TaskBreakdown => Some(StageKind::TaskBreakdown),
            PipelineStage::ResourceAllocation => Some(StageKind::ResourceAllocation),
            PipelineStage::Complete | PipelineStage::Failed => None,
        }
    }
}

/// The pipeline state machine
#[derive(Debug, Clone)]
pub struct Pipeline {
    pub stage: PipelineStage,
    /// Last stage that was running; kept after failure.
    current: StageKind,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self {
            stage: PipelineStage::MissionAnalysis,
            current: StageKind::MissionAnalysis,
        }
    }
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance to the next stage
    pub fn advance(&mut self) {
        self.stage = match self.stage {
            PipelineStage::MissionAnalysis => PipelineStage::MilestonePlanning,
            PipelineStage::MilestonePlanning => PipelineStage::TaskBreakdown,
            PipelineStage::TaskBreakdown => PipelineStage::ResourceAllocation,
            PipelineStage::ResourceAllocation => PipelineStage::Complete,
            PipelineStage::Complete => PipelineStage::Complete,
            PipelineStage::Failed => PipelineStage::Failed,
        };
        if let Some(kind) = self.stage.stage_kind() {
            self.current = kind;
        }
    }

    pub fn fail(&mut self) {
        self.stage = PipelineStage::Failed;
    }

    /// Stage that is running, or was running when the run ended.
    pub fn current_stage(&self) -> StageKind {
        self.current
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.stage, PipelineStage::Complete | PipelineStage::Failed)
    }

    pub fn is_success(&self) -> bool {
        self.stage == PipelineStage::Complete
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_advance() {
        let mut pipeline = Pipeline::new();
        assert_eq!(pipeline.stage, PipelineStage::MissionAnalysis);

        for expected in &StageKind::ORDER[1..] {
            pipeline.advance();
            assert_eq!(pipeline.current_stage(), *expected);
        }
        pipeline.advance();
        assert!(pipeline.is_success());
        assert_eq!(pipeline.current_stage(), StageKind::ResourceAllocation);
    }

    #[test]
    fn test_failure_is_terminal() {
        let mut pipeline = Pipeline::new();
        pipeline.advance();
        pipeline.fail();
        pipeline.advance();

        assert_eq!(pipeline.stage, PipelineStage::Failed);
        assert!(pipeline.is_complete());
        assert!(!pipeline.is_success());
        assert_eq!(pipeline.current_stage(), StageKind::MilestonePlanning);
    }
}
