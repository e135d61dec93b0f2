//! Request and response bodies of `POST /api/send_message`.
//!
//! ```text
//! request   {"id", "params": {"message": Envelope, "mission_data"?, "milestone_data"?, "task_data"?}}
//! response  {"id", "response": Envelope, "<result key>"?, "analysis_path"?}
//! ```
//!
//! Stage input normally rides in the envelope's attachment. The
//! `*_data` params are the older way of passing it and are still read.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::envelope::Envelope;
use crate::error::{DecodeError, RequestError};
use crate::plan::{MilestonePlan, Mission, MissionAnalysis, ProjectPlan, ResourceAllocation, TaskBreakdown};
use crate::skills::{AnalysisPath, StageArtifact, StageInput, StageKind, StageOutcome};

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageParams {
    pub message: Envelope,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mission_data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub milestone_data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_data: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendMessageRequest {
    #[serde(default = "new_id")]
    pub id: String,
    pub params: MessageParams,
}

impl SendMessageRequest {
    pub fn new(message: Envelope) -> Self {
        Self {
            id: new_id(),
            params: MessageParams {
                message,
                mission_data: None,
                milestone_data: None,
                task_data: None,
            },
        }
    }

    /// Request for `input`: mission text as the text part, full input as
    /// the attachment.
    pub fn for_stage(input: &StageInput) -> Result<Self, serde_json::Error> {
        let message = Envelope::user_text(input.mission_text()).with_attachment(input.to_attachment()?);
        Ok(Self::new(message))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        serde_json::from_slice(bytes).map_err(|e| DecodeError::MalformedEnvelope(e.to_string()))
    }

    fn legacy_data(&self, kind: StageKind) -> Option<&Value> {
        match kind {
            StageKind::MissionAnalysis => None,
            StageKind::MilestonePlanning => self.params.mission_data.as_ref(),
            StageKind::TaskBreakdown => self.params.milestone_data.as_ref(),
            StageKind::ResourceAllocation => self.params.task_data.as_ref(),
        }
    }

    /// Input for a service running `kind`, if the request carries one.
    ///
    /// `Ok(None)` means the caller should derive input from the text.
    pub fn stage_input(&self, kind: StageKind) -> Result<Option<StageInput>, RequestError> {
        let invalid = |e: serde_json::Error| RequestError::InvalidInput {
            stage: kind,
            reason: e.to_string(),
        };

        if let Some(attachment) = &self.params.message.attachment {
            if attachment.stage != kind {
                return Err(RequestError::WrongStage {
                    expected: kind,
                    got: attachment.stage,
                });
            }
            return StageInput::from_attachment(attachment).map(Some).map_err(invalid);
        }

        let Some(data) = self.legacy_data(kind) else {
            return Ok(None);
        };
        let data = data.clone();
        let input = match kind {
            StageKind::MissionAnalysis => return Ok(None),
            StageKind::MilestonePlanning => {
                StageInput::MilestonePlanning(serde_json::from_value(data).map_err(invalid)?)
            }
            StageKind::TaskBreakdown => {
                StageInput::TaskBreakdown(serde_json::from_value(data).map_err(invalid)?)
            }
            StageKind::ResourceAllocation => {
                StageInput::ResourceAllocation(serde_json::from_value(data).map_err(invalid)?)
            }
        };
        Ok(Some(input))
    }

    /// Mission text from the message's text parts.
    pub fn mission(&self) -> Result<Mission, RequestError> {
        Mission::new(self.params.message.text()).map_err(|e| RequestError::InvalidInput {
            stage: StageKind::MissionAnalysis,
            reason: e.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub id: String,
    pub response: Envelope,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mission_analysis: Option<MissionAnalysis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub milestones: Option<MilestonePlan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_breakdown: Option<TaskBreakdown>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_allocation: Option<ResourceAllocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_plan: Option<ProjectPlan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis_path: Option<AnalysisPath>,
}

impl MessageResponse {
    pub fn new(id: impl Into<String>, response: Envelope) -> Self {
        Self {
            id: id.into(),
            response,
            mission_analysis: None,
            milestones: None,
            task_breakdown: None,
            resource_allocation: None,
            project_plan: None,
            analysis_path: None,
        }
    }

    /// Reply for a finished stage, artifact under its result key.
    pub fn from_outcome(id: impl Into<String>, outcome: StageOutcome) -> Self {
        let mut reply = Self::new(id, Envelope::assistant_text(outcome.artifact.describe()));
        reply.analysis_path = Some(outcome.path);
        match outcome.artifact {
            StageArtifact::MissionAnalysis(a) => reply.mission_analysis = Some(a),
            StageArtifact::MilestonePlanning(m) => reply.milestones = Some(m),
            StageArtifact::TaskBreakdown(t) => reply.task_breakdown = Some(t),
            StageArtifact::ResourceAllocation(r) => reply.resource_allocation = Some(r),
        }
        reply
    }

    pub fn with_plan(mut self, plan: ProjectPlan) -> Self {
        self.project_plan = Some(plan);
        self
    }

    /// The artifact for `kind`, if present.
    pub fn take_artifact(&mut self, kind: StageKind) -> Option<StageArtifact> {
        match kind {
            StageKind::MissionAnalysis => self.mission_analysis.take().map(StageArtifact::MissionAnalysis),
            StageKind::MilestonePlanning => self.milestones.take().map(StageArtifact::MilestonePlanning),
            StageKind::TaskBreakdown => self.task_breakdown.take().map(StageArtifact::TaskBreakdown),
            StageKind::ResourceAllocation => {
                self.resource_allocation.take().map(StageArtifact::ResourceAllocation)
            }
        }
    }
}
