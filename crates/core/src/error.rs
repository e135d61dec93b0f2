//! # Error Taxonomy
//!
//! Typed failures for every layer of the pipeline.
//!
//! ```text
//! DecodeError ───────────────┐
//! DiscoveryError ──┐         │  (worker answers 400)
//! CallError ───────┼─ StageError ── PipelineError { failed_stage, cause }
//! ArtifactError ───┘
//! AggregationError ────────────────┘
//! ```
//!
//! Only the AI-vs-fallback choice inside a stage is recovered locally.
//! Everything listed here surfaces to the caller.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::skills::StageKind;

/// Envelope bytes could not be turned into an [`Envelope`](crate::a2a::Envelope).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),
}

/// A worker could not turn a request into stage input.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("message is addressed to {got}, this service runs {expected}")]
    WrongStage { expected: StageKind, got: StageKind },
    #[error("invalid {stage} input: {reason}")]
    InvalidInput { stage: StageKind, reason: String },
}

impl RequestError {
    pub fn kind(&self) -> &'static str {
        match self {
            RequestError::Decode(_) => "malformed_envelope",
            RequestError::WrongStage { .. } => "wrong_stage",
            RequestError::InvalidInput { .. } => "invalid_input",
        }
    }
}

/// Fetching a service card failed.
#[derive(Debug, Clone, Error)]
pub enum DiscoveryError {
    /// Connection-level failure, discovery timeout included.
    #[error("service at {address} is unreachable: {reason}")]
    ServiceUnreachable { address: String, reason: String },
    /// The service answered, but not with a usable card.
    #[error("invalid service card from {address}: {reason}")]
    InvalidCard { address: String, reason: String },
}

/// Why a remote call failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CallErrorKind {
    #[error("service unreachable: {0}")]
    Unreachable(String),
    #[error("no response within {0:?}")]
    Timeout(Duration),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("service answered {status}: {message}")]
    Application { status: u16, message: String },
}

impl CallErrorKind {
    /// Only transport-level failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CallErrorKind::Unreachable(_) | CallErrorKind::Timeout(_))
    }

    /// Short machine-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            CallErrorKind::Unreachable(_) => "unreachable",
            CallErrorKind::Timeout(_) => "timeout",
            CallErrorKind::Malformed(_) => "malformed",
            CallErrorKind::Application { .. } => "application",
        }
    }
}

/// A remote call that gave up.
#[derive(Debug, Clone, Error)]
#[error("call to {service} failed after {attempts} attempt(s): {kind}")]
pub struct CallError {
    pub service: String,
    pub kind: CallErrorKind,
    pub attempts: u32,
}

/// A plan artifact broke one of its structural invariants.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ArtifactError {
    #[error("mission text is empty")]
    EmptyMission,
    #[error("{0} must not be empty")]
    Empty(&'static str),
    #[error("duplicate {kind} name '{name}'")]
    DuplicateName { kind: &'static str, name: String },
    #[error("'{item}' depends on '{dependency}', which is not defined before it")]
    UnresolvedDependency { item: String, dependency: String },
    #[error("invalid {field}: {reason}")]
    InvalidValue { field: String, reason: String },
    #[error("team '{team}' lead '{lead}' is not one of its members")]
    LeadNotMember { team: String, lead: String },
    #[error("total_members is {declared} but teams hold {actual}")]
    MemberCountMismatch { declared: u32, actual: u32 },
}

/// Failure of a single stage as seen by the pipeline.
#[derive(Debug, Clone, Error)]
pub enum StageError {
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
    #[error(transparent)]
    Call(#[from] CallError),
    #[error("service returned no {0} artifact")]
    MissingArtifact(StageKind),
    #[error("service returned an invalid artifact: {0}")]
    InvalidArtifact(#[from] ArtifactError),
}

impl StageError {
    /// Machine-readable cause label used in structured error bodies.
    pub fn label(&self) -> &'static str {
        match self {
            StageError::Discovery(DiscoveryError::ServiceUnreachable { .. }) => "unreachable",
            StageError::Discovery(DiscoveryError::InvalidCard { .. }) => "invalid_card",
            StageError::Call(e) => e.kind.label(),
            StageError::MissingArtifact(_) => "missing_artifact",
            StageError::InvalidArtifact(_) => "invalid_artifact",
        }
    }
}

/// The final plan could not be assembled.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AggregationError {
    #[error("missing {0} artifact")]
    MissingArtifact(StageKind),
}

/// A run that did not produce a plan.
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    #[error("mission rejected: {0}")]
    InvalidMission(ArtifactError),
    #[error("stage {failed_stage} failed: {cause}")]
    StageFailed {
        failed_stage: StageKind,
        cause: StageError,
    },
    #[error("run deadline of {deadline:?} exceeded during {stage}")]
    Deadline { stage: StageKind, deadline: Duration },
    #[error(transparent)]
    Aggregation(#[from] AggregationError),
}

impl PipelineError {
    /// Stage the run stopped at, if any.
    pub fn failed_stage(&self) -> Option<StageKind> {
        match self {
            PipelineError::StageFailed { failed_stage, .. } => Some(*failed_stage),
            PipelineError::Deadline { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    pub fn summary(&self) -> PipelineErrorSummary {
        let kind = match self {
            PipelineError::InvalidMission(_) => "invalid_mission",
            PipelineError::StageFailed { cause, .. } => cause.label(),
            PipelineError::Deadline { .. } => "deadline",
            PipelineError::Aggregation(_) => "aggregation",
        };
        PipelineErrorSummary {
            kind: kind.to_string(),
            failed_stage: self.failed_stage(),
            message: self.to_string(),
        }
    }
}

/// Serializable view of a [`PipelineError`] for HTTP bodies and CLI output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PipelineErrorSummary {
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_stage: Option<StageKind>,
    pub message: String,
}
