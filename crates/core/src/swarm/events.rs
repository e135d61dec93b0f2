//! # Run Events
//!
//! Progress notifications a coordinator emits while a run is in flight.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::skills::{AnalysisPath, StageKind};

/// Kind of run event
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SwarmEventKind {
    RunStarted,
    StageStarted,
    /// Stage produced a validated artifact
    StageCompleted,
    StageFailed,
    RunCompleted,
    RunFailed,
}

/// An event in a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwarmEvent {
    pub id: String,
    pub run_id: String,
    pub timestamp: DateTime<Utc>,
    pub kind: SwarmEventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<StageKind>,
    /// Which path produced the artifact, on `StageCompleted`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<AnalysisPath>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl SwarmEvent {
    pub fn new(kind: SwarmEventKind, run_id: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            run_id: run_id.to_string(),
            timestamp: Utc::now(),
            kind,
            stage: None,
            path: None,
            data: None,
        }
    }

    pub fn for_stage(kind: SwarmEventKind, run_id: &str, stage: StageKind) -> Self {
        Self {
            stage: Some(stage),
            ..Self::new(kind, run_id)
        }
    }

    pub fn with_path(mut self, path: AnalysisPath) -> Self {
        self.path = Some(path);
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}
