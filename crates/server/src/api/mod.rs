//! HTTP surface of the four services.
//!
//! Every service answers the card, `send_message`, and health routes.
//! The orchestrator adds the plan API and its OpenAPI document.

pub mod orchestrator;
pub mod worker;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use planforge_core::error::{PipelineError, RequestError};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub use orchestrator::{orchestrator_router, ApiDoc};
pub use worker::worker_router;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
}

impl HealthResponse {
    pub fn ok(service: &str) -> Self {
        Self {
            status: "ok".to_string(),
            service: service.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_stage: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Error reply with its HTTP status.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: ErrorDetail,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<RequestError> for ApiError {
    fn from(err: RequestError) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            detail: ErrorDetail {
                kind: err.kind().to_string(),
                failed_stage: None,
                message: err.to_string(),
            },
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        let status = match err {
            PipelineError::InvalidMission(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::BAD_GATEWAY,
        };
        let summary = err.summary();
        Self {
            status,
            detail: ErrorDetail {
                kind: summary.kind,
                failed_stage: summary.failed_stage.map(|s| s.as_str().to_string()),
                message: summary.message,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { error: self.detail })).into_response()
    }
}
