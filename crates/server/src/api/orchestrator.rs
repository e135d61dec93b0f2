//! Orchestrator service: runs the whole pipeline per request.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use planforge_core::a2a::{
    Envelope, MessageResponse, SendMessageRequest, ServiceCard, SEND_MESSAGE_PATH,
    WELL_KNOWN_PATH,
};
use planforge_core::error::RequestError;
use planforge_core::plan::ProjectPlan;
use planforge_core::swarm::Coordinator;
use serde::Deserialize;
use utoipa::{OpenApi, ToSchema};

use super::{ApiError, ErrorBody, ErrorDetail, HealthResponse};

#[derive(Clone)]
struct OrchestratorState {
    coordinator: Arc<Coordinator>,
    card: Arc<ServiceCard>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PlanRequest {
    /// Free-text problem statement
    pub mission: String,
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Planforge API",
        version = "1.0.0",
        description = "Turns a free-text mission into a staffed project plan"
    ),
    paths(create_plan, send_message, health),
    components(schemas(PlanRequest, ErrorBody, ErrorDetail, HealthResponse)),
    tags(
        (name = "plan", description = "Project planning"),
        (name = "service", description = "Service-to-service messaging and health")
    )
)]
pub struct ApiDoc;

/// Card advertised by the orchestrator at `base_url`.
pub fn orchestrator_card(base_url: &str) -> ServiceCard {
    ServiceCard::new(
        "Project Orchestrator",
        "Coordinates mission analysis, milestones, tasks, and resources into a project plan",
        vec![
            "mission_analysis".to_string(),
            "project_planning".to_string(),
            "orchestration".to_string(),
        ],
        base_url,
    )
    .with_agent_type("orchestrator")
}

pub fn orchestrator_router(coordinator: Arc<Coordinator>, card: ServiceCard) -> Router {
    let state = OrchestratorState {
        coordinator,
        card: Arc::new(card),
    };
    Router::new()
        .route(WELL_KNOWN_PATH, get(service_card))
        .route(SEND_MESSAGE_PATH, post(send_message))
        .route("/health", get(health))
        .route("/api/v1/plan", post(create_plan))
        .route("/api/v1/openapi.json", get(serve_openapi))
        .with_state(state)
}

async fn service_card(State(state): State<OrchestratorState>) -> Json<ServiceCard> {
    Json(state.card.as_ref().clone())
}

/// Liveness check
#[utoipa::path(
    get,
    path = "/health",
    tag = "service",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    )
)]
async fn health(State(state): State<OrchestratorState>) -> Json<HealthResponse> {
    Json(HealthResponse::ok(&state.card.name))
}

/// Plan a mission given as envelope text
#[utoipa::path(
    post,
    path = "/api/send_message",
    tag = "service",
    request_body(content = String, content_type = "application/json"),
    responses(
        (status = 200, description = "Plan summary with the plan under `project_plan`"),
        (status = 400, description = "Malformed envelope or blank mission", body = ErrorBody),
        (status = 502, description = "A stage failed", body = ErrorBody)
    )
)]
async fn send_message(
    State(state): State<OrchestratorState>,
    body: Bytes,
) -> Result<Json<MessageResponse>, ApiError> {
    let request = SendMessageRequest::decode(&body).map_err(RequestError::from)?;
    let text = request.params.message.text();
    let plan = state.coordinator.run_mission(&text).await?;
    let reply = Envelope::assistant_text(plan.summary.clone());
    Ok(Json(MessageResponse::new(request.id, reply).with_plan(plan)))
}

/// Plan a mission
#[utoipa::path(
    post,
    path = "/api/v1/plan",
    tag = "plan",
    request_body = PlanRequest,
    responses(
        (status = 200, description = "Aggregated project plan"),
        (status = 400, description = "Blank mission", body = ErrorBody),
        (status = 502, description = "A stage failed", body = ErrorBody)
    )
)]
async fn create_plan(
    State(state): State<OrchestratorState>,
    Json(req): Json<PlanRequest>,
) -> Result<Json<ProjectPlan>, ApiError> {
    let plan = state.coordinator.run_mission(&req.mission).await?;
    Ok(Json(plan))
}

async fn serve_openapi() -> impl IntoResponse {
    match ApiDoc::openapi().to_json() {
        Ok(json) => ([(header::CONTENT_TYPE, "application/json")], json).into_response(),
        Err(e) => {
            tracing::error!("failed to render OpenAPI document: {}", e);
            axum::http::StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
