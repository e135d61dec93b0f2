//! Worker service: runs one stage per request.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use planforge_core::a2a::{
    MessageResponse, SendMessageRequest, ServiceCard, SEND_MESSAGE_PATH, WELL_KNOWN_PATH,
};
use planforge_core::error::RequestError;
use planforge_core::skills::{StageContext, StageKind, StageRunner};

use super::{ApiError, HealthResponse};

#[derive(Clone)]
struct WorkerState {
    kind: StageKind,
    runner: Arc<StageRunner>,
    card: Arc<ServiceCard>,
}

/// Card advertised by the worker for `kind` at `base_url`.
pub fn worker_card(kind: StageKind, base_url: &str) -> ServiceCard {
    let (name, description, capabilities) = match kind {
        StageKind::MissionAnalysis => (
            "Mission Analysis Service",
            "Classifies a mission by complexity and domain",
            vec!["mission_analysis"],
        ),
        StageKind::MilestonePlanning => (
            "Milestone Planning Service",
            "Turns a mission analysis into a dated milestone schedule",
            vec!["milestone_planning", "timeline_planning"],
        ),
        StageKind::TaskBreakdown => (
            "Task Breakdown Service",
            "Breaks milestones into estimated, ordered tasks",
            vec!["task_breakdown", "effort_estimation"],
        ),
        StageKind::ResourceAllocation => (
            "Resource Allocation Service",
            "Staffs a task breakdown with teams and costs",
            vec!["resource_allocation", "team_planning"],
        ),
    };
    ServiceCard::new(
        name,
        description,
        capabilities.into_iter().map(String::from).collect(),
        base_url,
    )
    .with_agent_type(kind.service_role())
}

pub fn worker_router(kind: StageKind, runner: Arc<StageRunner>, card: ServiceCard) -> Router {
    let state = WorkerState {
        kind,
        runner,
        card: Arc::new(card),
    };
    Router::new()
        .route(WELL_KNOWN_PATH, get(service_card))
        .route(SEND_MESSAGE_PATH, post(send_message))
        .route("/health", get(health))
        .with_state(state)
}

async fn service_card(State(state): State<WorkerState>) -> Json<ServiceCard> {
    Json(state.card.as_ref().clone())
}

async fn health(State(state): State<WorkerState>) -> Json<HealthResponse> {
    Json(HealthResponse::ok(&state.card.name))
}

#[tracing::instrument(skip_all, fields(stage = %state.kind))]
async fn send_message(
    State(state): State<WorkerState>,
    body: Bytes,
) -> Result<Json<MessageResponse>, ApiError> {
    let request = SendMessageRequest::decode(&body).map_err(RequestError::from)?;
    let ctx = StageContext::new(request.id.clone());

    let input = match request.stage_input(state.kind)? {
        Some(input) => input,
        None => {
            tracing::debug!("no stage input attached, deriving from text");
            StageRunner::derive_input(state.kind, &request.mission()?, &ctx)
        }
    };

    let outcome = state.runner.run(&input, &ctx).await;
    tracing::info!(path = ?outcome.path, "stage served");
    Ok(Json(MessageResponse::from_outcome(request.id, outcome)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use planforge_core::a2a::Envelope;
    use planforge_core::plan::{Mission, Validate};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn router(kind: StageKind) -> Router {
        worker_router(
            kind,
            Arc::new(StageRunner::rules_only()),
            worker_card(kind, "http://127.0.0.1:9003"),
        )
    }

    async fn post_json(router: Router, body: Vec<u8>) -> (StatusCode, Value) {
        let response = router
            .oneshot(
                Request::post(SEND_MESSAGE_PATH)
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_card_is_served() {
        let response = router(StageKind::TaskBreakdown)
            .oneshot(Request::get(WELL_KNOWN_PATH).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let card: ServiceCard = serde_json::from_slice(&bytes).unwrap();
        assert!(card.validate().is_ok());
        assert!(card.capabilities.contains(&"task_breakdown".to_string()));
    }

    #[tokio::test]
    async fn test_attached_input_is_used() {
        let ctx = StageContext::new("req");
        let mission = Mission::new("Create a simple blog with user authentication.").unwrap();
        let input = StageRunner::derive_input(StageKind::TaskBreakdown, &mission, &ctx);
        let request = SendMessageRequest::for_stage(&input).unwrap();

        let (status, body) =
            post_json(router(StageKind::TaskBreakdown), serde_json::to_vec(&request).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], request.id);

        let mut response: MessageResponse = serde_json::from_value(body).unwrap();
        let breakdown = response.task_breakdown.take().unwrap();
        assert!(breakdown.validate().is_ok());
        assert!(response.analysis_path.unwrap().is_fallback());
    }

    #[tokio::test]
    async fn test_text_only_request_derives_input() {
        let request = SendMessageRequest::new(Envelope::user_text(
            "Build an online store with payments",
        ));
        let (status, body) = post_json(
            router(StageKind::ResourceAllocation),
            serde_json::to_vec(&request).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["resource_allocation"]["teams"].is_array());
    }

    #[tokio::test]
    async fn test_wrong_stage_is_rejected() {
        let ctx = StageContext::new("req");
        let mission = Mission::new("Create a todo app").unwrap();
        let input = StageRunner::derive_input(StageKind::MilestonePlanning, &mission, &ctx);
        let request = SendMessageRequest::for_stage(&input).unwrap();

        let (status, body) =
            post_json(router(StageKind::TaskBreakdown), serde_json::to_vec(&request).unwrap()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["kind"], "wrong_stage");
    }

    #[tokio::test]
    async fn test_malformed_body_is_rejected() {
        let (status, body) =
            post_json(router(StageKind::MilestonePlanning), b"{not json".to_vec()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["kind"], "malformed_envelope");
        assert!(body["error"]["message"].is_string());
    }

    #[tokio::test]
    async fn test_health() {
        let response = router(StageKind::MilestonePlanning)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, json!({"status": "ok", "service": "Milestone Planning Service"}));
    }
}
