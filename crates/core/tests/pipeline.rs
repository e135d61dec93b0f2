//! Full runs against mocked worker services.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use planforge_core::a2a::{MessageResponse, SendMessageRequest, ServiceCard};
use planforge_core::config::{CoordinatorConfig, RetryPolicy, ServiceEndpoints};
use planforge_core::error::{CallErrorKind, PipelineError, StageError};
use planforge_core::error::ArtifactError;
use planforge_core::plan::{
    Mission, MissionAnalysis, Priority, Task, TaskBreakdown, Validate, MAX_WEEKS,
};
use planforge_core::skills::{
    AiStrategy, AnalysisPath, MilestoneRules, MissionRules, ResourceRules, RuleStrategy,
    StageArtifact, StageContext, StageInput, StageKind, StageOutcome, StageRunner, TaskInput,
    TaskRules,
};
use planforge_core::swarm::{Coordinator, SwarmEventKind};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

const BLOG: &str = "Create a simple blog with user authentication.";

/// Answers like a healthy worker running the rule-based path.
struct RuleWorker(StageKind);

impl Respond for RuleWorker {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let request = SendMessageRequest::decode(&request.body).unwrap();
        let ctx = StageContext::new(request.id.clone());
        let input = request.stage_input(self.0).unwrap().unwrap();
        let artifact = match &input {
            StageInput::MissionAnalysis(m) => StageArtifact::MissionAnalysis(MissionRules.compute(m, &ctx)),
            StageInput::MilestonePlanning(a) => {
                StageArtifact::MilestonePlanning(MilestoneRules.compute(a, &ctx))
            }
            StageInput::TaskBreakdown(t) => StageArtifact::TaskBreakdown(TaskRules.compute(t, &ctx)),
            StageInput::ResourceAllocation(r) => {
                StageArtifact::ResourceAllocation(ResourceRules.compute(r, &ctx))
            }
        };
        let outcome = StageOutcome {
            artifact,
            path: AnalysisPath::fallback("ai analysis disabled"),
        };
        ResponseTemplate::new(200).set_body_json(MessageResponse::from_outcome(request.id, outcome))
    }
}

/// Answers every request with the same outcome.
struct Canned(StageOutcome);

impl Respond for Canned {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let request = SendMessageRequest::decode(&request.body).unwrap();
        ResponseTemplate::new(200)
            .set_body_json(MessageResponse::from_outcome(request.id, self.0.clone()))
    }
}

async fn mount_card(server: &MockServer, kind: StageKind, expected_fetches: Option<u64>) {
    let card = ServiceCard::new(
        format!("{} service", kind.service_role()),
        "mock",
        vec![kind.as_str().to_string()],
        &server.uri(),
    );
    let mock = Mock::given(method("GET"))
        .and(path("/.well-known/agent.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(card));
    match expected_fetches {
        Some(n) => mock.expect(n).mount(server).await,
        None => mock.mount(server).await,
    }
}

async fn healthy_worker(kind: StageKind) -> MockServer {
    let server = MockServer::start().await;
    mount_card(&server, kind, None).await;
    Mock::given(method("POST"))
        .and(path("/api/send_message"))
        .respond_with(RuleWorker(kind))
        .mount(&server)
        .await;
    server
}

fn config(milestone: &MockServer, task: &MockServer, resource: &MockServer) -> CoordinatorConfig {
    let mut config = CoordinatorConfig::default();
    config.services = ServiceEndpoints {
        milestone: milestone.uri(),
        task: task.uri(),
        resource: resource.uri(),
    };
    config.analysis.ai_enabled = false;
    config.call_timeout = Duration::from_secs(2);
    config.retry = RetryPolicy {
        max_retries: 1,
        base_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(20),
        ..RetryPolicy::default()
    };
    config
}

fn decoded_requests(requests: &[Request]) -> Vec<SendMessageRequest> {
    requests
        .iter()
        .filter(|r| r.url.path() == "/api/send_message")
        .map(|r| SendMessageRequest::decode(&r.body).unwrap())
        .collect()
}

#[tokio::test]
async fn test_end_to_end_with_remote_workers() {
    let milestone = healthy_worker(StageKind::MilestonePlanning).await;
    let task = healthy_worker(StageKind::TaskBreakdown).await;
    let resource = healthy_worker(StageKind::ResourceAllocation).await;

    let coordinator = Coordinator::new(config(&milestone, &task, &resource));
    let plan = coordinator.run_mission(BLOG).await.unwrap();

    assert_eq!(plan.mission, BLOG);
    assert!(!plan.milestones.milestones.is_empty());
    assert!(plan.task_breakdown.validate().is_ok());

    let titles: Vec<&str> = plan.task_breakdown.tasks.iter().map(|t| t.title.as_str()).collect();
    let milestones = plan.milestones.names();
    for task in &plan.task_breakdown.tasks {
        for dep in &task.dependencies {
            assert!(
                titles.contains(&dep.as_str()) || milestones.contains(dep),
                "unresolved dependency {dep}"
            );
        }
    }

    let team_total: usize = plan
        .resource_allocation
        .teams
        .iter()
        .map(|t| t.members.len())
        .sum();
    assert_eq!(plan.resource_allocation.total_members as usize, team_total);
    assert_eq!(plan.provenance.fallback_stages(), StageKind::ORDER.to_vec());
}

#[tokio::test]
async fn test_each_stage_receives_previous_artifacts() {
    let milestone = healthy_worker(StageKind::MilestonePlanning).await;
    let task = healthy_worker(StageKind::TaskBreakdown).await;
    let resource = healthy_worker(StageKind::ResourceAllocation).await;

    let coordinator = Coordinator::new(config(&milestone, &task, &resource));
    let plan = coordinator.run_mission(BLOG).await.unwrap();

    let sent = decoded_requests(&milestone.received_requests().await.unwrap());
    assert_eq!(sent.len(), 1);
    assert_eq!(
        sent[0].stage_input(StageKind::MilestonePlanning).unwrap(),
        Some(StageInput::MilestonePlanning(plan.mission_analysis.clone()))
    );

    let sent = decoded_requests(&task.received_requests().await.unwrap());
    assert_eq!(
        sent[0].stage_input(StageKind::TaskBreakdown).unwrap(),
        Some(StageInput::TaskBreakdown(TaskInput {
            analysis: plan.mission_analysis.clone(),
            milestones: plan.milestones.clone(),
        }))
    );

    let sent = decoded_requests(&resource.received_requests().await.unwrap());
    match sent[0].stage_input(StageKind::ResourceAllocation).unwrap() {
        Some(StageInput::ResourceAllocation(input)) => {
            assert_eq!(input.tasks, plan.task_breakdown)
        }
        other => panic!("unexpected resource input: {:?}", other),
    }
}

#[tokio::test]
async fn test_task_failure_stops_before_resources() {
    let milestone = healthy_worker(StageKind::MilestonePlanning).await;

    let task = MockServer::start().await;
    mount_card(&task, StageKind::TaskBreakdown, None).await;
    Mock::given(method("POST"))
        .and(path("/api/send_message"))
        .respond_with(ResponseTemplate::new(500).set_body_string("task planner crashed"))
        .expect(1)
        .mount(&task)
        .await;

    let resource = MockServer::start().await;
    mount_card(&resource, StageKind::ResourceAllocation, Some(0)).await;
    Mock::given(method("POST"))
        .respond_with(RuleWorker(StageKind::ResourceAllocation))
        .expect(0)
        .mount(&resource)
        .await;

    let coordinator = Coordinator::new(config(&milestone, &task, &resource));
    let err = coordinator.run_mission(BLOG).await.unwrap_err();

    assert_eq!(err.failed_stage(), Some(StageKind::TaskBreakdown));
    match err {
        PipelineError::StageFailed {
            cause: StageError::Call(call),
            ..
        } => {
            assert!(matches!(call.kind, CallErrorKind::Application { status: 500, .. }));
            assert_eq!(call.attempts, 1);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_tasks_against_unplanned_milestones_fail_the_stage() {
    let milestone = healthy_worker(StageKind::MilestonePlanning).await;

    let breakdown = TaskBreakdown {
        tasks: vec![Task {
            title: "Wire up billing".into(),
            description: "Connect the payment provider".into(),
            priority: Priority::High,
            estimated_hours: 12.0,
            dependencies: vec!["Ghost Milestone".into()],
            skills_required: vec!["backend_development".into()],
            milestone: Some("Ghost Milestone".into()),
        }],
        milestone_names: vec!["Ghost Milestone".into()],
    };
    assert!(breakdown.validate().is_ok());

    let task = MockServer::start().await;
    mount_card(&task, StageKind::TaskBreakdown, None).await;
    Mock::given(method("POST"))
        .and(path("/api/send_message"))
        .respond_with(Canned(StageOutcome {
            artifact: StageArtifact::TaskBreakdown(breakdown),
            path: AnalysisPath::Ai,
        }))
        .mount(&task)
        .await;

    let resource = MockServer::start().await;
    mount_card(&resource, StageKind::ResourceAllocation, Some(0)).await;

    let (tx, mut rx) = tokio::sync::mpsc::channel(32);
    let coordinator =
        Coordinator::new(config(&milestone, &task, &resource)).with_event_channel(tx);
    let err = coordinator.run_mission(BLOG).await.unwrap_err();
    drop(coordinator);

    match &err {
        PipelineError::StageFailed {
            failed_stage: StageKind::TaskBreakdown,
            cause: StageError::InvalidArtifact(ArtifactError::InvalidValue { field, .. }),
        } => assert_eq!(field, "milestone_names"),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(err.summary().kind, "invalid_artifact");

    let mut failed = Vec::new();
    while let Some(event) = rx.recv().await {
        if event.kind == SwarmEventKind::StageFailed {
            failed.extend(event.stage);
        }
    }
    assert_eq!(failed, vec![StageKind::TaskBreakdown]);
}

#[tokio::test]
async fn test_silent_resource_service_times_out() {
    let milestone = healthy_worker(StageKind::MilestonePlanning).await;
    let task = healthy_worker(StageKind::TaskBreakdown).await;

    let resource = MockServer::start().await;
    mount_card(&resource, StageKind::ResourceAllocation, None).await;
    Mock::given(method("POST"))
        .and(path("/api/send_message"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .expect(2)
        .mount(&resource)
        .await;

    let mut config = config(&milestone, &task, &resource);
    config.call_timeout = Duration::from_millis(200);

    let coordinator = Coordinator::new(config);
    let started = Instant::now();
    let err = coordinator.run_mission(BLOG).await.unwrap_err();
    let elapsed = started.elapsed();

    // two attempts of 200ms plus one short backoff
    assert!(elapsed < Duration::from_millis(1500), "took {:?}", elapsed);
    assert_eq!(err.failed_stage(), Some(StageKind::ResourceAllocation));
    match err {
        PipelineError::StageFailed {
            cause: StageError::Call(call),
            ..
        } => {
            assert_eq!(call.kind, CallErrorKind::Timeout(Duration::from_millis(200)));
            assert_eq!(call.attempts, 2);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_run_deadline_bounds_the_whole_run() {
    let milestone = healthy_worker(StageKind::MilestonePlanning).await;
    let task = MockServer::start().await;
    mount_card(&task, StageKind::TaskBreakdown, None).await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&task)
        .await;
    let resource = healthy_worker(StageKind::ResourceAllocation).await;

    let mut config = config(&milestone, &task, &resource);
    config.call_timeout = Duration::from_secs(10);
    config.run_deadline = Duration::from_millis(300);

    let coordinator = Coordinator::new(config);
    let started = Instant::now();
    let err = coordinator.run_mission(BLOG).await.unwrap_err();

    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(matches!(
        err,
        PipelineError::Deadline {
            stage: StageKind::TaskBreakdown,
            ..
        }
    ));
}

#[tokio::test]
async fn test_cards_are_fetched_once_per_ttl() {
    let servers = [
        (StageKind::MilestonePlanning, MockServer::start().await),
        (StageKind::TaskBreakdown, MockServer::start().await),
        (StageKind::ResourceAllocation, MockServer::start().await),
    ];
    for (kind, server) in &servers {
        mount_card(server, *kind, Some(1)).await;
        Mock::given(method("POST"))
            .and(path("/api/send_message"))
            .respond_with(RuleWorker(*kind))
            .expect(2)
            .mount(server)
            .await;
    }

    let coordinator = Coordinator::new(config(&servers[0].1, &servers[1].1, &servers[2].1));
    coordinator.run_mission(BLOG).await.unwrap();
    coordinator.run_mission("Build a mobile fitness tracker").await.unwrap();
    assert_eq!(coordinator.registry().cached_len().await, 3);
}

#[tokio::test]
async fn test_unreachable_worker_fails_discovery() {
    let milestone = MockServer::start().await;
    let task = healthy_worker(StageKind::TaskBreakdown).await;
    let resource = healthy_worker(StageKind::ResourceAllocation).await;

    let mut config = config(&milestone, &task, &resource);
    config.services.milestone = "http://127.0.0.1:9".to_string();
    config.discovery_timeout = Duration::from_millis(500);

    let coordinator = Coordinator::new(config);
    let err = coordinator.run_mission(BLOG).await.unwrap_err();
    assert_eq!(err.failed_stage(), Some(StageKind::MilestonePlanning));
    assert_eq!(err.summary().kind, "unreachable");
}

struct BrokenAnalyst;

#[async_trait]
impl AiStrategy<Mission, MissionAnalysis> for BrokenAnalyst {
    async fn analyze(&self, _mission: &Mission, _ctx: &StageContext) -> anyhow::Result<MissionAnalysis> {
        anyhow::bail!("provider returned 503")
    }
}

#[tokio::test]
async fn test_mission_ai_failure_degrades_to_rules() {
    let runner = StageRunner::rules_only()
        .with_mission_ai(Arc::new(BrokenAnalyst), Duration::from_secs(1));
    let coordinator =
        Coordinator::new(CoordinatorConfig::local_rules_only()).with_runner(runner);

    let plan = coordinator.run_mission(BLOG).await.unwrap();

    match &plan.provenance.mission_analysis {
        AnalysisPath::Fallback { reason } => assert!(reason.contains("503")),
        other => panic!("expected fallback, got {:?}", other),
    }
    assert!(plan.summary.contains("mission_analysis"));
}

/// Proposes a schedule no plan can hold.
struct OverreachingAnalyst;

#[async_trait]
impl AiStrategy<Mission, MissionAnalysis> for OverreachingAnalyst {
    async fn analyze(&self, mission: &Mission, ctx: &StageContext) -> anyhow::Result<MissionAnalysis> {
        let mut analysis = MissionRules.compute(mission, ctx);
        analysis.estimated_weeks = 200_000_000;
        Ok(analysis)
    }
}

#[tokio::test]
async fn test_oversized_ai_estimate_falls_back_to_rules() {
    let runner = StageRunner::rules_only()
        .with_mission_ai(Arc::new(OverreachingAnalyst), Duration::from_secs(1));
    let coordinator =
        Coordinator::new(CoordinatorConfig::local_rules_only()).with_runner(runner);

    let plan = coordinator.run_mission(BLOG).await.unwrap();

    assert!(matches!(
        plan.provenance.mission_analysis,
        AnalysisPath::Fallback { .. }
    ));
    assert!(plan.mission_analysis.estimated_weeks <= MAX_WEEKS);
    assert!(plan.milestones.validate().is_ok());
}
