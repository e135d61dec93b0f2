//! # Swarm Coordinator
//!
//! Drives a mission through the four stages and aggregates the result.
//!
//! ```text
//! mission ─► [mission analysis] ─► [milestones] ─► [tasks] ─► [resources] ─► aggregate
//!               local                 remote         remote       remote
//! ```
//!
//! Stages run strictly one after another: each consumes the previous
//! stage's validated artifact. The first stage failure ends the run, and
//! the whole run is bounded by the configured deadline. Runs share
//! nothing mutable except the card cache, so any number may be in flight.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::a2a::{RemoteClient, ServiceRegistry};
use crate::config::{CoordinatorConfig, StagePlacement};
use crate::error::{AggregationError, ArtifactError, PipelineError, StageError};
use crate::plan::{Mission, ProjectPlan, Provenance};
use crate::skills::{
    ResourceInput, StageArtifact, StageContext, StageInput, StageKind, StageRunner, TaskInput,
};

use super::aggregator::{aggregate, CollectedArtifacts};
use super::events::{SwarmEvent, SwarmEventKind};
use super::executor::{LocalExecutor, RemoteExecutor, StageExecutor};
use super::pipeline::Pipeline;

fn slot(kind: StageKind) -> usize {
    match kind {
        StageKind::MissionAnalysis => 0,
        StageKind::MilestonePlanning => 1,
        StageKind::TaskBreakdown => 2,
        StageKind::ResourceAllocation => 3,
    }
}

pub struct Coordinator {
    config: CoordinatorConfig,
    registry: Arc<ServiceRegistry>,
    executors: [Arc<dyn StageExecutor>; 4],
    event_tx: Option<mpsc::Sender<SwarmEvent>>,
}

impl Coordinator {
    pub fn new(config: CoordinatorConfig) -> Self {
        let registry = Arc::new(ServiceRegistry::new(
            config.discovery_ttl,
            config.discovery_timeout,
        ));
        let runner = Arc::new(StageRunner::new(&config.analysis));
        let executors = build_executors(&config, &registry, &runner);
        Self {
            config,
            registry,
            executors,
            event_tx: None,
        }
    }

    /// Set event channel for streaming events
    pub fn with_event_channel(mut self, tx: mpsc::Sender<SwarmEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    /// Share a card cache with other coordinators.
    pub fn with_registry(mut self, registry: Arc<ServiceRegistry>) -> Self {
        self.registry = registry;
        let runner = Arc::new(StageRunner::new(&self.config.analysis));
        self.executors = build_executors(&self.config, &self.registry, &runner);
        self
    }

    /// Use `runner` for every stage that executes in-process.
    pub fn with_runner(mut self, runner: StageRunner) -> Self {
        let runner = Arc::new(runner);
        for kind in StageKind::ORDER {
            if is_local(&self.config, kind) {
                self.executors[slot(kind)] = Arc::new(LocalExecutor::new(kind, runner.clone()));
            }
        }
        self
    }

    /// Replace the executor of one stage.
    pub fn with_executor(mut self, executor: Arc<dyn StageExecutor>) -> Self {
        let idx = slot(executor.kind());
        self.executors[idx] = executor;
        self
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ServiceRegistry> {
        &self.registry
    }

    async fn emit(&self, event: SwarmEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(event).await;
        }
    }

    /// Turn mission text into a project plan.
    #[tracing::instrument(skip(self, text), fields(run_id = tracing::field::Empty, mission_preview = %text.chars().take(50).collect::<String>()))]
    pub async fn run_mission(&self, text: &str) -> Result<ProjectPlan, PipelineError> {
        let mission = Mission::new(text).map_err(PipelineError::InvalidMission)?;
        let ctx = StageContext::new(uuid::Uuid::new_v4().to_string());
        tracing::Span::current().record("run_id", ctx.run_id.as_str());

        self.emit(SwarmEvent::new(SwarmEventKind::RunStarted, &ctx.run_id)).await;

        let mut pipeline = Pipeline::new();
        let deadline = Instant::now() + self.config.run_deadline;
        let result = match tokio::time::timeout_at(
            deadline,
            self.run_stages(&mission, &ctx, &mut pipeline),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => {
                pipeline.fail();
                Err(PipelineError::Deadline {
                    stage: pipeline.current_stage(),
                    deadline: self.config.run_deadline,
                })
            }
        };

        match &result {
            Ok(plan) => {
                tracing::info!("run complete: {}", plan.summary);
                self.emit(
                    SwarmEvent::new(SwarmEventKind::RunCompleted, &ctx.run_id)
                        .with_data(serde_json::json!({ "summary": plan.summary })),
                )
                .await;
            }
            Err(e) => {
                tracing::warn!("run failed: {}", e);
                let data = serde_json::to_value(e.summary()).unwrap_or_default();
                self.emit(SwarmEvent::new(SwarmEventKind::RunFailed, &ctx.run_id).with_data(data))
                    .await;
            }
        }
        result
    }

    async fn run_stages(
        &self,
        mission: &Mission,
        ctx: &StageContext,
        pipeline: &mut Pipeline,
    ) -> Result<ProjectPlan, PipelineError> {
        let mut artifacts = CollectedArtifacts::default();
        let mut provenance = Provenance::default();
        let mut input = StageInput::MissionAnalysis(mission.clone());

        loop {
            let kind = pipeline.current_stage();
            self.emit(SwarmEvent::for_stage(SwarmEventKind::StageStarted, &ctx.run_id, kind))
                .await;

            let result = self.executors[slot(kind)]
                .execute(input, ctx)
                .await
                .and_then(|outcome| {
                    if outcome.artifact.kind() != kind {
                        return Err(StageError::MissingArtifact(kind));
                    }
                    consistent_with(&outcome.artifact, &artifacts)?;
                    Ok(outcome)
                });
            let outcome = match result {
                Ok(outcome) => outcome,
                Err(cause) => {
                    pipeline.fail();
                    tracing::warn!("{} failed: {}", kind, cause);
                    self.emit(
                        SwarmEvent::for_stage(SwarmEventKind::StageFailed, &ctx.run_id, kind)
                            .with_data(serde_json::json!({ "error": cause.to_string() })),
                    )
                    .await;
                    return Err(PipelineError::StageFailed {
                        failed_stage: kind,
                        cause,
                    });
                }
            };

            tracing::info!("{}: {}", kind, outcome.artifact.describe());
            self.emit(
                SwarmEvent::for_stage(SwarmEventKind::StageCompleted, &ctx.run_id, kind)
                    .with_path(outcome.path.clone()),
            )
            .await;
            provenance.set(kind, outcome.path);

            let next = match outcome.artifact {
                StageArtifact::MissionAnalysis(analysis) => {
                    artifacts.mission_analysis = Some(analysis.clone());
                    Some(StageInput::MilestonePlanning(analysis))
                }
                StageArtifact::MilestonePlanning(milestones) => {
                    artifacts.milestones = Some(milestones.clone());
                    Some(StageInput::TaskBreakdown(TaskInput {
                        analysis: earlier(&artifacts.mission_analysis, StageKind::MissionAnalysis)?,
                        milestones,
                    }))
                }
                StageArtifact::TaskBreakdown(tasks) => {
                    artifacts.task_breakdown = Some(tasks.clone());
                    Some(StageInput::ResourceAllocation(ResourceInput {
                        analysis: earlier(&artifacts.mission_analysis, StageKind::MissionAnalysis)?,
                        tasks,
                    }))
                }
                StageArtifact::ResourceAllocation(resources) => {
                    artifacts.resource_allocation = Some(resources);
                    None
                }
            };

            pipeline.advance();
            match next {
                Some(next) => input = next,
                None => break,
            }
        }

        Ok(aggregate(mission, artifacts, provenance)?)
    }
}

fn earlier<T: Clone>(artifact: &Option<T>, stage: StageKind) -> Result<T, PipelineError> {
    artifact
        .clone()
        .ok_or(PipelineError::Aggregation(AggregationError::MissingArtifact(stage)))
}

/// A task breakdown must reference exactly the milestones this run planned.
fn consistent_with(
    artifact: &StageArtifact,
    artifacts: &CollectedArtifacts,
) -> Result<(), StageError> {
    if let (StageArtifact::TaskBreakdown(tasks), Some(milestones)) =
        (artifact, &artifacts.milestones)
    {
        let planned = milestones.names();
        if tasks.milestone_names != planned {
            return Err(ArtifactError::InvalidValue {
                field: "milestone_names".into(),
                reason: format!(
                    "expected {:?} from milestone planning, got {:?}",
                    planned, tasks.milestone_names
                ),
            }
            .into());
        }
    }
    Ok(())
}

fn is_local(config: &CoordinatorConfig, kind: StageKind) -> bool {
    kind == StageKind::MissionAnalysis || config.placement == StagePlacement::Local
}

fn build_executors(
    config: &CoordinatorConfig,
    registry: &Arc<ServiceRegistry>,
    runner: &Arc<StageRunner>,
) -> [Arc<dyn StageExecutor>; 4] {
    let client = RemoteClient::new(config.retry.clone());
    StageKind::ORDER.map(|kind| -> Arc<dyn StageExecutor> {
        match config.services.address_for(kind) {
            Some(address) if !is_local(config, kind) => Arc::new(RemoteExecutor::new(
                kind,
                address,
                registry.clone(),
                client.clone(),
                config.call_timeout,
            )),
            _ => Arc::new(LocalExecutor::new(kind, runner.clone())),
        }
    })
}
