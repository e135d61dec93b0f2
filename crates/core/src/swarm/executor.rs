//! # Stage Executors
//!
//! Where a stage runs: in this process, or on a worker service.
//!
//! Both kinds hand back a validated artifact plus the path that produced
//! it. A remote artifact that fails validation is a stage failure, not a
//! reason to fall back locally.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::a2a::{RemoteClient, SendMessageRequest, ServiceRegistry};
use crate::error::{CallError, CallErrorKind, StageError};
use crate::skills::{AnalysisPath, StageContext, StageInput, StageKind, StageOutcome, StageRunner};

#[async_trait]
pub trait StageExecutor: Send + Sync {
    fn kind(&self) -> StageKind;

    async fn execute(&self, input: StageInput, ctx: &StageContext) -> Result<StageOutcome, StageError>;
}

/// Runs the stage in-process.
pub struct LocalExecutor {
    kind: StageKind,
    runner: Arc<StageRunner>,
}

impl LocalExecutor {
    pub fn new(kind: StageKind, runner: Arc<StageRunner>) -> Self {
        Self { kind, runner }
    }
}

#[async_trait]
impl StageExecutor for LocalExecutor {
    fn kind(&self) -> StageKind {
        self.kind
    }

    async fn execute(&self, input: StageInput, ctx: &StageContext) -> Result<StageOutcome, StageError> {
        let outcome = self.runner.run(&input, ctx).await;
        outcome.artifact.validate()?;
        Ok(outcome)
    }
}

/// Sends the stage to a worker service found through discovery.
pub struct RemoteExecutor {
    kind: StageKind,
    address: String,
    registry: Arc<ServiceRegistry>,
    client: RemoteClient,
    call_timeout: Duration,
}

impl RemoteExecutor {
    pub fn new(
        kind: StageKind,
        address: impl Into<String>,
        registry: Arc<ServiceRegistry>,
        client: RemoteClient,
        call_timeout: Duration,
    ) -> Self {
        Self {
            kind,
            address: address.into(),
            registry,
            client,
            call_timeout,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }
}

#[async_trait]
impl StageExecutor for RemoteExecutor {
    fn kind(&self) -> StageKind {
        self.kind
    }

    #[tracing::instrument(skip_all, fields(stage = %self.kind, address = %self.address))]
    async fn execute(&self, input: StageInput, _ctx: &StageContext) -> Result<StageOutcome, StageError> {
        let request = SendMessageRequest::for_stage(&input).map_err(|e| CallError {
            service: self.address.clone(),
            kind: CallErrorKind::Malformed(format!("request: {}", e)),
            attempts: 0,
        })?;

        let card = self.registry.discover(&self.address).await?;
        let mut response = match self.client.send(&card, &request, self.call_timeout).await {
            Ok(response) => response,
            Err(err) if matches!(err.kind, CallErrorKind::Unreachable(_)) => {
                // The worker may have restarted or moved; a fresh card earns one more try.
                let fresh = match self.registry.refresh(&self.address).await {
                    Ok(fresh) => fresh,
                    Err(refresh_err) => {
                        tracing::debug!("re-discovery failed: {}", refresh_err);
                        return Err(err.into());
                    }
                };
                if fresh.send_message_url() != card.send_message_url() {
                    tracing::info!("'{}' moved to {}", fresh.name, fresh.send_message_url());
                }
                self.client.send(&fresh, &request, self.call_timeout).await?
            }
            Err(err) => return Err(err.into()),
        };

        let artifact = response
            .take_artifact(self.kind)
            .ok_or(StageError::MissingArtifact(self.kind))?;
        artifact.validate()?;

        Ok(StageOutcome {
            artifact,
            path: response.analysis_path.unwrap_or(AnalysisPath::Unreported),
        })
    }
}
