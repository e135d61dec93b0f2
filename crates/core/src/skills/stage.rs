//! # Analysis Stage
//!
//! One unit of work with an AI-assisted path and a rule-based fallback.
//!
//! ```text
//!         ai enabled           ok + valid
//! Idle ───────────► AiAttempt ───────────► Success ──┐
//!   │                   │ error / timeout / invalid  ├──► Done
//!   │ ai disabled       ▼                            │
//!   └─────────────► Fallback ───────────────────────┘
//! ```
//!
//! `Fallback` never leads back to `AiAttempt`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{AnalysisPath, StageContext, StageKind};
use crate::plan::Validate;

/// AI-assisted analysis. Any error sends the stage to its fallback.
#[async_trait]
pub trait AiStrategy<I, O>: Send + Sync {
    async fn analyze(&self, input: &I, ctx: &StageContext) -> anyhow::Result<O>;
}

/// Deterministic analysis. Must not fail for well-formed input.
pub trait RuleStrategy<I, O>: Send + Sync {
    fn compute(&self, input: &I, ctx: &StageContext) -> O;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageState {
    Idle,
    AiAttempt,
    Success,
    Fallback,
    Done,
}

impl StageState {
    pub fn can_transition_to(self, next: StageState) -> bool {
        use StageState::*;
        matches!(
            (self, next),
            (Idle, AiAttempt)
                | (Idle, Fallback)
                | (AiAttempt, Success)
                | (AiAttempt, Fallback)
                | (Success, Done)
                | (Fallback, Done)
        )
    }
}

/// Tracks the state of one stage run.
#[derive(Debug)]
struct StageMachine {
    state: StageState,
    trace: Vec<StageState>,
}

impl StageMachine {
    fn new() -> Self {
        Self {
            state: StageState::Idle,
            trace: vec![StageState::Idle],
        }
    }

    fn advance(&mut self, next: StageState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal stage transition {:?} -> {:?}",
            self.state,
            next
        );
        self.state = next;
        self.trace.push(next);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StageResult<O> {
    pub output: O,
    pub path: AnalysisPath,
    /// States visited, starting at `Idle` and ending at `Done`.
    pub trace: Vec<StageState>,
}

pub struct AnalysisStage<I, O> {
    kind: StageKind,
    ai: Option<Arc<dyn AiStrategy<I, O>>>,
    rules: Arc<dyn RuleStrategy<I, O>>,
    ai_timeout: Duration,
}

impl<I, O> Clone for AnalysisStage<I, O> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            ai: self.ai.clone(),
            rules: self.rules.clone(),
            ai_timeout: self.ai_timeout,
        }
    }
}

impl<I, O> AnalysisStage<I, O>
where
    I: Send + Sync,
    O: Validate + Send,
{
    /// A stage that only has its rule-based path.
    pub fn new(kind: StageKind, rules: Arc<dyn RuleStrategy<I, O>>) -> Self {
        Self {
            kind,
            ai: None,
            rules,
            ai_timeout: Duration::from_secs(15),
        }
    }

    pub fn with_ai(mut self, ai: Arc<dyn AiStrategy<I, O>>, timeout: Duration) -> Self {
        self.ai = Some(ai);
        self.ai_timeout = timeout;
        self
    }

    pub fn kind(&self) -> StageKind {
        self.kind
    }

    pub fn ai_enabled(&self) -> bool {
        self.ai.is_some()
    }

    #[tracing::instrument(skip_all, fields(stage = %self.kind, run_id = %ctx.run_id))]
    pub async fn run(&self, input: &I, ctx: &StageContext) -> StageResult<O> {
        let mut machine = StageMachine::new();

        let reason = match &self.ai {
            None => "ai analysis disabled".to_string(),
            Some(ai) => {
                machine.advance(StageState::AiAttempt);
                match tokio::time::timeout(self.ai_timeout, ai.analyze(input, ctx)).await {
                    Ok(Ok(output)) => match output.validate() {
                        Ok(()) => {
                            machine.advance(StageState::Success);
                            machine.advance(StageState::Done);
                            tracing::info!("{} produced by AI path", self.kind);
                            return StageResult {
                                output,
                                path: AnalysisPath::Ai,
                                trace: machine.trace,
                            };
                        }
                        Err(e) => format!("AI output failed validation: {}", e),
                    },
                    Ok(Err(e)) => format!("AI analysis failed: {}", e),
                    Err(_) => format!("AI analysis timed out after {:?}", self.ai_timeout),
                }
            }
        };

        if self.ai.is_some() {
            tracing::warn!("{}: {}, using rule-based analysis", self.kind, reason);
        } else {
            tracing::debug!("{}: {}", self.kind, reason);
        }

        machine.advance(StageState::Fallback);
        let output = self.rules.compute(input, ctx);
        machine.advance(StageState::Done);

        StageResult {
            output,
            path: AnalysisPath::fallback(reason),
            trace: machine.trace,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ArtifactError;

    #[derive(Debug, PartialEq)]
    struct Count(i32);

    impl Validate for Count {
        fn validate(&self) -> Result<(), ArtifactError> {
            if self.0 >= 0 {
                Ok(())
            } else {
                Err(ArtifactError::InvalidValue {
                    field: "count".into(),
                    reason: "negative".into(),
                })
            }
        }
    }

    struct Rules;
    impl RuleStrategy<i32, Count> for Rules {
        fn compute(&self, input: &i32, _ctx: &StageContext) -> Count {
            Count(input.abs())
        }
    }

    struct Echo;
    #[async_trait]
    impl AiStrategy<i32, Count> for Echo {
        async fn analyze(&self, input: &i32, _ctx: &StageContext) -> anyhow::Result<Count> {
            Ok(Count(*input))
        }
    }

    struct Broken;
    #[async_trait]
    impl AiStrategy<i32, Count> for Broken {
        async fn analyze(&self, _input: &i32, _ctx: &StageContext) -> anyhow::Result<Count> {
            anyhow::bail!("provider unavailable")
        }
    }

    struct Slow;
    #[async_trait]
    impl AiStrategy<i32, Count> for Slow {
        async fn analyze(&self, input: &i32, _ctx: &StageContext) -> anyhow::Result<Count> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Count(*input))
        }
    }

    fn stage() -> AnalysisStage<i32, Count> {
        AnalysisStage::new(StageKind::MissionAnalysis, Arc::new(Rules))
    }

    fn ctx() -> StageContext {
        StageContext::new("test-run")
    }

    #[tokio::test]
    async fn test_ai_success_path() {
        let stage = stage().with_ai(Arc::new(Echo), Duration::from_secs(1));
        let result = stage.run(&7, &ctx()).await;

        assert_eq!(result.output, Count(7));
        assert_eq!(result.path, AnalysisPath::Ai);
        assert_eq!(
            result.trace,
            vec![
                StageState::Idle,
                StageState::AiAttempt,
                StageState::Success,
                StageState::Done
            ]
        );
    }

    #[tokio::test]
    async fn test_ai_error_falls_back() {
        let stage = stage().with_ai(Arc::new(Broken), Duration::from_secs(1));
        let result = stage.run(&-3, &ctx()).await;

        assert_eq!(result.output, Count(3));
        assert!(matches!(&result.path, AnalysisPath::Fallback { reason } if reason.contains("provider unavailable")));
        assert_eq!(
            result.trace,
            vec![
                StageState::Idle,
                StageState::AiAttempt,
                StageState::Fallback,
                StageState::Done
            ]
        );
    }

    #[tokio::test]
    async fn test_invalid_ai_output_falls_back() {
        let stage = stage().with_ai(Arc::new(Echo), Duration::from_secs(1));
        let result = stage.run(&-5, &ctx()).await;

        assert_eq!(result.output, Count(5));
        assert!(result.path.is_fallback());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ai_timeout_falls_back() {
        let stage = stage().with_ai(Arc::new(Slow), Duration::from_millis(100));
        let result = stage.run(&2, &ctx()).await;

        assert_eq!(result.output, Count(2));
        assert!(matches!(&result.path, AnalysisPath::Fallback { reason } if reason.contains("timed out")));
    }

    #[tokio::test]
    async fn test_disabled_ai_goes_straight_to_fallback() {
        let result = stage().run(&4, &ctx()).await;
        assert_eq!(
            result.trace,
            vec![StageState::Idle, StageState::Fallback, StageState::Done]
        );
    }

    #[test]
    fn test_fallback_never_reenters_ai() {
        assert!(!StageState::Fallback.can_transition_to(StageState::AiAttempt));
        assert!(!StageState::Done.can_transition_to(StageState::AiAttempt));
        assert!(!StageState::Success.can_transition_to(StageState::Fallback));
    }
}
