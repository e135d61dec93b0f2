//! Which service a process plays, and how to stand it up.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use clap::ValueEnum;
use planforge_core::config::CoordinatorConfig;
use planforge_core::skills::{StageKind, StageRunner};
use planforge_core::swarm::Coordinator;
use tokio::net::TcpListener;

use crate::api::orchestrator::orchestrator_card;
use crate::api::worker::worker_card;
use crate::api::{orchestrator_router, worker_router};
use crate::config::{MILESTONE_PORT, ORCHESTRATOR_PORT, RESOURCE_PORT, TASK_PORT};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ServiceRole {
    Orchestrator,
    Milestone,
    Task,
    Resource,
}

impl ServiceRole {
    pub const ALL: [ServiceRole; 4] = [
        ServiceRole::Orchestrator,
        ServiceRole::Milestone,
        ServiceRole::Task,
        ServiceRole::Resource,
    ];

    /// Stage a worker runs; `None` for the orchestrator.
    pub fn stage(self) -> Option<StageKind> {
        match self {
            ServiceRole::Orchestrator => None,
            ServiceRole::Milestone => Some(StageKind::MilestonePlanning),
            ServiceRole::Task => Some(StageKind::TaskBreakdown),
            ServiceRole::Resource => Some(StageKind::ResourceAllocation),
        }
    }

    pub fn default_port(self) -> u16 {
        match self {
            ServiceRole::Orchestrator => ORCHESTRATOR_PORT,
            ServiceRole::Milestone => MILESTONE_PORT,
            ServiceRole::Task => TASK_PORT,
            ServiceRole::Resource => RESOURCE_PORT,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ServiceRole::Orchestrator => "orchestrator",
            ServiceRole::Milestone => "milestone",
            ServiceRole::Task => "task",
            ServiceRole::Resource => "resource",
        }
    }

    /// Router for this role. `base_url` is what the card advertises.
    pub fn router(self, config: &CoordinatorConfig, base_url: &str) -> Router {
        match self.stage() {
            None => {
                let coordinator = Coordinator::new(config.clone());
                orchestrator_router(Arc::new(coordinator), orchestrator_card(base_url))
            }
            Some(kind) => {
                let runner = Arc::new(StageRunner::new(&config.analysis));
                worker_router(kind, runner, worker_card(kind, base_url))
            }
        }
    }
}

/// Serve `router` on an already bound listener until ctrl-c.
pub async fn serve(listener: TcpListener, router: Router, role: ServiceRole) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!("{} service listening on http://{}", role.name(), addr);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .with_context(|| format!("{} service stopped", role.name()))
}

pub async fn bind(addr: SocketAddr) -> anyhow::Result<TcpListener> {
    TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!("shutting down");
    }
}
