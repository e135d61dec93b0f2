use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use planforge_core::config::StagePlacement;
use planforge_core::skills::AnalysisPath;
use planforge_core::swarm::{Coordinator, SwarmEvent, SwarmEventKind};
use planforge_server::config::{PersistedConfig, CONFIG_PATH};
use planforge_server::roles::{bind, serve, ServiceRole};
use planforge_server::telemetry::init_telemetry_with_level;
use tokio::sync::mpsc;

#[derive(Parser, Clone)]
#[command(author, version, about = "Planforge - mission to project plan")]
struct Args {
    /// Config file to read
    #[arg(long, global = true, default_value = CONFIG_PATH)]
    config: PathBuf,
    /// Log level (overridden by RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<String>,
    /// Skip the AI path and use rule-based analysis only
    #[arg(long, global = true)]
    no_ai: bool,
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand, Clone)]
enum CliCommand {
    /// Run one service
    Serve {
        #[arg(value_enum)]
        role: ServiceRole,
        /// Port to listen on (defaults to the role's port)
        #[arg(short, long)]
        port: Option<u16>,
        #[arg(long, default_value = "127.0.0.1")]
        host: IpAddr,
        /// Base URL advertised in the service card
        #[arg(long)]
        public_url: Option<String>,
    },
    /// Run all four services in this process on their default ports
    All {
        #[arg(long, default_value = "127.0.0.1")]
        host: IpAddr,
    },
    /// Plan a mission and print the plan as JSON
    Run {
        /// The mission text
        mission: String,
        /// Run every stage in-process instead of calling the workers
        #[arg(long)]
        local: bool,
    },
    /// Write the effective configuration to the config file
    Init,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let (mut persisted, load_error) = match PersistedConfig::load(&args.config).await {
        Ok(persisted) => (persisted, None),
        Err(e) => (PersistedConfig::default(), Some(e)),
    };
    persisted.apply_env();
    if let Some(level) = &args.log_level {
        persisted.log_level = Some(level.clone());
    }
    if args.no_ai {
        persisted.ai_enabled = Some(false);
    }
    init_telemetry_with_level(persisted.log_level());
    if let Some(e) = load_error {
        tracing::warn!("ignoring config file: {:#}", e);
    }

    let mut config = persisted
        .to_coordinator_config()
        .context("invalid configuration")?;

    match args.command {
        CliCommand::Serve {
            role,
            port,
            host,
            public_url,
        } => {
            let addr = SocketAddr::new(host, port.unwrap_or_else(|| role.default_port()));
            let listener = bind(addr).await?;
            let base_url = public_url.unwrap_or_else(|| format!("http://{}", addr));
            serve(listener, role.router(&config, &base_url), role).await
        }
        CliCommand::All { host } => {
            let mut services = tokio::task::JoinSet::new();
            for role in ServiceRole::ALL {
                let addr = SocketAddr::new(host, role.default_port());
                let listener = bind(addr).await?;
                let router = role.router(&config, &format!("http://{}", addr));
                services.spawn(serve(listener, router, role));
            }
            while let Some(joined) = services.join_next().await {
                joined.context("service task panicked")??;
            }
            Ok(())
        }
        CliCommand::Run { mission, local } => {
            if local {
                config.placement = StagePlacement::Local;
            }
            run_mission(Coordinator::new(config), &mission).await
        }
        CliCommand::Init => {
            persisted.save(&args.config).await?;
            println!("Wrote {}", args.config.display());
            Ok(())
        }
    }
}

async fn run_mission(coordinator: Coordinator, mission: &str) -> anyhow::Result<()> {
    let (tx, mut rx) = mpsc::channel::<SwarmEvent>(32);
    let coordinator = coordinator.with_event_channel(tx);

    let progress = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if let (SwarmEventKind::StageCompleted, Some(stage)) = (&event.kind, event.stage) {
                let via = match &event.path {
                    Some(AnalysisPath::Ai) => "ai",
                    Some(AnalysisPath::Fallback { .. }) => "rules",
                    Some(AnalysisPath::Unreported) | None => "unreported",
                };
                eprintln!("  ✓ {} ({})", stage, via);
            }
        }
    });

    let result = coordinator.run_mission(mission).await;
    drop(coordinator);
    progress.await.ok();

    match result {
        Ok(plan) => {
            println!("{}", serde_json::to_string_pretty(&plan)?);
            Ok(())
        }
        Err(e) => {
            eprintln!("{}", serde_json::to_string_pretty(&e.summary())?);
            Err(e.into())
        }
    }
}
