//! # Planforge Core
//!
//! Turns a free-text mission into a project plan: analysis, milestones,
//! tasks, and staffing.
//!
//! ## Architecture
//!
//! - `a2a/` - Envelope codec, service cards, discovery, and the remote call client
//! - `skills/` - The four analysis stages, each with an AI path and a rule-based fallback
//! - `plan/` - Stage artifacts and the aggregated `ProjectPlan`
//! - `swarm/` - Coordinator, pipeline state machine, and stage executors
//! - `models` - LLM provider configuration
//! - `config` - Everything a run needs, threaded explicitly
//!
//! ## Usage
//!
//! ```rust,ignore
//! use planforge_core::config::CoordinatorConfig;
//! use planforge_core::swarm::Coordinator;
//!
//! let coordinator = Coordinator::new(CoordinatorConfig::default());
//! let plan = coordinator.run_mission("Build a stock tracker").await?;
//! ```

pub mod a2a;
pub mod config;
pub mod error;
pub mod models;
pub mod plan;
pub mod skills;
pub mod swarm;
