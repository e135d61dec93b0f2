//! # Swarm Orchestration
//!
//! Coordinates the stage pipeline for a mission.
//!
//! ## Pipeline Flow
//!
//! ```text
//! Mission → Mission Analysis → Milestone Planning → Task Breakdown → Resource Allocation → ProjectPlan
//! ```

pub mod aggregator;
pub mod coordinator;
pub mod events;
pub mod executor;
pub mod pipeline;

pub use aggregator::{aggregate, CollectedArtifacts};
pub use coordinator::Coordinator;
pub use events::{SwarmEvent, SwarmEventKind};
pub use executor::{LocalExecutor, RemoteExecutor, StageExecutor};
pub use pipeline::{Pipeline, PipelineStage};
