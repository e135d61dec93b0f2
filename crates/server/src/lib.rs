//! # Planforge Server
//!
//! HTTP services, configuration loading, and logging setup for the
//! `planforge` binary.

pub mod api;
pub mod config;
pub mod roles;
pub mod telemetry;
