//! Container stats sampling library
//!
//! This crate provides the core functionality for:
//! - Listing running containers and sampling their raw statistics
//! - Per-container history for delta-based CPU percentages
//! - Cache-adjusted memory percentages
//! - Health checks and observability for the agent

pub mod collector;
pub mod error;
pub mod health;
pub mod history;
pub mod models;
pub mod observability;

pub use error::{RuntimeError, RuntimeResult};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use history::HistoryStore;
pub use models::*;
pub use observability::{AgentMetrics, StructuredLogger};
