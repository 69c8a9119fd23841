//! Common utilities, types, and configurations shared across Shardgate crates.
//!
//! This crate contains the base building blocks for the Shardgate router, including:
//! - **Configuration**: Strongly typed application configuration (`config`, `models`).
//! - **Rows**: The ordered, schema-less result row model (`row`).
//! - **Telemetry**: Observability setup (`telemetry`).
//! - **Resilience**: Circuit breakers for failing backends (`circuit_breaker`).
//! - **Logging**: Credential/PII scrubbing (`scrubber`) and per-query warnings (`warnings`).
pub mod circuit_breaker;
pub mod config;
pub mod models;
pub mod row;
pub mod scrubber;
pub mod telemetry;
pub mod warnings;
pub use crate::models::{
    BackendConfig, CacheNamespaceConfig, CacheSettings, ExecutorSettings, JoinSettings,
};
pub use crate::row::{ResultRow, ResultSet};
