//! Backend abstractions and implementations.
//!
//! Each backend entry in the configuration names a `type`; the matching
//! `SourceProvider` turns the entry into a [`SqlBackend`] handle that the executor
//! sends statements to.
//!
//! # Supported Backends
//!
//! | Type       | Implementation             | Description                          |
//! |------------|----------------------------|--------------------------------------|
//! | `postgres` | `PostgresSourceProvider`   | PostgreSQL (and wire-compatible) DBs |
//!
//! # Adding a New Backend
//!
//! 1. Implement `SqlBackend` for the connection handle.
//! 2. Implement `SourceProvider` to build it from a `BackendConfig`.
//! 3. Register the provider in `default_registry`, or pass it to the coordinator
//!    as an extra source.

use anyhow::Result;
use async_trait::async_trait;
use shardgate_common::{BackendConfig, ExecutorSettings, ResultSet};
use std::collections::HashMap;
use std::sync::Arc;

pub mod postgres;

/// A connection handle to one relational backend.
#[async_trait]
pub trait SqlBackend: Send + Sync {
    /// Backend name as declared in configuration (e.g., "DBMS1").
    fn name(&self) -> &str;

    /// Executes one read-only statement and returns rows in backend order.
    async fn query(&self, sql: &str) -> Result<ResultSet>;

    /// Releases pooled resources. Called once on shutdown.
    async fn close(&self) {}
}

/// A backend that could not be reached at all: refused or timed-out connects,
/// connections lost mid-statement, statements that never answered. A statement
/// the backend rejected is not `Unreachable`.
#[derive(Debug, thiserror::Error)]
#[error("backend '{backend}' is unreachable: {reason}")]
pub struct Unreachable {
    pub backend: String,
    pub reason: String,
}

impl Unreachable {
    pub fn new(backend: impl Into<String>, reason: impl ToString) -> Self {
        Self {
            backend: backend.into(),
            reason: reason.to_string(),
        }
    }
}

/// Whether `err`, or anything it wraps, marks the backend as unreachable.
pub fn is_unreachable(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| cause.is::<Unreachable>())
}

#[async_trait]
pub trait SourceProvider: Send + Sync {
    /// Returns the backend type this provider handles (e.g., "postgres")
    fn type_name(&self) -> &'static str;

    /// Builds a handle for the given backend entry
    async fn connect(
        &self,
        config: &BackendConfig,
        settings: &ExecutorSettings,
    ) -> Result<Arc<dyn SqlBackend>>;
}

#[derive(Default)]
pub struct SourceRegistry {
    providers: HashMap<&'static str, Box<dyn SourceProvider>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_provider(&mut self, provider: Box<dyn SourceProvider>) {
        self.providers.insert(provider.type_name(), provider);
    }

    pub fn supports(&self, backend_type: &str) -> bool {
        self.providers.contains_key(normalize_type(backend_type))
    }

    pub fn type_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.providers.keys().copied().collect();
        names.sort_unstable();
        names
    }

    pub async fn connect(
        &self,
        config: &BackendConfig,
        settings: &ExecutorSettings,
    ) -> Result<Arc<dyn SqlBackend>> {
        let type_name = normalize_type(&config.backend_type);

        if let Some(provider) = self.providers.get(type_name) {
            provider.connect(config, settings).await
        } else {
            anyhow::bail!("No provider found for backend type: {}", type_name)
        }
    }
}

fn normalize_type(backend_type: &str) -> &str {
    match backend_type {
        "postgresql" | "pg" => "postgres",
        other => other,
    }
}

pub fn default_registry() -> SourceRegistry {
    let mut registry = SourceRegistry::new();
    registry.register_provider(Box::new(postgres::PostgresSourceProvider));
    registry
}
