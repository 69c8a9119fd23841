//! Backend registry: static descriptors plus lazily opened client handles.

use anyhow::{Context, Result};
use shardgate_common::{BackendConfig, ExecutorSettings};
use shardgate_connectors::sources::{SourceRegistry, SqlBackend};
use shardgate_error::{ErrorCode, ErrorContext, ShardgateError};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Name → descriptor map with one shared client per backend.
///
/// Clients are created on first use and kept until `close_all`. A failed open is
/// not remembered, so the next call tries again.
pub struct BackendPool {
    descriptors: Vec<BackendConfig>,
    registry: SourceRegistry,
    settings: ExecutorSettings,
    clients: RwLock<HashMap<String, Arc<dyn SqlBackend>>>,
}

impl BackendPool {
    pub fn new(
        descriptors: Vec<BackendConfig>,
        registry: SourceRegistry,
        settings: ExecutorSettings,
    ) -> Self {
        Self {
            descriptors,
            registry,
            settings,
            clients: RwLock::new(HashMap::new()),
        }
    }

    pub fn descriptor(&self, name: &str) -> Option<&BackendConfig> {
        self.descriptors.iter().find(|b| b.name == name)
    }

    pub fn names(&self) -> Vec<String> {
        self.descriptors.iter().map(|b| b.name.clone()).collect()
    }

    pub fn standby_of(&self, name: &str) -> Option<&str> {
        self.descriptor(name).and_then(|b| b.standby.as_deref())
    }

    pub fn datacenter_of(&self, name: &str) -> Option<&str> {
        self.descriptor(name).and_then(|b| b.datacenter.as_deref())
    }

    /// Returns the shared client for `name`, opening it on first use.
    pub async fn open(&self, name: &str) -> Result<Arc<dyn SqlBackend>> {
        if let Some(client) = self.clients.read().await.get(name) {
            return Ok(client.clone());
        }

        let descriptor = self.descriptor(name).ok_or_else(|| {
            ShardgateError::new(
                ErrorCode::BackendNotFound,
                format!("Backend '{}' is not registered", name),
            )
            .with_context(ErrorContext::Backend {
                backend: name.to_string(),
                standby: None,
                endpoint: None,
            })
        })?;

        let client = self
            .registry
            .connect(descriptor, &self.settings)
            .await
            .with_context(|| format!("Failed to open backend '{}'", name))?;

        let mut clients = self.clients.write().await;
        // Another task may have opened it meanwhile; keep the first one.
        let client = clients
            .entry(name.to_string())
            .or_insert_with(|| client)
            .clone();
        debug!(backend = %name, "Backend client ready");
        Ok(client)
    }

    pub async fn close_all(&self) {
        let clients: Vec<_> = self.clients.write().await.drain().collect();
        let count = clients.len();
        for (_, client) in clients {
            client.close().await;
        }
        info!(closed = count, "Closed backend clients");
    }
}
