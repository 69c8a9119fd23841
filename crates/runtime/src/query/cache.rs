//! Datacenter-scoped result cache.
//!
//! Reads go to the plan's datacenter namespace and fall back to the shared standby
//! namespace only when the datacenter store errors; a plain miss is final. Writes go
//! to the datacenter namespace only. No cache failure ever reaches the caller.
//!
//! The standby namespace is shared by every datacenter and its keys carry no
//! datacenter qualifier, so a fallback read may return an entry written for a
//! different datacenter's plan of the same statement text.

use sha2::{Digest, Sha256};
use shardgate_common::warnings::add_warning;
use shardgate_common::{CacheNamespaceConfig, CacheSettings, ResultSet};
use shardgate_connectors::cache::{CacheStore, StoreError, StoreRegistry};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Namespace name → lazily connected store client.
pub struct CacheStorePool {
    namespaces: Vec<CacheNamespaceConfig>,
    registry: StoreRegistry,
    clients: RwLock<HashMap<String, Arc<dyn CacheStore>>>,
}

impl CacheStorePool {
    pub fn new(namespaces: Vec<CacheNamespaceConfig>, registry: StoreRegistry) -> Self {
        Self {
            namespaces,
            registry,
            clients: RwLock::new(HashMap::new()),
        }
    }

    pub fn names(&self) -> Vec<String> {
        self.namespaces.iter().map(|ns| ns.name.clone()).collect()
    }

    /// Returns the client for `namespace`, connecting on first use. Failed
    /// connections are not remembered.
    pub async fn open(&self, namespace: &str) -> Result<Arc<dyn CacheStore>, StoreError> {
        if let Some(client) = self.clients.read().await.get(namespace) {
            return Ok(client.clone());
        }

        let config = self
            .namespaces
            .iter()
            .find(|ns| ns.name == namespace)
            .ok_or_else(|| {
                StoreError::InvalidConfig(format!("cache namespace '{}' is not configured", namespace))
            })?;

        let client = self.registry.connect(config).await?;
        let mut clients = self.clients.write().await;
        Ok(clients
            .entry(namespace.to_string())
            .or_insert_with(|| client)
            .clone())
    }

    pub async fn close_all(&self) {
        let closed = {
            let mut clients = self.clients.write().await;
            let count = clients.len();
            clients.clear();
            count
        };
        info!(closed, "Closed cache clients");
    }
}

pub struct CacheManager {
    pool: CacheStorePool,
    settings: CacheSettings,
}

impl CacheManager {
    pub fn new(settings: CacheSettings, registry: StoreRegistry) -> Self {
        Self {
            pool: CacheStorePool::new(settings.namespaces.clone(), registry),
            settings,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.settings.enabled
    }

    pub fn pool(&self) -> &CacheStorePool {
        &self.pool
    }

    pub fn standby_namespace(&self) -> &str {
        &self.settings.standby_namespace
    }

    /// `<prefix>:<sha256 hex>` of the statement exactly as given.
    pub fn key_for(&self, sql: &str) -> String {
        format!("{}:{:x}", self.settings.key_prefix, Sha256::digest(sql.as_bytes()))
    }

    pub async fn get(&self, sql: &str, datacenter: &str) -> Option<ResultSet> {
        if !self.settings.enabled {
            return None;
        }

        let key = self.key_for(sql);
        let standby = self.settings.standby_namespace.as_str();

        match self.read(datacenter, &key).await {
            Ok(payload) => payload.and_then(|p| decode(datacenter, &p)),
            Err(e) if datacenter == standby => {
                warn!(namespace = %datacenter, error = %e, "Standby cache read failed");
                None
            }
            Err(e) => {
                warn!(
                    namespace = %datacenter,
                    standby = %standby,
                    error = %e,
                    "Cache read failed, falling back to standby"
                );
                add_warning(format!("x-shardgate-cache-failover: {} -> {}", datacenter, standby));

                match self.read(standby, &key).await {
                    Ok(payload) => payload.and_then(|p| decode(standby, &p)),
                    Err(e) => {
                        warn!(namespace = %standby, error = %e, "Standby cache read failed");
                        None
                    }
                }
            }
        }
    }

    /// Best-effort write to the datacenter namespace.
    pub async fn set(&self, sql: &str, rows: &ResultSet, datacenter: &str) {
        if !self.settings.enabled {
            return;
        }

        let payload = match serde_json::to_string(rows) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "Failed to encode result set for caching");
                return;
            }
        };
        let key = self.key_for(sql);
        let ttl = Duration::from_secs(self.settings.ttl_seconds);

        let result = self
            .bounded(datacenter, |store| async move { store.set_ex(&key, &payload, ttl).await })
            .await;
        match result {
            Ok(()) => debug!(namespace = %datacenter, rows = rows.len(), "Cached result set"),
            Err(e) => warn!(namespace = %datacenter, error = %e, "Cache write failed"),
        }
    }

    /// Removes prefixed keys from one namespace, or from every configured one.
    pub async fn clear(&self, namespace: Option<&str>) -> u64 {
        if !self.settings.enabled {
            return 0;
        }

        let targets = match namespace {
            Some(ns) => vec![ns.to_string()],
            None => self.pool.names(),
        };
        let prefix = format!("{}:", self.settings.key_prefix);

        let mut cleared = 0;
        for ns in targets {
            let prefix = prefix.clone();
            let result = self
                .bounded(&ns, |store| async move { store.delete_matching(&prefix).await })
                .await;
            match result {
                Ok(count) => {
                    info!(namespace = %ns, cleared = count, "Cleared cache namespace");
                    cleared += count;
                }
                Err(e) => warn!(namespace = %ns, error = %e, "Failed to clear cache namespace"),
            }
        }
        cleared
    }

    pub async fn shutdown(&self) {
        self.pool.close_all().await;
    }

    async fn read(&self, namespace: &str, key: &str) -> Result<Option<String>, StoreError> {
        let key = key.to_string();
        self.bounded(namespace, |store| async move { store.get(&key).await })
            .await
    }

    /// Opens the namespace and runs `op`, all within `operation_timeout_ms`.
    async fn bounded<T, F, Fut>(&self, namespace: &str, op: F) -> Result<T, StoreError>
    where
        F: FnOnce(Arc<dyn CacheStore>) -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let limit = Duration::from_millis(self.settings.operation_timeout_ms);
        let call = async {
            let store = self.pool.open(namespace).await?;
            op(store).await
        };

        tokio::time::timeout(limit, call).await.map_err(|_| {
            StoreError::Unavailable(format!("'{}' did not answer within {:?}", namespace, limit))
        })?
    }
}

fn decode(namespace: &str, payload: &str) -> Option<ResultSet> {
    match serde_json::from_str(payload) {
        Ok(rows) => Some(rows),
        Err(e) => {
            warn!(namespace = %namespace, error = %e, "Discarding undecodable cache entry");
            None
        }
    }
}
