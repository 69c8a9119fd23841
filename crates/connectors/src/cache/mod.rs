//! Result cache stores.
//!
//! A store is one cache namespace (a datacenter cache or the shared standby).
//! Values are opaque strings; the runtime owns the key scheme and payload format.

use async_trait::async_trait;
use shardgate_common::CacheNamespaceConfig;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub mod memory;
pub mod redis;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] ::redis::RedisError),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid store configuration: {0}")]
    InvalidConfig(String),

    #[error("No store provider for type: {0}")]
    UnknownType(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Lists the keys starting with `prefix`.
    async fn scan(&self, prefix: &str) -> Result<Vec<String>>;

    /// Deletes every key starting with `prefix` and returns how many were removed.
    async fn delete_matching(&self, prefix: &str) -> Result<u64>;
}

#[async_trait]
pub trait CacheStoreProvider: Send + Sync {
    /// Returns the store type this provider handles (e.g., "redis")
    fn type_name(&self) -> &'static str;

    async fn connect(&self, config: &CacheNamespaceConfig) -> Result<Arc<dyn CacheStore>>;
}

#[derive(Default)]
pub struct StoreRegistry {
    providers: HashMap<&'static str, Box<dyn CacheStoreProvider>>,
}

impl StoreRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_provider(&mut self, provider: Box<dyn CacheStoreProvider>) {
        self.providers.insert(provider.type_name(), provider);
    }

    pub fn supports(&self, store_type: &str) -> bool {
        self.providers.contains_key(store_type)
    }

    pub async fn connect(&self, config: &CacheNamespaceConfig) -> Result<Arc<dyn CacheStore>> {
        match self.providers.get(config.store_type.as_str()) {
            Some(provider) => provider.connect(config).await,
            None => Err(StoreError::UnknownType(config.store_type.clone())),
        }
    }
}

pub fn default_registry() -> StoreRegistry {
    let mut registry = StoreRegistry::new();
    registry.register_provider(Box::new(redis::RedisStoreProvider));
    registry.register_provider(Box::new(memory::MemoryStoreProvider));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_store_type() {
        let registry = default_registry();
        let config = CacheNamespaceConfig {
            name: "DC1".to_string(),
            store_type: "memcached".to_string(),
            url: None,
        };
        match registry.connect(&config).await {
            Err(StoreError::UnknownType(t)) => assert_eq!(t, "memcached"),
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("memcached is not registered"),
        }
    }

    #[tokio::test]
    async fn test_redis_requires_url() {
        let registry = default_registry();
        let config = CacheNamespaceConfig {
            name: "DC2".to_string(),
            store_type: "redis".to_string(),
            url: None,
        };
        assert!(matches!(
            registry.connect(&config).await,
            Err(StoreError::InvalidConfig(_))
        ));
    }
}
