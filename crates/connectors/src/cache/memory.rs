//! In-process store for single-node setups and tests.
use async_trait::async_trait;
use moka::future::Cache;
use moka::Expiry;
use shardgate_common::CacheNamespaceConfig;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{CacheStore, CacheStoreProvider, Result};

const MAX_ENTRIES: u64 = 10_000;

pub struct MemoryStoreProvider;

#[async_trait]
impl CacheStoreProvider for MemoryStoreProvider {
    fn type_name(&self) -> &'static str {
        "memory"
    }

    async fn connect(&self, _config: &CacheNamespaceConfig) -> Result<Arc<dyn CacheStore>> {
        Ok(Arc::new(MemoryStore::new()))
    }
}

#[derive(Clone)]
struct Entry {
    value: Arc<str>,
    ttl: Duration,
}

struct PerEntryTtl;

impl Expiry<String, Entry> for PerEntryTtl {
    fn expire_after_create(&self, _key: &String, entry: &Entry, _created_at: Instant) -> Option<Duration> {
        Some(entry.ttl)
    }
}

pub struct MemoryStore {
    cache: Cache<String, Entry>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let cache = Cache::builder()
            .max_capacity(MAX_ENTRIES)
            .expire_after(PerEntryTtl)
            .build();
        Self { cache }
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.cache.get(key).await.map(|entry| entry.value.to_string()))
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let entry = Entry {
            value: Arc::from(value),
            ttl,
        };
        self.cache.insert(key.to_string(), entry).await;
        Ok(())
    }

    async fn scan(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .cache
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.as_ref().clone())
            .collect())
    }

    async fn delete_matching(&self, prefix: &str) -> Result<u64> {
        let keys = self.scan(prefix).await?;
        for key in &keys {
            self.cache.invalidate(key).await;
        }
        Ok(keys.len() as u64)
    }
}
