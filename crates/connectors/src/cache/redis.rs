use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use shardgate_common::scrubber::redact_endpoint;
use shardgate_common::CacheNamespaceConfig;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::{CacheStore, CacheStoreProvider, Result, StoreError};

const SCAN_BATCH: usize = 500;

pub struct RedisStoreProvider;

#[async_trait]
impl CacheStoreProvider for RedisStoreProvider {
    fn type_name(&self) -> &'static str {
        "redis"
    }

    async fn connect(&self, config: &CacheNamespaceConfig) -> Result<Arc<dyn CacheStore>> {
        let url = config.url.as_deref().ok_or_else(|| {
            StoreError::InvalidConfig(format!("namespace '{}' has no url", config.name))
        })?;
        Ok(Arc::new(RedisStore::connect(&config.name, url).await?))
    }
}

/// One Redis database acting as a cache namespace.
pub struct RedisStore {
    namespace: String,
    conn: ConnectionManager,
}

impl RedisStore {
    pub async fn connect(namespace: &str, url: &str) -> Result<Self> {
        let client = Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        info!(
            namespace,
            endpoint = %redact_endpoint(url),
            "Connected cache namespace"
        );
        Ok(Self {
            namespace: namespace.to_string(),
            conn,
        })
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        Ok(conn.get::<_, Option<String>>(key).await?)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(key, value, ttl.as_secs().max(1)).await?;
        Ok(())
    }

    async fn scan(&self, prefix: &str) -> Result<Vec<String>> {
        let mut conn = self.conn.clone();
        let pattern = format!("{}*", prefix);
        let mut cursor: u64 = 0;
        let mut keys = Vec::new();

        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await?;
            keys.extend(batch);

            if next == 0 {
                break;
            }
            cursor = next;
        }

        Ok(keys)
    }

    async fn delete_matching(&self, prefix: &str) -> Result<u64> {
        let keys = self.scan(prefix).await?;
        let mut conn = self.conn.clone();
        let mut deleted: u64 = 0;

        for chunk in keys.chunks(SCAN_BATCH) {
            let removed: u64 = conn.del(chunk).await?;
            deleted += removed;
        }

        debug!(namespace = %self.namespace, deleted, "Deleted cache keys");
        Ok(deleted)
    }
}
