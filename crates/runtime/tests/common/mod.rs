//! In-process backends and cache stores for integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use shardgate_common::config::AppConfig;
use shardgate_common::{
    BackendConfig, CacheNamespaceConfig, CacheSettings, ExecutorSettings, ResultRow, ResultSet,
};
use shardgate_connectors::cache::{CacheStore, CacheStoreProvider, StoreError};
use shardgate_connectors::sources::{SourceProvider, SqlBackend, Unreachable};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ---------------------------------------------------------------------------
// Backends
// ---------------------------------------------------------------------------

#[derive(Default)]
struct ClusterState {
    calls: Mutex<Vec<(String, String)>>,
    down: Mutex<HashSet<String>>,
    delays: Mutex<HashMap<String, Duration>>,
    responses: Mutex<Vec<(String, String, ResultSet)>>,
    rejects: Mutex<Vec<(String, String)>>,
}

/// A set of fake relational backends sharing one call log.
///
/// Backends answer with the first canned response whose backend matches and whose
/// SQL fragment is contained in the statement, or with no rows.
#[derive(Clone, Default)]
pub struct MockCluster {
    state: Arc<ClusterState>,
}

impl MockCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, backend: &str, sql_fragment: &str, rows: ResultSet) {
        self.state.responses.lock().unwrap().push((
            backend.to_string(),
            sql_fragment.to_string(),
            rows,
        ));
    }

    /// Makes `backend` answer statements containing `sql_fragment` with an error,
    /// the way a live server rejects a bad column.
    pub fn reject(&self, backend: &str, sql_fragment: &str) {
        self.state
            .rejects
            .lock()
            .unwrap()
            .push((backend.to_string(), sql_fragment.to_string()));
    }

    pub fn take_down(&self, backend: &str) {
        self.state.down.lock().unwrap().insert(backend.to_string());
    }

    pub fn bring_up(&self, backend: &str) {
        self.state.down.lock().unwrap().remove(backend);
    }

    pub fn delay(&self, backend: &str, delay: Duration) {
        self.state
            .delays
            .lock()
            .unwrap()
            .insert(backend.to_string(), delay);
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.state.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, backend: &str) -> usize {
        self.calls().iter().filter(|(b, _)| b == backend).count()
    }

    pub fn total_calls(&self) -> usize {
        self.state.calls.lock().unwrap().len()
    }

    pub fn provider(&self) -> Box<dyn SourceProvider> {
        Box::new(MockProvider {
            state: self.state.clone(),
        })
    }
}

struct MockProvider {
    state: Arc<ClusterState>,
}

#[async_trait]
impl SourceProvider for MockProvider {
    fn type_name(&self) -> &'static str {
        "mock"
    }

    async fn connect(
        &self,
        config: &BackendConfig,
        _settings: &ExecutorSettings,
    ) -> anyhow::Result<Arc<dyn SqlBackend>> {
        Ok(Arc::new(MockBackend {
            name: config.name.clone(),
            state: self.state.clone(),
        }))
    }
}

struct MockBackend {
    name: String,
    state: Arc<ClusterState>,
}

#[async_trait]
impl SqlBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn query(&self, sql: &str) -> anyhow::Result<ResultSet> {
        self.state
            .calls
            .lock()
            .unwrap()
            .push((self.name.clone(), sql.to_string()));

        let delay = self.state.delays.lock().unwrap().get(&self.name).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.state.down.lock().unwrap().contains(&self.name) {
            return Err(Unreachable::new(&self.name, "connection refused").into());
        }

        let rejected = self
            .state
            .rejects
            .lock()
            .unwrap()
            .iter()
            .any(|(backend, fragment)| backend == &self.name && sql.contains(fragment.as_str()));
        if rejected {
            anyhow::bail!("{}: statement rejected by server", self.name);
        }

        let responses = self.state.responses.lock().unwrap();
        Ok(responses
            .iter()
            .find(|(backend, fragment, _)| backend == &self.name && sql.contains(fragment.as_str()))
            .map(|(_, _, rows)| rows.clone())
            .unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// Cache stores
// ---------------------------------------------------------------------------

#[derive(Default)]
struct StoreState {
    data: Mutex<HashMap<(String, String), String>>,
    failing: Mutex<HashSet<String>>,
    gets: Mutex<Vec<String>>,
    sets: Mutex<Vec<String>>,
}

/// Shared in-memory namespaces that can be told to fail. TTLs are ignored.
#[derive(Clone, Default)]
pub struct FlakyStores {
    state: Arc<StoreState>,
}

impl FlakyStores {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self, namespace: &str) {
        self.state
            .failing
            .lock()
            .unwrap()
            .insert(namespace.to_string());
    }

    pub fn heal(&self, namespace: &str) {
        self.state.failing.lock().unwrap().remove(namespace);
    }

    pub fn seed(&self, namespace: &str, key: &str, value: &str) {
        self.state
            .data
            .lock()
            .unwrap()
            .insert((namespace.to_string(), key.to_string()), value.to_string());
    }

    pub fn value(&self, namespace: &str, key: &str) -> Option<String> {
        self.state
            .data
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), key.to_string()))
            .cloned()
    }

    pub fn len(&self, namespace: &str) -> usize {
        self.state
            .data
            .lock()
            .unwrap()
            .keys()
            .filter(|(ns, _)| ns == namespace)
            .count()
    }

    /// Namespaces read from, in order.
    pub fn gets(&self) -> Vec<String> {
        self.state.gets.lock().unwrap().clone()
    }

    /// Namespaces written to, in order.
    pub fn sets(&self) -> Vec<String> {
        self.state.sets.lock().unwrap().clone()
    }

    pub fn provider(&self) -> Box<dyn CacheStoreProvider> {
        Box::new(FlakyProvider {
            state: self.state.clone(),
        })
    }
}

struct FlakyProvider {
    state: Arc<StoreState>,
}

#[async_trait]
impl CacheStoreProvider for FlakyProvider {
    fn type_name(&self) -> &'static str {
        "flaky"
    }

    async fn connect(
        &self,
        config: &CacheNamespaceConfig,
    ) -> Result<Arc<dyn CacheStore>, StoreError> {
        Ok(Arc::new(FlakyStore {
            namespace: config.name.clone(),
            state: self.state.clone(),
        }))
    }
}

struct FlakyStore {
    namespace: String,
    state: Arc<StoreState>,
}

impl FlakyStore {
    fn check(&self) -> Result<(), StoreError> {
        if self.state.failing.lock().unwrap().contains(&self.namespace) {
            return Err(StoreError::Unavailable(format!(
                "{} is unreachable",
                self.namespace
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl CacheStore for FlakyStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.state.gets.lock().unwrap().push(self.namespace.clone());
        self.check()?;
        Ok(self
            .state
            .data
            .lock()
            .unwrap()
            .get(&(self.namespace.clone(), key.to_string()))
            .cloned())
    }

    async fn set_ex(&self, key: &str, value: &str, _ttl: Duration) -> Result<(), StoreError> {
        self.state.sets.lock().unwrap().push(self.namespace.clone());
        self.check()?;
        self.state
            .data
            .lock()
            .unwrap()
            .insert((self.namespace.clone(), key.to_string()), value.to_string());
        Ok(())
    }

    async fn scan(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        self.check()?;
        Ok(self
            .state
            .data
            .lock()
            .unwrap()
            .keys()
            .filter(|(ns, key)| ns == &self.namespace && key.starts_with(prefix))
            .map(|(_, key)| key.clone())
            .collect())
    }

    async fn delete_matching(&self, prefix: &str) -> Result<u64, StoreError> {
        self.check()?;
        let mut data = self.state.data.lock().unwrap();
        let before = data.len();
        data.retain(|(ns, key), _| !(ns == &self.namespace && key.starts_with(prefix)));
        Ok((before - data.len()) as u64)
    }
}

// ---------------------------------------------------------------------------
// Topology
// ---------------------------------------------------------------------------

fn backend(name: &str, datacenter: Option<&str>, standby: Option<&str>) -> BackendConfig {
    BackendConfig {
        name: name.to_string(),
        backend_type: "mock".to_string(),
        url: format!("mock://{}", name.to_lowercase()),
        datacenter: datacenter.map(str::to_string),
        standby: standby.map(str::to_string),
    }
}

fn namespace(name: &str) -> CacheNamespaceConfig {
    CacheNamespaceConfig {
        name: name.to_string(),
        store_type: "flaky".to_string(),
        url: None,
    }
}

/// DBMS1 (DC1, standby DBMS1-STANDBY), DBMS2 (DC2), DBMS3 (DC1); caches DC1, DC2, STANDBY.
pub fn test_config() -> AppConfig {
    let mut config = AppConfig {
        backends: vec![
            backend("DBMS1", Some("DC1"), Some("DBMS1-STANDBY")),
            backend("DBMS1-STANDBY", Some("DC1"), None),
            backend("DBMS2", Some("DC2"), None),
            backend("DBMS3", Some("DC1"), None),
        ],
        cache: CacheSettings {
            namespaces: vec![namespace("DC1"), namespace("DC2"), namespace("STANDBY")],
            ..Default::default()
        },
        ..Default::default()
    };
    config.executor.circuit_breaker.enabled = false;
    config
}

pub fn row(pairs: &[(&str, &str)]) -> ResultRow {
    pairs
        .iter()
        .fold(ResultRow::new(), |row, (name, value)| row.with(*name, *value))
}

pub fn column<'a>(rows: &'a ResultSet, name: &str) -> Vec<&'a str> {
    rows.iter()
        .filter_map(|r| r.get(name).and_then(|v| v.as_str()))
        .collect()
}
