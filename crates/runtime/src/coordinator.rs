//! Single entry point for query execution.
//!
//! The `Coordinator` sequences one request:
//!
//! 1. **Route**: statement text → `ExecutionPlan`.
//! 2. **Scope**: pick the cache datacenter for the plan's targets.
//! 3. **Lookup**: on a hit, return without touching any backend.
//! 4. **Execute**: run the plan with standby failover.
//! 5. **Store**: best-effort cache write.
//!
//! Non-fatal events raised along the way (failovers, cache fallback, hit/miss)
//! are collected per call and returned in `QueryOutcome::warnings`.

use serde::Serialize;
use shardgate_common::config::AppConfig;
use shardgate_common::scrubber::scrub;
use shardgate_common::warnings::{add_warning, with_warnings};
use shardgate_common::ResultSet;
use shardgate_connectors::cache::{self as stores, CacheStoreProvider};
use shardgate_connectors::sources::{self, SourceProvider};
use shardgate_error::{ErrorCode, ErrorContext, ShardgateError};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::query::cache::CacheManager;
use crate::query::executor::QueryExecutor;
use crate::query::plan::ExecutionPlan;
use crate::query::router::{Router, RoutingTable};
use crate::registry::BackendPool;

pub struct CoordinatorOptions {
    pub config: AppConfig,
    pub routing: RoutingTable,
    pub extra_sources: Vec<Box<dyn SourceProvider>>,
    pub extra_stores: Vec<Box<dyn CacheStoreProvider>>,
}

impl CoordinatorOptions {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            routing: RoutingTable::standard(),
            extra_sources: Vec::new(),
            extra_stores: Vec::new(),
        }
    }
}

/// Result of one coordinator call.
#[derive(Debug, Clone, Serialize)]
pub struct QueryOutcome {
    pub plan: ExecutionPlan,
    pub datacenter: String,
    pub rows: ResultSet,
    pub cache_hit: bool,
    pub warnings: Vec<String>,
}

pub struct Coordinator {
    router: Router,
    executor: QueryExecutor,
    cache: CacheManager,
    pool: Arc<BackendPool>,
    default_datacenter: String,
}

impl Coordinator {
    pub fn new(options: CoordinatorOptions) -> shardgate_error::Result<Self> {
        let config = options.config;
        config.validate_topology()?;

        let mut source_registry = sources::default_registry();
        for provider in options.extra_sources {
            source_registry.register_provider(provider);
        }
        let mut store_registry = stores::default_registry();
        for provider in options.extra_stores {
            store_registry.register_provider(provider);
        }

        for backend in &config.backends {
            if !source_registry.supports(&backend.backend_type) {
                return Err(ShardgateError::config(format!(
                    "Backend '{}' has unsupported type '{}'",
                    backend.name, backend.backend_type
                ))
                .with_hint(format!("Supported types: {}", source_registry.type_names().join(", "))));
            }
        }
        if config.cache.enabled {
            for ns in &config.cache.namespaces {
                if !store_registry.supports(&ns.store_type) {
                    return Err(ShardgateError::config(format!(
                        "Cache namespace '{}' has unsupported type '{}'",
                        ns.name, ns.store_type
                    )));
                }
            }
        }

        let known: Vec<String> = config.backends.iter().map(|b| b.name.clone()).collect();
        for name in options.routing.backends() {
            if config.backend(name).is_none() {
                let mut err = ShardgateError::new(
                    ErrorCode::UnknownBackend,
                    format!("Routing table sends queries to unregistered backend '{}'", name),
                )
                .with_context(ErrorContext::Config {
                    file_path: None,
                    field: Some("backends".to_string()),
                });
                if let Some(closest) = shardgate_error::find_closest_match(name, &known) {
                    err = err.with_hint(format!("Did you mean '{}'?", closest));
                }
                return Err(err);
            }
        }

        let pool = Arc::new(BackendPool::new(
            config.backends.clone(),
            source_registry,
            config.executor.clone(),
        ));
        let executor = QueryExecutor::new(pool.clone(), &config.executor, config.join.clone());
        let cache = CacheManager::new(config.cache.clone(), store_registry);

        info!(
            backends = config.backends.len(),
            cache_enabled = config.cache.enabled,
            namespaces = config.cache.namespaces.len(),
            "Coordinator ready"
        );

        Ok(Self {
            router: Router::new(options.routing),
            executor,
            cache,
            pool,
            default_datacenter: config.cache.default_datacenter,
        })
    }

    pub fn route(&self, sql: &str) -> shardgate_error::Result<ExecutionPlan> {
        self.router.route(sql)
    }

    /// Cache datacenter for a plan: the shared datacenter of all targets, or the
    /// default datacenter when they differ. Backends with no datacenter count as
    /// the default one.
    pub fn datacenter_for(&self, plan: &ExecutionPlan) -> String {
        let mut datacenters = plan.targets().iter().map(|target| {
            self.pool
                .datacenter_of(target)
                .unwrap_or(self.default_datacenter.as_str())
        });

        match datacenters.next() {
            Some(first) if datacenters.all(|dc| dc == first) => first.to_string(),
            _ => self.default_datacenter.clone(),
        }
    }

    pub fn cache_namespaces(&self) -> Vec<String> {
        self.cache.pool().names()
    }

    pub async fn execute(&self, sql: &str, use_cache: bool) -> shardgate_error::Result<ResultSet> {
        Ok(self.execute_query(sql, use_cache).await?.rows)
    }

    pub async fn execute_query(
        &self,
        sql: &str,
        use_cache: bool,
    ) -> shardgate_error::Result<QueryOutcome> {
        let start = Instant::now();
        let (result, warnings) = with_warnings(self.run(sql, use_cache)).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok((plan, datacenter, rows, cache_hit)) => {
                info!(
                    target: "queries",
                    query = %scrub(sql),
                    strategy = %plan.strategy(),
                    targets = ?plan.targets(),
                    datacenter = %datacenter,
                    rows_returned = rows.len(),
                    cache_hit,
                    duration_ms,
                    warnings = warnings.len(),
                    success = true
                );
                Ok(QueryOutcome {
                    plan,
                    datacenter,
                    rows,
                    cache_hit,
                    warnings,
                })
            }
            Err(e) => {
                warn!(
                    target: "queries",
                    query = %scrub(sql),
                    error = %e,
                    duration_ms,
                    success = false
                );
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        sql: &str,
        use_cache: bool,
    ) -> shardgate_error::Result<(ExecutionPlan, String, ResultSet, bool)> {
        let plan = self.router.route(sql)?;
        let datacenter = self.datacenter_for(&plan);
        let use_cache = use_cache && self.cache.is_enabled();

        if use_cache {
            if let Some(rows) = self.cache.get(sql, &datacenter).await {
                add_warning("x-shardgate-cache: hit");
                return Ok((plan, datacenter, rows, true));
            }
            add_warning("x-shardgate-cache: miss");
        } else {
            add_warning("x-shardgate-cache: bypass");
        }

        let rows = self.executor.execute(&plan).await?;

        if use_cache {
            self.cache.set(sql, &rows, &datacenter).await;
        }
        Ok((plan, datacenter, rows, false))
    }

    /// Clears one namespace, or all of them, and returns the number of removed entries.
    pub async fn clear_cache(&self, namespace: Option<&str>) -> u64 {
        self.cache.clear(namespace).await
    }

    pub async fn shutdown(&self) {
        self.pool.close_all().await;
        self.cache.shutdown().await;
    }
}
