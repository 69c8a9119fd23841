//! Plan execution against live backends.
//!
//! Every statement goes through `run_with_failover`: try the primary, and if it
//! fails (or its circuit breaker is open) try its standby exactly once. There is
//! no retry on the same backend. Fan-out work runs concurrently on the calling
//! task so results come back in target order and task-local warnings are kept.

use anyhow::Context;
use futures::future::try_join_all;
use serde_json::Value;
use shardgate_common::circuit_breaker::{BackendBreaker, BreakerConfig};
use shardgate_common::row::value_to_text;
use shardgate_common::scrubber::redact_endpoint;
use shardgate_common::warnings::add_warning;
use shardgate_common::{ExecutorSettings, JoinSettings, ResultRow, ResultSet};
use shardgate_connectors::sources::is_unreachable;
use shardgate_error::{ErrorCode, ShardgateError};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use super::plan::{ExecutionPlan, Strategy};
use crate::registry::BackendPool;

pub struct QueryExecutor {
    pool: Arc<BackendPool>,
    breakers: HashMap<String, Arc<BackendBreaker>>,
    budget: Arc<Semaphore>,
    join: JoinSettings,
}

impl QueryExecutor {
    pub fn new(pool: Arc<BackendPool>, settings: &ExecutorSettings, join: JoinSettings) -> Self {
        let breakers = if settings.circuit_breaker.enabled {
            pool.names()
                .into_iter()
                .map(|name| {
                    let config = BreakerConfig::from_settings(&name, &settings.circuit_breaker);
                    (name, Arc::new(BackendBreaker::new(config)))
                })
                .collect()
        } else {
            HashMap::new()
        };

        Self {
            pool,
            breakers,
            budget: Arc::new(Semaphore::new(settings.max_concurrent_queries.max(1))),
            join,
        }
    }

    pub async fn execute(&self, plan: &ExecutionPlan) -> shardgate_error::Result<ResultSet> {
        match plan.strategy() {
            Strategy::Single | Strategy::Parallel => self.execute_fan_out(plan).await,
            Strategy::Join => self.execute_join(plan).await,
        }
    }

    /// Runs every `(target, statement)` pair concurrently and concatenates in target order.
    /// The first target that stays unavailable after failover aborts the call.
    async fn execute_fan_out(&self, plan: &ExecutionPlan) -> shardgate_error::Result<ResultSet> {
        let calls = plan
            .statements()
            .map(|(target, sql)| self.run_with_failover(target, sql));
        let results = try_join_all(calls).await?;
        Ok(results.into_iter().flatten().collect())
    }

    async fn execute_join(&self, plan: &ExecutionPlan) -> shardgate_error::Result<ResultSet> {
        let (Some(rank_target), Some(rank_query)) = (plan.rank_target(), plan.rank_query()) else {
            return Err(ShardgateError::new(
                ErrorCode::InternalPanic,
                "Join plan is missing its rank stage",
            ));
        };

        let rank_rows = self.run_with_failover(rank_target, rank_query).await?;
        let ids = match rank_rows.first().and_then(ResultRow::first) {
            None | Some(Value::Null) => return Ok(Vec::new()),
            Some(value) => split_ids(&value_to_text(value)),
        };
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let detail_sql = self.join.detail_query(&ids);
        debug!(ids = ids.len(), backends = ?self.join.detail_backends, "Fetching join details");
        let calls = self
            .join
            .detail_backends
            .iter()
            .map(|backend| self.run_with_failover(backend, &detail_sql));
        let details = try_join_all(calls).await?.into_iter().flatten();

        Ok(order_by_ids(&ids, details, &self.join.key_column))
    }

    async fn run_with_failover(
        &self,
        primary: &str,
        sql: &str,
    ) -> shardgate_error::Result<ResultSet> {
        let primary_error = match self.attempt(primary, sql).await {
            Ok(rows) => return Ok(rows),
            Err(e) => e,
        };

        let Some(standby) = self.pool.standby_of(primary) else {
            warn!(
                backend = %primary,
                error = %format!("{:#}", primary_error),
                "Backend failed and has no standby"
            );
            return Err(self.unavailable(
                primary,
                None,
                format!("Backend '{}' is unavailable: {:#}", primary, primary_error),
            ));
        };

        warn!(
            backend = %primary,
            standby = %standby,
            error = %format!("{:#}", primary_error),
            "Backend failed, failing over to standby"
        );
        add_warning(format!("x-shardgate-failover: {} -> {}", primary, standby));

        self.attempt(standby, sql).await.map_err(|standby_error| {
            self.unavailable(
                primary,
                Some(standby),
                format!(
                    "Backend '{}' and its standby '{}' are unavailable: {:#}",
                    primary, standby, standby_error
                ),
            )
        })
    }

    fn unavailable(&self, primary: &str, standby: Option<&str>, message: String) -> ShardgateError {
        let endpoint = self.pool.descriptor(primary).map(|d| redact_endpoint(&d.url));
        ShardgateError::backend_unavailable(primary, standby, endpoint, message)
            .with_hint("Check that the backend (and its standby, if any) is reachable")
    }

    /// One call to one backend, gated by its circuit breaker and the global budget.
    /// Only failures to reach the backend count against the breaker.
    async fn attempt(&self, backend: &str, sql: &str) -> anyhow::Result<ResultSet> {
        let breaker = self.breakers.get(backend);
        if let Some(cb) = breaker {
            if !cb.allows_request().await {
                anyhow::bail!("circuit breaker is open for '{}'", backend);
            }
        }

        let _permit = self
            .budget
            .acquire()
            .await
            .context("Connection budget closed")?;

        let (result, reached) = match self.pool.open(backend).await {
            Ok(client) => {
                let result = client.query(sql).await;
                let reached = result.as_ref().map_or_else(|e| !is_unreachable(e), |_| true);
                (result, reached)
            }
            Err(e) => (Err(e), false),
        };

        if let Some(cb) = breaker {
            if reached {
                cb.record_reachable().await;
            } else {
                cb.record_unreachable().await;
            }
        }
        result
    }
}

/// Splits a comma-separated identifier list, trimming blanks and dropping empties.
pub fn split_ids(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

/// Re-orders detail rows to follow `ids`. The first row seen for a key wins; ids
/// without a row are dropped.
pub fn order_by_ids<I>(ids: &[String], rows: I, key_column: &str) -> ResultSet
where
    I: IntoIterator<Item = ResultRow>,
{
    let mut by_key: HashMap<String, ResultRow> = HashMap::new();
    for row in rows {
        let Some(key) = row.get(key_column).map(value_to_text) else {
            continue;
        };
        by_key.entry(key).or_insert(row);
    }

    ids.iter().filter_map(|id| by_key.get(id).cloned()).collect()
}
