//! Execution plans: the contract between the router and the executor.

use serde::Serialize;
use shardgate_error::{ErrorCode, ShardgateError};
use std::collections::BTreeMap;

/// Table holding the published rankings for the ranked-article view.
pub const RANK_TABLE: &str = "popular_rank";
/// Column of `RANK_TABLE` holding the comma-separated ranked identifiers.
pub const RANK_COLUMN: &str = "articleaidlist";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// One backend holds all matching rows.
    Single,
    /// Fan out to every target and concatenate in target order.
    Parallel,
    /// Fetch a ranked identifier list, then the detail rows for those identifiers.
    Join,
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::Single => write!(f, "single"),
            Strategy::Parallel => write!(f, "parallel"),
            Strategy::Join => write!(f, "join"),
        }
    }
}

/// Immutable plan. Built only through the constructors, which enforce:
/// targets are non-empty and duplicate-free, `single` has exactly one target,
/// every single/parallel target has a statement, and join plans target the
/// rank backend only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionPlan {
    strategy: Strategy,
    targets: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    queries: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rank_target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rank_query: Option<String>,
}

impl ExecutionPlan {
    pub fn single(target: impl Into<String>, sql: &str) -> Self {
        let target = target.into();
        let mut queries = BTreeMap::new();
        queries.insert(target.clone(), sql.to_string());
        Self {
            strategy: Strategy::Single,
            targets: vec![target],
            queries,
            rank_target: None,
            rank_query: None,
        }
    }

    /// Fan-out plan. Duplicate targets are dropped, keeping first-seen order.
    pub fn parallel<I, S>(targets: I, sql: &str) -> shardgate_error::Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut ordered: Vec<String> = Vec::new();
        for target in targets {
            let target = target.into();
            if !ordered.contains(&target) {
                ordered.push(target);
            }
        }

        if ordered.is_empty() {
            return Err(ShardgateError::new(
                ErrorCode::InvalidConfig,
                "A parallel plan needs at least one target",
            ));
        }

        let queries = ordered
            .iter()
            .map(|t| (t.clone(), sql.to_string()))
            .collect();

        Ok(Self {
            strategy: Strategy::Parallel,
            targets: ordered,
            queries,
            rank_target: None,
            rank_query: None,
        })
    }

    /// Two-phase plan reading the latest ranking of `granularity` from `rank_target`.
    pub fn join(rank_target: impl Into<String>, granularity: &str) -> Self {
        let rank_target = rank_target.into();
        Self {
            strategy: Strategy::Join,
            targets: vec![rank_target.clone()],
            queries: BTreeMap::new(),
            rank_query: Some(rank_query(granularity)),
            rank_target: Some(rank_target),
        }
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    pub fn query_for(&self, target: &str) -> Option<&str> {
        self.queries.get(target).map(String::as_str)
    }

    /// `(target, statement)` pairs in target order.
    pub fn statements(&self) -> impl Iterator<Item = (&str, &str)> {
        self.targets
            .iter()
            .filter_map(|t| self.queries.get(t).map(|q| (t.as_str(), q.as_str())))
    }

    pub fn rank_target(&self) -> Option<&str> {
        self.rank_target.as_deref()
    }

    pub fn rank_query(&self) -> Option<&str> {
        self.rank_query.as_deref()
    }
}

fn rank_query(granularity: &str) -> String {
    format!(
        "SELECT {} FROM \"{}\" WHERE temporalgranularity = '{}' ORDER BY timestamp DESC LIMIT 1",
        RANK_COLUMN,
        RANK_TABLE,
        granularity.replace('\'', "''")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_plan() {
        let plan = ExecutionPlan::single("DBMS1", "SELECT * FROM \"user\"");
        assert_eq!(plan.strategy(), Strategy::Single);
        assert_eq!(plan.targets(), ["DBMS1"]);
        assert_eq!(plan.query_for("DBMS1"), Some("SELECT * FROM \"user\""));
        assert_eq!(plan.rank_target(), None);
    }

    #[test]
    fn test_parallel_dedups_in_order() -> anyhow::Result<()> {
        let plan = ExecutionPlan::parallel(["DBMS2", "DBMS1", "DBMS2"], "SELECT 1 FROM t")?;
        assert_eq!(plan.targets(), ["DBMS2", "DBMS1"]);
        let statements: Vec<_> = plan.statements().collect();
        assert_eq!(
            statements,
            vec![("DBMS2", "SELECT 1 FROM t"), ("DBMS1", "SELECT 1 FROM t")]
        );
        Ok(())
    }

    #[test]
    fn test_parallel_requires_targets() {
        let err = ExecutionPlan::parallel(Vec::<String>::new(), "SELECT 1").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidConfig);
    }

    #[test]
    fn test_join_plan_shape() {
        let plan = ExecutionPlan::join("DBMS2", "weekly");
        assert_eq!(plan.strategy(), Strategy::Join);
        assert_eq!(plan.targets(), ["DBMS2"]);
        assert_eq!(plan.rank_target(), Some("DBMS2"));
        assert_eq!(
            plan.rank_query(),
            Some("SELECT articleaidlist FROM \"popular_rank\" WHERE temporalgranularity = 'weekly' ORDER BY timestamp DESC LIMIT 1")
        );
        assert_eq!(plan.statements().count(), 0);
    }

    #[test]
    fn test_plan_serializes_for_display() -> anyhow::Result<()> {
        let plan = ExecutionPlan::join("DBMS1", "daily");
        let value = serde_json::to_value(&plan)?;
        assert_eq!(value["strategy"], "join");
        assert_eq!(value["targets"][0], "DBMS1");
        assert!(value.get("queries").is_none());

        let yaml = serde_yaml::to_string(&ExecutionPlan::single("DBMS3", "SELECT 1"))?;
        assert!(yaml.contains("strategy: single"));
        Ok(())
    }
}
