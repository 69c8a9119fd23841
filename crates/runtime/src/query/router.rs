//! Fragmentation-aware routing.
//!
//! The router is a heuristic matcher, not a SQL parser. It finds the first table
//! named after `FROM`, then checks that table's marker rules in order: a rule
//! matches when the lower-cased statement contains the partition column name and
//! any of the rule's value tokens anywhere in the text. It cannot tell `=` from
//! `!=` and does not look at literal boundaries, so a statement that mentions a
//! marker value in an unrelated place can be routed to a narrower fragment.

use once_cell::sync::Lazy;
use regex::Regex;
use shardgate_common::scrubber::sql_preview;
use shardgate_error::{ErrorContext, ShardgateError};
use std::collections::{BTreeSet, HashMap};

use super::plan::ExecutionPlan;

static TABLE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r#"from\s+"?(\w+)"?"#).unwrap());

/// Backends holding horizontal fragments of the partitioned tables.
pub const PARTITION_BACKENDS: [&str; 3] = ["DBMS1", "DBMS2", "DBMS3"];

/// Where a statement goes once a rule has matched.
#[derive(Debug, Clone, PartialEq)]
pub enum Placement {
    Single(String),
    Parallel(Vec<String>),
    /// Ranked view: rank list from `rank_target`, details from the join backends.
    Join {
        rank_target: String,
        granularity: String,
    },
}

impl Placement {
    pub fn single(backend: &str) -> Self {
        Placement::Single(backend.to_string())
    }

    pub fn parallel(backends: &[&str]) -> Self {
        Placement::Parallel(backends.iter().map(|b| b.to_string()).collect())
    }

    pub fn join(rank_target: &str, granularity: &str) -> Self {
        Placement::Join {
            rank_target: rank_target.to_string(),
            granularity: granularity.to_string(),
        }
    }

    fn plan(&self, sql: &str) -> shardgate_error::Result<ExecutionPlan> {
        match self {
            Placement::Single(backend) => Ok(ExecutionPlan::single(backend.as_str(), sql)),
            Placement::Parallel(backends) => ExecutionPlan::parallel(backends.iter().cloned(), sql),
            Placement::Join {
                rank_target,
                granularity,
            } => Ok(ExecutionPlan::join(rank_target.as_str(), granularity)),
        }
    }

    fn backends(&self) -> Vec<&str> {
        match self {
            Placement::Single(backend) => vec![backend.as_str()],
            Placement::Parallel(backends) => backends.iter().map(String::as_str).collect(),
            Placement::Join { rank_target, .. } => vec![rank_target.as_str()],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkerRule {
    column: String,
    values: Vec<String>,
    placement: Placement,
}

impl MarkerRule {
    fn matches(&self, lowered: &str) -> bool {
        lowered.contains(&self.column) && self.values.iter().any(|v| lowered.contains(v))
    }
}

/// Ordered marker rules for one table, plus the placement used when none match.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRule {
    markers: Vec<MarkerRule>,
    fallback: Placement,
}

impl TableRule {
    pub fn new(fallback: Placement) -> Self {
        Self {
            markers: Vec::new(),
            fallback,
        }
    }

    pub fn marker(mut self, column: &str, values: &[&str], placement: Placement) -> Self {
        self.markers.push(MarkerRule {
            column: column.to_lowercase(),
            values: values.iter().map(|v| v.to_lowercase()).collect(),
            placement,
        });
        self
    }

    fn resolve(&self, lowered: &str) -> &Placement {
        self.markers
            .iter()
            .find(|rule| rule.matches(lowered))
            .map(|rule| &rule.placement)
            .unwrap_or(&self.fallback)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoutingTable {
    tables: HashMap<String, TableRule>,
    unknown_table: Placement,
}

impl RoutingTable {
    /// An empty table sending every statement to `unknown_table`.
    pub fn new(unknown_table: Placement) -> Self {
        Self {
            tables: HashMap::new(),
            unknown_table,
        }
    }

    pub fn with_table(mut self, table: &str, rule: TableRule) -> Self {
        self.tables.insert(table.to_lowercase(), rule);
        self
    }

    /// Fragmentation of the news-reading schema across DBMS1..DBMS3.
    pub fn standard() -> Self {
        RoutingTable::new(Placement::parallel(&PARTITION_BACKENDS))
            .with_table(
                "user",
                TableRule::new(Placement::parallel(&PARTITION_BACKENDS))
                    .marker("region", &["beijing"], Placement::single("DBMS1"))
                    .marker("region", &["hong kong"], Placement::single("DBMS2"))
                    .marker("region", &["shanghai"], Placement::single("DBMS3")),
            )
            .with_table(
                "article",
                TableRule::new(Placement::parallel(&["DBMS1", "DBMS2"]))
                    .marker("category", &["technology"], Placement::single("DBMS2"))
                    // science is replicated on both; DBMS1 takes the read load
                    .marker("category", &["science"], Placement::single("DBMS1")),
            )
            // Reads live next to the user that made them.
            .with_table(
                "user_read",
                TableRule::new(Placement::parallel(&PARTITION_BACKENDS)),
            )
            .with_table(
                "be_read",
                TableRule::new(Placement::single("DBMS2")).marker(
                    "category",
                    &["technology"],
                    Placement::single("DBMS2"),
                ),
            )
            .with_table(
                "popular_rank",
                TableRule::new(Placement::parallel(&["DBMS1", "DBMS2"]))
                    .marker("temporalgranularity", &["daily"], Placement::single("DBMS1"))
                    .marker(
                        "temporalgranularity",
                        &["weekly", "monthly"],
                        Placement::single("DBMS2"),
                    ),
            )
            .with_table(
                "popular_articles",
                TableRule::new(Placement::join("DBMS1", "daily"))
                    .marker("temporalgranularity", &["daily"], Placement::join("DBMS1", "daily"))
                    .marker(
                        "temporalgranularity",
                        &["weekly"],
                        Placement::join("DBMS2", "weekly"),
                    )
                    .marker(
                        "temporalgranularity",
                        &["monthly"],
                        Placement::join("DBMS2", "monthly"),
                    ),
            )
    }

    /// Every backend any rule can route to.
    pub fn backends(&self) -> BTreeSet<&str> {
        let mut names: BTreeSet<&str> = self.unknown_table.backends().into_iter().collect();
        for rule in self.tables.values() {
            names.extend(rule.fallback.backends());
            for marker in &rule.markers {
                names.extend(marker.placement.backends());
            }
        }
        names
    }

    fn placement_for(&self, table: &str, lowered: &str) -> &Placement {
        match self.tables.get(table) {
            Some(rule) => rule.resolve(lowered),
            None => &self.unknown_table,
        }
    }
}

impl Default for RoutingTable {
    fn default() -> Self {
        RoutingTable::standard()
    }
}

/// First identifier after `FROM`, lower-cased.
pub fn extract_table(sql: &str) -> Option<String> {
    let lowered = sql.to_lowercase();
    TABLE_REGEX
        .captures(&lowered)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Maps statement text to an execution plan. Pure and deterministic.
#[derive(Debug, Clone, Default)]
pub struct Router {
    table: RoutingTable,
}

impl Router {
    pub fn new(table: RoutingTable) -> Self {
        Self { table }
    }

    pub fn routing_table(&self) -> &RoutingTable {
        &self.table
    }

    pub fn route(&self, sql: &str) -> shardgate_error::Result<ExecutionPlan> {
        let lowered = sql.to_lowercase();
        let table = extract_table(&lowered).ok_or_else(|| {
            ShardgateError::unroutable("No table identifier found after FROM")
                .with_context(ErrorContext::Routing {
                    table: None,
                    sql_preview: sql_preview(sql),
                })
                .with_hint("Statements must read from a table: SELECT ... FROM \"<table>\"")
        })?;

        self.table.placement_for(&table, &lowered).plan(sql)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::plan::Strategy;
    use shardgate_error::ErrorCode;

    fn route(sql: &str) -> ExecutionPlan {
        Router::new(RoutingTable::standard())
            .route(sql)
            .expect("statement should route")
    }

    #[test]
    fn test_extract_table() {
        assert_eq!(extract_table("SELECT * FROM \"User\" WHERE uid = 'u1'").as_deref(), Some("user"));
        assert_eq!(extract_table("select * from   article").as_deref(), Some("article"));
        assert_eq!(extract_table("SELECT 1"), None);
    }

    #[test]
    fn test_user_region_markers() {
        let plan = route("SELECT * FROM \"user\" WHERE region = 'Beijing'");
        assert_eq!(plan.strategy(), Strategy::Single);
        assert_eq!(plan.targets(), ["DBMS1"]);

        assert_eq!(route("SELECT * FROM \"user\" WHERE region = 'Hong Kong'").targets(), ["DBMS2"]);
        assert_eq!(route("SELECT * FROM \"user\" WHERE region = 'Shanghai'").targets(), ["DBMS3"]);
    }

    #[test]
    fn test_user_without_marker_fans_out() {
        let plan = route("SELECT * FROM \"user\" WHERE uid = 'u42'");
        assert_eq!(plan.strategy(), Strategy::Parallel);
        assert_eq!(plan.targets(), ["DBMS1", "DBMS2", "DBMS3"]);
    }

    #[test]
    fn test_marker_requires_column_token() {
        // "beijing" alone is not enough without the partition column.
        let plan = route("SELECT * FROM \"user\" WHERE name = 'beijing fan'");
        assert_eq!(plan.strategy(), Strategy::Parallel);
    }

    #[test]
    fn test_matching_is_substring_based() {
        // Negation is not understood.
        let plan = route("SELECT * FROM \"user\" WHERE region != 'Beijing'");
        assert_eq!(plan.targets(), ["DBMS1"]);
    }

    #[test]
    fn test_article_category() {
        assert_eq!(
            route("SELECT * FROM \"article\" WHERE category = 'technology'").targets(),
            ["DBMS2"]
        );
        assert_eq!(
            route("SELECT * FROM \"article\" WHERE category = 'science'").targets(),
            ["DBMS1"]
        );
        assert_eq!(
            route("SELECT * FROM \"article\" WHERE aid = 'a1'").targets(),
            ["DBMS1", "DBMS2"]
        );
    }

    #[test]
    fn test_read_tables() {
        assert_eq!(
            route("SELECT * FROM \"user_read\" WHERE uid = 'u1'").targets(),
            ["DBMS1", "DBMS2", "DBMS3"]
        );
        let be_read = route("SELECT * FROM \"be_read\" WHERE aid = 'a1'");
        assert_eq!(be_read.strategy(), Strategy::Single);
        assert_eq!(be_read.targets(), ["DBMS2"]);
    }

    #[test]
    fn test_popular_rank() {
        assert_eq!(
            route("SELECT * FROM \"popular_rank\" WHERE temporalGranularity = 'daily'").targets(),
            ["DBMS1"]
        );
        assert_eq!(
            route("SELECT * FROM \"popular_rank\" WHERE temporalGranularity = 'monthly'").targets(),
            ["DBMS2"]
        );
        assert_eq!(
            route("SELECT * FROM \"popular_rank\"").targets(),
            ["DBMS1", "DBMS2"]
        );
    }

    #[test]
    fn test_popular_articles_join() {
        let plan = route("SELECT * FROM \"popular_articles\" WHERE temporalGranularity = 'weekly'");
        assert_eq!(plan.strategy(), Strategy::Join);
        assert_eq!(plan.rank_target(), Some("DBMS2"));
        assert!(plan.rank_query().unwrap_or_default().contains("'weekly'"));

        let default = route("SELECT * FROM popular_articles");
        assert_eq!(default.rank_target(), Some("DBMS1"));
        assert!(default.rank_query().unwrap_or_default().contains("'daily'"));
    }

    #[test]
    fn test_unknown_table_fans_out() {
        let plan = route("SELECT * FROM \"comments\"");
        assert_eq!(plan.targets(), ["DBMS1", "DBMS2", "DBMS3"]);
    }

    #[test]
    fn test_original_text_is_forwarded() {
        let sql = "SELECT * FROM \"User\" WHERE Region = 'Beijing'";
        let plan = route(sql);
        assert_eq!(plan.query_for("DBMS1"), Some(sql));
    }

    #[test]
    fn test_unroutable() {
        let err = Router::default().route("SELECT 1").unwrap_err();
        assert_eq!(err.code, ErrorCode::UnroutableQuery);
        assert!(matches!(err.context, Some(ErrorContext::Routing { .. })));
    }

    #[test]
    fn test_routing_is_deterministic() {
        let router = Router::default();
        let sql = "SELECT * FROM \"article\" WHERE category = 'science'";
        assert_eq!(router.route(sql).unwrap(), router.route(sql).unwrap());
    }

    #[test]
    fn test_standard_backends() {
        let table = RoutingTable::standard();
        let backends: Vec<&str> = table.backends().into_iter().collect();
        assert_eq!(backends, vec!["DBMS1", "DBMS2", "DBMS3"]);
    }

    #[test]
    fn test_custom_table() {
        let router = Router::new(
            RoutingTable::new(Placement::single("A"))
                .with_table("t", TableRule::new(Placement::parallel(&["A", "B"]))),
        );
        assert_eq!(router.route("SELECT * FROM t").unwrap().targets(), ["A", "B"]);
        assert_eq!(router.route("SELECT * FROM x").unwrap().targets(), ["A"]);
    }
}
