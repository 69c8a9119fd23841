//! Shardgate runtime: fragmentation-aware query routing.
//!
//! Routes statements against a shared logical schema to the backends holding the
//! relevant fragments, runs them with standby failover, and caches results per
//! datacenter.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │ Coordinator │──── CacheManager ──── CacheStorePool (DC1, DC2, STANDBY)
//! └──────┬──────┘
//!        │ Router → ExecutionPlan
//!   ┌────┴─────┐
//!   │ Executor │──── BackendPool (DBMS1, DBMS2, DBMS3, standbys)
//!   └──────────┘
//! ```

pub mod coordinator;
pub mod query;
pub mod registry;

pub use coordinator::{Coordinator, CoordinatorOptions, QueryOutcome};
pub use query::plan::{ExecutionPlan, Strategy};
pub use query::router::{Placement, Router, RoutingTable, TableRule};
