//! Query routing and execution.
//!
//! - **Plan**: the immutable execution plan handed from router to executor.
//! - **Router**: statement text to plan, driven by a `RoutingTable`.
//! - **Executor**: runs plans against backends with standby failover.
//! - **Cache**: per-datacenter result cache with standby fallback.

pub mod cache;
pub mod executor;
pub mod plan;
pub mod router;
