//! Connectors for the systems Shardgate talks to.
//!
//! - [`sources`]: relational backends that execute SQL and return ordered rows.
//! - [`cache`]: key/value stores that back the per-datacenter result caches.
//!
//! Both sides follow the same pattern: a provider per `type` string, collected in a
//! registry that turns configuration entries into live handles.
pub mod cache;
pub mod sources;
