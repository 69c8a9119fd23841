//! # Error Contexts
//!
//! Structured metadata attached to errors for programmatic handling.

use serde::{Deserialize, Serialize};

/// Structured error context.
///
/// Each variant provides the fields relevant to one family of errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ErrorContext {
    /// Context for SHARDGATE-2001 (UnroutableQuery)
    Routing {
        table: Option<String>,
        sql_preview: String,
    },

    /// Context for backend errors (SHARDGATE-1001, 1002, 1003)
    Backend {
        backend: String,
        standby: Option<String>,
        /// Endpoint with credentials redacted
        endpoint: Option<String>,
    },

    /// Context for SHARDGATE-1004 (CacheDegraded)
    Cache { namespace: String },

    /// Context for SHARDGATE-3xxx (config errors)
    Config {
        file_path: Option<String>,
        field: Option<String>,
    },

    /// Generic key-value context for extensibility
    Generic {
        #[serde(flatten)]
        data: std::collections::HashMap<String, serde_json::Value>,
    },
}
