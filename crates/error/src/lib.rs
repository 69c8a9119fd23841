//! # shardgate-error
//!
//! Unified error types for the Shardgate query router.
//!
//! Every error carries:
//! - A numeric error code (SHARDGATE-XXXX)
//! - Optional structured JSON context
//! - An optional hint for the operator

mod code;
mod context;
mod convert;

pub use code::{ErrorCategory, ErrorCode};
pub use context::ErrorContext;
pub use convert::find_closest_match;

use serde::{Deserialize, Serialize};
use std::fmt;

/// The unified error type for all Shardgate operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShardgateError {
    /// Numeric error code (e.g., "SHARDGATE-2001")
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,

    /// Structured context for programmatic handling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<ErrorContext>,

    /// Suggestion for the caller
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,

    /// Correlation ID for distributed tracing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}

impl ShardgateError {
    /// Create a new error with code and message
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: None,
            hint: None,
            trace_id: None,
        }
    }

    /// Add structured context
    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Add a hint
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Add trace ID for correlation
    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }

    /// Shorthand for `UnroutableQuery`.
    pub fn unroutable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::UnroutableQuery, message)
    }

    /// Shorthand for `BackendUnavailable` with backend context attached.
    /// `endpoint` must already have its credentials redacted.
    pub fn backend_unavailable(
        backend: &str,
        standby: Option<&str>,
        endpoint: Option<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(ErrorCode::BackendUnavailable, message).with_context(ErrorContext::Backend {
            backend: backend.to_string(),
            standby: standby.map(str::to_string),
            endpoint,
        })
    }

    /// Shorthand for configuration errors.
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidConfig, message)
    }

    /// Serialize to JSON for API/CLI responses
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            tracing::warn!("Failed to serialize ShardgateError: {}", e);
            format!(
                r#"{{"code":"{}","message":"Serialization failed"}}"#,
                self.code
            )
        })
    }

    /// Serialize to pretty JSON for logging
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| self.to_json())
    }
}

impl fmt::Display for ShardgateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(hint) = &self.hint {
            write!(f, " (Hint: {})", hint)?;
        }
        Ok(())
    }
}

impl std::error::Error for ShardgateError {}

/// Result type alias for Shardgate operations
pub type Result<T> = std::result::Result<T, ShardgateError>;
