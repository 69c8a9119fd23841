//! Structured exit codes for machine-readable error handling.
//!
//! These codes let scripts distinguish a bad statement from a dead backend or a
//! broken configuration file.

use shardgate_error::{ErrorCategory, ShardgateError};

/// Success (standard convention)
#[allow(dead_code)]
pub const SUCCESS: i32 = 0;

/// General error (fallback for unknown errors)
pub const GENERAL_ERROR: i32 = 1;

/// CLI usage error (invalid arguments, missing flags)
pub const USAGE_ERROR: i32 = 2;

/// Configuration error (YAML parse failure, invalid topology, unknown namespace)
pub const CONFIG_ERROR: i32 = 3;

/// Connection error (backend and standby unreachable, timeout)
pub const CONNECTION_ERROR: i32 = 4;

/// Query error (statement cannot be routed)
pub const QUERY_ERROR: i32 = 5;

pub fn for_error(e: &anyhow::Error) -> i32 {
    if let Some(err) = e.downcast_ref::<ShardgateError>() {
        return match err.code.category() {
            ErrorCategory::Connection => CONNECTION_ERROR,
            ErrorCategory::Config => CONFIG_ERROR,
            ErrorCategory::Query => QUERY_ERROR,
            ErrorCategory::Internal => GENERAL_ERROR,
            _ => GENERAL_ERROR,
        };
    }

    // Errors raised outside the router carry no code.
    let s = format!("{:#}", e).to_lowercase();
    if s.contains("usage") || s.contains("argument") {
        return USAGE_ERROR;
    }
    if s.contains("config") || s.contains("yaml") {
        return CONFIG_ERROR;
    }
    if s.contains("connect") || s.contains("timeout") {
        return CONNECTION_ERROR;
    }
    GENERAL_ERROR
}

#[cfg(test)]
mod tests {
    use super::*;
    use shardgate_error::ErrorCode;

    #[test]
    fn test_codes_follow_error_category() {
        let unroutable = anyhow::Error::new(ShardgateError::unroutable("no table"));
        assert_eq!(for_error(&unroutable), QUERY_ERROR);

        let down = anyhow::Error::new(ShardgateError::new(
            ErrorCode::BackendUnavailable,
            "DBMS1 is down",
        ));
        assert_eq!(for_error(&down), CONNECTION_ERROR);

        let unknown = anyhow::Error::new(ShardgateError::new(ErrorCode::UnknownBackend, "DBMS9"));
        assert_eq!(for_error(&unknown), CONFIG_ERROR);
    }

    #[test]
    fn test_context_does_not_hide_the_code() {
        let e = anyhow::Error::new(ShardgateError::unroutable("no table")).context("Query failed");
        assert_eq!(for_error(&e), QUERY_ERROR);
    }

    #[test]
    fn test_untyped_errors_fall_back_to_message() {
        assert_eq!(
            for_error(&anyhow::anyhow!("Failed to deserialize configuration")),
            CONFIG_ERROR
        );
        assert_eq!(for_error(&anyhow::anyhow!("stdin closed")), GENERAL_ERROR);
    }
}
