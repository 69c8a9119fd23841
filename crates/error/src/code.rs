use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric error codes following SHARDGATE-XXXX format.
///
/// ## Code Ranges
/// - **1000-1999**: Backend and cache connectivity
/// - **2000-2999**: Query routing and execution
/// - **3000-3999**: Configuration
/// - **5000-5999**: Internal/System errors
///
/// Codes are stable across versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
#[non_exhaustive]
pub enum ErrorCode {
    // === Connection Errors (1000-1999) ===
    /// SHARDGATE-1001: Backend name not present in the registry
    BackendNotFound = 1001,
    /// SHARDGATE-1002: Connect or statement timeout
    ConnectionTimeout = 1002,
    /// SHARDGATE-1003: Primary and standby (if any) both failed
    BackendUnavailable = 1003,
    /// SHARDGATE-1004: Cache store error (recovered internally)
    CacheDegraded = 1004,

    // === Query Errors (2000-2999) ===
    /// SHARDGATE-2001: No table could be extracted from the query
    UnroutableQuery = 2001,

    // === Configuration Errors (3000-3999) ===
    /// SHARDGATE-3001: Configuration could not be loaded or is inconsistent
    InvalidConfig = 3001,
    /// SHARDGATE-3002: Missing required field in config
    MissingRequiredField = 3002,
    /// SHARDGATE-3003: Invalid connection string
    InvalidConnectionString = 3003,
    /// SHARDGATE-3004: A rule or plan names a backend that is not registered
    UnknownBackend = 3004,

    // === Internal Errors (5000-5999) ===
    /// SHARDGATE-5001: Serialization/deserialization failed
    SerializationFailed = 5001,
    /// SHARDGATE-5002: Unexpected internal state
    InternalPanic = 5002,

    /// SHARDGATE-9999: Unknown/unclassified error
    Unknown = 9999,
}

impl ErrorCode {
    /// Get the numeric code value
    pub fn as_u16(&self) -> u16 {
        *self as u16
    }

    /// Get the formatted code string (e.g., "SHARDGATE-2001")
    pub fn as_str(&self) -> String {
        format!("SHARDGATE-{:04}", self.as_u16())
    }

    /// Get the error category
    pub fn category(&self) -> ErrorCategory {
        match self.as_u16() {
            1000..=1999 => ErrorCategory::Connection,
            2000..=2999 => ErrorCategory::Query,
            3000..=3999 => ErrorCategory::Config,
            _ => ErrorCategory::Internal,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<ErrorCode> for String {
    fn from(code: ErrorCode) -> String {
        code.as_str()
    }
}

impl TryFrom<String> for ErrorCode {
    type Error = String;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        let num: u16 = s
            .strip_prefix("SHARDGATE-")
            .and_then(|n| n.parse().ok())
            .ok_or_else(|| "Invalid format".to_string())?;
        Self::try_from(num).map_err(|_| "Unknown code".to_string())
    }
}

impl TryFrom<u16> for ErrorCode {
    type Error = String;

    fn try_from(n: u16) -> std::result::Result<Self, Self::Error> {
        match n {
            1001 => Ok(Self::BackendNotFound),
            1002 => Ok(Self::ConnectionTimeout),
            1003 => Ok(Self::BackendUnavailable),
            1004 => Ok(Self::CacheDegraded),
            2001 => Ok(Self::UnroutableQuery),
            3001 => Ok(Self::InvalidConfig),
            3002 => Ok(Self::MissingRequiredField),
            3003 => Ok(Self::InvalidConnectionString),
            3004 => Ok(Self::UnknownBackend),
            5001 => Ok(Self::SerializationFailed),
            5002 => Ok(Self::InternalPanic),
            9999 => Ok(Self::Unknown),
            _ => Err(format!("Unknown error code: {}", n)),
        }
    }
}

/// High-level error category, used for CLI exit codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ErrorCategory {
    Connection,
    Query,
    Config,
    Internal,
}
