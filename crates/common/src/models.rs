use serde::{Deserialize, Serialize};
use validator::Validate;

// --- Config Constants (Defaults) ---

pub const DEFAULT_BACKEND_TYPE: &str = "postgres";
pub const DEFAULT_STORE_TYPE: &str = "redis";

fn default_backend_type() -> String {
    DEFAULT_BACKEND_TYPE.to_string()
}

fn default_store_type() -> String {
    DEFAULT_STORE_TYPE.to_string()
}

fn default_cache_enabled() -> bool {
    true
}

fn default_cache_ttl_seconds() -> u64 {
    60
}

fn default_key_prefix() -> String {
    "query".to_string()
}

fn default_datacenter() -> String {
    "DC1".to_string()
}

fn default_standby_namespace() -> String {
    "STANDBY".to_string()
}

fn default_cache_operation_timeout_ms() -> u64 {
    2000
}

fn default_connect_timeout_ms() -> u64 {
    5000
}

fn default_statement_timeout_ms() -> u64 {
    30000
}

fn default_max_concurrent_queries() -> usize {
    16
}

fn default_breaker_enabled() -> bool {
    true
}

fn default_failure_threshold() -> usize {
    5
}

fn default_success_threshold() -> usize {
    2
}

fn default_reset_timeout_secs() -> u64 {
    30
}

fn default_error_rate_threshold() -> f64 {
    0.5
}

fn default_window_secs() -> u64 {
    300
}

fn default_detail_table() -> String {
    "article".to_string()
}

fn default_key_column() -> String {
    "aid".to_string()
}

fn default_detail_columns() -> Vec<String> {
    ["aid", "title", "category", "abstract", "text", "image", "video"]
        .iter()
        .map(|c| c.to_string())
        .collect()
}

fn default_detail_backends() -> Vec<String> {
    vec!["DBMS1".to_string(), "DBMS2".to_string()]
}

fn validate_endpoint(endpoint: &str) -> Result<(), validator::ValidationError> {
    match url::Url::parse(endpoint) {
        Ok(_) => Ok(()),
        Err(_) => Err(validator::ValidationError::new("invalid_endpoint")),
    }
}

/// One relational backend holding a fragment of the logical schema.
#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub struct BackendConfig {
    #[validate(length(min = 1))]
    pub name: String,

    /// Connector type (e.g., postgres)
    #[serde(rename = "type", default = "default_backend_type")]
    #[validate(length(min = 1))]
    pub backend_type: String,

    #[validate(custom(function = "validate_endpoint"))]
    pub url: String,

    /// Cache datacenter this backend lives in
    #[serde(default)]
    pub datacenter: Option<String>,

    /// Backend that holds the same data and takes over when this one fails
    #[serde(default)]
    pub standby: Option<String>,
}

/// One cache namespace (a datacenter cache or the shared standby).
#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub struct CacheNamespaceConfig {
    #[validate(length(min = 1))]
    pub name: String,

    /// Store type (e.g., redis, memory)
    #[serde(rename = "type", default = "default_store_type")]
    pub store_type: String,

    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub struct CacheSettings {
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,

    #[serde(default = "default_cache_ttl_seconds")]
    #[validate(range(min = 1))]
    pub ttl_seconds: u64,

    #[serde(default = "default_key_prefix")]
    #[validate(length(min = 1))]
    pub key_prefix: String,

    /// Datacenter used when a plan spans several datacenters
    #[serde(default = "default_datacenter")]
    pub default_datacenter: String,

    #[serde(default = "default_standby_namespace")]
    pub standby_namespace: String,

    #[serde(default = "default_cache_operation_timeout_ms")]
    #[validate(range(min = 1))]
    pub operation_timeout_ms: u64,

    #[serde(default)]
    #[validate(nested)]
    pub namespaces: Vec<CacheNamespaceConfig>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            ttl_seconds: default_cache_ttl_seconds(),
            key_prefix: default_key_prefix(),
            default_datacenter: default_datacenter(),
            standby_namespace: default_standby_namespace(),
            operation_timeout_ms: default_cache_operation_timeout_ms(),
            namespaces: Vec::new(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
pub struct CircuitBreakerSettings {
    #[serde(default = "default_breaker_enabled")]
    pub enabled: bool,
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: usize,
    #[serde(default = "default_success_threshold")]
    pub success_threshold: usize,
    #[serde(default = "default_reset_timeout_secs")]
    pub reset_timeout_secs: u64,
    #[serde(default = "default_error_rate_threshold")]
    pub error_rate_threshold: f64,
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self {
            enabled: default_breaker_enabled(),
            failure_threshold: default_failure_threshold(),
            success_threshold: default_success_threshold(),
            reset_timeout_secs: default_reset_timeout_secs(),
            error_rate_threshold: default_error_rate_threshold(),
            window_secs: default_window_secs(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub struct ExecutorSettings {
    #[serde(default = "default_connect_timeout_ms")]
    #[validate(range(min = 1))]
    pub connect_timeout_ms: u64,

    #[serde(default = "default_statement_timeout_ms")]
    #[validate(range(min = 1))]
    pub statement_timeout_ms: u64,

    /// Global budget of in-flight backend statements
    #[serde(default = "default_max_concurrent_queries")]
    #[validate(range(min = 1))]
    pub max_concurrent_queries: usize,

    #[serde(default)]
    pub circuit_breaker: CircuitBreakerSettings,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout_ms(),
            statement_timeout_ms: default_statement_timeout_ms(),
            max_concurrent_queries: default_max_concurrent_queries(),
            circuit_breaker: CircuitBreakerSettings::default(),
        }
    }
}

/// Second stage of a ranking join: where item details live and how to fetch them.
#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub struct JoinSettings {
    #[serde(default = "default_detail_table")]
    #[validate(length(min = 1))]
    pub detail_table: String,

    #[serde(default = "default_key_column")]
    #[validate(length(min = 1))]
    pub key_column: String,

    #[serde(default = "default_detail_columns")]
    #[validate(length(min = 1))]
    pub detail_columns: Vec<String>,

    #[serde(default = "default_detail_backends")]
    #[validate(length(min = 1))]
    pub detail_backends: Vec<String>,
}

impl Default for JoinSettings {
    fn default() -> Self {
        Self {
            detail_table: default_detail_table(),
            key_column: default_key_column(),
            detail_columns: default_detail_columns(),
            detail_backends: default_detail_backends(),
        }
    }
}

impl JoinSettings {
    /// Builds the detail lookup for an ordered identifier list.
    ///
    /// Identifiers are embedded as string literals with single quotes doubled.
    pub fn detail_query(&self, ids: &[String]) -> String {
        let literals = ids
            .iter()
            .map(|id| format!("'{}'", id.replace('\'', "''")))
            .collect::<Vec<_>>()
            .join(",");
        format!(
            "SELECT {} FROM \"{}\" WHERE {} IN ({})",
            self.detail_columns.join(", "),
            self.detail_table,
            self.key_column,
            literals
        )
    }
}
