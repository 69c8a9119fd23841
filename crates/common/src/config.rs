use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use validator::Validate;

use crate::models::{BackendConfig, CacheSettings, ExecutorSettings, JoinSettings};
use shardgate_error::{ErrorCode, ErrorContext, ShardgateError};

// Default constants
pub const DEFAULT_CONFIG_PATH: &str = "config/shardgate.yaml";
pub const DEFAULT_SERVICE_NAME: &str = "shardgate";
pub const DEFAULT_TELEMETRY_ENABLED: bool = false;
pub const DEFAULT_OTLP_ENDPOINT: &str = "http://localhost:4317";
pub const ENV_PREFIX: &str = "SHARDGATE";

#[derive(Debug, Serialize, Deserialize, Default, Clone, Validate)]
pub struct AppConfig {
    #[serde(default)]
    #[validate(nested)]
    pub backends: Vec<BackendConfig>,
    #[serde(default)]
    #[validate(nested)]
    pub cache: CacheSettings,
    #[serde(default)]
    #[validate(nested)]
    pub executor: ExecutorSettings,
    #[serde(default)]
    #[validate(nested)]
    pub join: JoinSettings,
    #[serde(default)]
    #[validate(nested)]
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub struct TelemetryConfig {
    #[serde(default = "default_telemetry_enabled")]
    pub enabled: bool,

    #[serde(default = "default_otlp_endpoint")]
    #[validate(url)]
    pub endpoint: String,

    #[serde(default = "default_service_name")]
    pub service_name: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: default_telemetry_enabled(),
            endpoint: default_otlp_endpoint(),
            service_name: default_service_name(),
        }
    }
}

fn default_telemetry_enabled() -> bool {
    DEFAULT_TELEMETRY_ENABLED
}

fn default_otlp_endpoint() -> String {
    DEFAULT_OTLP_ENDPOINT.to_string()
}

fn default_service_name() -> String {
    DEFAULT_SERVICE_NAME.to_string()
}

impl AppConfig {
    /// Loads configuration from a YAML file (when present) and `SHARDGATE_*` env overrides.
    pub fn from_file(path: &str) -> Result<Self> {
        let builder = config::Config::builder();

        let builder = if std::path::Path::new(path).exists() {
            builder.add_source(config::File::with_name(path))
        } else {
            builder
        };

        // Map SHARDGATE_CACHE__TTL_SECONDS to cache.ttl_seconds, etc.
        let builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let cfg = builder.build().context("Failed to build configuration")?;

        let app_config: AppConfig = cfg
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        app_config
            .validate()
            .map_err(|e| anyhow::anyhow!("Configuration validation failed: {:?}", e))?;
        app_config.validate_topology().map_err(|e| {
            anyhow::Error::new(e.with_context(ErrorContext::Config {
                file_path: Some(path.to_string()),
                field: None,
            }))
        })?;

        Ok(app_config)
    }

    pub fn backend(&self, name: &str) -> Option<&BackendConfig> {
        self.backends.iter().find(|b| b.name == name)
    }

    /// Cross-field checks the derive-based validation cannot express.
    pub fn validate_topology(&self) -> shardgate_error::Result<()> {
        if self.backends.is_empty() {
            return Err(ShardgateError::new(
                ErrorCode::MissingRequiredField,
                "No backends configured",
            )
            .with_hint("Declare at least one entry under 'backends'"));
        }

        let mut names = HashSet::new();
        for backend in &self.backends {
            if !names.insert(backend.name.as_str()) {
                return Err(ShardgateError::config(format!(
                    "Backend '{}' is declared more than once",
                    backend.name
                )));
            }
        }

        for backend in &self.backends {
            if let Some(standby) = &backend.standby {
                if standby == &backend.name {
                    return Err(ShardgateError::config(format!(
                        "Backend '{}' cannot be its own standby",
                        backend.name
                    )));
                }
                if !names.contains(standby.as_str()) {
                    return Err(self.unknown_backend(standby, "standby"));
                }
            }
        }

        for target in &self.join.detail_backends {
            if !names.contains(target.as_str()) {
                return Err(self.unknown_backend(target, "join.detail_backends"));
            }
        }

        if self.cache.enabled
            && !self
                .cache
                .namespaces
                .iter()
                .any(|ns| ns.name == self.cache.standby_namespace)
        {
            return Err(ShardgateError::new(
                ErrorCode::MissingRequiredField,
                format!(
                    "Standby cache namespace '{}' is not configured",
                    self.cache.standby_namespace
                ),
            )
            .with_hint("Add it under cache.namespaces or set cache.enabled = false"));
        }

        Ok(())
    }

    fn unknown_backend(&self, name: &str, field: &str) -> ShardgateError {
        let known: Vec<String> = self.backends.iter().map(|b| b.name.clone()).collect();
        let mut err = ShardgateError::new(
            ErrorCode::UnknownBackend,
            format!("'{}' references unknown backend '{}'", field, name),
        )
        .with_context(ErrorContext::Config {
            file_path: None,
            field: Some(field.to_string()),
        });
        if let Some(closest) = shardgate_error::find_closest_match(name, &known) {
            err = err.with_hint(format!("Did you mean '{}'?", closest));
        }
        err
    }
}
