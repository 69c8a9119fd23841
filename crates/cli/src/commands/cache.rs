//! `clear-cache` command.

use anyhow::Result;
use owo_colors::OwoColorize;
use shardgate_error::{find_closest_match, ErrorCode, ErrorContext, ShardgateError};
use shardgate_runtime::Coordinator;

use crate::output::{self, OutputFormat};

pub async fn clear_cache(
    coordinator: &Coordinator,
    datacenter: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    if let Some(name) = datacenter {
        let known = coordinator.cache_namespaces();
        if !known.iter().any(|ns| ns == name) {
            let mut err = ShardgateError::new(
                ErrorCode::InvalidConfig,
                format!("Cache namespace '{}' is not configured", name),
            )
            .with_context(ErrorContext::Cache {
                namespace: name.to_string(),
            });
            if let Some(closest) = find_closest_match(name, &known) {
                err = err.with_hint(format!("Did you mean '{}'?", closest));
            }
            return Err(err.into());
        }
    }

    let cleared = coordinator.clear_cache(datacenter).await;

    if format.is_machine_readable() {
        return output::print_success(
            format,
            serde_json::json!({ "namespace": datacenter, "cleared": cleared }),
        );
    }

    println!(
        "{} {} cached entries from {}",
        "Cleared".green().bold(),
        cleared,
        datacenter.unwrap_or("all namespaces")
    );
    Ok(())
}
