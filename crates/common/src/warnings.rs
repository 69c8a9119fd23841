//! # Query Warnings
//!
//! Task-local collection of non-fatal events raised while a query runs: backend
//! failover, cache fallback, cache hit/miss markers. The coordinator opens a scope
//! per query and hands the collected list back with the result.

use std::future::Future;
use std::sync::{Arc, Mutex};

tokio::task_local! {
    pub static QUERY_WARNINGS: Arc<Mutex<Vec<String>>>;
}

/// Adds a warning to the current task's list, if a scope is active.
pub fn add_warning(warning: impl Into<String>) {
    if let Ok(warnings) = QUERY_WARNINGS.try_with(|w: &Arc<Mutex<Vec<String>>>| w.clone()) {
        if let Ok(mut lock) = warnings.lock() {
            lock.push(warning.into());
        }
    }
}

/// Runs `fut` inside a fresh warning scope and returns its output with the warnings raised.
///
/// Spawned tasks do not inherit the scope; only work polled by `fut` itself is captured.
pub async fn with_warnings<F, T>(fut: F) -> (T, Vec<String>)
where
    F: Future<Output = T>,
{
    let sink = Arc::new(Mutex::new(Vec::new()));
    let output = QUERY_WARNINGS.scope(sink.clone(), fut).await;
    let warnings = match sink.lock() {
        Ok(mut lock) => std::mem::take(&mut *lock),
        Err(_) => Vec::new(),
    };
    (output, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_warnings_collected_in_scope() {
        let (value, warnings) = with_warnings(async {
            add_warning("x-shardgate-cache: miss");
            add_warning(String::from("x-shardgate-failover: DBMS1 -> DBMS1-STANDBY"));
            7
        })
        .await;

        assert_eq!(value, 7);
        assert_eq!(
            warnings,
            vec![
                "x-shardgate-cache: miss".to_string(),
                "x-shardgate-failover: DBMS1 -> DBMS1-STANDBY".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn test_add_warning_outside_scope_is_noop() {
        add_warning("dropped");
        let (_, warnings) = with_warnings(async {}).await;
        assert!(warnings.is_empty());
    }
}
