//! `top5` command: the latest ranked articles for one granularity.

use anyhow::Result;
use shardgate_runtime::Coordinator;
use tracing::debug;

use crate::output::OutputFormat;

#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Granularity {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Daily => "daily",
            Granularity::Weekly => "weekly",
            Granularity::Monthly => "monthly",
        }
    }
}

pub(crate) fn top5_statement(granularity: Granularity) -> String {
    format!(
        "SELECT * FROM \"popular_articles\" WHERE temporalgranularity = '{}'",
        granularity.as_str()
    )
}

pub async fn top5(
    coordinator: &Coordinator,
    granularity: Granularity,
    use_cache: bool,
    format: OutputFormat,
) -> Result<()> {
    let sql = top5_statement(granularity);
    debug!(granularity = granularity.as_str(), "Fetching ranked articles");
    super::query(coordinator, &sql, use_cache, format).await
}
