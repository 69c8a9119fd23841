//! `route` command: show where a statement would run, without running it.

use anyhow::Result;
use owo_colors::OwoColorize;
use shardgate_runtime::Coordinator;

use crate::output::{self, OutputFormat};

pub fn route(coordinator: &Coordinator, sql: &str, format: OutputFormat) -> Result<()> {
    let plan = coordinator.route(sql)?;
    let datacenter = coordinator.datacenter_for(&plan);

    if format.is_machine_readable() {
        return output::print_success(
            format,
            serde_json::json!({ "plan": plan, "datacenter": datacenter }),
        );
    }

    println!("{} {}", "Strategy:".bold().blue(), plan.strategy().bold());
    println!("{} {}", "Cache datacenter:".bold().blue(), datacenter);

    if let (Some(target), Some(rank_sql)) = (plan.rank_target(), plan.rank_query()) {
        println!("  {} {}", "Rank stage on".dimmed(), target.bold());
        println!("    {}", rank_sql);
        println!(
            "  {}",
            "Detail stage: ids from the rank row, fetched from the join detail backends".dimmed()
        );
        return Ok(());
    }

    for (target, statement) in plan.statements() {
        println!("  {} {}", "•".cyan(), target.bold());
        println!("    {}", statement);
    }
    Ok(())
}
