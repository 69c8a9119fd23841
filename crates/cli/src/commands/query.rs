//! `query` command: one-shot execution and the interactive shell.

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use shardgate_runtime::{Coordinator, QueryOutcome};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use crate::exit_codes;
use crate::output::{self, OutputFormat};

/// Rows printed per statement in the shell.
pub const SHELL_ROW_LIMIT: usize = 10;

const PROMPT: &str = "SQL> ";

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum ShellInput<'a> {
    Empty,
    Exit,
    ClearCache,
    Statement(&'a str),
}

impl<'a> ShellInput<'a> {
    pub(crate) fn parse(line: &'a str) -> Self {
        let line = line.trim();
        let command = line.trim_end_matches(';').trim();
        if command.is_empty() {
            ShellInput::Empty
        } else if command.eq_ignore_ascii_case("exit") || command.eq_ignore_ascii_case("quit") {
            ShellInput::Exit
        } else if command
            .split_whitespace()
            .map(str::to_ascii_lowercase)
            .eq(["clear", "cache"])
        {
            ShellInput::ClearCache
        } else {
            ShellInput::Statement(line)
        }
    }
}

pub async fn query(
    coordinator: &Coordinator,
    sql: &str,
    use_cache: bool,
    format: OutputFormat,
) -> Result<()> {
    let outcome = coordinator.execute_query(sql, use_cache).await?;

    if format.is_machine_readable() {
        return output::print_success(format, &outcome);
    }
    print_outcome(&outcome, None);
    Ok(())
}

/// Reads statements from stdin until `exit`, `quit` or end of input. A failing
/// statement is reported and the loop continues.
pub async fn shell(coordinator: &Coordinator, use_cache: bool, format: OutputFormat) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    if !format.is_machine_readable() {
        println!(
            "{} Type {} or {} to leave, {} to drop cached results.",
            "Shardgate shell.".bold().cyan(),
            "exit".bold(),
            "quit".bold(),
            "clear cache".bold()
        );
    }

    loop {
        if !format.is_machine_readable() {
            print!("{}", PROMPT);
            std::io::stdout().flush().context("Failed to flush prompt")?;
        }

        let Some(line) = lines.next_line().await.context("Failed to read from stdin")? else {
            break;
        };

        match ShellInput::parse(&line) {
            ShellInput::Empty => continue,
            ShellInput::Exit => break,
            ShellInput::ClearCache => {
                let cleared = coordinator.clear_cache(None).await;
                if format.is_machine_readable() {
                    output::print_success(format, serde_json::json!({ "cleared": cleared }))?;
                } else {
                    println!("{} {} cached entries", "Cleared".green(), cleared);
                }
            }
            ShellInput::Statement(sql) => match coordinator.execute_query(sql, use_cache).await {
                Ok(outcome) if format.is_machine_readable() => {
                    output::print_success(format, &outcome)?;
                }
                Ok(outcome) => print_outcome(&outcome, Some(SHELL_ROW_LIMIT)),
                Err(e) => {
                    debug!(code = %e.code, "Shell statement failed");
                    let e = anyhow::Error::new(e);
                    if format.is_machine_readable() {
                        output::print_error::<()>(
                            format,
                            &e.to_string(),
                            exit_codes::for_error(&e),
                        )?;
                    } else {
                        eprintln!("{} {}", "Error:".red().bold(), e);
                    }
                }
            },
        }
    }
    Ok(())
}

fn print_outcome(outcome: &QueryOutcome, limit: Option<usize>) {
    println!("{}", output::render_table(&outcome.rows, limit));
    for warning in &outcome.warnings {
        println!("{}", warning.yellow());
    }
    println!(
        "{}",
        format!(
            "{} row(s) | {} via {} | datacenter {}{}",
            outcome.rows.len(),
            outcome.plan.strategy(),
            outcome.plan.targets().join(", "),
            outcome.datacenter,
            if outcome.cache_hit { " | cached" } else { "" }
        )
        .dimmed()
    );
}
