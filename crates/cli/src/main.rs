//! Shardgate CLI: query shell and operator tooling for the fragmentation-aware router.
//!
//! # Commands
//!
//! - `query`: Run one statement (`--sql`) or open the interactive `SQL>` shell.
//! - `top5`: Show the latest ranked articles for a daily, weekly or monthly window.
//! - `route`: Show the execution plan for a statement without running it.
//! - `clear-cache`: Drop cached result sets from one datacenter namespace or all of them.
//!
//! Every command loads `config/shardgate.yaml` (or `--config`), with `SHARDGATE_*`
//! environment overrides, and builds a single `Coordinator`.

use clap::{Parser, Subcommand};
use dotenv::dotenv;
use owo_colors::OwoColorize;
use shardgate_common::config::{AppConfig, DEFAULT_CONFIG_PATH};
use shardgate_common::telemetry::{init_telemetry, shutdown_telemetry};
use shardgate_runtime::{Coordinator, CoordinatorOptions};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

mod commands;
mod exit_codes;
mod output;

use output::OutputFormat;

#[derive(Parser)]
#[command(name = "shardgate")]
#[command(about = "Query a fragmented deployment through the Shardgate router", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the router configuration
    #[arg(long, global = true, env = "SHARDGATE_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    /// Output format (human, json, yaml)
    #[arg(long, global = true, value_enum, default_value = "human")]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a query, or start the interactive shell
    Query {
        /// Statement to run
        #[arg(long, conflicts_with = "interactive", required_unless_present = "interactive")]
        sql: Option<String>,
        /// Read statements from stdin at a `SQL>` prompt
        #[arg(long, short = 'i', default_value_t = false)]
        interactive: bool,
        /// Neither read nor write the result cache
        #[arg(long, default_value_t = false)]
        no_cache: bool,
    },
    /// Show the latest popular articles for one granularity
    Top5 {
        /// Ranking window
        #[arg(long, value_enum, default_value = "daily")]
        granularity: commands::Granularity,
        /// Neither read nor write the result cache
        #[arg(long, default_value_t = false)]
        no_cache: bool,
    },
    /// Print the execution plan for a statement without running it
    Route {
        /// Statement to route
        #[arg(long)]
        sql: String,
    },
    /// Remove cached result sets
    ClearCache {
        /// Cache namespace to clear (all namespaces when omitted)
        #[arg(long)]
        datacenter: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    dotenv().ok();

    let cli = Cli::parse();

    let config = match AppConfig::from_file(&cli.config) {
        Ok(config) => config,
        Err(e) => exit_with(&cli, &e.context(format!("Failed to load '{}'", cli.config))),
    };

    init_logging(&config);
    debug!(
        config = %cli.config,
        backends = config.backends.len(),
        cache_enabled = config.cache.enabled,
        "Configuration loaded"
    );

    let result = run_cli(&cli, config).await;
    shutdown_telemetry();

    if let Err(e) = result {
        exit_with(&cli, &e);
    }
    Ok(())
}

fn init_logging(config: &AppConfig) {
    // Logs go to stderr so stdout stays parseable in json/yaml mode.
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        );

    let otel_layer = match init_telemetry(&config.telemetry) {
        Ok(layer) => Some(layer),
        Err(e) => {
            eprintln!("{} telemetry disabled: {:#}", "Warning:".yellow().bold(), e);
            None
        }
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(otel_layer)
        .try_init()
        .ok();
}

fn exit_with(cli: &Cli, e: &anyhow::Error) -> ! {
    let exit_code = exit_codes::for_error(e);
    if cli.output.is_machine_readable() {
        output::print_error::<()>(cli.output, &format!("{:#}", e), exit_code).ok();
    } else {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
    }
    std::process::exit(exit_code);
}

async fn run_cli(cli: &Cli, config: AppConfig) -> Result<(), anyhow::Error> {
    let coordinator = Coordinator::new(CoordinatorOptions::new(config))?;

    let result = match &cli.command {
        Commands::Query { sql, no_cache, .. } => match sql {
            Some(sql) => commands::query(&coordinator, sql, !*no_cache, cli.output).await,
            None => commands::shell(&coordinator, !*no_cache, cli.output).await,
        },
        Commands::Top5 {
            granularity,
            no_cache,
        } => commands::top5(&coordinator, *granularity, !*no_cache, cli.output).await,
        Commands::Route { sql } => commands::route(&coordinator, sql, cli.output),
        Commands::ClearCache { datacenter } => {
            commands::clear_cache(&coordinator, datacenter.as_deref(), cli.output).await
        }
    };

    coordinator.shutdown().await;
    result
}
