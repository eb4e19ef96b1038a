use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::{
    config::NotionArgs,
    journal::{JournalClient, page_payload},
    loader::load_csv,
    matcher::{match_all, match_all_parallel},
    normalizer::normalize,
    report::RunSummary,
    utils::shutdown_token,
};

/// Turn a broker order-history export into journaled round-trip trades
#[derive(Parser)]
#[command(name = "trade-journal")]
#[command(
    version,
    about = "FIFO-match filled orders into trades and sync them to a Notion journal"
)]
struct Cli {
    /// Order history CSV export
    #[arg(long, global = true, env = "CSV_FILE_PATH", default_value = "trades.csv")]
    csv: PathBuf,

    /// Match instruments on a thread pool
    #[arg(long, global = true)]
    parallel: bool,

    /// tracing filter, e.g. `info` or `trade_journal=debug`
    #[arg(long, global = true, env = "RUST_LOG", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print matched trades and open positions without syncing
    Report {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Match trades and create one journal page per trade
    Sync {
        #[command(flatten)]
        notion: NotionArgs,

        /// Print page payloads instead of sending them
        #[arg(long)]
        dry_run: bool,
    },
}

fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));
    // stderr keeps stdout free for the report itself
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn build_summary(cli: &Cli) -> anyhow::Result<RunSummary> {
    let rows = load_csv(&cli.csv)
        .with_context(|| format!("loading order history from {}", cli.csv.display()))?;
    let orders = normalize(&rows);
    info!(
        "{} filled orders ({} filtered, {} invalid)",
        orders.stats.fills, orders.stats.filtered, orders.stats.invalid
    );
    let matched = if cli.parallel {
        match_all_parallel(&orders)
    } else {
        match_all(&orders)
    };
    info!("matched {} complete trades", matched.trades.len());
    Ok(RunSummary::new(&orders, matched))
}

fn handle_report(cli: &Cli, json: bool) -> anyhow::Result<()> {
    let summary = build_summary(cli)?;
    if json {
        println!("{}", summary.to_json()?);
    } else {
        print!("{}", summary.render_table());
    }
    Ok(())
}

async fn handle_sync(cli: &Cli, notion: NotionArgs, dry_run: bool) -> anyhow::Result<()> {
    // credentials are checked before the export is even read
    let config = notion.validate()?;
    let summary = build_summary(cli)?;
    if summary.trades.is_empty() {
        warn!("no complete trades found, nothing to sync");
        return Ok(());
    }

    if dry_run {
        for trade in &summary.trades {
            println!(
                "{}",
                serde_json::to_string_pretty(&page_payload(&config.database_id, trade))?
            );
        }
        return Ok(());
    }

    let client = JournalClient::new(config);
    let result = client.sync_trades(&summary.trades, &shutdown_token()).await;
    println!(
        "Synced {}/{} trades ({} failed, {} not sent)",
        result.synced,
        summary.trades.len(),
        result.failed,
        result.skipped
    );
    Ok(())
}

pub async fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);
    match &cli.command {
        Commands::Report { json } => handle_report(&cli, *json),
        Commands::Sync { notion, dry_run } => handle_sync(&cli, notion.clone(), *dry_run).await,
    }
}
