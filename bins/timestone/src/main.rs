mod cmd;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use cmd::config::Effective;
use cmd::error::CliError;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "timestone", about = "Stage wearable sensor exports and query them back")]
struct Cli {
    /// Path to timestone.toml
    #[arg(long, global = true, default_value = "timestone.toml", env = "TIMESTONE_CONFIG")]
    config: PathBuf,

    /// Debug logging (RUST_LOG still wins)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Re-shape sensor CSVs into combined files for batch loading
    Prep(cmd::prep::PrepArgs),
    /// Estimate the cost and time of writing sensor CSVs record by record
    Estimate(cmd::estimate::EstimateArgs),
    /// Run queries and print decoded rows
    Query(cmd::query::QueryCmdArgs),
    /// Run one query and write its result as CSV
    Export(cmd::export::ExportArgs),
    /// Summarise daily wear time per participant
    Wear(cmd::wear::WearArgs),
    /// Package staged files and copy them to a remote host
    Transfer(cmd::transfer::TransferArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_level.into()),
        )
        .init();

    let eff = match Effective::new(&cli.config) {
        Ok(e) => e,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = run(&eff, &cli.command).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(eff: &Effective, command: &Command) -> Result<(), CliError> {
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, stopping");
            on_signal.cancel();
        }
    });

    match command {
        Command::Prep(args) => cmd::prep::run(eff, args).await,
        Command::Estimate(args) => cmd::estimate::run(args),
        Command::Query(args) => cmd::query::run(eff, args, &cancel).await,
        Command::Export(args) => cmd::export::run(eff, args, &cancel).await,
        Command::Wear(args) => cmd::wear::run(eff, args, &cancel).await,
        Command::Transfer(args) => cmd::transfer::run(eff, args).await,
    }
}
