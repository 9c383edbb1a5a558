//! CLI application for commission statement reconciliation.

mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{config, inspect, run};

/// Overrides the `-v`/`-q` log level, e.g. `COMMREC_LOG=commrec_core::ledger=debug`.
const LOG_ENV: &str = "COMMREC_LOG";

/// Commission reconciliation - merge lender statements and introducer reports into a case ledger
#[derive(Parser)]
#[command(name = "commrec")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// More log output on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile statements and reports into the ledger
    Run(run::RunArgs),

    /// Show the records extracted from a single document
    Inspect(inspect::InspectArgs),

    /// Manage configuration
    Config(config::ConfigArgs),
}

fn default_log_filter(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so a JSON summary on stdout stays parseable
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_log_filter(cli.verbose, cli.quiet)));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Run(args) => run::run(args, config_path).await,
        Commands::Inspect(args) => inspect::run(args, config_path).await,
        Commands::Config(args) => config::run(args, config_path).await,
    }
}
