//! Coverdesk sync daemon - local quote store and offline delivery sync.

mod app;

use clap::{Parser, Subcommand};
use coverdesk_config::{init_logging, Config, Paths};
use std::path::PathBuf;

/// Coverdesk sync daemon command-line interface.
#[derive(Parser)]
#[command(name = "coverdesk-daemon")]
#[command(about = "Background sync for the Coverdesk quoting app")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true, env = "COVERDESK_LOG_LEVEL")]
    log_level: Option<String>,

    /// Base directory for runtime files (database, tokens, config).
    /// Defaults to ~/.coverdesk
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the sync daemon in the foreground
    Run,
    /// Run a single sync pass and exit
    SyncOnce,
    /// Wipe all local quotes, illustrations and delivery queues
    Reset,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let paths = match cli.base_dir {
        Some(base) => Paths::with_base_dir(base),
        None => Paths::new()?,
    };
    let mut config = Config::load(&paths)?;
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    // Reject a malformed backend URL before doing anything else
    config.api_base_url()?;

    init_logging(&config);

    match cli.command {
        Some(Commands::Run) | None => app::run_daemon(config, paths).await,
        Some(Commands::SyncOnce) => app::sync_once(config, paths).await,
        Some(Commands::Reset) => app::reset_local_data(&paths).await,
    }
}
