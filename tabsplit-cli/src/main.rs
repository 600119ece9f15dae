//! tabsplit: split group food orders into shared expenses.
//!
//! # Usage
//!
//! ```text
//! tabsplit sync [--limit N] [--json]
//! tabsplit orders list
//! tabsplit orders remove <order-id>
//! tabsplit orders reset
//! tabsplit orders import <file>
//! tabsplit auth test
//! ```
//!
//! Settings come from the environment; a `.env` file in the working
//! directory is loaded first when present.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{auth::AuthCommand, orders::OrdersCommand, sync::SyncArgs};

#[derive(Parser, Debug)]
#[command(
    name = "tabsplit",
    version,
    about = "Turn group food orders into balanced shared expenses",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch recent orders and record every new group order as an expense.
    Sync(SyncArgs),

    /// Inspect and edit the processed-orders ledger.
    Orders {
        #[command(subcommand)]
        command: OrdersCommand,
    },

    /// Check ordering platform credentials.
    Auth {
        #[command(subcommand)]
        command: AuthCommand,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    match cli.command {
        Commands::Sync(args) => args.run(),
        Commands::Orders { command } => commands::orders::run(command),
        Commands::Auth { command } => commands::auth::run(command),
    }
}

/// Logs go to stderr so command output stays clean on stdout.
fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
