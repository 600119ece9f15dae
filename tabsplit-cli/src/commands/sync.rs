//! `tabsplit sync` — one pass over the recent order history.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use tabsplit_core::{AliasTable, ProcessedLedger};
use tabsplit_remote::{notifier_from_config, SplitwiseClient, TokenProvider, WoltClient};
use tabsplit_sync::pipeline::ORDER_HISTORY_LIMIT;
use tabsplit_sync::{Orchestrator, RunSummary, SyncOptions};

/// Arguments for `tabsplit sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// How many recent orders to inspect.
    #[arg(long, default_value_t = ORDER_HISTORY_LIMIT)]
    pub limit: usize,

    /// Print the run summary as JSON.
    #[arg(long)]
    pub json: bool,
}

impl SyncArgs {
    pub fn run(self) -> Result<()> {
        let config = super::load_config()?;
        let ledger = ProcessedLedger::new(&config.ledger_path);
        let aliases = AliasTable::load(&config.aliases_path).context("failed to load aliases")?;
        tracing::debug!(aliases = aliases.len(), path = %config.aliases_path.display(), "aliases loaded");

        let expenses =
            SplitwiseClient::new(&config.splitwise).context("expense ledger is not configured")?;
        let orders = WoltClient::new(&config.wolt, TokenProvider::from_config(&config.wolt))
            .context("failed to set up order history client")?;
        let notifier = notifier_from_config(&config.smtp);

        let options = SyncOptions {
            history_limit: self.limit,
            ..SyncOptions::default()
        };

        let summary = super::runtime()?.block_on(async {
            Orchestrator::new(&orders, &expenses, &*notifier, &ledger, &aliases)
                .with_options(options)
                .run()
                .await
        });
        let summary = summary.context("sync failed")?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        } else {
            print_summary(&summary);
        }
        Ok(())
    }
}

fn print_summary(summary: &RunSummary) {
    println!(
        "Order history: {} orders, {} already processed, {} new",
        summary.total_orders, summary.already_processed, summary.new_orders
    );
    if summary.nothing_to_do() {
        println!("{} No new orders to process.", "✓".green());
        return;
    }

    for detail in &summary.processed {
        println!("{} {} ({})", "✓".green(), detail.label, detail.total);
        for line in &detail.splits {
            if line.is_payer() {
                println!("    paid: {} {}", line.name, line.paid);
            } else {
                println!("    owes: {} {}", line.name, line.owed);
            }
        }
    }
    for failure in &summary.failures {
        println!("{} {}: {}", "✗".red(), failure.order_id, failure.message);
        if failure.auth_expired {
            println!("    {}", "log in again with the session helper".yellow());
        }
    }

    let errored = if summary.errored > 0 {
        summary.errored.to_string().red().to_string()
    } else {
        summary.errored.to_string()
    };
    println!(
        "\nRecorded: {}  Skipped: {}  Errors: {}",
        summary.succeeded.to_string().green(),
        summary.skipped,
        errored
    );
}
