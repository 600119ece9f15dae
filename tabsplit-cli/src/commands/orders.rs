//! `tabsplit orders list|remove|reset|import`

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Args, Subcommand};
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use tabsplit_core::ledger::{load_export, IMPORT_SOURCE};
use tabsplit_core::{OrderId, ProcessedLedger};

/// Ledger maintenance.
#[derive(Subcommand, Debug)]
pub enum OrdersCommand {
    /// List processed orders, most recent first.
    List,

    /// Forget one order so the next sync processes it again.
    Remove(RemoveArgs),

    /// Forget every processed order.
    Reset,

    /// Seed the ledger from an order export file.
    Import(ImportArgs),
}

#[derive(Args, Debug)]
pub struct RemoveArgs {
    /// Order (purchase) id as shown by `tabsplit orders list`.
    pub order_id: String,
}

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Export file, usually `orders_done.json`.
    #[arg(default_value = IMPORT_SOURCE)]
    pub file: PathBuf,
}

#[derive(Tabled)]
struct OrderRow {
    #[tabled(rename = "order id")]
    order_id: String,
    #[tabled(rename = "processed")]
    processed: String,
    #[tabled(rename = "order")]
    order: String,
    #[tabled(rename = "source")]
    source: String,
}

pub fn run(cmd: OrdersCommand) -> Result<()> {
    let config = super::load_config()?;
    let ledger = ProcessedLedger::new(&config.ledger_path);
    match cmd {
        OrdersCommand::List => list(&ledger),
        OrdersCommand::Remove(args) => remove(&ledger, args),
        OrdersCommand::Reset => reset(&ledger),
        OrdersCommand::Import(args) => import(&ledger, args),
    }
}

fn list(ledger: &ProcessedLedger) -> Result<()> {
    let entries = ledger.list().context("failed to read processed orders")?;
    println!("Processed orders ({} total)", entries.len());

    if entries.is_empty() {
        println!("No orders processed yet.");
        return Ok(());
    }

    let rows: Vec<OrderRow> = entries
        .into_iter()
        .map(|(id, record)| OrderRow {
            order_id: id.0,
            processed: record
                .processed_at
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string(),
            order: record.order_name.unwrap_or_else(|| "N/A".to_string()),
            source: record.imported_from.unwrap_or_else(|| "sync".to_string()),
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    Ok(())
}

fn remove(ledger: &ProcessedLedger, args: RemoveArgs) -> Result<()> {
    let id = OrderId::from(args.order_id);
    let removed = ledger
        .remove(&id)
        .with_context(|| format!("failed to remove order {id}"))?;
    if removed {
        println!("{} Removed order {id} from processed list.", "✓".green());
    } else {
        println!("Order {id} not found in processed list.");
    }
    Ok(())
}

fn reset(ledger: &ProcessedLedger) -> Result<()> {
    let removed = ledger
        .reset_all()
        .context("failed to reset processed orders")?;
    if removed {
        println!(
            "{} Processed orders reset. All orders will be processed again on next run.",
            "✓".green()
        );
    } else {
        println!("No processed orders file found.");
    }
    Ok(())
}

fn import(ledger: &ProcessedLedger, args: ImportArgs) -> Result<()> {
    let exported = load_export(&args.file)
        .with_context(|| format!("failed to read export {}", args.file.display()))?;
    let report = ledger
        .import(&exported)
        .context("failed to write processed orders")?;

    println!(
        "{} Imported {} orders ({} already present, {} in ledger).",
        "✓".green(),
        report.imported,
        report.already_present,
        report.total
    );
    Ok(())
}
