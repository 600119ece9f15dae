//! Processing ledger: durable record of orders that have already been handled.
//!
//! Persists a [`ProcessedOrders`] JSON document (by default
//! `~/.tabsplit/processed_orders.json`). The document is pretty-printed so it
//! can be corrected by hand. Writes go to `<path>.tmp` and are renamed into
//! place, so a crash mid-write leaves the previous document intact.
//!
//! Every operation re-reads the file; the store assumes a single writer
//! process at a time and takes no lock.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::LedgerError;
use crate::types::{Cents, OrderId, ProcessedOrders, ProcessedRecord};

/// Provenance tag written on records created by [`ProcessedLedger::import`].
pub const IMPORT_SOURCE: &str = "orders_done.json";

/// Handle on the processed-orders document at a fixed path.
#[derive(Debug, Clone)]
pub struct ProcessedLedger {
    path: PathBuf,
}

/// One entry of an exported order-history document (`orders_done.json`).
#[derive(Debug, Clone, Deserialize)]
pub struct ExportedOrder {
    pub purchase_id: String,
    /// Payment time in Unix milliseconds.
    pub payment_time_ts: i64,
    pub venue_name: String,
    pub received_at: String,
    #[serde(default)]
    pub total_amount: Option<i64>,
    #[serde(default)]
    pub group_name: Option<String>,
}

/// Outcome of [`ProcessedLedger::import`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportReport {
    pub imported: usize,
    pub already_present: usize,
    pub total: usize,
}

impl ProcessedLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load every record.
    ///
    /// Returns an empty map if the file does not yet exist.
    pub fn load(&self) -> Result<ProcessedOrders, LedgerError> {
        if !self.path.exists() {
            return Ok(ProcessedOrders::new());
        }
        let contents = std::fs::read_to_string(&self.path).map_err(|source| LedgerError::Read {
            path: self.path.clone(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| LedgerError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    pub fn is_processed(&self, id: &OrderId) -> Result<bool, LedgerError> {
        Ok(self.load()?.contains_key(id))
    }

    /// Record `id` as handled now. Re-marking an id re-stamps it.
    pub fn mark_processed(&self, id: &OrderId, label: &str) -> Result<(), LedgerError> {
        self.mark_processed_at(id, label, Utc::now())
    }

    pub fn mark_processed_at(
        &self,
        id: &OrderId,
        label: &str,
        processed_at: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        let mut orders = self.load()?;
        orders.insert(id.clone(), ProcessedRecord::new(processed_at, label));
        self.save(&orders)?;
        tracing::debug!(order_id = %id, label, "marked order as processed");
        Ok(())
    }

    /// Remove one record. Returns `false` if it was not present.
    pub fn remove(&self, id: &OrderId) -> Result<bool, LedgerError> {
        let mut orders = self.load()?;
        if orders.remove(id).is_none() {
            return Ok(false);
        }
        self.save(&orders)?;
        Ok(true)
    }

    /// All records, most recently processed first.
    pub fn list(&self) -> Result<Vec<(OrderId, ProcessedRecord)>, LedgerError> {
        let mut entries: Vec<_> = self.load()?.into_iter().collect();
        entries.sort_by(|a, b| b.1.processed_at.cmp(&a.1.processed_at));
        Ok(entries)
    }

    /// Delete the whole document. Returns `false` if there was nothing to delete.
    pub fn reset_all(&self) -> Result<bool, LedgerError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(LedgerError::Write {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Seed the ledger from an exported order history.
    ///
    /// Ids already present are left untouched.
    pub fn import(&self, exported: &[ExportedOrder]) -> Result<ImportReport, LedgerError> {
        let mut orders = self.load()?;
        let mut imported = 0;
        let mut already_present = 0;

        for order in exported {
            let id = OrderId::from(order.purchase_id.as_str());
            if orders.contains_key(&id) {
                already_present += 1;
                continue;
            }
            let processed_at =
                DateTime::from_timestamp_millis(order.payment_time_ts).unwrap_or_else(Utc::now);
            orders.insert(
                id,
                ProcessedRecord {
                    processed_at,
                    order_name: Some(format!("{} {}", order.venue_name, order.received_at)),
                    imported_from: Some(IMPORT_SOURCE.to_string()),
                    total_amount: order.total_amount.map(Cents),
                    is_group_order: Some(order.group_name.is_some()),
                },
            );
            imported += 1;
        }

        self.save(&orders)?;
        Ok(ImportReport {
            imported,
            already_present,
            total: orders.len(),
        })
    }

    /// Save atomically: write `<path>.tmp`, then rename over `<path>`.
    fn save(&self, orders: &ProcessedOrders) -> Result<(), LedgerError> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir).map_err(write_err(dir))?;
            }
        }

        let json = serde_json::to_string_pretty(orders)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(write_err(&tmp))?;
        if let Err(e) = std::fs::rename(&tmp, &self.path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(write_err(&self.path)(e));
        }
        Ok(())
    }
}

fn write_err(path: &Path) -> impl FnOnce(std::io::Error) -> LedgerError {
    let path = path.to_path_buf();
    move |source| LedgerError::Write { path, source }
}

/// Parse an exported order-history document.
pub fn load_export(path: &Path) -> Result<Vec<ExportedOrder>, LedgerError> {
    let contents = std::fs::read_to_string(path).map_err(|source| LedgerError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| LedgerError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
