//! What one sync run saw and did.

use std::fmt::Write as _;

use serde::Serialize;

use tabsplit_core::{Cents, OrderId, SplitLine};

/// A group order that became an expense.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessedDetail {
    pub order_id: OrderId,
    pub label: String,
    pub total: Cents,
    pub splits: Vec<SplitLine>,
}

/// An order that failed and will be retried next run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderFailure {
    pub order_id: OrderId,
    pub message: String,
    pub auth_expired: bool,
}

/// Aggregate counts and per-order details for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Ids returned by the order history.
    pub total_orders: usize,
    /// Of those, ids the processing ledger already knew.
    pub already_processed: usize,
    pub new_orders: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub errored: usize,
    pub processed: Vec<ProcessedDetail>,
    pub failures: Vec<OrderFailure>,
}

impl RunSummary {
    pub fn nothing_to_do(&self) -> bool {
        self.new_orders == 0
    }

    /// A summary mail is only worth sending when something happened.
    pub fn should_notify(&self) -> bool {
        self.succeeded > 0 || self.errored > 0
    }

    /// Plain-text report used for the summary mail.
    pub fn report_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Order history: {} orders", self.total_orders);
        let _ = writeln!(out, "Already processed: {}", self.already_processed);
        let _ = writeln!(out, "New orders: {}", self.new_orders);
        let _ = writeln!(out);
        let _ = writeln!(out, "Split and recorded: {}", self.succeeded);
        let _ = writeln!(out, "Skipped (not group orders): {}", self.skipped);
        let _ = writeln!(out, "Errors: {}", self.errored);

        if !self.processed.is_empty() {
            let _ = writeln!(out, "\nProcessed orders:");
            for detail in &self.processed {
                let _ = writeln!(out, "- {} ({})", detail.label, detail.total);
                for line in &detail.splits {
                    let (status, amount) = if line.is_payer() {
                        ("paid", line.paid)
                    } else {
                        ("owes", line.owed)
                    };
                    let _ = writeln!(out, "    {status}: {} {amount}", line.name);
                }
            }
        }

        if !self.failures.is_empty() {
            let _ = writeln!(out, "\nFailed orders (retried next run):");
            for failure in &self.failures {
                let _ = writeln!(out, "- {}: {}", failure.order_id, failure.message);
            }
        }
        out
    }
}
