//! The sync pipeline.
//!
//! ## Run protocol
//!
//! 1. List up to [`ORDER_HISTORY_LIMIT`] recent order ids. Failure here ends
//!    the run with an error (auth expiry also sends a failure notification).
//! 2. Drop ids the processing ledger already holds, keeping history order.
//! 3. Nothing new → return immediately, no notification.
//! 4. For each new id, one at a time:
//!    - solo order → mark processed, count as skipped;
//!    - group order → resolve members, submit the expense, mark processed;
//!    - any remote or mapping failure → count, notify, leave unmarked so the
//!      next run retries it.
//!
//!    Orders are spaced by [`ORDER_DELAY`].
//! 5. Send the summary notification if anything succeeded or failed.
//!
//! A ledger failure is fatal. In particular a failed write after a successful
//! expense submission leaves the expense unrecorded, and the next run will
//! submit it again.

use std::collections::HashSet;
use std::time::Duration;

use tabsplit_core::{AliasTable, OrderId, ProcessedLedger, ProcessedOrders};

use crate::collab::{
    ExpenseLedger, FailureReport, MemberDirectory, NewExpense, Notifier, OrderSource,
};
use crate::error::SyncError;
use crate::split::{build_split, order_label};
use crate::summary::{OrderFailure, ProcessedDetail, RunSummary};

pub const ORDER_HISTORY_LIMIT: usize = 50;
pub const ORDER_DELAY: Duration = Duration::from_secs(1);

/// Ledger label for orders that were inspected and found not splittable.
pub const NOT_A_GROUP_ORDER: &str = "not a group order";

/// Remediation text attached to auth-expiry notifications.
pub const REAUTH_GUIDANCE: &str =
    "Log in to Wolt again with the session helper, then re-run `tabsplit sync`.";

/// Knobs for one run.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub history_limit: usize,
    /// Pause between consecutive orders.
    pub order_delay: Duration,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            history_limit: ORDER_HISTORY_LIMIT,
            order_delay: ORDER_DELAY,
        }
    }
}

enum OrderOutcome {
    Split(ProcessedDetail),
    Skipped,
}

/// Drives one sync run against its collaborators.
pub struct Orchestrator<'a> {
    orders: &'a dyn OrderSource,
    expenses: &'a dyn ExpenseLedger,
    notifier: &'a dyn Notifier,
    ledger: &'a ProcessedLedger,
    aliases: &'a AliasTable,
    options: SyncOptions,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        orders: &'a dyn OrderSource,
        expenses: &'a dyn ExpenseLedger,
        notifier: &'a dyn Notifier,
        ledger: &'a ProcessedLedger,
        aliases: &'a AliasTable,
    ) -> Self {
        Self {
            orders,
            expenses,
            notifier,
            ledger,
            aliases,
            options: SyncOptions::default(),
        }
    }

    pub fn with_options(mut self, options: SyncOptions) -> Self {
        self.options = options;
        self
    }

    /// Run the pipeline to completion.
    ///
    /// Returns `Err` only for setup failures (order history unavailable) and
    /// processing-ledger failures. Per-order failures are counted in the
    /// returned summary.
    pub async fn run(&self) -> Result<RunSummary, SyncError> {
        let candidates = match self
            .orders
            .list_recent_order_ids(self.options.history_limit)
            .await
        {
            Ok(ids) => ids,
            Err(err) => {
                tracing::error!(error = %err, "failed to fetch order history");
                if err.is_auth_expired() {
                    let report = FailureReport::new("Wolt authentication failed: session expired")
                        .detail("error", err.to_string())
                        .detail("solution", REAUTH_GUIDANCE)
                        .detail("timestamp", chrono::Utc::now().to_rfc3339());
                    self.notify_failure(&report).await;
                }
                return Err(SyncError::History(err));
            }
        };

        let processed = self.ledger.load()?;
        let new_ids = new_order_ids(&candidates, &processed);

        let mut summary = RunSummary {
            total_orders: candidates.len(),
            already_processed: candidates
                .iter()
                .filter(|id| processed.contains_key(*id))
                .count(),
            new_orders: new_ids.len(),
            ..Default::default()
        };
        tracing::info!(
            total = summary.total_orders,
            already_processed = summary.already_processed,
            new = summary.new_orders,
            "order history filtered"
        );

        if new_ids.is_empty() {
            tracing::info!("no new orders to process");
            return Ok(summary);
        }

        let mut directory: Option<MemberDirectory> = None;
        for (index, id) in new_ids.iter().enumerate() {
            if index > 0 && !self.options.order_delay.is_zero() {
                tokio::time::sleep(self.options.order_delay).await;
            }

            match self.process_order(id, &mut directory).await {
                Ok(OrderOutcome::Split(detail)) => {
                    summary.succeeded += 1;
                    summary.processed.push(detail);
                }
                Ok(OrderOutcome::Skipped) => summary.skipped += 1,
                Err(err) if err.is_fatal() => {
                    tracing::error!(
                        order_id = %id,
                        error = %err,
                        succeeded = summary.succeeded,
                        skipped = summary.skipped,
                        errored = summary.errored,
                        "aborting run"
                    );
                    let recorded = summary
                        .processed
                        .iter()
                        .map(|d| d.label.as_str())
                        .collect::<Vec<_>>()
                        .join("; ");
                    let report = FailureReport::new(format!("Sync aborted at order {id}"))
                        .detail("order_id", id.to_string())
                        .detail("error", err.to_string())
                        .detail(
                            "completed before abort",
                            format!(
                                "{} recorded, {} skipped, {} errored",
                                summary.succeeded, summary.skipped, summary.errored
                            ),
                        )
                        .detail("recorded orders", recorded);
                    self.notify_failure(&report).await;
                    return Err(err);
                }
                Err(err) => {
                    tracing::error!(order_id = %id, error = %err, "failed to process order");
                    summary.errored += 1;
                    let auth_expired = err.is_auth_expired();
                    self.notify_failure(&order_failure_report(id, &err)).await;
                    summary.failures.push(OrderFailure {
                        order_id: id.clone(),
                        message: err.to_string(),
                        auth_expired,
                    });
                }
            }
        }

        tracing::info!(
            succeeded = summary.succeeded,
            skipped = summary.skipped,
            errored = summary.errored,
            "sync run finished"
        );

        if summary.should_notify() {
            if let Err(err) = self.notifier.run_summary(&summary).await {
                tracing::warn!(error = %err, "failed to send summary notification");
            }
        }
        Ok(summary)
    }

    async fn process_order(
        &self,
        id: &OrderId,
        directory: &mut Option<MemberDirectory>,
    ) -> Result<OrderOutcome, SyncError> {
        let order = self.orders.order_detail(id).await?;

        let Some(group) = order.split_group() else {
            tracing::info!(order_id = %id, venue = %order.venue_name, "skipping order, not a group order");
            self.ledger.mark_processed(id, NOT_A_GROUP_ORDER)?;
            return Ok(OrderOutcome::Skipped);
        };

        let members = match directory.take() {
            Some(members) => members,
            None => self.expenses.members().await?,
        };
        let splits = build_split(group, self.aliases, &members);
        *directory = Some(members);
        let splits = splits?;

        let label = order_label(&order.venue_name, order.payment_time);
        let expense = NewExpense {
            description: label.clone(),
            cost: group.total(),
            splits,
        };
        tracing::info!(order_id = %id, label = %label, total = %expense.cost, "submitting expense");
        self.expenses.create_expense(&expense).await?;

        self.ledger
            .mark_processed(id, &label)
            .map_err(|source| SyncError::NotRecorded {
                order_id: id.clone(),
                source,
            })?;
        tracing::info!(order_id = %id, "expense recorded and order marked as processed");

        Ok(OrderOutcome::Split(ProcessedDetail {
            order_id: id.clone(),
            label,
            total: expense.cost,
            splits: expense.splits,
        }))
    }

    async fn notify_failure(&self, report: &FailureReport) {
        if let Err(err) = self.notifier.failure(report).await {
            tracing::warn!(error = %err, subject = %report.subject, "failed to send failure notification");
        }
    }
}

/// `candidates` minus the ids already in `processed`, in candidate order.
/// Duplicate candidates are kept once.
pub fn new_order_ids(candidates: &[OrderId], processed: &ProcessedOrders) -> Vec<OrderId> {
    let mut seen = HashSet::new();
    candidates
        .iter()
        .filter(|id| !processed.contains_key(*id))
        .filter(|id| seen.insert(*id))
        .cloned()
        .collect()
}

fn order_failure_report(id: &OrderId, err: &SyncError) -> FailureReport {
    if err.is_auth_expired() {
        FailureReport::new(format!("Failed to process order {id}: authentication expired"))
            .detail("order_id", id.to_string())
            .detail("error", err.to_string())
            .detail("solution", REAUTH_GUIDANCE)
    } else {
        FailureReport::new(format!("Failed to process order {id}: {err}"))
            .detail("order_id", id.to_string())
            .detail("error", err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use tabsplit_core::ProcessedRecord;

    use super::*;

    fn ids(raw: &[&str]) -> Vec<OrderId> {
        raw.iter().map(|s| OrderId::from(*s)).collect()
    }

    #[test]
    fn set_difference_keeps_candidate_order() {
        let mut processed = ProcessedOrders::new();
        processed.insert(OrderId::from("B"), ProcessedRecord::new(Utc::now(), "b"));
        assert_eq!(
            new_order_ids(&ids(&["A", "B", "C"]), &processed),
            ids(&["A", "C"])
        );
    }

    #[test]
    fn set_difference_with_empty_ledger_is_identity() {
        let candidates = ids(&["C", "A", "B"]);
        assert_eq!(new_order_ids(&candidates, &ProcessedOrders::new()), candidates);
    }

    #[test]
    fn duplicate_candidates_are_processed_once() {
        assert_eq!(
            new_order_ids(&ids(&["A", "B", "A"]), &ProcessedOrders::new()),
            ids(&["A", "B"])
        );
    }

    #[test]
    fn auth_failure_report_carries_guidance() {
        let err = SyncError::Remote(tabsplit_core::RemoteError::AuthExpired {
            message: "no session".into(),
        });
        let report = order_failure_report(&OrderId::from("X"), &err);
        assert!(report.subject.contains("authentication expired"));
        assert!(report
            .details
            .iter()
            .any(|(k, v)| k == "solution" && v == REAUTH_GUIDANCE));
    }
}
