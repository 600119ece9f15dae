//! Seams to the outside world: the ordering platform, the expense ledger,
//! and the notifier.

use std::collections::BTreeMap;

use async_trait::async_trait;
use thiserror::Error;

use tabsplit_core::{Cents, MemberId, OrderDetail, OrderId, RemoteError, SplitLine};

use crate::summary::RunSummary;

/// Ledger member display name (`"<first> <last>"`) → member id.
pub type MemberDirectory = BTreeMap<String, MemberId>;

/// Read access to the ordering platform.
#[async_trait]
pub trait OrderSource: Send + Sync {
    /// Up to `limit` most recent order ids, newest first.
    async fn list_recent_order_ids(&self, limit: usize) -> Result<Vec<OrderId>, RemoteError>;

    async fn order_detail(&self, id: &OrderId) -> Result<OrderDetail, RemoteError>;
}

/// An expense ready for submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewExpense {
    pub description: String,
    pub cost: Cents,
    pub splits: Vec<SplitLine>,
}

/// Write access to the shared-expense ledger.
#[async_trait]
pub trait ExpenseLedger: Send + Sync {
    async fn members(&self) -> Result<MemberDirectory, RemoteError>;

    async fn create_expense(&self, expense: &NewExpense) -> Result<(), RemoteError>;
}

#[derive(Debug, Error)]
#[error("notification failed: {0}")]
pub struct NotifyError(pub String);

/// A hard failure worth telling a human about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureReport {
    pub subject: String,
    /// Ordered key/value context rendered under the subject.
    pub details: Vec<(String, String)>,
}

impl FailureReport {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            details: Vec::new(),
        }
    }

    pub fn detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.push((key.into(), value.into()));
        self
    }
}

/// Best-effort delivery of run outcomes.
///
/// Callers log and discard the error; a notifier can never change the outcome
/// of a run.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn run_summary(&self, summary: &RunSummary) -> Result<(), NotifyError>;

    async fn failure(&self, report: &FailureReport) -> Result<(), NotifyError>;
}

/// Notifier used when mail is not configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn run_summary(&self, _summary: &RunSummary) -> Result<(), NotifyError> {
        tracing::info!("email not configured, skipping summary notification");
        Ok(())
    }

    async fn failure(&self, _report: &FailureReport) -> Result<(), NotifyError> {
        Ok(())
    }
}
