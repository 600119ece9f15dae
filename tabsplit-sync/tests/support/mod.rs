//! In-memory collaborators for driving the pipeline in tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use tabsplit_core::{Cents, Group, GroupMember, MemberId, OrderDetail, OrderId, RemoteError};
use tabsplit_sync::{
    ExpenseLedger, FailureReport, MemberDirectory, NewExpense, Notifier, NotifyError, OrderSource,
    RunSummary,
};

pub fn paid_at() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2025-03-14T18:05:09Z")
        .expect("timestamp")
        .with_timezone(&Utc)
}

pub fn solo_order(id: &str) -> OrderDetail {
    OrderDetail {
        id: OrderId::from(id),
        venue_name: "Noodle Box".into(),
        payment_time: paid_at(),
        total: Cents(1450),
        group: None,
    }
}

/// Group order initiated by Ana Novak (share 500) with Jane Doe (1200) and
/// `third` (800).
pub fn group_order(id: &str, third: (&str, &str)) -> OrderDetail {
    OrderDetail {
        id: OrderId::from(id),
        venue_name: "Pizzeria Napoli".into(),
        payment_time: paid_at(),
        total: Cents(2500),
        group: Some(Group {
            initiator: GroupMember::new("Ana", "Novak", Cents(500)),
            others: vec![
                GroupMember::new("Jane", "Doe", Cents(1200)),
                GroupMember::new(third.0, third.1, Cents(800)),
            ],
        }),
    }
}

// ---------------------------------------------------------------------------
// Order source
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeOrders {
    pub history: Vec<OrderId>,
    pub details: HashMap<OrderId, OrderDetail>,
    /// When set, listing the history fails with this error.
    pub history_failure: Option<fn() -> RemoteError>,
    /// Orders whose detail fetch fails with `AuthExpired`.
    pub auth_expired: HashSet<OrderId>,
    pub detail_calls: Mutex<Vec<OrderId>>,
}

impl FakeOrders {
    pub fn with_orders(orders: Vec<OrderDetail>) -> Self {
        Self {
            history: orders.iter().map(|o| o.id.clone()).collect(),
            details: orders.into_iter().map(|o| (o.id.clone(), o)).collect(),
            ..Default::default()
        }
    }

    pub fn detail_calls(&self) -> Vec<OrderId> {
        self.detail_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl OrderSource for FakeOrders {
    async fn list_recent_order_ids(&self, limit: usize) -> Result<Vec<OrderId>, RemoteError> {
        if let Some(failure) = self.history_failure {
            return Err(failure());
        }
        Ok(self.history.iter().take(limit).cloned().collect())
    }

    async fn order_detail(&self, id: &OrderId) -> Result<OrderDetail, RemoteError> {
        self.detail_calls.lock().unwrap().push(id.clone());
        if self.auth_expired.contains(id) {
            return Err(RemoteError::AuthExpired {
                message: "could not capture bearer token".into(),
            });
        }
        self.details
            .get(id)
            .cloned()
            .ok_or_else(|| RemoteError::api("wolt", "No order details found"))
    }
}

// ---------------------------------------------------------------------------
// Expense ledger
// ---------------------------------------------------------------------------

pub struct RecordingLedger {
    pub directory: MemberDirectory,
    pub created: Mutex<Vec<NewExpense>>,
    pub member_calls: AtomicUsize,
    /// After this many created expenses, replace the file at the path with a
    /// directory so the processing ledger can no longer be read or written.
    pub break_ledger_after: Option<(usize, PathBuf)>,
}

impl RecordingLedger {
    pub fn new() -> Self {
        let directory = [("Ana Novak", 1), ("Jane Doe", 2), ("Bob Smith", 3)]
            .into_iter()
            .map(|(name, id)| (name.to_string(), MemberId(id)))
            .collect();
        Self {
            directory,
            created: Mutex::new(Vec::new()),
            member_calls: AtomicUsize::new(0),
            break_ledger_after: None,
        }
    }

    pub fn breaking_ledger_after(mut self, created: usize, ledger_path: PathBuf) -> Self {
        self.break_ledger_after = Some((created, ledger_path));
        self
    }

    pub fn created(&self) -> Vec<NewExpense> {
        self.created.lock().unwrap().clone()
    }

    pub fn member_calls(&self) -> usize {
        self.member_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExpenseLedger for RecordingLedger {
    async fn members(&self) -> Result<MemberDirectory, RemoteError> {
        self.member_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.directory.clone())
    }

    async fn create_expense(&self, expense: &NewExpense) -> Result<(), RemoteError> {
        let created = {
            let mut list = self.created.lock().unwrap();
            list.push(expense.clone());
            list.len()
        };
        if let Some((limit, path)) = &self.break_ledger_after {
            if created == *limit {
                let _ = std::fs::remove_file(path);
                std::fs::create_dir_all(path).unwrap();
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Notifier
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingNotifier {
    pub summaries: Mutex<Vec<RunSummary>>,
    pub failures: Mutex<Vec<FailureReport>>,
    /// Record, then fail every send.
    pub broken: bool,
}

impl RecordingNotifier {
    pub fn broken() -> Self {
        Self {
            broken: true,
            ..Default::default()
        }
    }

    pub fn summaries(&self) -> Vec<RunSummary> {
        self.summaries.lock().unwrap().clone()
    }

    pub fn failures(&self) -> Vec<FailureReport> {
        self.failures.lock().unwrap().clone()
    }

    fn outcome(&self) -> Result<(), NotifyError> {
        if self.broken {
            Err(NotifyError("smtp unreachable".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn run_summary(&self, summary: &RunSummary) -> Result<(), NotifyError> {
        self.summaries.lock().unwrap().push(summary.clone());
        self.outcome()
    }

    async fn failure(&self, report: &FailureReport) -> Result<(), NotifyError> {
        self.failures.lock().unwrap().push(report.clone());
        self.outcome()
    }
}
