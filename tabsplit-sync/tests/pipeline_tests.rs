//! End-to-end pipeline behaviour against in-memory collaborators.

mod support;

use std::time::Duration;

use tempfile::TempDir;

use tabsplit_core::{AliasTable, Cents, MemberId, OrderId, ProcessedLedger, RemoteError};
use tabsplit_sync::{
    pipeline::{NOT_A_GROUP_ORDER, REAUTH_GUIDANCE},
    Orchestrator, SyncError, SyncOptions,
};

use support::{group_order, solo_order, FakeOrders, RecordingLedger, RecordingNotifier};

fn no_delay() -> SyncOptions {
    SyncOptions {
        order_delay: Duration::ZERO,
        ..Default::default()
    }
}

fn ledger_in(tmp: &TempDir) -> ProcessedLedger {
    ProcessedLedger::new(tmp.path().join("processed_orders.json"))
}

fn aliases() -> AliasTable {
    AliasTable::new().with("Bob Smith", &["Bobby S"])
}

// ---------------------------------------------------------------------------
// 1. Happy path and idempotence
// ---------------------------------------------------------------------------

#[tokio::test]
async fn group_order_becomes_balanced_expense() {
    let tmp = TempDir::new().unwrap();
    let ledger = ledger_in(&tmp);
    let orders = FakeOrders::with_orders(vec![group_order("A", ("Bobby", "S"))]);
    let expenses = RecordingLedger::new();
    let notifier = RecordingNotifier::default();
    let aliases = aliases();

    let summary = Orchestrator::new(&orders, &expenses, &notifier, &ledger, &aliases)
        .with_options(no_delay())
        .run()
        .await
        .expect("run");

    assert_eq!(summary.succeeded, 1);
    let created = expenses.created();
    assert_eq!(created.len(), 1);
    let expense = &created[0];
    assert!(expense.description.starts_with("Pizzeria Napoli "));
    assert_eq!(expense.cost, Cents(2500));

    let payer = expense.splits.iter().find(|l| l.is_payer()).expect("payer");
    assert_eq!(payer.member_id, MemberId(1));
    assert_eq!((payer.paid, payer.owed), (Cents(2500), Cents(500)));
    let bob = expense
        .splits
        .iter()
        .find(|l| l.member_id == MemberId(3))
        .expect("alias resolved to Bob Smith");
    assert_eq!((bob.paid, bob.owed), (Cents(0), Cents(800)));

    let processed = ledger.load().unwrap();
    let record = &processed[&OrderId::from("A")];
    assert_eq!(record.order_name.as_deref(), Some(expense.description.as_str()));
    assert_eq!(notifier.summaries().len(), 1);
    assert!(notifier.failures().is_empty());
}

#[tokio::test]
async fn second_run_submits_nothing() {
    let tmp = TempDir::new().unwrap();
    let ledger = ledger_in(&tmp);
    let orders = FakeOrders::with_orders(vec![
        group_order("A", ("Bob", "Smith")),
        solo_order("B"),
        group_order("C", ("Bob", "Smith")),
    ]);
    let expenses = RecordingLedger::new();
    let notifier = RecordingNotifier::default();
    let aliases = aliases();
    let orchestrator = Orchestrator::new(&orders, &expenses, &notifier, &ledger, &aliases)
        .with_options(no_delay());

    let first = orchestrator.run().await.expect("first run");
    assert_eq!((first.succeeded, first.skipped, first.errored), (2, 1, 0));
    assert_eq!(expenses.created().len(), 2);

    let second = orchestrator.run().await.expect("second run");
    assert!(second.nothing_to_do());
    assert_eq!(second.total_orders, 3);
    assert_eq!(second.already_processed, 3);
    assert_eq!(expenses.created().len(), 2, "no new expenses on re-run");
    assert_eq!(notifier.summaries().len(), 1, "nothing-to-do runs stay quiet");
}

#[tokio::test]
async fn solo_order_is_marked_and_counted_as_skipped() {
    let tmp = TempDir::new().unwrap();
    let ledger = ledger_in(&tmp);
    let orders = FakeOrders::with_orders(vec![solo_order("S")]);
    let expenses = RecordingLedger::new();
    let notifier = RecordingNotifier::default();
    let aliases = aliases();

    let summary = Orchestrator::new(&orders, &expenses, &notifier, &ledger, &aliases)
        .with_options(no_delay())
        .run()
        .await
        .expect("run");

    assert_eq!((summary.succeeded, summary.skipped, summary.errored), (0, 1, 0));
    let processed = ledger.load().unwrap();
    let record = &processed[&OrderId::from("S")];
    assert_eq!(record.order_name.as_deref(), Some(NOT_A_GROUP_ORDER));
    assert!(expenses.created().is_empty());
    assert_eq!(expenses.member_calls(), 0, "solo orders never touch the ledger API");
    assert!(notifier.summaries().is_empty());
}

// ---------------------------------------------------------------------------
// 2. Per-order isolation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_mapping_fails_only_that_order() {
    let tmp = TempDir::new().unwrap();
    let ledger = ledger_in(&tmp);
    let orders = FakeOrders::with_orders(vec![
        group_order("A", ("Bob", "Smith")),
        group_order("B", ("Carla", "Unknown")),
        group_order("C", ("Bob", "Smith")),
    ]);
    let expenses = RecordingLedger::new();
    let notifier = RecordingNotifier::default();
    let aliases = aliases();

    let summary = Orchestrator::new(&orders, &expenses, &notifier, &ledger, &aliases)
        .with_options(no_delay())
        .run()
        .await
        .expect("run");

    assert_eq!((summary.succeeded, summary.skipped, summary.errored), (2, 0, 1));
    assert_eq!(summary.failures[0].order_id, OrderId::from("B"));
    assert!(summary.failures[0].message.contains("Carla Unknown"));
    assert!(!summary.failures[0].auth_expired);

    let processed = ledger.load().unwrap();
    assert!(processed.contains_key(&OrderId::from("A")));
    assert!(processed.contains_key(&OrderId::from("C")));
    assert!(!processed.contains_key(&OrderId::from("B")), "errored orders are retried");

    let failures = notifier.failures();
    assert_eq!(failures.len(), 1);
    assert!(failures[0].subject.contains("order B"));
    assert_eq!(notifier.summaries().len(), 1);
    assert_eq!(expenses.member_calls(), 1, "members are fetched once per run");
}

#[tokio::test]
async fn auth_expiry_mid_run_is_isolated_with_guidance() {
    let tmp = TempDir::new().unwrap();
    let ledger = ledger_in(&tmp);
    let mut orders = FakeOrders::with_orders(vec![
        group_order("A", ("Bob", "Smith")),
        group_order("B", ("Bob", "Smith")),
    ]);
    orders.auth_expired.insert(OrderId::from("A"));
    let expenses = RecordingLedger::new();
    let notifier = RecordingNotifier::default();
    let aliases = aliases();

    let summary = Orchestrator::new(&orders, &expenses, &notifier, &ledger, &aliases)
        .with_options(no_delay())
        .run()
        .await
        .expect("run");

    assert_eq!((summary.succeeded, summary.errored), (1, 1));
    assert!(summary.failures[0].auth_expired);
    let failures = notifier.failures();
    assert!(failures[0].subject.contains("authentication expired"));
    assert!(failures[0]
        .details
        .iter()
        .any(|(k, v)| k == "solution" && v == REAUTH_GUIDANCE));
}

#[tokio::test]
async fn broken_notifier_never_changes_outcome() {
    let tmp = TempDir::new().unwrap();
    let ledger = ledger_in(&tmp);
    let orders = FakeOrders::with_orders(vec![
        group_order("A", ("Carla", "Unknown")),
        group_order("B", ("Bob", "Smith")),
    ]);
    let expenses = RecordingLedger::new();
    let notifier = RecordingNotifier::broken();
    let aliases = aliases();

    let summary = Orchestrator::new(&orders, &expenses, &notifier, &ledger, &aliases)
        .with_options(no_delay())
        .run()
        .await
        .expect("notification failures are swallowed");

    assert_eq!((summary.succeeded, summary.errored), (1, 1));
    assert_eq!(notifier.failures().len(), 1);
    assert_eq!(notifier.summaries().len(), 1);
}

// ---------------------------------------------------------------------------
// 3. Setup and storage failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn auth_expiry_before_listing_aborts_and_notifies() {
    let tmp = TempDir::new().unwrap();
    let ledger = ledger_in(&tmp);
    let orders = FakeOrders {
        history_failure: Some(|| RemoteError::AuthExpired {
            message: "no valid session".into(),
        }),
        ..Default::default()
    };
    let expenses = RecordingLedger::new();
    let notifier = RecordingNotifier::default();
    let aliases = aliases();

    let err = Orchestrator::new(&orders, &expenses, &notifier, &ledger, &aliases)
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::History(_)), "got: {err}");
    assert!(err.is_auth_expired());
    let failures = notifier.failures();
    assert_eq!(failures.len(), 1);
    assert!(failures[0]
        .details
        .iter()
        .any(|(k, v)| k == "solution" && v == REAUTH_GUIDANCE));
    assert!(!ledger.path().exists());
}

#[tokio::test]
async fn other_listing_failures_abort_quietly() {
    let tmp = TempDir::new().unwrap();
    let ledger = ledger_in(&tmp);
    let orders = FakeOrders {
        history_failure: Some(|| RemoteError::api("wolt", "HTTP 500")),
        ..Default::default()
    };
    let expenses = RecordingLedger::new();
    let notifier = RecordingNotifier::default();
    let aliases = aliases();

    let err = Orchestrator::new(&orders, &expenses, &notifier, &ledger, &aliases)
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::History(_)));
    assert!(!err.is_auth_expired());
    assert!(notifier.failures().is_empty());
}

#[tokio::test]
async fn malformed_ledger_aborts_before_any_submission() {
    let tmp = TempDir::new().unwrap();
    let ledger = ledger_in(&tmp);
    std::fs::write(ledger.path(), "{ not json").unwrap();
    let orders = FakeOrders::with_orders(vec![group_order("A", ("Bob", "Smith"))]);
    let expenses = RecordingLedger::new();
    let notifier = RecordingNotifier::default();
    let aliases = aliases();

    let err = Orchestrator::new(&orders, &expenses, &notifier, &ledger, &aliases)
        .with_options(no_delay())
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::Ledger(_)), "got: {err}");
    assert!(orders.detail_calls().is_empty());
    assert!(expenses.created().is_empty());
}

#[tokio::test]
async fn unwritable_ledger_after_submission_is_fatal() {
    let tmp = TempDir::new().unwrap();
    // The ledger's parent "directory" is a regular file, so writes fail while
    // the initial load sees an empty ledger.
    let blocker = tmp.path().join("not-a-dir");
    std::fs::write(&blocker, "").unwrap();
    let ledger = ProcessedLedger::new(blocker.join("processed_orders.json"));
    let orders = FakeOrders::with_orders(vec![
        group_order("A", ("Bob", "Smith")),
        group_order("B", ("Bob", "Smith")),
    ]);
    let expenses = RecordingLedger::new();
    let notifier = RecordingNotifier::default();
    let aliases = aliases();

    let err = Orchestrator::new(&orders, &expenses, &notifier, &ledger, &aliases)
        .with_options(no_delay())
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::NotRecorded { .. }), "got: {err}");
    assert_eq!(expenses.created().len(), 1, "run stops at the first unrecorded expense");
    assert_eq!(orders.detail_calls(), vec![OrderId::from("A")]);
    assert_eq!(notifier.failures().len(), 1);
}

#[tokio::test]
async fn abort_report_keeps_orders_completed_earlier_in_the_run() {
    let tmp = TempDir::new().unwrap();
    let ledger = ledger_in(&tmp);
    let orders = FakeOrders::with_orders(vec![
        group_order("A", ("Bob", "Smith")),
        solo_order("B"),
        group_order("C", ("Bob", "Smith")),
    ]);
    let expenses = RecordingLedger::new().breaking_ledger_after(2, ledger.path().to_path_buf());
    let notifier = RecordingNotifier::default();
    let aliases = aliases();

    let err = Orchestrator::new(&orders, &expenses, &notifier, &ledger, &aliases)
        .with_options(no_delay())
        .run()
        .await
        .unwrap_err();

    assert!(
        matches!(&err, SyncError::NotRecorded { order_id, .. } if order_id == &OrderId::from("C")),
        "got: {err}"
    );
    let failures = notifier.failures();
    assert_eq!(failures.len(), 1);
    let detail = |key: &str| {
        failures[0]
            .details
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
            .unwrap_or_default()
    };
    assert_eq!(detail("completed before abort"), "1 recorded, 1 skipped, 0 errored");
    assert!(detail("recorded orders").starts_with("Pizzeria Napoli "));
}

#[tokio::test]
async fn repeated_history_ids_are_not_counted_as_processed() {
    let tmp = TempDir::new().unwrap();
    let ledger = ledger_in(&tmp);
    let mut orders = FakeOrders::with_orders(vec![solo_order("A")]);
    orders.history = vec![OrderId::from("A"), OrderId::from("A")];
    let expenses = RecordingLedger::new();
    let notifier = RecordingNotifier::default();
    let aliases = aliases();

    let summary = Orchestrator::new(&orders, &expenses, &notifier, &ledger, &aliases)
        .with_options(no_delay())
        .run()
        .await
        .expect("run");

    assert_eq!(summary.total_orders, 2);
    assert_eq!(summary.already_processed, 0);
    assert_eq!((summary.new_orders, summary.skipped), (1, 1));
    assert_eq!(orders.detail_calls(), vec![OrderId::from("A")]);
}

// ---------------------------------------------------------------------------
// 4. Pacing
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn orders_are_spaced_by_the_configured_delay() {
    let tmp = TempDir::new().unwrap();
    let ledger = ledger_in(&tmp);
    let orders = FakeOrders::with_orders(vec![solo_order("A"), solo_order("B"), solo_order("C")]);
    let expenses = RecordingLedger::new();
    let notifier = RecordingNotifier::default();
    let aliases = aliases();

    let started = tokio::time::Instant::now();
    let summary = Orchestrator::new(&orders, &expenses, &notifier, &ledger, &aliases)
        .run()
        .await
        .expect("run");

    assert_eq!(summary.skipped, 3);
    assert_eq!(started.elapsed(), Duration::from_secs(2));
    assert_eq!(
        orders.detail_calls(),
        vec![OrderId::from("A"), OrderId::from("B"), OrderId::from("C")]
    );
}
