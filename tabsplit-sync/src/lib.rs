//! # tabsplit-sync
//!
//! The order synchronization pipeline.
//!
//! [`Orchestrator::run`] lists recent orders, filters out the ones the
//! processing ledger already knows, and turns each new group order into a
//! split expense. Remote services are reached through the traits in
//! [`collab`] so the pipeline can be driven by in-memory fakes.

pub mod collab;
pub mod error;
pub mod pipeline;
pub mod split;
pub mod summary;

pub use collab::{
    ExpenseLedger, FailureReport, MemberDirectory, NewExpense, NoopNotifier, Notifier, NotifyError,
    OrderSource,
};
pub use error::SyncError;
pub use pipeline::{new_order_ids, Orchestrator, SyncOptions};
pub use summary::{OrderFailure, ProcessedDetail, RunSummary};
