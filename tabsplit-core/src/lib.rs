//! tabsplit core library: domain types, processing ledger, aliases, config.
//!
//! Public API surface:
//! - [`types`] — newtypes and domain structs
//! - [`error`] — [`LedgerError`], [`ConfigError`], [`RemoteError`]
//! - [`ledger`] — the processed-orders store
//! - [`alias`] — display-name → canonical member resolution
//! - [`config`] — environment-sourced configuration

pub mod alias;
pub mod config;
pub mod error;
pub mod ledger;
pub mod paths;
pub mod types;

pub use alias::AliasTable;
pub use config::Config;
pub use error::{ConfigError, LedgerError, RemoteError};
pub use ledger::ProcessedLedger;
pub use types::{
    Cents, Group, GroupMember, MemberId, OrderDetail, OrderId, ProcessedOrders, ProcessedRecord,
    SplitLine,
};
