//! Error types for tabsplit-sync.

use thiserror::Error;

use tabsplit_core::{LedgerError, OrderId, RemoteError};

/// All errors that can arise from a sync run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The initial order listing failed; nothing can be processed.
    #[error("failed to fetch order history: {0}")]
    History(#[source] RemoteError),

    /// A remote call failed while handling one order.
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// A participant could not be matched to a ledger member.
    #[error(
        "no ledger member for \"{display_name}\" (looked up \"{lookup_name}\"); known members: {}; \
         list \"{display_name}\" under one of them in the alias table",
        .known.join(", ")
    )]
    MissingMapping {
        display_name: String,
        lookup_name: String,
        known: Vec<String>,
    },

    /// The processing ledger could not be read or written.
    #[error("processing ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// The expense was created but the ledger write that records it failed.
    /// The next run will submit it again.
    #[error("expense for order {order_id} was created but could not be recorded: {source}")]
    NotRecorded {
        order_id: OrderId,
        #[source]
        source: LedgerError,
    },
}

impl SyncError {
    pub fn is_auth_expired(&self) -> bool {
        match self {
            SyncError::History(err) | SyncError::Remote(err) => err.is_auth_expired(),
            _ => false,
        }
    }

    /// Storage failures end the run; everything else is isolated to one order.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SyncError::History(_) | SyncError::Ledger(_) | SyncError::NotRecorded { .. }
        )
    }
}
