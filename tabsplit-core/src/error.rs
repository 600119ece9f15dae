//! Error types for tabsplit-core.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the processed-orders store.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The store exists but could not be read.
    #[error("failed to read processed orders at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The store was read but is not a valid ledger document.
    #[error("failed to parse processed orders at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Writing (or renaming into place) failed.
    #[error("failed to write processed orders at {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("processed orders JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LedgerError {
    /// `true` for failures on the read side (the store is unusable).
    pub fn is_read(&self) -> bool {
        matches!(self, LedgerError::Read { .. } | LedgerError::Parse { .. })
    }
}

/// Errors raised while assembling configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// `dirs::home_dir()` returned `None` and `TABSPLIT_HOME` is unset.
    #[error("cannot determine home directory; set $HOME or TABSPLIT_HOME")]
    HomeNotFound,

    #[error("missing required setting {key}")]
    Missing { key: &'static str },

    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("failed to read alias table at {path}: {source}")]
    AliasRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse alias table at {path}: {source}")]
    AliasParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Failures talking to either remote service.
///
/// [`RemoteError::AuthExpired`] is the one kind callers branch on: it means a
/// person has to log in again.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Credential acquisition exhausted its retries.
    #[error("authentication expired: {message}")]
    AuthExpired { message: String },

    /// The service answered with a failure status, an error payload, or a
    /// payload missing fields we need.
    #[error("{service} API error: {message}")]
    Api {
        service: &'static str,
        message: String,
    },

    /// The request never produced a response (connect, TLS, timeout).
    #[error("{service} transport error: {message}")]
    Transport {
        service: &'static str,
        message: String,
    },
}

impl RemoteError {
    pub fn api(service: &'static str, message: impl Into<String>) -> Self {
        RemoteError::Api {
            service,
            message: message.into(),
        }
    }

    pub fn is_auth_expired(&self) -> bool {
        matches!(self, RemoteError::AuthExpired { .. })
    }
}
