//! # tabsplit-remote
//!
//! Concrete collaborators for the sync pipeline:
//! - [`auth`] — bearer token acquisition with retry and per-run caching
//! - [`session`] — sources that derive a token from the saved browser session
//! - [`wolt`] — the ordering platform's order history API
//! - [`splitwise`] — the expense ledger API
//! - [`notify`] — SMTP notifications

pub mod auth;
pub mod notify;
pub mod session;
pub mod splitwise;
pub mod wolt;

pub use auth::{Token, TokenProvider};
pub use notify::{notifier_from_config, SmtpNotifier};
pub use session::{HelperCommandSession, SessionError, SessionFile, SessionSource};
pub use splitwise::SplitwiseClient;
pub use wolt::WoltClient;

use std::time::Duration;

/// Bound applied to every outbound HTTP request.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

pub(crate) fn http_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()
}
