//! Bearer token acquisition.
//!
//! A [`TokenProvider`] lives for one run. It hands out a static override
//! token when one is configured; otherwise it derives a token from the saved
//! session, caches it, and retries extraction with linear backoff
//! (`attempt × 1s`) before giving up with [`RemoteError::AuthExpired`].

use std::fmt;
use std::time::Duration;

use tokio::sync::Mutex;

use tabsplit_core::config::WoltConfig;
use tabsplit_core::RemoteError;

use crate::session::{HelperCommandSession, SessionFile, SessionSource};

pub const MAX_ATTEMPTS: u32 = 3;
pub const BACKOFF_UNIT: Duration = Duration::from_secs(1);

/// A full `Authorization` header value (`Bearer …`).
#[derive(Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    /// Normalise a raw token, adding the `Bearer ` scheme if missing.
    pub fn new(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let value = raw.strip_prefix("Bearer ").unwrap_or(raw).trim();
        if value.is_empty() {
            return None;
        }
        Some(Self(format!("Bearer {value}")))
    }

    pub fn header_value(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(Bearer ***)")
    }
}

/// Per-run credential holder.
pub struct TokenProvider {
    fixed: Option<Token>,
    source: Box<dyn SessionSource>,
    cached: Mutex<Option<Token>>,
    max_attempts: u32,
    backoff_unit: Duration,
}

impl TokenProvider {
    pub fn new(source: Box<dyn SessionSource>) -> Self {
        Self {
            fixed: None,
            source,
            cached: Mutex::new(None),
            max_attempts: MAX_ATTEMPTS,
            backoff_unit: BACKOFF_UNIT,
        }
    }

    /// Provider for the configured session source, honouring the override.
    pub fn from_config(config: &WoltConfig) -> Self {
        let source: Box<dyn SessionSource> = match &config.session_command {
            Some(command) => Box::new(HelperCommandSession::new(command)),
            None => Box::new(SessionFile::new(&config.session_file)),
        };
        let provider = Self::new(source);
        match config.bearer_override.as_deref() {
            Some(raw) => provider.with_fixed(raw),
            None => provider,
        }
    }

    /// Always return `raw` without consulting the session.
    pub fn with_fixed(mut self, raw: &str) -> Self {
        self.fixed = Token::new(raw);
        self
    }

    pub fn is_fixed(&self) -> bool {
        self.fixed.is_some()
    }

    pub async fn token(&self) -> Result<Token, RemoteError> {
        if let Some(token) = &self.fixed {
            tracing::debug!("using bearer token from configuration");
            return Ok(token.clone());
        }

        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            return Ok(token.clone());
        }

        let mut last_error = String::new();
        for attempt in 1..=self.max_attempts {
            tracing::info!(attempt, "fetching bearer token from saved session");
            match self.source.extract().await {
                Ok(raw) => match Token::new(&raw) {
                    Some(token) => {
                        tracing::info!(attempt, "bearer token captured");
                        *cached = Some(token.clone());
                        return Ok(token);
                    }
                    None => last_error = "session produced an empty token".to_string(),
                },
                Err(err) => last_error = err.to_string(),
            }

            tracing::warn!(attempt, error = %last_error, "bearer token attempt failed");
            if attempt < self.max_attempts {
                tokio::time::sleep(self.backoff_unit * attempt).await;
            }
        }

        Err(RemoteError::AuthExpired {
            message: format!(
                "could not capture bearer token after {} attempts ({last_error}); \
                 the session may have expired, log in again",
                self.max_attempts
            ),
        })
    }

    /// Forget the cached token after the API rejected it.
    pub async fn invalidate(&self) {
        if self.cached.lock().await.take().is_some() {
            tracing::info!("discarded rejected bearer token");
        }
    }
}
