//! Session sources: ways of turning the saved browser session into a bearer
//! token.
//!
//! The interactive login itself happens outside this crate; a source only
//! reads what that login left behind.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

/// Upper bound for one extraction attempt by the helper command.
pub const HELPER_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no saved session found at {0}; log in with the session helper first")]
    NoSession(PathBuf),

    #[error("could not capture bearer token: {0}")]
    NoToken(String),

    #[error("session helper timed out after {0:?}")]
    Timeout(Duration),

    #[error("session I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Something that can produce a bearer token from a persisted session.
#[async_trait]
pub trait SessionSource: Send + Sync {
    /// One extraction attempt. Returns the raw `Authorization` value.
    async fn extract(&self) -> Result<String, SessionError>;
}

/// Runs an external helper (typically a headless browser script) and reads
/// the first `Bearer …` line from its stdout.
#[derive(Debug, Clone)]
pub struct HelperCommandSession {
    command: String,
    timeout: Duration,
}

impl HelperCommandSession {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            timeout: HELPER_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl SessionSource for HelperCommandSession {
    async fn extract(&self) -> Result<String, SessionError> {
        tracing::debug!(command = %self.command, "running session helper");
        let child = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, child)
            .await
            .map_err(|_| SessionError::Timeout(self.timeout))??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SessionError::NoToken(format!(
                "helper exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        find_bearer(&stdout)
            .ok_or_else(|| SessionError::NoToken("helper printed no Bearer line".to_string()))
    }
}

/// Reads a token persisted by the login helper.
///
/// Accepts either `{"access_token": "..."}` or a plain `Bearer ...` line.
#[derive(Debug, Clone)]
pub struct SessionFile {
    path: PathBuf,
}

#[derive(Deserialize)]
struct StoredSession {
    access_token: String,
}

impl SessionFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SessionSource for SessionFile {
    async fn extract(&self) -> Result<String, SessionError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SessionError::NoSession(self.path.clone()))
            }
            Err(e) => return Err(e.into()),
        };

        if let Ok(stored) = serde_json::from_str::<StoredSession>(&contents) {
            let token = stored.access_token.trim();
            if token.is_empty() {
                return Err(SessionError::NoToken("session file has an empty access_token".into()));
            }
            return Ok(token.to_string());
        }
        find_bearer(&contents).ok_or_else(|| {
            SessionError::NoToken(format!("no token in {}", self.path.display()))
        })
    }
}

fn find_bearer(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .find(|line| line.starts_with("Bearer ") && line.len() > "Bearer ".len())
        .map(str::to_owned)
}
