//! Environment-sourced configuration.
//!
//! Every setting is optional at load time. Settings that only some commands
//! need (the expense ledger credentials) are checked by the component that
//! uses them, so `tabsplit orders list` works on a machine with no API keys.
//!
//! The binary loads an optional `.env` file into the process environment
//! before calling [`Config::from_env`].

use std::path::PathBuf;
use std::str::FromStr;

use crate::error::ConfigError;
use crate::paths;

pub const DEFAULT_CONSUMER_API: &str = "https://consumer-api.wolt.com";
pub const DEFAULT_RESTAURANT_API: &str = "https://restaurant-api.wolt.com";
pub const DEFAULT_SPLITWISE_API: &str = "https://secure.splitwise.com/api/v3.0";
pub const DEFAULT_CURRENCY: &str = "EUR";
pub const DEFAULT_SMTP_PORT: u16 = 465;

/// Fully resolved configuration for one invocation.
#[derive(Debug, Clone)]
pub struct Config {
    /// Data directory holding the ledger, aliases and session file.
    pub data_dir: PathBuf,
    pub ledger_path: PathBuf,
    pub aliases_path: PathBuf,
    pub wolt: WoltConfig,
    pub splitwise: SplitwiseConfig,
    pub smtp: SmtpConfig,
}

/// Ordering platform settings.
#[derive(Debug, Clone)]
pub struct WoltConfig {
    /// Static token; when set, no session refresh is ever attempted.
    pub bearer_override: Option<String>,
    /// External helper that prints a bearer token extracted from the saved
    /// browser session.
    pub session_command: Option<String>,
    pub session_file: PathBuf,
    pub consumer_api: String,
    pub restaurant_api: String,
}

/// Expense ledger settings.
#[derive(Debug, Clone)]
pub struct SplitwiseConfig {
    pub api_key: Option<String>,
    pub group_id: Option<u64>,
    pub api_base: String,
    pub currency: String,
}

/// Outbound mail settings.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub server: String,
    pub port: u16,
    /// Implicit TLS (`true`) or STARTTLS (`false`).
    pub ssl: bool,
    pub auth: bool,
    pub username: String,
    pub password: String,
    pub from: String,
    pub to: Vec<String>,
}

impl SmtpConfig {
    /// Mail is sent only when credentials are present.
    pub fn is_enabled(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}

impl Config {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let data_dir = match get("TABSPLIT_HOME") {
            Some(dir) => PathBuf::from(dir),
            None => paths::data_root(&dirs::home_dir().ok_or(ConfigError::HomeNotFound)?),
        };
        let ledger_path = get("TABSPLIT_LEDGER_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| paths::ledger_path(&data_dir));
        let aliases_path = get("TABSPLIT_ALIASES_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| paths::aliases_path(&data_dir));

        let wolt = WoltConfig {
            bearer_override: get("WOLT_AUTH_BEARER_TOKEN"),
            session_command: get("WOLT_SESSION_COMMAND"),
            session_file: get("WOLT_SESSION_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| paths::session_file_path(&data_dir)),
            consumer_api: get("WOLT_CONSUMER_API")
                .unwrap_or_else(|| DEFAULT_CONSUMER_API.to_string()),
            restaurant_api: get("WOLT_RESTAURANT_API")
                .unwrap_or_else(|| DEFAULT_RESTAURANT_API.to_string()),
        };

        let splitwise = SplitwiseConfig {
            api_key: get("SPLITWISE_API_KEY"),
            group_id: parse_opt("SPLITWISE_GROUP_ID", get("SPLITWISE_GROUP_ID"))?,
            api_base: get("SPLITWISE_API").unwrap_or_else(|| DEFAULT_SPLITWISE_API.to_string()),
            currency: get("SPLITWISE_CURRENCY").unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
        };

        let smtp = SmtpConfig {
            server: get("SMTP_SERVER").unwrap_or_default(),
            port: parse_opt("SMTP_PORT", get("SMTP_PORT"))?.unwrap_or(DEFAULT_SMTP_PORT),
            ssl: parse_flag("SMTP_SSL", get("SMTP_SSL"))?,
            auth: parse_flag("SMTP_AUTH", get("SMTP_AUTH"))?,
            username: get("SMTP_USERNAME").unwrap_or_default(),
            password: get("SMTP_PASSWORD").unwrap_or_default(),
            from: get("MAIL_FROM").unwrap_or_default(),
            to: get("MAIL_TO")
                .map(|list| {
                    list.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_owned)
                        .collect()
                })
                .unwrap_or_default(),
        };

        Ok(Self {
            data_dir,
            ledger_path,
            aliases_path,
            wolt,
            splitwise,
            smtp,
        })
    }
}

fn parse_opt<T>(key: &'static str, value: Option<String>) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .map(|v| {
            v.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
                key,
                value: v.clone(),
                reason: e.to_string(),
            })
        })
        .transpose()
}

/// Flags default to `true`; only an explicit `false`/`0`/`no` turns them off.
fn parse_flag(key: &'static str, value: Option<String>) -> Result<bool, ConfigError> {
    let Some(v) = value else { return Ok(true) };
    match v.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value: v,
            reason: "expected true or false".to_string(),
        }),
    }
}
