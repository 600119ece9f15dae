//! Expense ledger client (Splitwise API v3.0).
//!
//! Authenticates with a personal API key as a bearer token. Expenses are
//! created with an explicit per-member split using the flattened
//! `users__<i>__<field>` form the API expects.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};

use tabsplit_core::config::SplitwiseConfig;
use tabsplit_core::{ConfigError, MemberId, RemoteError};
use tabsplit_sync::{ExpenseLedger, MemberDirectory, NewExpense};

const SERVICE: &str = "splitwise";

pub struct SplitwiseClient {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
    group_id: u64,
    currency: String,
}

impl SplitwiseClient {
    /// Requires `SPLITWISE_API_KEY` and `SPLITWISE_GROUP_ID`.
    pub fn new(config: &SplitwiseConfig) -> Result<Self, ConfigError> {
        let api_key = config.api_key.clone().ok_or(ConfigError::Missing {
            key: "SPLITWISE_API_KEY",
        })?;
        let group_id = config.group_id.ok_or(ConfigError::Missing {
            key: "SPLITWISE_GROUP_ID",
        })?;
        let http = crate::http_client().map_err(|e| ConfigError::Invalid {
            key: "SPLITWISE_API",
            value: config.api_base.clone(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key,
            group_id,
            currency: config.currency.clone(),
        })
    }

    async fn read_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, RemoteError> {
        let response = request
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| RemoteError::Transport {
                service: SERVICE,
                message: e.to_string(),
            })?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::api(SERVICE, format!("HTTP {status}: {body}")));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| RemoteError::api(SERVICE, format!("unexpected response payload: {e}")))
    }
}

#[async_trait]
impl ExpenseLedger for SplitwiseClient {
    async fn members(&self) -> Result<MemberDirectory, RemoteError> {
        let url = format!("{}/get_group/{}", self.api_base, self.group_id);
        let response: GroupResponse = self.read_json(self.http.get(&url)).await?;
        let directory = response.into_directory()?;
        tracing::debug!(members = directory.len(), "fetched ledger group members");
        Ok(directory)
    }

    async fn create_expense(&self, expense: &NewExpense) -> Result<(), RemoteError> {
        let url = format!("{}/create_expense", self.api_base);
        let body = expense_body(expense, self.group_id, &self.currency);
        let response: CreateExpenseResponse =
            self.read_json(self.http.post(&url).json(&body)).await?;
        response.check()?;
        tracing::info!(
            description = %expense.description,
            cost = %expense.cost,
            members = expense.splits.len(),
            "ledger expense created"
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct GroupResponse {
    group: Option<WireGroup>,
}

#[derive(Debug, Deserialize)]
struct WireGroup {
    #[serde(default)]
    members: Vec<WireMember>,
}

#[derive(Debug, Deserialize)]
struct WireMember {
    id: u64,
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
}

impl WireMember {
    fn display_name(&self) -> String {
        let first = self.first_name.as_deref().unwrap_or_default();
        let last = self.last_name.as_deref().unwrap_or_default();
        format!("{first} {last}").trim().to_string()
    }
}

impl GroupResponse {
    pub(crate) fn into_directory(self) -> Result<MemberDirectory, RemoteError> {
        let group = self
            .group
            .ok_or_else(|| RemoteError::api(SERVICE, "response has no group"))?;
        Ok(group
            .members
            .iter()
            .map(|m| (m.display_name(), MemberId(m.id)))
            .collect())
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreateExpenseResponse {
    #[serde(default)]
    errors: Option<Value>,
}

impl CreateExpenseResponse {
    /// The API reports validation failures with a 200 and a non-empty
    /// `errors` field.
    pub(crate) fn check(&self) -> Result<(), RemoteError> {
        let has_errors = match &self.errors {
            None | Some(Value::Null) => false,
            Some(Value::Object(map)) => !map.is_empty(),
            Some(Value::Array(list)) => !list.is_empty(),
            Some(_) => true,
        };
        if has_errors {
            let detail = self.errors.as_ref().map(Value::to_string).unwrap_or_default();
            return Err(RemoteError::api(SERVICE, format!("expense rejected: {detail}")));
        }
        Ok(())
    }
}

pub(crate) fn expense_body(expense: &NewExpense, group_id: u64, currency: &str) -> Value {
    let mut body = Map::new();
    body.insert("cost".into(), expense.cost.to_decimal_string().into());
    body.insert("description".into(), expense.description.clone().into());
    body.insert("group_id".into(), group_id.into());
    body.insert("currency_code".into(), currency.into());
    for (i, line) in expense.splits.iter().enumerate() {
        body.insert(format!("users__{i}__user_id"), line.member_id.0.into());
        body.insert(
            format!("users__{i}__paid_share"),
            line.paid.to_decimal_string().into(),
        );
        body.insert(
            format!("users__{i}__owed_share"),
            line.owed.to_decimal_string().into(),
        );
    }
    Value::Object(body)
}
