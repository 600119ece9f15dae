//! Order history client for the ordering platform.
//!
//! Two endpoints are used:
//! - `GET {consumer}/order-tracking-api/v1/order_history/?limit=N` → ids
//! - `GET {restaurant}/v2/order_details/by_ids?purchases=ID` → one order
//!
//! Detail is fetched lazily per order to keep request volume low.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use tabsplit_core::config::WoltConfig;
use tabsplit_core::{Cents, Group, GroupMember, OrderDetail, OrderId, RemoteError};
use tabsplit_sync::OrderSource;

use crate::auth::TokenProvider;

const SERVICE: &str = "wolt";

/// Authenticated client for the order history API.
pub struct WoltClient {
    http: reqwest::Client,
    consumer_api: String,
    restaurant_api: String,
    tokens: TokenProvider,
}

impl WoltClient {
    pub fn new(config: &WoltConfig, tokens: TokenProvider) -> Result<Self, RemoteError> {
        let http = crate::http_client().map_err(|e| RemoteError::Transport {
            service: SERVICE,
            message: format!("failed to create HTTP client: {e}"),
        })?;
        Ok(Self {
            http,
            consumer_api: config.consumer_api.trim_end_matches('/').to_string(),
            restaurant_api: config.restaurant_api.trim_end_matches('/').to_string(),
            tokens,
        })
    }

    /// GET `url` with the bearer token. A 401/403 drops the cached token and
    /// retries once with a freshly derived one.
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, RemoteError> {
        let mut retried = false;
        loop {
            let token = self.tokens.token().await?;
            let response = self
                .http
                .get(url)
                .query(query)
                .header(reqwest::header::ACCEPT, "application/json, text/plain, */*")
                .header("app-language", "en")
                .header(reqwest::header::AUTHORIZATION, token.header_value())
                .send()
                .await
                .map_err(transport)?;

            let status = response.status();
            if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
                if !retried && !self.tokens.is_fixed() {
                    tracing::warn!(%status, "bearer token rejected, refreshing");
                    self.tokens.invalidate().await;
                    retried = true;
                    continue;
                }
                return Err(RemoteError::AuthExpired {
                    message: format!("ordering API rejected the bearer token ({status})"),
                });
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(RemoteError::api(SERVICE, format!("HTTP {status}: {body}")));
            }
            return response.json::<T>().await.map_err(|e| {
                RemoteError::api(SERVICE, format!("unexpected response payload: {e}"))
            });
        }
    }
}

#[async_trait]
impl OrderSource for WoltClient {
    async fn list_recent_order_ids(&self, limit: usize) -> Result<Vec<OrderId>, RemoteError> {
        tracing::info!(limit, "fetching order history");
        let url = format!("{}/order-tracking-api/v1/order_history/", self.consumer_api);
        let response: HistoryResponse = self.get_json(&url, &[("limit", limit.to_string())]).await?;
        let ids = response.into_ids()?;
        tracing::info!(count = ids.len(), "order history fetched");
        Ok(ids)
    }

    async fn order_detail(&self, id: &OrderId) -> Result<OrderDetail, RemoteError> {
        tracing::debug!(order_id = %id, "fetching order detail");
        let url = format!("{}/v2/order_details/by_ids", self.restaurant_api);
        let response: DetailResponse = self.get_json(&url, &[("purchases", id.0.clone())]).await?;
        response.into_detail(id)
    }
}

fn transport(err: reqwest::Error) -> RemoteError {
    RemoteError::Transport {
        service: SERVICE,
        message: err.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

/// An explicit `error` field in an otherwise successful response.
fn payload_error(error: &Option<Value>) -> Option<String> {
    match error {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct HistoryResponse {
    #[serde(default)]
    orders: Vec<HistoryEntry>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct HistoryEntry {
    #[serde(default)]
    purchase_id: Option<String>,
}

impl HistoryResponse {
    pub(crate) fn into_ids(self) -> Result<Vec<OrderId>, RemoteError> {
        if let Some(message) = payload_error(&self.error) {
            return Err(RemoteError::api(SERVICE, message));
        }
        Ok(self
            .orders
            .into_iter()
            .filter_map(|o| o.purchase_id)
            .filter(|id| !id.is_empty())
            .map(OrderId::from)
            .collect())
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct DetailResponse {
    #[serde(default)]
    order_details: Vec<WireOrderDetail>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct WireOrderDetail {
    venue_name: String,
    payment_time: WireDate,
    #[serde(default)]
    total_price: Option<i64>,
    #[serde(default)]
    group: Option<WireGroup>,
}

/// `{"$date": <unix millis>}`
#[derive(Debug, Deserialize)]
struct WireDate {
    #[serde(rename = "$date")]
    millis: i64,
}

#[derive(Debug, Deserialize)]
struct WireGroup {
    #[serde(default)]
    my_member: Option<WireMember>,
    #[serde(default)]
    other_members: Option<Vec<WireMember>>,
}

#[derive(Debug, Deserialize)]
struct WireMember {
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
    total_share: i64,
}

impl From<WireMember> for GroupMember {
    fn from(m: WireMember) -> Self {
        GroupMember::new(m.first_name, m.last_name, Cents(m.total_share))
    }
}

impl DetailResponse {
    pub(crate) fn into_detail(self, id: &OrderId) -> Result<OrderDetail, RemoteError> {
        if let Some(message) = payload_error(&self.error) {
            return Err(RemoteError::api(SERVICE, message));
        }
        let Some(detail) = self.order_details.into_iter().next() else {
            return Err(RemoteError::api(
                SERVICE,
                format!("no order details found for {id}"),
            ));
        };

        let payment_time = DateTime::<Utc>::from_timestamp_millis(detail.payment_time.millis)
            .ok_or_else(|| {
                RemoteError::api(
                    SERVICE,
                    format!("order {id} has an invalid payment time {}", detail.payment_time.millis),
                )
            })?;

        let group = match detail.group {
            Some(WireGroup {
                my_member,
                other_members: Some(others),
            }) => {
                let initiator = my_member.ok_or_else(|| {
                    RemoteError::api(SERVICE, format!("group order {id} has no initiating member"))
                })?;
                Some(Group {
                    initiator: initiator.into(),
                    others: others.into_iter().map(GroupMember::from).collect(),
                })
            }
            _ => None,
        };

        let total = match (detail.total_price, &group) {
            (Some(total), _) => Cents(total),
            (None, Some(group)) => group.total(),
            (None, None) => Cents::ZERO,
        };

        Ok(OrderDetail {
            id: id.clone(),
            venue_name: detail.venue_name,
            payment_time,
            total,
            group,
        })
    }
}
