use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use super::ApiError;
use crate::models::OrderIntent;

const ALPACA_API_BASE: &str = "https://paper-api.alpaca.markets/v2";
const PROVIDER: &str = "alpaca";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for the Alpaca trading REST API (market clock, account,
/// positions, orders). Defaults to the paper endpoint.
#[derive(Clone)]
pub struct AlpacaClient {
    client: Client,
    base_url: String,
    key_id: String,
    secret_key: String,
}

// ============== Response Types ==============

/// Market session snapshot from /clock
#[derive(Debug, Clone, Deserialize)]
pub struct MarketClock {
    pub is_open: bool,
    pub next_open: DateTime<Utc>,
    pub next_close: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct AccountRaw {
    cash: String,
}

#[derive(Debug, Deserialize)]
struct PositionRaw {
    qty: String,
}

#[derive(Debug, Clone)]
pub struct Account {
    pub cash: f64,
}

#[derive(Debug, Serialize)]
struct OrderBody<'a> {
    symbol: &'a str,
    qty: String,
    side: String,
    #[serde(rename = "type")]
    order_type: &'static str,
    time_in_force: &'static str,
    client_order_id: String,
}

// ============== Implementation ==============

impl AlpacaClient {
    pub fn new(key_id: String, secret_key: String) -> Result<Self, ApiError> {
        Self::with_base_url(key_id, secret_key, ALPACA_API_BASE.to_string())
    }

    /// Point the client at a different API root (stub servers in tests).
    pub fn with_base_url(
        key_id: String,
        secret_key: String,
        base_url: String,
    ) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url,
            key_id,
            secret_key,
        })
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("APCA-API-KEY-ID", &self.key_id)
            .header("APCA-API-SECRET-KEY", &self.secret_key)
    }

    /// Get the market clock: open/closed now, plus the next boundaries.
    /// Endpoint: GET /clock
    pub async fn get_clock(&self) -> Result<MarketClock, ApiError> {
        let url = format!("{}/clock", self.base_url);
        let response = self.authed(self.client.get(&url)).send().await?;

        if !response.status().is_success() {
            return Err(ApiError::Status {
                provider: PROVIDER,
                status: response.status(),
            });
        }

        Ok(response.json().await?)
    }

    /// Get account buying power.
    /// Endpoint: GET /account (cash comes back string-encoded)
    pub async fn get_account(&self) -> Result<Account, ApiError> {
        let url = format!("{}/account", self.base_url);
        let response = self.authed(self.client.get(&url)).send().await?;

        if !response.status().is_success() {
            return Err(ApiError::Status {
                provider: PROVIDER,
                status: response.status(),
            });
        }

        let raw: AccountRaw = response.json().await?;
        let cash = raw.cash.parse().map_err(|_| ApiError::Payload {
            provider: PROVIDER,
            detail: format!("unparseable cash amount {:?}", raw.cash),
        })?;

        Ok(Account { cash })
    }

    /// Get the currently held quantity for a symbol. Alpaca answers 404
    /// when there is no position; that reads back as a flat 0.
    /// Endpoint: GET /positions/{symbol}
    pub async fn get_position(&self, symbol: &str) -> Result<f64, ApiError> {
        let url = format!("{}/positions/{}", self.base_url, symbol);
        let response = self.authed(self.client.get(&url)).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(0.0);
        }
        if !response.status().is_success() {
            return Err(ApiError::Status {
                provider: PROVIDER,
                status: response.status(),
            });
        }

        let raw: PositionRaw = response.json().await?;
        raw.qty.parse().map_err(|_| ApiError::Payload {
            provider: PROVIDER,
            detail: format!("unparseable position qty {:?}", raw.qty),
        })
    }

    /// Submit a fill-or-kill market order. Returns the HTTP status of the
    /// order call - rejection is reported to the caller, not retried.
    /// Endpoint: POST /orders
    pub async fn place_order(&self, intent: &OrderIntent) -> Result<StatusCode, ApiError> {
        let url = format!("{}/orders", self.base_url);
        let body = OrderBody {
            symbol: &intent.symbol,
            qty: intent.qty.to_string(),
            side: intent.side.to_string(),
            order_type: "market",
            time_in_force: "fok",
            client_order_id: Uuid::new_v4().to_string(),
        };

        let response = self.authed(self.client.post(&url)).json(&body).send().await?;

        Ok(response.status())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OrderSide;
    use mockito::Matcher;

    fn test_client(server: &mockito::Server) -> AlpacaClient {
        AlpacaClient::with_base_url("key".to_string(), "secret".to_string(), server.url())
            .unwrap()
    }

    #[tokio::test]
    async fn test_get_clock_parses_boundaries() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/clock")
            .match_header("APCA-API-KEY-ID", "key")
            .match_header("APCA-API-SECRET-KEY", "secret")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"timestamp":"2026-08-05T10:00:00-04:00","is_open":true,
                    "next_open":"2026-08-06T09:30:00-04:00",
                    "next_close":"2026-08-05T16:00:00-04:00"}"#,
            )
            .create_async()
            .await;

        let clock = test_client(&server).get_clock().await.unwrap();

        assert!(clock.is_open);
        assert_eq!(clock.next_close.to_rfc3339(), "2026-08-05T20:00:00+00:00");
        assert_eq!(clock.next_open.to_rfc3339(), "2026-08-06T13:30:00+00:00");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_clock_error_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/clock")
            .with_status(503)
            .create_async()
            .await;

        let result = test_client(&server).get_clock().await;
        assert!(matches!(
            result,
            Err(ApiError::Status { status, .. }) if status.as_u16() == 503
        ));
    }

    #[tokio::test]
    async fn test_get_account_parses_string_cash() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/account")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":"abc","cash":"10250.75","currency":"USD"}"#)
            .create_async()
            .await;

        let account = test_client(&server).get_account().await.unwrap();
        assert_eq!(account.cash, 10250.75);
    }

    #[tokio::test]
    async fn test_get_position_held() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/positions/TSLA")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"symbol":"TSLA","qty":"12.5"}"#)
            .create_async()
            .await;

        let qty = test_client(&server).get_position("TSLA").await.unwrap();
        assert_eq!(qty, 12.5);
    }

    #[tokio::test]
    async fn test_get_position_404_means_flat() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/positions/TSLA")
            .with_status(404)
            .with_body(r#"{"code":40410000,"message":"position does not exist"}"#)
            .create_async()
            .await;

        let qty = test_client(&server).get_position("TSLA").await.unwrap();
        assert_eq!(qty, 0.0);
    }

    #[tokio::test]
    async fn test_place_order_returns_status() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/orders")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "symbol": "TSLA",
                "side": "buy",
                "type": "market",
                "time_in_force": "fok",
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":"order-1","status":"accepted"}"#)
            .create_async()
            .await;

        let intent = OrderIntent {
            side: OrderSide::Buy,
            symbol: "TSLA".to_string(),
            qty: 2.0,
            reference_price: 250.0,
        };

        let status = test_client(&server).place_order(&intent).await.unwrap();
        assert_eq!(status.as_u16(), 200);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_place_order_rejection_is_not_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/orders")
            .with_status(403)
            .with_body(r#"{"message":"insufficient buying power"}"#)
            .create_async()
            .await;

        let intent = OrderIntent {
            side: OrderSide::Sell,
            symbol: "TSLA".to_string(),
            qty: 1.0,
            reference_price: 250.0,
        };

        let status = test_client(&server).place_order(&intent).await.unwrap();
        assert_eq!(status.as_u16(), 403);
    }
}
