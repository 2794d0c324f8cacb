use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use super::ApiError;

const TWELVEDATA_API_BASE: &str = "https://api.twelvedata.com";
const PROVIDER: &str = "twelvedata";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for the Twelve Data typical-price endpoint
#[derive(Clone)]
pub struct TwelveDataClient {
    client: Client,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct TypicalPriceResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    values: Vec<TypicalPriceValue>,
}

#[derive(Debug, Deserialize)]
struct TypicalPriceValue {
    typprice: String,
}

impl TwelveDataClient {
    pub fn new(api_key: String) -> Result<Self, ApiError> {
        Self::with_base_url(api_key, TWELVEDATA_API_BASE.to_string())
    }

    /// Point the client at a different API root (stub servers in tests).
    pub fn with_base_url(api_key: String, base_url: String) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_key,
            base_url,
        })
    }

    /// Get the latest 1-minute typical price for a symbol.
    ///
    /// Returns Ok(None) when the provider answers without a usable value
    /// (status not "ok", or an empty series) - "no sample" is not a price
    /// of zero and not an error.
    /// Endpoint: GET /typprice
    pub async fn get_price(&self, symbol: &str) -> Result<Option<f64>, ApiError> {
        let url = format!(
            "{}/typprice?apikey={}&interval=1min&symbol={}&outputsize=1&format=JSON",
            self.base_url, self.api_key, symbol
        );

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(ApiError::Status {
                provider: PROVIDER,
                status: response.status(),
            });
        }

        let data: TypicalPriceResponse = response.json().await?;

        if data.status.as_deref() != Some("ok") {
            return Ok(None);
        }

        let Some(value) = data.values.first() else {
            return Ok(None);
        };

        let price = value.typprice.parse().map_err(|_| ApiError::Payload {
            provider: PROVIDER,
            detail: format!("unparseable typprice {:?}", value.typprice),
        })?;

        Ok(Some(price))
    }
}
