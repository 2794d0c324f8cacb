pub mod alpaca;
pub mod twelvedata;

pub use alpaca::{Account, AlpacaClient, MarketClock};
pub use twelvedata::TwelveDataClient;

use reqwest::StatusCode;
use thiserror::Error;

/// Failure classes shared by the HTTP clients, so tick handlers can match
/// on what went wrong instead of swallowing it.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{provider} returned {status}")]
    Status {
        provider: &'static str,
        status: StatusCode,
    },

    #[error("{provider} payload unusable: {detail}")]
    Payload {
        provider: &'static str,
        detail: String,
    },
}
