//! Finnhub REST Client
//!
//! Request/response calls against the Finnhub REST API: the US market
//! holiday calendar and the per-symbol quote passthrough. Failures are
//! surfaced to the caller, not retried; the holiday refresh loop and the
//! quote endpoint decide what to do with them.

use std::time::Duration;

use reqwest::Client;

use super::messages::{HolidayResponse, QuoteResponse};
use crate::domain::calendar::HolidayEvent;
use crate::infrastructure::config::{ApiToken, ServiceConfig};

/// Request timeout for REST calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// REST client errors.
#[derive(Debug, thiserror::Error)]
pub enum RestError {
    /// Transport-level failure (connect, timeout, decode).
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Upstream answered with a non-success status.
    #[error("unexpected status {status} from {endpoint}")]
    Status {
        /// Endpoint path the request targeted.
        endpoint: &'static str,
        /// HTTP status code received.
        status: u16,
    },
}

/// HTTP client for the Finnhub REST API.
#[derive(Debug, Clone)]
pub struct FinnhubRestClient {
    client: Client,
    base_url: String,
    token: ApiToken,
    exchange: String,
}

impl FinnhubRestClient {
    /// Create a new REST client from the service configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: &ServiceConfig) -> Result<Self, RestError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            client,
            base_url: config.rest_base_url().to_string(),
            token: config.token.clone(),
            exchange: config.calendar.exchange.clone(),
        })
    }

    /// Override the API base URL (tests, mirrors).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Fetch the full market holiday list for the configured exchange.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-success status.
    pub async fn market_holidays(&self) -> Result<Vec<HolidayEvent>, RestError> {
        let url = format!("{}/stock/market-holiday", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("exchange", self.exchange.as_str()),
                ("token", self.token.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RestError::Status {
                endpoint: "stock/market-holiday",
                status: status.as_u16(),
            });
        }

        let body: HolidayResponse = response.json().await?;
        Ok(body.data)
    }

    /// Fetch the current quote for one symbol.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-success status.
    pub async fn quote(&self, symbol: &str) -> Result<QuoteResponse, RestError> {
        let url = format!("{}/quote", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("symbol", symbol), ("token", self.token.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RestError::Status {
                endpoint: "quote",
                status: status.as_u16(),
            });
        }

        Ok(response.json().await?)
    }
}
