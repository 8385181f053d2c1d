use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::core::errors::ApiError;

/// One quoted conversion rate, with the backend's own freshness stamp.
#[derive(Debug, Clone)]
pub struct RateQuote {
    pub rate: f64,
    pub last_updated: String,
}

#[async_trait]
pub trait RateSource: Send + Sync {
    async fn latest(&self, from: &str, to: &str) -> Result<RateQuote, ApiError>;
}

/// Client for an open.er-api.com-style exchange-rate endpoint.
#[derive(Clone)]
pub struct ExchangeRateClient {
    base_url: String,
    client: Client,
}

impl ExchangeRateClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        ExchangeRateClient {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }
}

#[async_trait]
impl RateSource for ExchangeRateClient {
    async fn latest(&self, from: &str, to: &str) -> Result<RateQuote, ApiError> {
        let url = format!("{}/v6/latest/{}", self.base_url, from);
        tracing::debug!("Fetching {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(ApiError::internal)?;

        if !response.status().is_success() {
            return Err(ApiError::Internal(format!(
                "Exchange rate request failed: {}",
                response.status()
            )));
        }

        let payload: Value = response.json().await.map_err(ApiError::internal)?;
        let rate = payload
            .get("rates")
            .and_then(|rates| rates.get(to))
            .and_then(|value| value.as_f64())
            .ok_or_else(|| ApiError::BadRequest(format!("Unknown currency code: {to}")))?;
        let last_updated = payload
            .get("time_last_update_utc")
            .and_then(|value| value.as_str())
            .unwrap_or("an unknown date")
            .to_string();

        Ok(RateQuote { rate, last_updated })
    }
}

/// Natural-language rate statement fed to the composition call and kept
/// as the turn's reference.
pub fn rate_statement(from: &str, to: &str, quote: &RateQuote) -> String {
    format!(
        "As per {}, 1 {} equals {} {}.",
        quote.last_updated, from, quote.rate, to
    )
}
