use chrono::{Duration as ChronoDuration, Utc};
use config_manager::BirdEyeConfig;
use reqwest::Client;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum BirdEyeError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error: {0}")]
    Api(String),
    #[error("Rate limit exceeded")]
    RateLimit,
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Current price response from BirdEye `/defi/price`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceResponse {
    pub success: bool,
    pub data: Option<PriceData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceData {
    pub value: f64,
    #[serde(default, rename = "updateUnixTime")]
    pub update_unix_time: Option<i64>,
}

/// Historical price response from BirdEye `/defi/history_price`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryPriceResponse {
    pub success: bool,
    pub data: Option<HistoryPriceData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryPriceData {
    #[serde(default)]
    pub items: Vec<HistoryPricePoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryPricePoint {
    #[serde(rename = "unixTime")]
    pub unix_time: i64,
    pub value: f64,
}

/// BirdEye API client for current and historical token prices
#[derive(Debug, Clone)]
pub struct BirdEyeClient {
    config: BirdEyeConfig,
    http_client: Client,
}

impl BirdEyeClient {
    pub fn new(config: BirdEyeConfig) -> Result<Self, BirdEyeError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()?;

        Ok(Self {
            config,
            http_client,
        })
    }

    /// Get the current USD price for a token
    pub async fn get_current_price(&self, token_address: &str) -> Result<Decimal, BirdEyeError> {
        let url = format!("{}/defi/price", self.config.api_base_url);

        debug!(
            "Fetching current price from BirdEye for token: {}",
            token_address
        );

        let response = self
            .http_client
            .get(&url)
            .header("X-API-KEY", &self.config.api_key)
            .header("x-chain", "solana")
            .query(&[("address", token_address)])
            .send()
            .await?;

        if response.status() == 429 {
            return Err(BirdEyeError::RateLimit);
        }

        if !response.status().is_success() {
            return Err(BirdEyeError::Api(format!("HTTP {}", response.status())));
        }

        let price_response: PriceResponse = response.json().await.map_err(|e| {
            BirdEyeError::InvalidResponse(format!("Failed to parse price response: {}", e))
        })?;

        if !price_response.success {
            return Err(BirdEyeError::Api("API returned success=false".to_string()));
        }

        let value = price_response.data.map(|d| d.value).unwrap_or(0.0);
        let price = decimal_from_quote(value);

        debug!(
            "Retrieved current price from BirdEye for token {}: ${}",
            token_address, price
        );
        Ok(price)
    }

    /// Get the highest daily close over the configured lookback window,
    /// used as the all-time-high price
    pub async fn get_ath_price(&self, token_address: &str) -> Result<Decimal, BirdEyeError> {
        let time_to = Utc::now().timestamp();
        let time_from = (Utc::now()
            - ChronoDuration::days(self.config.ath_lookback_days as i64))
        .timestamp();

        let url = format!("{}/defi/history_price", self.config.api_base_url);

        debug!(
            "Fetching {}d price history from BirdEye for token: {}",
            self.config.ath_lookback_days, token_address
        );

        let response = self
            .http_client
            .get(&url)
            .header("X-API-KEY", &self.config.api_key)
            .header("x-chain", "solana")
            .query(&[
                ("address", token_address),
                ("address_type", "token"),
                ("type", "1D"),
                ("time_from", &time_from.to_string()),
                ("time_to", &time_to.to_string()),
            ])
            .send()
            .await?;

        if response.status() == 429 {
            return Err(BirdEyeError::RateLimit);
        }

        if !response.status().is_success() {
            return Err(BirdEyeError::Api(format!("HTTP {}", response.status())));
        }

        let history_response: HistoryPriceResponse = response.json().await.map_err(|e| {
            BirdEyeError::InvalidResponse(format!("Failed to parse history response: {}", e))
        })?;

        if !history_response.success {
            return Err(BirdEyeError::Api("API returned success=false".to_string()));
        }

        let items = history_response
            .data
            .map(|d| d.items)
            .unwrap_or_default();

        if items.is_empty() {
            warn!(
                "BirdEye returned empty price history for token {}",
                token_address
            );
        }

        let ath = items
            .iter()
            .map(|point| decimal_from_quote(point.value))
            .max()
            .unwrap_or(Decimal::ZERO);

        debug!(
            "Derived ATH price from BirdEye for token {} over {} candles: ${}",
            token_address,
            items.len(),
            ath
        );
        Ok(ath)
    }
}

/// Convert an f64 quote to Decimal, treating non-finite or negative
/// values as unavailable
fn decimal_from_quote(value: f64) -> Decimal {
    if !value.is_finite() || value < 0.0 {
        return Decimal::ZERO;
    }
    Decimal::from_f64(value).unwrap_or(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn price_response_parses() {
        let response: PriceResponse = serde_json::from_value(json!({
            "success": true,
            "data": { "value": 0.0000234, "updateUnixTime": 1700000000 }
        }))
        .unwrap();

        assert!(response.success);
        assert_eq!(response.data.unwrap().value, 0.0000234);
    }

    #[test]
    fn history_response_parses_and_ath_is_max() {
        let response: HistoryPriceResponse = serde_json::from_value(json!({
            "success": true,
            "data": {
                "items": [
                    { "unixTime": 1700000000, "value": 1.0 },
                    { "unixTime": 1700086400, "value": 4.5 },
                    { "unixTime": 1700172800, "value": 2.25 }
                ]
            }
        }))
        .unwrap();

        let ath = response
            .data
            .unwrap()
            .items
            .iter()
            .map(|p| decimal_from_quote(p.value))
            .max()
            .unwrap();
        assert_eq!(ath, "4.5".parse().unwrap());
    }

    #[test]
    fn quote_conversion_degrades_bad_floats() {
        assert_eq!(decimal_from_quote(f64::NAN), Decimal::ZERO);
        assert_eq!(decimal_from_quote(f64::INFINITY), Decimal::ZERO);
        assert_eq!(decimal_from_quote(-1.5), Decimal::ZERO);
        assert_eq!(decimal_from_quote(2.5), "2.5".parse().unwrap());
    }

    #[test]
    fn missing_data_yields_zero_price() {
        let response: PriceResponse = serde_json::from_value(json!({
            "success": true,
            "data": null
        }))
        .unwrap();
        let value = response.data.map(|d| d.value).unwrap_or(0.0);
        assert_eq!(decimal_from_quote(value), Decimal::ZERO);
    }
}
