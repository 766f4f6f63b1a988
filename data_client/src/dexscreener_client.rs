use config_manager::DexScreenerConfig;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum DexScreenerError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },
    #[error("No data available")]
    NoDataAvailable,
}

/// Response from `/latest/dex/tokens/{mint}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPairsResponse {
    #[serde(default)]
    pub pairs: Option<Vec<DexPair>>,
}

/// A single trading pair as DexScreener reports it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DexPair {
    #[serde(rename = "chainId")]
    pub chain_id: String,
    #[serde(default, rename = "pairAddress")]
    pub pair_address: Option<String>,
    /// Price is reported as a decimal string
    #[serde(default, rename = "priceUsd")]
    pub price_usd: Option<String>,
    #[serde(default)]
    pub liquidity: Option<PairLiquidity>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairLiquidity {
    #[serde(default)]
    pub usd: Option<f64>,
}

/// Keyless DexScreener client, used as a price fallback when BirdEye has
/// no quote for a token
pub struct DexScreenerClient {
    client: Client,
    config: DexScreenerConfig,
}

impl DexScreenerClient {
    pub fn new(config: DexScreenerConfig) -> Result<Self, DexScreenerError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()?;

        Ok(Self { client, config })
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Get the current USD price for a token from its deepest Solana pair
    pub async fn get_current_price(&self, mint: &str) -> Result<Decimal, DexScreenerError> {
        if !self.config.enabled {
            return Ok(Decimal::ZERO);
        }

        let url = format!(
            "{}/latest/dex/tokens/{}",
            self.config.api_base_url.trim_end_matches('/'),
            mint
        );
        debug!("Fetching token pairs from DexScreener: {}", url);

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(DexScreenerError::ApiError { status, message });
        }

        let pairs_response: TokenPairsResponse = response.json().await?;
        let pairs = pairs_response.pairs.unwrap_or_default();

        if pairs.is_empty() {
            warn!("DexScreener has no pairs for token {}", mint);
            return Err(DexScreenerError::NoDataAvailable);
        }

        let price = best_pair_price(&pairs);

        debug!(
            "Retrieved price from DexScreener for token {} across {} pairs: ${}",
            mint,
            pairs.len(),
            price
        );
        Ok(price)
    }
}

/// Pick the price from the Solana pair with the deepest USD liquidity;
/// unparseable prices count as zero
fn best_pair_price(pairs: &[DexPair]) -> Decimal {
    pairs
        .iter()
        .filter(|pair| pair.chain_id == "solana")
        .max_by(|a, b| {
            let liquidity_a = a.liquidity.as_ref().and_then(|l| l.usd).unwrap_or(0.0);
            let liquidity_b = b.liquidity.as_ref().and_then(|l| l.usd).unwrap_or(0.0);
            liquidity_a
                .partial_cmp(&liquidity_b)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .and_then(|pair| pair.price_usd.as_deref())
        .and_then(|price| price.parse::<Decimal>().ok())
        .filter(|price| *price > Decimal::ZERO)
        .unwrap_or(Decimal::ZERO)
}
