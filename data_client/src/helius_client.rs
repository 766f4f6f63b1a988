use config_manager::HeliusConfig;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tokio::time;
use tracing::{debug, error, info, warn};

#[derive(Error, Debug)]
pub enum HeliusError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    #[error("JSON parsing failed: {0}")]
    JsonParsingFailed(#[from] serde_json::Error),
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },
    #[error("Rate limit exceeded, retry after: {retry_after_ms}ms")]
    RateLimitExceeded { retry_after_ms: u64 },
    #[error("Invalid wallet address: {0}")]
    InvalidWalletAddress(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

pub type Result<T> = std::result::Result<T, HeliusError>;

/// Raw enhanced transaction as returned by the Helius
/// `/v0/addresses/{address}/transactions` endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTransaction {
    /// Transaction signature
    pub signature: Option<String>,

    /// Block time as Unix seconds
    pub timestamp: Option<i64>,

    /// Parsed token movements within the transaction
    #[serde(default, rename = "tokenTransfers")]
    pub token_transfers: Vec<RawTokenTransfer>,

    /// Helius transaction classification (SWAP, TRANSFER, ...)
    #[serde(default, rename = "type")]
    pub transaction_type: Option<String>,

    /// Originating program/source label
    #[serde(default)]
    pub source: Option<String>,
}

/// Raw token transfer payload.
///
/// Field names are not stable across providers and API versions
/// (`fromUserAccount` vs `from`, `priceUsd` vs `usdValue`), so every field
/// is optional and aliased; the normalizer resolves them into the canonical
/// shape.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RawTokenTransfer {
    /// Token mint address
    #[serde(default)]
    pub mint: Option<String>,

    /// Token symbol, when the provider includes metadata
    #[serde(default, rename = "tokenSymbol", alias = "symbol")]
    pub token_symbol: Option<String>,

    /// Token name, when the provider includes metadata
    #[serde(default, rename = "tokenName", alias = "name")]
    pub token_name: Option<String>,

    /// Wallet the tokens moved out of
    #[serde(default, rename = "fromUserAccount", alias = "from")]
    pub from_user_account: Option<String>,

    /// Wallet the tokens moved into
    #[serde(default, rename = "toUserAccount", alias = "to")]
    pub to_user_account: Option<String>,

    /// Token amount in UI units; number or numeric string depending on
    /// provider
    #[serde(default, rename = "tokenAmount", alias = "amount")]
    pub token_amount: Option<Value>,

    /// USD price per token at transfer time, when known
    #[serde(default, rename = "priceUsd", alias = "price_usd")]
    pub price_usd: Option<Value>,

    /// Total USD value of the transfer, when known
    #[serde(default, rename = "usdValue", alias = "usd_value")]
    pub usd_value: Option<Value>,
}

/// Helius API client for fetching enhanced transaction history
#[derive(Debug, Clone)]
pub struct HeliusClient {
    /// HTTP client for making requests
    http_client: Client,

    /// Helius API configuration
    config: HeliusConfig,
}

impl HeliusClient {
    /// Create a new Helius client with the given configuration
    pub fn new(config: HeliusConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(HeliusError::ConfigError(
                "Helius API key is required".to_string(),
            ));
        }

        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .user_agent("jitterhands/1.0")
            .build()
            .map_err(|e| HeliusError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            config,
        })
    }

    /// Fetch up to `max_transactions` enhanced transactions for a wallet,
    /// newest first, following the `before` signature cursor across pages
    pub async fn get_wallet_transactions(
        &self,
        wallet_address: &str,
        max_transactions: u32,
    ) -> Result<Vec<RawTransaction>> {
        validate_wallet_address(wallet_address)?;

        let mut transactions: Vec<RawTransaction> = Vec::new();
        let mut before_signature: Option<String> = None;

        info!(
            "Fetching up to {} transactions for wallet {}",
            max_transactions, wallet_address
        );

        while (transactions.len() as u32) < max_transactions {
            let remaining = max_transactions - transactions.len() as u32;
            let page_size = self.config.page_size.min(remaining);

            let url = format!(
                "{}/v0/addresses/{}/transactions",
                self.config.api_base_url.trim_end_matches('/'),
                wallet_address
            );

            let mut request = self
                .http_client
                .get(&url)
                .query(&[("api-key", self.config.api_key.as_str())])
                .query(&[("limit", page_size)]);

            if let Some(ref cursor) = before_signature {
                request = request.query(&[("before", cursor.as_str())]);
            }

            let response = self.make_request(request).await?;
            let page: Vec<RawTransaction> = response.json().await?;

            debug!(
                "Fetched page of {} transactions for wallet {} (total so far: {})",
                page.len(),
                wallet_address,
                transactions.len() + page.len()
            );

            if page.is_empty() {
                break;
            }

            before_signature = page.iter().rev().find_map(|tx| tx.signature.clone());
            let page_len = page.len() as u32;
            transactions.extend(page);

            // A short page means the history is exhausted
            if page_len < page_size || before_signature.is_none() {
                break;
            }
        }

        transactions.truncate(max_transactions as usize);

        info!(
            "Fetched {} transactions for wallet {}",
            transactions.len(),
            wallet_address
        );

        Ok(transactions)
    }

    /// Make a rate-limited HTTP request with bounded retry and backoff
    async fn make_request(&self, request_builder: RequestBuilder) -> Result<reqwest::Response> {
        let mut attempt = 0;
        let max_attempts = self.config.max_retry_attempts;

        loop {
            attempt += 1;

            let request = request_builder
                .try_clone()
                .ok_or_else(|| HeliusError::ConfigError("Failed to clone request".to_string()))?
                .build()
                .map_err(HeliusError::RequestFailed)?;

            debug!(
                "Making Helius API request (attempt {}/{}): {}",
                attempt,
                max_attempts,
                request.url()
            );

            match self.http_client.execute(request).await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        return Ok(response);
                    } else if status.as_u16() == 429 {
                        let retry_after_ms = self.config.rate_limit_ms * 2u64.pow(attempt);
                        warn!(
                            "Helius rate limit exceeded, retrying after {}ms",
                            retry_after_ms
                        );

                        if attempt >= max_attempts {
                            return Err(HeliusError::RateLimitExceeded { retry_after_ms });
                        }

                        time::sleep(Duration::from_millis(retry_after_ms)).await;
                        continue;
                    } else {
                        let error_text = response
                            .text()
                            .await
                            .unwrap_or_else(|_| "Unknown error".to_string());
                        error!("Helius API error: {} - {}", status, error_text);

                        if attempt >= max_attempts || status.is_client_error() {
                            return Err(HeliusError::ApiError {
                                status: status.as_u16(),
                                message: error_text,
                            });
                        }

                        let delay_ms = self.config.rate_limit_ms * attempt as u64;
                        time::sleep(Duration::from_millis(delay_ms)).await;
                        continue;
                    }
                }
                Err(e) => {
                    error!("Helius API request failed: {}", e);

                    if attempt >= max_attempts {
                        return Err(HeliusError::RequestFailed(e));
                    }

                    let delay_ms = self.config.rate_limit_ms * attempt as u64;
                    time::sleep(Duration::from_millis(delay_ms)).await;
                }
            }
        }
    }
}

/// Sanity-check a Solana address: base58 alphabet, plausible length
pub fn validate_wallet_address(address: &str) -> Result<()> {
    let valid_length = (32..=44).contains(&address.len());
    let valid_charset = address
        .chars()
        .all(|c| c.is_ascii_alphanumeric() && !matches!(c, '0' | 'O' | 'I' | 'l'));

    if valid_length && valid_charset {
        Ok(())
    } else {
        Err(HeliusError::InvalidWalletAddress(address.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wallet_address_validation() {
        assert!(validate_wallet_address("DYw8jCTfwHNRJhhmFcbXvVDTqWMEVFBX6ZKUmG5CNSKK").is_ok());
        assert!(validate_wallet_address("short").is_err());
        assert!(validate_wallet_address("0000000000000000000000000000000000000000").is_err());
        assert!(validate_wallet_address("").is_err());
    }

    #[test]
    fn raw_transaction_parses_helius_shape() {
        let raw: RawTransaction = serde_json::from_value(json!({
            "signature": "5KtP3...",
            "timestamp": 1700000000,
            "type": "SWAP",
            "source": "JUPITER",
            "tokenTransfers": [{
                "mint": "DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263",
                "fromUserAccount": "walletA",
                "toUserAccount": "walletB",
                "tokenAmount": 1234.5,
                "priceUsd": 0.000012
            }]
        }))
        .unwrap();

        assert_eq!(raw.timestamp, Some(1700000000));
        assert_eq!(raw.token_transfers.len(), 1);
        let transfer = &raw.token_transfers[0];
        assert_eq!(transfer.from_user_account.as_deref(), Some("walletA"));
        assert!(transfer.price_usd.is_some());
    }

    #[test]
    fn raw_transfer_accepts_alternate_field_names() {
        let transfer: RawTokenTransfer = serde_json::from_value(json!({
            "mint": "mint",
            "from": "walletA",
            "to": "walletB",
            "amount": "42.5",
            "usd_value": 85.0
        }))
        .unwrap();

        assert_eq!(transfer.from_user_account.as_deref(), Some("walletA"));
        assert_eq!(transfer.to_user_account.as_deref(), Some("walletB"));
        assert!(transfer.token_amount.is_some());
        assert!(transfer.usd_value.is_some());
    }

    #[test]
    fn missing_fields_default_to_none() {
        let transfer: RawTokenTransfer = serde_json::from_value(json!({})).unwrap();
        assert!(transfer.mint.is_none());
        assert!(transfer.token_amount.is_none());
    }

    #[test]
    fn client_requires_api_key() {
        let config = HeliusConfig {
            api_key: "".to_string(),
            api_base_url: "https://api.helius.xyz".to_string(),
            request_timeout_seconds: 30,
            page_size: 100,
            max_retry_attempts: 3,
            rate_limit_ms: 500,
        };
        assert!(HeliusClient::new(config).is_err());
    }
}
