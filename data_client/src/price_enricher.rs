use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::birdeye_client::BirdEyeClient;
use crate::dexscreener_client::DexScreenerClient;
use jitter_core::{PriceSource, Result as CoreResult, TokenPriceQuote};

/// Price resolution layer combining BirdEye and DexScreener.
///
/// BirdEye is authoritative for both current and all-time-high prices;
/// DexScreener fills in the current price when BirdEye has no quote.
/// Provider failures never propagate: a token that cannot be priced
/// resolves to a zero quote so the analysis can continue.
pub struct PriceEnricher {
    birdeye: BirdEyeClient,
    dexscreener: DexScreenerClient,
    cache: Arc<Mutex<HashMap<String, TokenPriceQuote>>>,
}

impl PriceEnricher {
    pub fn new(birdeye: BirdEyeClient, dexscreener: DexScreenerClient) -> Self {
        Self {
            birdeye,
            dexscreener,
            cache: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    async fn fetch_current_price(&self, mint: &str) -> Decimal {
        match self.birdeye.get_current_price(mint).await {
            Ok(price) if price > Decimal::ZERO => return price,
            Ok(_) => {
                debug!("BirdEye returned zero price for token {}", mint);
            }
            Err(e) => {
                warn!("BirdEye current price lookup failed for {}: {}", mint, e);
            }
        }

        if !self.dexscreener.is_enabled() {
            return Decimal::ZERO;
        }

        match self.dexscreener.get_current_price(mint).await {
            Ok(price) => price,
            Err(e) => {
                warn!(
                    "DexScreener fallback price lookup failed for {}: {}",
                    mint, e
                );
                Decimal::ZERO
            }
        }
    }

    async fn fetch_ath_price(&self, mint: &str) -> Decimal {
        match self.birdeye.get_ath_price(mint).await {
            Ok(price) => price,
            Err(e) => {
                warn!("BirdEye ATH lookup failed for {}: {}", mint, e);
                Decimal::ZERO
            }
        }
    }
}

#[async_trait]
impl PriceSource for PriceEnricher {
    async fn resolve_price(&self, mint: &str) -> CoreResult<TokenPriceQuote> {
        {
            let cache = self.cache.lock().await;
            if let Some(quote) = cache.get(mint) {
                debug!("Price cache hit for token {}", mint);
                return Ok(*quote);
            }
        }

        let current_price_usd = self.fetch_current_price(mint).await;
        let ath_price_usd = self.fetch_ath_price(mint).await;

        let quote = TokenPriceQuote {
            current_price_usd,
            ath_price_usd,
        };

        debug!(
            "Resolved prices for token {}: current=${} ath=${}",
            mint, quote.current_price_usd, quote.ath_price_usd
        );

        let mut cache = self.cache.lock().await;
        cache.insert(mint.to_string(), quote);

        Ok(quote)
    }
}
