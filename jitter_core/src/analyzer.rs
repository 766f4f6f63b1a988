use chrono::Utc;
use tracing::{debug, info, warn};

use crate::{
    compute_metrics, summarize, PriceSource, Result, TokenAggregate, TokenPriceQuote,
    TransferAggregator, WalletReport, WalletTransaction,
};

/// Wires the three pure stages together: aggregate the transfer stream,
/// resolve a price snapshot per token through the injected source, compute
/// metrics and reduce to a wallet summary.
///
/// All I/O concurrency (provider fan-out, caching) lives behind the
/// `PriceSource` seam; rerunning with identical inputs yields identical
/// outputs apart from `generated_at`.
pub struct WalletAnalyzer<P: PriceSource> {
    price_source: P,
}

impl<P: PriceSource> WalletAnalyzer<P> {
    pub fn new(price_source: P) -> Self {
        Self { price_source }
    }

    /// Analyze a wallet's transaction history into a full report
    pub async fn analyze(
        &self,
        wallet_address: &str,
        transactions: &[WalletTransaction],
    ) -> Result<WalletReport> {
        info!(
            "Analyzing wallet {} with {} transactions",
            wallet_address,
            transactions.len()
        );

        let aggregates = TransferAggregator::aggregate(transactions);

        // Deterministic token order so summary tie-breaking is reproducible
        let mut ordered: Vec<TokenAggregate> = aggregates.into_values().collect();
        ordered.sort_by(|a, b| {
            let a_start = a.legs.first().map(|leg| leg.timestamp);
            let b_start = b.legs.first().map(|leg| leg.timestamp);
            a_start.cmp(&b_start).then_with(|| a.mint.cmp(&b.mint))
        });

        let mut tokens = Vec::with_capacity(ordered.len());
        for aggregate in ordered {
            // A failed price lookup degrades to an all-zero quote; the
            // metrics fallback chains absorb it
            let quote = match self.price_source.resolve_price(&aggregate.mint).await {
                Ok(quote) => quote,
                Err(e) => {
                    warn!(
                        "Price resolution failed for {}, continuing without prices: {}",
                        aggregate.mint, e
                    );
                    TokenPriceQuote::default()
                }
            };

            debug!(
                "Token {} priced at current={}, ath={}",
                aggregate.mint, quote.current_price_usd, quote.ath_price_usd
            );

            tokens.push(compute_metrics(
                aggregate,
                quote.current_price_usd,
                quote.ath_price_usd,
            ));
        }

        let summary = summarize(&tokens);

        info!(
            "Wallet {} analyzed: {} tokens, jitter score {}",
            wallet_address, summary.token_count, summary.jitter_score
        );

        Ok(WalletReport {
            wallet_address: wallet_address.to_string(),
            tokens,
            summary,
            generated_at: Utc::now(),
        })
    }
}
