pub mod aggregator;
pub mod analyzer;
pub mod metrics;
pub mod summary;


// Re-export the pipeline entry points
pub use aggregator::TransferAggregator;
pub use analyzer::WalletAnalyzer;
pub use metrics::compute_metrics;
pub use summary::summarize;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("Price resolution error: {0}")]
    PriceResolution(String),
    #[error("Invalid transfer event: {0}")]
    InvalidEvent(String),
    #[error("Calculation error: {0}")]
    Calculation(String),
}

pub type Result<T> = std::result::Result<T, AnalyticsError>;

/// Placeholder used for token identity fields when no provider supplied one.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Direction of a token movement relative to the analyzed wallet.
///
/// The ingestion layer resolves the provider's from/to account fields into
/// this canonical side before events reach the aggregator; the core never
/// re-infers direction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransferSide {
    /// Tokens moved into the analyzed wallet (a buy)
    In,
    /// Tokens moved out of the analyzed wallet (a sell)
    Out,
}

/// Canonical token movement within a transaction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransferEvent {
    /// Token mint address
    pub mint: String,

    /// Token symbol, if the provider reported one
    pub symbol: Option<String>,

    /// Token name, if the provider reported one
    pub name: Option<String>,

    /// Token amount moved (token-native units)
    pub amount: Decimal,

    /// USD price per token at transfer time; zero means unknown
    pub price_usd: Decimal,

    /// Movement direction relative to the analyzed wallet
    pub side: TransferSide,
}

/// One wallet transaction as handed to the aggregator
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WalletTransaction {
    /// Transaction signature, if known
    pub signature: Option<String>,

    /// Transaction timestamp; missing timestamps degrade to "now"
    pub timestamp: Option<DateTime<Utc>>,

    /// Token movements contained in this transaction
    pub transfers: Vec<TransferEvent>,
}

/// Position status for a token, derived purely from totals
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TokenStatus {
    /// Never sold any of the position
    NeverSold,
    /// Sold out completely
    Sold,
    /// Sold some, still holding some
    Partial,
    /// Holding with no other classification
    Held,
}

/// A single recorded transaction leg for a token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeLeg {
    /// Timestamp of the parent transaction
    pub timestamp: DateTime<Utc>,

    /// Buy or sell side
    pub side: TransferSide,

    /// Amount moved (clamped non-negative)
    pub amount: Decimal,

    /// USD price per token (clamped non-negative, zero = unknown)
    pub price_usd: Decimal,
}

/// Running position state for one token, built by folding transfer events
/// in arrival order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenAggregate {
    /// Token mint address
    pub mint: String,

    /// Display symbol (best effort, "Unknown" if never reported)
    pub symbol: String,

    /// Display name (best effort, "Unknown" if never reported)
    pub name: String,

    /// Sum of bought amounts
    pub total_bought: Decimal,

    /// Sum of sold amounts
    pub total_sold: Decimal,

    /// max(0, total_bought - total_sold), set at finalization
    pub current_held: Decimal,

    /// total_bought + total_sold, set at finalization
    pub total_volume_traded: Decimal,

    /// Number of buy transfers with a positive amount
    pub buy_count: u32,

    /// Number of sell transfers with a positive amount
    pub sell_count: u32,

    /// Every transfer event seen for this token, including ones that were
    /// dropped from the totals for having a non-positive amount
    pub total_transactions: u32,

    /// Count of buy transfers that carried a usable (nonzero) price
    pub priced_buy_count: u32,

    /// Count of sell transfers that carried a usable (nonzero) price
    pub priced_sell_count: u32,

    /// Incremental running mean of valid buy prices, in arrival order
    pub avg_buy_price: Decimal,

    /// Incremental running mean of valid sell prices, in arrival order
    pub avg_sell_price: Decimal,

    /// Minimum valid buy price observed; resolved to avg_buy_price at
    /// finalization when no valid price was ever seen
    pub best_buy_price: Option<Decimal>,

    /// Minimum valid sell price observed (the worst individual exit);
    /// resolved to avg_sell_price at finalization when never set
    pub worst_sell_price: Option<Decimal>,

    /// Timestamps of buy transfers, in arrival order
    pub buy_dates: Vec<DateTime<Utc>>,

    /// Timestamps of sell transfers, in arrival order
    pub sell_dates: Vec<DateTime<Utc>>,

    /// Chronologically earliest buy
    pub first_buy_date: Option<DateTime<Utc>>,

    /// Chronologically latest buy
    pub last_buy_date: Option<DateTime<Utc>>,

    /// Chronologically earliest sell
    pub first_sell_date: Option<DateTime<Utc>>,

    /// Chronologically latest sell
    pub last_sell_date: Option<DateTime<Utc>>,

    /// Individual transaction legs, in arrival order
    pub legs: Vec<TradeLeg>,

    /// Position status, assigned at finalization
    pub status: TokenStatus,
}

impl TokenAggregate {
    /// Create an empty aggregate for a newly seen token
    pub fn new(mint: &str, symbol: Option<&str>, name: Option<&str>) -> Self {
        Self {
            mint: mint.to_string(),
            symbol: plausible_label(symbol),
            name: plausible_label(name),
            total_bought: Decimal::ZERO,
            total_sold: Decimal::ZERO,
            current_held: Decimal::ZERO,
            total_volume_traded: Decimal::ZERO,
            buy_count: 0,
            sell_count: 0,
            total_transactions: 0,
            priced_buy_count: 0,
            priced_sell_count: 0,
            avg_buy_price: Decimal::ZERO,
            avg_sell_price: Decimal::ZERO,
            best_buy_price: None,
            worst_sell_price: None,
            buy_dates: Vec::new(),
            sell_dates: Vec::new(),
            first_buy_date: None,
            last_buy_date: None,
            first_sell_date: None,
            last_sell_date: None,
            legs: Vec::new(),
            status: TokenStatus::NeverSold,
        }
    }
}

/// Resolve an optional identity field to a non-empty label
fn plausible_label(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v.to_string(),
        _ => UNKNOWN_LABEL.to_string(),
    }
}

/// Per-token metrics: the aggregate plus everything derived from the
/// externally supplied price snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenMetrics {
    /// The aggregated position this was computed from
    pub token: TokenAggregate,

    /// Current USD price supplied by the price source (0 = unknown)
    pub current_price_usd: Decimal,

    /// All-time-high USD price supplied by the price source (0 = unknown)
    pub ath_price_usd: Decimal,

    /// total_bought * avg_buy_price
    pub total_cost: Decimal,

    /// total_sold * avg_sell_price
    pub actual_proceeds: Decimal,

    /// current_held * current_price
    pub current_value: Decimal,

    /// Realized ROI percentage (unrealized when nothing was ever sold)
    pub roi: Decimal,

    /// Value had every bought token been held to the current price
    pub what_if_current_value: Decimal,

    /// USD left on the table against the current price (0 if never sold)
    pub missed_gains_current: Decimal,

    /// ROI percentage had everything been held to the current price
    pub roi_if_held_current: Decimal,

    /// Value had every bought token been held to the ATH price
    pub what_if_ath_value: Decimal,

    /// USD left on the table against the ATH price (0 if never sold)
    pub missed_gains_ath: Decimal,

    /// ROI percentage had everything been held to the ATH price
    pub roi_if_held_ath: Decimal,

    /// Whole days between first buy and last sell (or now), never negative
    pub time_held_days: i64,

    /// Percentage move from avg buy price to current price
    pub price_change: Decimal,
}

/// Wallet-level aggregates over all per-token metrics
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WalletSummary {
    /// Number of distinct tokens analyzed
    pub token_count: u32,

    /// Number of tokens that were sold out completely
    pub tokens_sold_out: u32,

    /// Sum of total_cost across tokens
    pub total_cost: Decimal,

    /// Sum of actual_proceeds across tokens
    pub total_proceeds: Decimal,

    /// Sum of current_value across tokens
    pub total_current_value: Decimal,

    /// Sum of what_if_current_value across tokens
    pub total_what_if_current_value: Decimal,

    /// Sum of what_if_ath_value across tokens
    pub total_what_if_ath_value: Decimal,

    /// Sum of missed_gains_current across tokens
    pub total_missed_gains_current: Decimal,

    /// Sum of missed_gains_ath across tokens
    pub total_missed_gains_ath: Decimal,

    /// Mean roi across tokens
    pub avg_roi: Decimal,

    /// Mean roi_if_held_current across tokens
    pub avg_roi_if_held: Decimal,

    /// Mean time_held_days across tokens
    pub avg_hold_time_days: Decimal,

    /// Token with the highest roi_if_held_current (first encountered wins)
    pub best_performer: Option<TokenMetrics>,

    /// Token with the lowest roi_if_held_current (first encountered wins)
    pub worst_performer: Option<TokenMetrics>,

    /// Token with the largest missed_gains_current (first encountered wins)
    pub biggest_miss: Option<TokenMetrics>,

    /// Composite 0-100 trading-behavior score; higher = more impulsive exits
    pub jitter_score: u32,
}

/// Full analysis output for one wallet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletReport {
    /// Wallet address analyzed
    pub wallet_address: String,

    /// Per-token metrics in deterministic order (earliest activity, then mint)
    pub tokens: Vec<TokenMetrics>,

    /// Wallet-level summary
    pub summary: WalletSummary,

    /// When this report was generated
    pub generated_at: DateTime<Utc>,
}

/// Two-number price snapshot for one token, as resolved by the injected
/// price source. Zero means the provider could not supply a value.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct TokenPriceQuote {
    /// Current USD price per token
    pub current_price_usd: Decimal,

    /// All-time-high USD price per token
    pub ath_price_usd: Decimal,
}

/// Capability seam for resolving current and ATH prices per token.
///
/// The engine stays a pure function of its inputs; all provider precedence
/// and caching lives behind this trait in the ingestion layer.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Resolve the price snapshot for a token mint
    async fn resolve_price(&self, mint: &str) -> Result<TokenPriceQuote>;
}
