use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Standard API error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub timestamp: DateTime<Utc>,
}

/// Standard API success response
#[derive(Debug, Serialize)]
pub struct SuccessResponse<T> {
    pub data: T,
    pub timestamp: DateTime<Utc>,
}

impl<T> SuccessResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            timestamp: Utc::now(),
        }
    }
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Configuration summary (safe subset for API responses)
#[derive(Debug, Serialize)]
pub struct ConfigSummary {
    pub helius_api_configured: bool,
    pub birdeye_api_configured: bool,
    pub dexscreener_enabled: bool,
    pub default_max_transactions: u32,
}

/// Query parameters for wallet analysis
#[derive(Debug, Deserialize)]
pub struct AnalysisQuery {
    /// Maximum number of transactions to fetch; defaults to the configured
    /// system-wide limit
    #[serde(alias = "max_transactions")]
    pub limit: Option<u32>,
}
