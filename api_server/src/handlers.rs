use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Json},
};
use data_client::{helius_client, TransactionNormalizer};
use jitter_core::{WalletReport, WalletSummary};
use tracing::info;

use crate::types::*;
use crate::{ApiError, AppState};

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Get a safe configuration summary
pub async fn get_config(State(state): State<AppState>) -> impl IntoResponse {
    Json(SuccessResponse::new(ConfigSummary {
        helius_api_configured: !state.config.helius.api_key.is_empty(),
        birdeye_api_configured: !state.config.birdeye.api_key.is_empty(),
        dexscreener_enabled: state.config.dexscreener.enabled,
        default_max_transactions: state.config.system.default_max_transactions,
    }))
}

/// Analyze a wallet: fetch its transaction history, aggregate transfers,
/// price each token and return the full report with the jitter score
pub async fn analyze_wallet(
    State(state): State<AppState>,
    Path(wallet_address): Path<String>,
    Query(query): Query<AnalysisQuery>,
) -> Result<Json<SuccessResponse<WalletReport>>, ApiError> {
    let report = run_analysis(&state, &wallet_address, query.limit).await?;
    Ok(Json(SuccessResponse::new(report)))
}

/// Like `analyze_wallet` but returns only the wallet-level summary
pub async fn summarize_wallet(
    State(state): State<AppState>,
    Path(wallet_address): Path<String>,
    Query(query): Query<AnalysisQuery>,
) -> Result<Json<SuccessResponse<WalletSummary>>, ApiError> {
    let report = run_analysis(&state, &wallet_address, query.limit).await?;
    Ok(Json(SuccessResponse::new(report.summary)))
}

async fn run_analysis(
    state: &AppState,
    wallet_address: &str,
    limit: Option<u32>,
) -> Result<WalletReport, ApiError> {
    helius_client::validate_wallet_address(wallet_address)
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let max_transactions = limit.unwrap_or(state.config.system.default_max_transactions);

    info!(
        "Analysis requested for wallet {} (max {} transactions)",
        wallet_address, max_transactions
    );

    let raw_transactions = state
        .helius
        .get_wallet_transactions(wallet_address, max_transactions)
        .await
        .map_err(|e| ApiError::DataProvider(e.to_string()))?;

    let normalizer = TransactionNormalizer::new(wallet_address);
    let transactions = normalizer.normalize(&raw_transactions);

    let report = state.analyzer.analyze(wallet_address, &transactions).await?;

    Ok(report)
}
