use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use config_manager::{ConfigurationError, SystemConfig};
use data_client::{BirdEyeClient, DexScreenerClient, HeliusClient, PriceEnricher};
use jitter_core::{AnalyticsError, WalletAnalyzer};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tracing::info;

mod handlers;
mod types;

use handlers::*;
use types::*;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: SystemConfig,
    pub helius: Arc<HeliusClient>,
    pub analyzer: Arc<WalletAnalyzer<PriceEnricher>>,
}

/// Main application error type
#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigurationError),
    #[error("Analytics error: {0}")]
    Analytics(#[from] AnalyticsError),
    #[error("Data provider error: {0}")]
    DataProvider(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            ApiError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
            ApiError::Analytics(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
            ApiError::DataProvider(_) => (StatusCode::BAD_GATEWAY, self.to_string()),
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
        };

        let body = Json(ErrorResponse {
            error: error_message,
            timestamp: chrono::Utc::now(),
        });

        (status, body).into_response()
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,api_server=debug".into()),
        )
        .init();

    info!("Starting JitterHands API Server...");

    // Load configuration
    let config = SystemConfig::load()?;
    info!("Configuration loaded successfully");

    // Wire up the data clients and the analysis pipeline
    let helius = Arc::new(HeliusClient::new(config.helius.clone())?);
    let birdeye = BirdEyeClient::new(config.birdeye.clone())?;
    let dexscreener = DexScreenerClient::new(config.dexscreener.clone())?;
    let analyzer = Arc::new(WalletAnalyzer::new(PriceEnricher::new(birdeye, dexscreener)));
    info!("Data clients and analyzer initialized");

    let app_state = AppState {
        config: config.clone(),
        helius,
        analyzer,
    };

    let app = create_router(app_state);

    info!("Available endpoints:");
    info!("   GET /health - Health check");
    info!("   GET /api/config - Configuration summary");
    info!("   GET /api/v1/wallets/:address/analysis - Full wallet jitter report");
    info!("   GET /api/v1/wallets/:address/summary - Wallet summary only");

    // Bind and serve
    let bind_addr = format!("{}:{}", config.api.host, config.api.port);
    info!("Starting server on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Server listening on {}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/config", get(get_config))
        .route("/api/v1/wallets/:address/analysis", get(analyze_wallet))
        .route("/api/v1/wallets/:address/summary", get(summarize_wallet))
        .layer(
            ServiceBuilder::new()
                .layer(CorsLayer::permissive())
                .into_inner(),
        )
        .with_state(state)
}
