use anyhow::{bail, Context, Result};
use config_manager::SystemConfig;
use data_client::{BirdEyeClient, DexScreenerClient, HeliusClient, PriceEnricher, TransactionNormalizer};
use jitter_core::WalletAnalyzer;
use tracing::info;

/// One-shot wallet analysis from the command line.
///
/// Usage: jitterhands <wallet-address> [max-transactions]
///
/// Prints the full report as JSON to stdout. For the HTTP interface, run
/// `cargo run -p api_server` instead.
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let wallet_address = match args.next() {
        Some(address) => address,
        None => {
            eprintln!("Usage: jitterhands <wallet-address> [max-transactions]");
            bail!("missing wallet address");
        }
    };

    let config = SystemConfig::load().context("failed to load configuration")?;

    let max_transactions = match args.next() {
        Some(raw) => raw
            .parse::<u32>()
            .context("max-transactions must be a positive integer")?,
        None => config.system.default_max_transactions,
    };

    info!(
        "Analyzing wallet {} (up to {} transactions)",
        wallet_address, max_transactions
    );

    let helius = HeliusClient::new(config.helius.clone())?;
    let birdeye = BirdEyeClient::new(config.birdeye.clone())?;
    let dexscreener = DexScreenerClient::new(config.dexscreener.clone())?;
    let analyzer = WalletAnalyzer::new(PriceEnricher::new(birdeye, dexscreener));

    let raw_transactions = helius
        .get_wallet_transactions(&wallet_address, max_transactions)
        .await
        .context("failed to fetch transaction history")?;

    let normalizer = TransactionNormalizer::new(&wallet_address);
    let transactions = normalizer.normalize(&raw_transactions);

    let report = analyzer.analyze(&wallet_address, &transactions).await?;

    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
