pub mod birdeye_client;
pub mod dexscreener_client;
pub mod helius_client;
pub mod normalizer;
pub mod price_enricher;

pub use birdeye_client::{BirdEyeClient, BirdEyeError};
pub use dexscreener_client::{DexScreenerClient, DexScreenerError};
pub use helius_client::{HeliusClient, HeliusError, RawTokenTransfer, RawTransaction};
pub use normalizer::TransactionNormalizer;
pub use price_enricher::PriceEnricher;
