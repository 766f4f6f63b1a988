use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Configuration loading error: {0}")]
    ConfigLoad(#[from] ConfigError),
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

pub type Result<T> = std::result::Result<T, ConfigurationError>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    /// General system settings
    pub system: SystemSettings,

    /// Helius API configuration (wallet transaction history)
    pub helius: HeliusConfig,

    /// BirdEye API configuration (current and historical prices)
    pub birdeye: BirdEyeConfig,

    /// DexScreener API configuration (keyless price fallback)
    pub dexscreener: DexScreenerConfig,

    /// API server configuration
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemSettings {
    /// Enable debug mode
    pub debug_mode: bool,

    /// Default maximum transactions fetched per wallet analysis
    pub default_max_transactions: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeliusConfig {
    /// Helius API key
    pub api_key: String,

    /// Helius enhanced-transactions API base URL
    pub api_base_url: String,

    /// Request timeout in seconds
    pub request_timeout_seconds: u64,

    /// Page size for transaction history requests (Helius caps at 100)
    pub page_size: u32,

    /// Maximum retry attempts for failed requests
    pub max_retry_attempts: u32,

    /// Base delay between retries in milliseconds
    pub rate_limit_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BirdEyeConfig {
    /// BirdEye API key
    pub api_key: String,

    /// BirdEye API base URL
    pub api_base_url: String,

    /// Request timeout in seconds
    pub request_timeout_seconds: u64,

    /// History window in days used when deriving the all-time-high price
    pub ath_lookback_days: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DexScreenerConfig {
    /// DexScreener API base URL
    pub api_base_url: String,

    /// Request timeout in seconds
    pub request_timeout_seconds: u64,

    /// Enable DexScreener as a price fallback
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API server host
    pub host: String,

    /// API server port
    pub port: u16,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            system: SystemSettings {
                debug_mode: false,
                default_max_transactions: 500,
            },
            helius: HeliusConfig {
                api_key: "".to_string(), // Must be set in .env or config file
                api_base_url: "https://api.helius.xyz".to_string(),
                request_timeout_seconds: 30,
                page_size: 100,
                max_retry_attempts: 3,
                rate_limit_ms: 500,
            },
            birdeye: BirdEyeConfig {
                api_key: "".to_string(), // Must be set in .env or config file
                api_base_url: "https://public-api.birdeye.so".to_string(),
                request_timeout_seconds: 30,
                ath_lookback_days: 365,
            },
            dexscreener: DexScreenerConfig {
                api_base_url: "https://api.dexscreener.com".to_string(),
                request_timeout_seconds: 30,
                enabled: true,
            },
            api: ApiConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
        }
    }
}

impl HeliusConfig {
    /// Validate Helius configuration
    pub fn validate(&self) -> Result<()> {
        if self.api_key.is_empty() {
            return Err(ConfigurationError::InvalidValue(
                "Helius API key is required".to_string(),
            ));
        }

        if self.request_timeout_seconds == 0 {
            return Err(ConfigurationError::InvalidValue(
                "Request timeout must be greater than 0".to_string(),
            ));
        }

        if self.page_size == 0 || self.page_size > 100 {
            return Err(ConfigurationError::InvalidValue(
                "Helius page size must be between 1 and 100".to_string(),
            ));
        }

        Ok(())
    }
}

impl BirdEyeConfig {
    /// Validate BirdEye configuration
    pub fn validate(&self) -> Result<()> {
        if self.api_key.is_empty() {
            return Err(ConfigurationError::InvalidValue(
                "BirdEye API key is required".to_string(),
            ));
        }

        if self.request_timeout_seconds == 0 {
            return Err(ConfigurationError::InvalidValue(
                "Request timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl SystemConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path("config.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let mut config_builder = Config::builder()
            // Start with defaults
            .add_source(Config::try_from(&SystemConfig::default())?);

        // Add config file if it exists
        if config_path.as_ref().exists() {
            info!(
                "Loading configuration from: {}",
                config_path.as_ref().display()
            );
            config_builder = config_builder.add_source(File::from(config_path.as_ref()));
        } else {
            debug!("Config file not found, using defaults and environment variables");
        }

        // Add environment variables with prefix, e.g. JITTER__HELIUS__API_KEY
        config_builder = config_builder.add_source(
            Environment::with_prefix("JITTER")
                .try_parsing(true)
                .separator("__")
                .list_separator(","),
        );

        let config = config_builder.build()?;
        let system_config: SystemConfig = config.try_deserialize()?;

        system_config.validate()?;

        Ok(system_config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        self.helius.validate()?;
        self.birdeye.validate()?;

        if self.api.port == 0 {
            return Err(ConfigurationError::InvalidValue(
                "API port cannot be 0".to_string(),
            ));
        }

        if self.system.default_max_transactions == 0 {
            return Err(ConfigurationError::InvalidValue(
                "default_max_transactions cannot be 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Get configuration as a JSON value for API responses
    pub fn to_json_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Configuration manager for loading and managing system configuration
#[derive(Debug)]
pub struct ConfigManager {
    config: SystemConfig,
}

impl ConfigManager {
    /// Create a new configuration manager
    pub fn new() -> Result<Self> {
        let config = SystemConfig::load()?;
        info!("Configuration loaded successfully");
        debug!("Configuration: {:#?}", config);

        Ok(Self { config })
    }

    /// Create configuration manager from a specific file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = SystemConfig::load_from_path(path)?;
        Ok(Self { config })
    }

    /// Get a reference to the current configuration
    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    /// Reload configuration from file and environment
    pub fn reload(&mut self) -> Result<()> {
        self.config = SystemConfig::load()?;
        info!("Configuration reloaded");
        Ok(())
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new().unwrap_or_else(|_| Self {
            config: SystemConfig::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_every_section() {
        let config = SystemConfig::default();
        assert_eq!(config.api.port, 8080);
        assert_eq!(config.helius.page_size, 100);
        assert!(config.dexscreener.enabled);
        assert_eq!(config.system.default_max_transactions, 500);
    }

    #[test]
    fn validation_rejects_missing_api_keys() {
        // Default keys are empty, so validation must fail
        let config = SystemConfig::default();
        assert!(config.validate().is_err());

        let mut config = SystemConfig::default();
        config.helius.api_key = "helius-key".to_string();
        config.birdeye.api_key = "birdeye-key".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validation_rejects_out_of_range_page_size() {
        let mut config = SystemConfig::default();
        config.helius.api_key = "helius-key".to_string();
        config.birdeye.api_key = "birdeye-key".to_string();
        config.helius.page_size = 250;
        assert!(config.validate().is_err());
    }
}
