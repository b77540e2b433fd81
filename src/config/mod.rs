//! Configuration management for Loanee
//!
//! This module handles loading and validating configuration from environment variables,
//! with support for different environments (development, staging, production).
//! Lending parameters, the price feed and the chain verifier each get their own section
//! so the composition root can pick adapter variants once at startup.

use rust_decimal::Decimal;
use std::collections::HashMap;
use std::env;
use std::str::FromStr;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid environment value: {0}")]
    InvalidValue(String),

    #[error("Invalid port number: {0}")]
    InvalidPort(String),
}

/// Application environment
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    /// Parse environment from string
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        match s.to_lowercase().as_str() {
            "dev" | "development" => Ok(Environment::Development),
            "staging" => Ok(Environment::Staging),
            "prod" | "production" => Ok(Environment::Production),
            _ => Err(ConfigError::InvalidValue(format!(
                "Invalid environment: '{}'. Expected: dev, staging, or prod",
                s
            ))),
        }
    }

    /// Check if this is a production environment
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    /// Get the environment name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

/// Where entities are persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

/// Lending parameters shared by the collateral ledger and the loan engine
#[derive(Debug, Clone)]
pub struct LoanConfig {
    /// Loan-to-value ratio applied to new collateral, in (0, 1]
    pub default_ltv: Decimal,

    /// Annualized interest rate in percent (12 means 12% APR)
    pub default_interest_rate: Decimal,

    /// Term assigned to auto-originated loans
    pub duration_months: i32,

    /// Days between repayment due dates
    pub repayment_frequency_days: i64,

    /// Days after a due date before late penalties start accruing
    pub grace_period_days: i64,

    /// Annualized late penalty rate in percent
    pub penalty_apr: Decimal,

    /// Days a delinquent loan may stay past due (plus grace) before it is defaulted
    pub default_after_days: i64,

    /// How often the default detector scans delinquent loans
    pub default_check_interval_secs: u64,
}

impl Default for LoanConfig {
    fn default() -> Self {
        Self {
            default_ltv: Decimal::new(65, 2),
            default_interest_rate: Decimal::from(12),
            duration_months: 12,
            repayment_frequency_days: 30,
            grace_period_days: 3,
            penalty_apr: Decimal::from(24),
            default_after_days: 90,
            default_check_interval_secs: 3600,
        }
    }
}

impl LoanConfig {
    /// Reject parameter combinations the ledger cannot price against
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_ltv <= Decimal::ZERO || self.default_ltv > Decimal::ONE {
            return Err(ConfigError::InvalidValue(format!(
                "DEFAULT_LTV must be in (0, 1], got {}",
                self.default_ltv
            )));
        }
        if self.default_interest_rate < Decimal::ZERO || self.penalty_apr < Decimal::ZERO {
            return Err(ConfigError::InvalidValue(
                "interest and penalty rates must not be negative".to_string(),
            ));
        }
        if self.repayment_frequency_days <= 0 {
            return Err(ConfigError::InvalidValue(
                "REPAYMENT_FREQUENCY_DAYS must be positive".to_string(),
            ));
        }
        if self.grace_period_days < 0 || self.default_after_days < 0 {
            return Err(ConfigError::InvalidValue(
                "GRACE_PERIOD_DAYS and DEFAULT_AFTER_DAYS must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Which price feed implementation to wire in
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PriceProvider {
    CoinGecko,
    Fixed,
}

/// Price feed settings
#[derive(Debug, Clone)]
pub struct PricingConfig {
    pub provider: PriceProvider,

    /// CoinGecko REST base URL
    pub coingecko_base_url: String,

    /// Optional pro API key sent as `x-cg-pro-api-key`
    pub coingecko_api_key: Option<String>,

    /// Minimum spacing between outbound price requests
    pub min_interval_secs: u64,

    /// Static quotes used by the fixed provider (symbol -> price)
    pub fixed_prices: HashMap<String, Decimal>,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            provider: PriceProvider::CoinGecko,
            coingecko_base_url: "https://api.coingecko.com/api/v3".to_string(),
            coingecko_api_key: None,
            min_interval_secs: 6,
            fixed_prices: HashMap::new(),
        }
    }
}

/// Which transaction verifier implementation to wire in
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifierMode {
    Noop,
    Ethereum,
}

/// Chain verification settings
#[derive(Debug, Clone)]
pub struct BlockchainConfig {
    pub verifier: VerifierMode,

    /// Ethereum JSON-RPC endpoint
    pub eth_rpc_url: String,

    /// Blocks that must be mined on top of a transaction before it counts
    pub min_confirmations: u64,
}

impl Default for BlockchainConfig {
    fn default() -> Self {
        Self {
            verifier: VerifierMode::Noop,
            eth_rpc_url: "http://localhost:8545".to_string(),
            min_confirmations: 12,
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection URL (required for the Postgres backend)
    pub database_url: String,

    /// Persistence backend
    pub storage: StorageBackend,

    /// Current environment
    pub environment: Environment,

    /// Server port
    pub port: u16,

    /// Maximum database connections
    pub db_max_connections: u32,

    /// Rate limit: requests per second per client
    pub rate_limit_rps: u32,

    /// CORS allowed origins
    pub cors_allowed_origins: Option<String>,

    /// Log level (RUST_LOG)
    pub log_level: String,

    /// Upper bound for a single HTTP request
    pub request_timeout_secs: u64,

    pub loan: LoanConfig,
    pub pricing: PricingConfig,
    pub blockchain: BlockchainConfig,
}

/// In-memory development settings, used by tests and local runs
impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            storage: StorageBackend::Memory,
            environment: Environment::Development,
            port: 3001,
            db_max_connections: 5,
            rate_limit_rps: 100,
            cors_allowed_origins: None,
            log_level: "info".to_string(),
            request_timeout_secs: 10,
            loan: LoanConfig::default(),
            pricing: PricingConfig::default(),
            blockchain: BlockchainConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors)
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .map(|s| Environment::parse(&s))
            .unwrap_or(Ok(Environment::Development))?;

        let storage = match env::var("STORAGE")
            .unwrap_or_else(|_| "postgres".to_string())
            .to_lowercase()
            .as_str()
        {
            "postgres" | "pg" => StorageBackend::Postgres,
            "memory" | "mem" => StorageBackend::Memory,
            other => {
                return Err(ConfigError::InvalidValue(format!(
                    "Invalid STORAGE: '{}'. Expected: postgres or memory",
                    other
                )))
            }
        };

        let database_url = match (env::var("DATABASE_URL"), storage) {
            (Ok(url), _) => url,
            (Err(_), StorageBackend::Memory) => String::new(),
            (Err(_), StorageBackend::Postgres) => {
                return Err(ConfigError::MissingEnvVar("DATABASE_URL".to_string()))
            }
        };

        let port = env::var("PORT")
            .unwrap_or_else(|_| "3001".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort("PORT must be a valid number".to_string()))?;

        let db_max_connections = env::var("DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "5".to_string())
            .parse::<u32>()
            .unwrap_or(5);

        let rate_limit_rps = env::var("RATE_LIMIT_RPS")
            .unwrap_or_else(|_| "100".to_string())
            .parse::<u32>()
            .unwrap_or(100);

        let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS").ok();

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let request_timeout_secs = parse_var("REQUEST_TIMEOUT_SECS", 10u64)?;

        let loan = LoanConfig::from_env()?;
        let pricing = PricingConfig::from_env()?;
        let blockchain = BlockchainConfig::from_env()?;

        Ok(Config {
            database_url,
            storage,
            environment,
            port,
            db_max_connections,
            rate_limit_rps,
            cors_allowed_origins,
            log_level,
            request_timeout_secs,
            loan,
            pricing,
            blockchain,
        })
    }

    /// Get database URL (useful for logging masked version)
    pub fn database_url_masked(&self) -> String {
        // Mask password in database URL for logging
        if let Some(at_pos) = self.database_url.find('@') {
            if let Some(colon_pos) = self.database_url[..at_pos].rfind(':') {
                let prefix = &self.database_url[..colon_pos + 1];
                let suffix = &self.database_url[at_pos..];
                return format!("{}****{}", prefix, suffix);
            }
        }
        self.database_url.clone()
    }
}

impl LoanConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = LoanConfig::default();
        let config = LoanConfig {
            default_ltv: parse_var("DEFAULT_LTV", defaults.default_ltv)?,
            default_interest_rate: parse_var(
                "DEFAULT_INTEREST_RATE",
                defaults.default_interest_rate,
            )?,
            duration_months: parse_var("LOAN_DURATION_MONTHS", defaults.duration_months)?,
            repayment_frequency_days: parse_var(
                "REPAYMENT_FREQUENCY_DAYS",
                defaults.repayment_frequency_days,
            )?,
            grace_period_days: parse_var("GRACE_PERIOD_DAYS", defaults.grace_period_days)?,
            penalty_apr: parse_var("PENALTY_APR", defaults.penalty_apr)?,
            default_after_days: parse_var("DEFAULT_AFTER_DAYS", defaults.default_after_days)?,
            default_check_interval_secs: parse_var(
                "DEFAULT_CHECK_INTERVAL_SECS",
                defaults.default_check_interval_secs,
            )?,
        };
        config.validate()?;
        Ok(config)
    }
}

impl PricingConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = PricingConfig::default();

        let provider = match env::var("PRICE_PROVIDER")
            .unwrap_or_else(|_| "coingecko".to_string())
            .to_lowercase()
            .as_str()
        {
            "coingecko" => PriceProvider::CoinGecko,
            "fixed" => PriceProvider::Fixed,
            other => {
                return Err(ConfigError::InvalidValue(format!(
                    "Invalid PRICE_PROVIDER: '{}'. Expected: coingecko or fixed",
                    other
                )))
            }
        };

        let fixed_prices = parse_price_list(
            &env::var("FIXED_PRICES").unwrap_or_else(|_| "BTC=20000,ETH=1000,USDT=1".to_string()),
        )?;

        Ok(PricingConfig {
            provider,
            coingecko_base_url: env::var("COINGECKO_BASE_URL")
                .unwrap_or(defaults.coingecko_base_url),
            coingecko_api_key: env::var("COINGECKO_API_KEY").ok().filter(|k| !k.is_empty()),
            min_interval_secs: parse_var("PRICE_MIN_INTERVAL_SECS", defaults.min_interval_secs)?,
            fixed_prices,
        })
    }
}

impl BlockchainConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = BlockchainConfig::default();

        let verifier = match env::var("VERIFIER")
            .unwrap_or_else(|_| "noop".to_string())
            .to_lowercase()
            .as_str()
        {
            "noop" => VerifierMode::Noop,
            "ethereum" | "eth" => VerifierMode::Ethereum,
            other => {
                return Err(ConfigError::InvalidValue(format!(
                    "Invalid VERIFIER: '{}'. Expected: noop or ethereum",
                    other
                )))
            }
        };

        Ok(BlockchainConfig {
            verifier,
            eth_rpc_url: env::var("ETH_RPC_URL").unwrap_or(defaults.eth_rpc_url),
            min_confirmations: parse_var("MIN_CONFIRMATIONS", defaults.min_confirmations)?,
        })
    }
}

/// Read an optional variable, reporting unparsable values instead of silently defaulting
fn parse_var<T: FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue(format!("{} has invalid value '{}'", key, raw))),
        _ => Ok(default),
    }
}

/// Parse `BTC=20000,ETH=1000` into a symbol -> price map
pub fn parse_price_list(raw: &str) -> Result<HashMap<String, Decimal>, ConfigError> {
    let mut prices = HashMap::new();
    for pair in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (symbol, price) = pair.split_once('=').ok_or_else(|| {
            ConfigError::InvalidValue(format!("FIXED_PRICES entry '{}' is not SYMBOL=PRICE", pair))
        })?;
        let price = Decimal::from_str(price.trim()).map_err(|_| {
            ConfigError::InvalidValue(format!("FIXED_PRICES price '{}' is not a number", price))
        })?;
        prices.insert(symbol.trim().to_uppercase(), price);
    }
    Ok(prices)
}
