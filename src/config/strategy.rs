/// Screener configuration structures

use std::path::Path;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::constants::*;
use super::ConfigError;

/// Exchanges whose spot REST API speaks the Binance v3 dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExchangeKind {
    Binance,
    Mexc,
}

impl ExchangeKind {
    pub fn from_id(id: &str) -> Option<Self> {
        match id.trim().to_lowercase().as_str() {
            "binance" => Some(ExchangeKind::Binance),
            "mexc" => Some(ExchangeKind::Mexc),
            _ => None,
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            ExchangeKind::Binance => "binance",
            ExchangeKind::Mexc => "mexc",
        }
    }

    pub fn max_klines_limit(&self) -> usize {
        match self {
            ExchangeKind::Binance | ExchangeKind::Mexc => MAX_KLINES_LIMIT,
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            ExchangeKind::Binance => "https://api.binance.com",
            ExchangeKind::Mexc => "https://api.mexc.com",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ScreenerConfig {
    pub exchange: Exchange,
    pub filter: Filter,
    pub spike: Spike,
    pub metadata: Metadata,
    pub scan: Scan,
    pub retry: Retry,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Exchange {
    pub id: String,
    pub api_key: String,
    pub secret_key: String,
    pub base_url: Option<String>,
    pub request_timeout_secs: u64,
    pub min_request_interval_ms: u64,
}

impl Default for Exchange {
    fn default() -> Self {
        Self {
            id: String::new(),
            api_key: String::new(),
            secret_key: String::new(),
            base_url: None,
            request_timeout_secs: EXCHANGE_TIMEOUT_SECS,
            min_request_interval_ms: MIN_REQUEST_INTERVAL_MS,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Filter {
    pub max_market_cap: f64,
    pub min_daily_volume: f64,
    pub quote_currency: String,
    pub excluded_markers: Vec<String>,
}

impl Default for Filter {
    fn default() -> Self {
        Self {
            max_market_cap: DEFAULT_MAX_MARKET_CAP,
            min_daily_volume: DEFAULT_MIN_DAILY_VOLUME,
            quote_currency: DEFAULT_QUOTE_CURRENCY.to_string(),
            excluded_markers: DEFAULT_EXCLUDED_MARKERS.iter().map(|m| m.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Spike {
    pub days: usize,
    pub ratio_threshold: f64,
    pub max_price_change_pct: f64,
}

impl Default for Spike {
    fn default() -> Self {
        Self {
            days: DEFAULT_EMA_DAYS,
            ratio_threshold: DEFAULT_RATIO_THRESHOLD,
            max_price_change_pct: DEFAULT_MAX_PRICE_CHANGE_PCT,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Metadata {
    pub base_url: String,
    pub api_key: Option<String>,
    pub pages: u32,
    pub per_page: u32,
    pub timeout_secs: u64,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            base_url: COINGECKO_API.to_string(),
            api_key: None,
            pages: METADATA_PAGES,
            per_page: METADATA_PAGE_SIZE,
            timeout_secs: METADATA_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Scan {
    /// Upper bound on in-flight candle requests; 1 keeps the scan sequential
    pub concurrency: usize,
}

impl Default for Scan {
    fn default() -> Self {
        Self { concurrency: 1 }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Retry {
    pub max_attempts: u32,
    pub base_backoff_ms: u64,
}

impl Default for Retry {
    fn default() -> Self {
        Self {
            max_attempts: RETRY_MAX_ATTEMPTS,
            base_backoff_ms: RETRY_BASE_BACKOFF_MS,
        }
    }
}

impl ScreenerConfig {
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Reads the TOML file when it exists, otherwise starts from defaults,
    /// then layers the process environment on top.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            info!(path = %path.display(), "Loading screener configuration");
            Self::load_from_file(path)?
        } else {
            debug!(path = %path.display(), "No configuration file found, using defaults");
            Self::default()
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Overrides credentials from `EXCHANGE_ID`, `API_KEY`, `SECRET_KEY` and `COINGECKO_API_KEY`.
    /// Only the process environment is consulted; `.env` files are not loaded.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(id) = non_empty("EXCHANGE_ID") {
            self.exchange.id = id;
        }
        if let Some(key) = non_empty("API_KEY") {
            self.exchange.api_key = key;
        }
        if let Some(secret) = non_empty("SECRET_KEY") {
            self.exchange.secret_key = secret;
        }
        if let Some(key) = non_empty("COINGECKO_API_KEY") {
            self.metadata.api_key = Some(key);
        }
    }

    pub fn exchange_kind(&self) -> Result<ExchangeKind, ConfigError> {
        ExchangeKind::from_id(&self.exchange.id)
            .ok_or_else(|| ConfigError::UnsupportedExchange(self.exchange.id.clone()))
    }

    pub fn exchange_base_url(&self) -> Result<String, ConfigError> {
        match &self.exchange.base_url {
            Some(url) => Ok(url.trim_end_matches('/').to_string()),
            None => Ok(self.exchange_kind()?.default_base_url().to_string()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut missing = Vec::new();
        if self.exchange.id.trim().is_empty() {
            missing.push("EXCHANGE_ID");
        }
        if self.exchange.api_key.trim().is_empty() {
            missing.push("API_KEY");
        }
        if self.exchange.secret_key.trim().is_empty() {
            missing.push("SECRET_KEY");
        }
        if !missing.is_empty() {
            return Err(ConfigError::MissingCredentials(missing.join(", ")));
        }

        let kind = self.exchange_kind()?;

        for url in [self.exchange_base_url()?, self.metadata.base_url.clone()] {
            url::Url::parse(&url).map_err(|e| ConfigError::Invalid(format!("bad url {}: {}", url, e)))?;
        }

        if self.spike.days == 0 {
            return Err(ConfigError::Invalid("spike.days must be at least 1".to_string()));
        }
        if self.spike.days >= kind.max_klines_limit() {
            return Err(ConfigError::Invalid(format!(
                "spike.days must be below {}: {} serves at most {} daily candles per request",
                kind.max_klines_limit(),
                kind.id(),
                kind.max_klines_limit()
            )));
        }
        if !self.spike.ratio_threshold.is_finite() || !self.spike.max_price_change_pct.is_finite() {
            return Err(ConfigError::Invalid("spike thresholds must be finite".to_string()));
        }
        if !self.filter.max_market_cap.is_finite() || !self.filter.min_daily_volume.is_finite() {
            return Err(ConfigError::Invalid("filter thresholds must be finite".to_string()));
        }
        if self.filter.quote_currency.trim().is_empty() {
            return Err(ConfigError::Invalid("filter.quote_currency is empty".to_string()));
        }
        if self.scan.concurrency == 0 {
            return Err(ConfigError::Invalid("scan.concurrency must be at least 1".to_string()));
        }
        if self.metadata.pages == 0 || self.metadata.per_page == 0 {
            return Err(ConfigError::Invalid("metadata.pages and metadata.per_page must be positive".to_string()));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid("retry.max_attempts must be at least 1".to_string()));
        }

        Ok(())
    }
}
