/// External collaborators: exchange gateway and market metadata provider

pub mod coingecko;
pub mod pacer;
pub mod retry;
pub mod spot_rest;

#[cfg(test)]
pub(crate) mod stub_server;

use std::collections::{HashMap, HashSet};
use async_trait::async_trait;

use crate::config::ConfigError;
use crate::core::types::{Candle, MarketMetadata, TickerSnapshot};

pub use coingecko::CoinGeckoClient;
pub use pacer::RequestPacer;
pub use retry::RetryPolicy;
pub use spot_rest::SpotRestClient;

#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{service} API error: {status} {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("Failed to decode {service} response: {reason}")]
    Decode {
        service: &'static str,
        reason: String,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ClientError {
    pub fn decode(service: &'static str, reason: impl Into<String>) -> Self {
        ClientError::Decode {
            service,
            reason: reason.into(),
        }
    }

    /// Timeouts, connection failures, 429 and 5xx are worth another attempt
    pub fn is_transient(&self) -> bool {
        match self {
            ClientError::Http(e) => e.is_timeout() || e.is_connect(),
            ClientError::Status { status, .. } => *status == 429 || *status >= 500,
            ClientError::Decode { .. } | ClientError::Config(_) => false,
        }
    }
}

/// Source of tradable pairs, 24h tickers and daily candles
#[async_trait]
pub trait ExchangeGateway: Send + Sync {
    fn exchange_id(&self) -> &str;

    /// Uppercase pair symbols currently open for trading, e.g. `PEPEUSDT`
    async fn list_tradable_symbols(&self) -> Result<HashSet<String>, ClientError>;

    async fn fetch_tickers(&self) -> Result<HashMap<String, TickerSnapshot>, ClientError>;

    /// Daily candles oldest-first, at most `limit` of them
    async fn fetch_daily_candles(&self, symbol: &str, limit: usize) -> Result<Vec<Candle>, ClientError>;
}

/// Source of asset-level market cap and volume
#[async_trait]
pub trait MarketMetadataProvider: Send + Sync {
    async fn fetch_market_metadata(&self) -> Result<Vec<MarketMetadata>, ClientError>;
}
