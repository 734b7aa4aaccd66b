/// CoinGecko API client for market cap and total volume per asset

use std::time::Duration;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::config::ScreenerConfig;
use crate::core::types::MarketMetadata;
use super::{ClientError, MarketMetadataProvider, RetryPolicy};

const SERVICE: &str = "coingecko";
const MARKETS_PATH: &str = "/coins/markets";
const API_KEY_HEADER: &str = "x-cg-demo-api-key";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CoinMarket {
    pub id: String,
    pub symbol: String,
    pub name: Option<String>,
    pub market_cap: Option<f64>,
    pub market_cap_rank: Option<u32>,
    pub total_volume: Option<f64>,
}

impl From<CoinMarket> for MarketMetadata {
    fn from(coin: CoinMarket) -> Self {
        MarketMetadata::new(&coin.symbol, coin.market_cap, coin.total_volume)
    }
}

pub struct CoinGeckoClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    pages: u32,
    per_page: u32,
    retry: RetryPolicy,
}

impl CoinGeckoClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: None,
            pages: 1,
            per_page: 250,
            retry: RetryPolicy::none(),
        })
    }

    pub fn from_config(config: &ScreenerConfig) -> Result<Self, ClientError> {
        let metadata = &config.metadata;
        let mut client = Self::new(&metadata.base_url, Duration::from_secs(metadata.timeout_secs))?
            .with_pagination(metadata.pages, metadata.per_page)
            .with_retry(RetryPolicy::from_config(&config.retry));
        client.api_key = metadata.api_key.clone();
        Ok(client)
    }

    pub fn with_pagination(mut self, pages: u32, per_page: u32) -> Self {
        self.pages = pages.max(1);
        self.per_page = per_page.max(1);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn fetch_page(&self, page: u32) -> Result<Vec<CoinMarket>, ClientError> {
        let url = format!("{}{}", self.base_url, MARKETS_PATH);
        let url = url.as_str();
        let query = [
            ("vs_currency", "usd".to_string()),
            ("order", "market_cap_desc".to_string()),
            ("per_page", self.per_page.to_string()),
            ("page", page.to_string()),
            ("sparkline", "false".to_string()),
        ];
        let query = &query;

        self.retry
            .run(MARKETS_PATH, || async move {
                let mut request = self.client.get(url).query(query);
                if let Some(key) = &self.api_key {
                    request = request.header(API_KEY_HEADER, key);
                }

                let response = request.send().await?;
                let status = response.status();
                if !status.is_success() {
                    let body: String = response
                        .text()
                        .await
                        .unwrap_or_default()
                        .chars()
                        .take(200)
                        .collect();
                    return Err(ClientError::Status {
                        service: SERVICE,
                        status: status.as_u16(),
                        body,
                    });
                }

                let text = response.text().await?;
                parse_markets(&text)
            })
            .await
    }
}

#[async_trait]
impl MarketMetadataProvider for CoinGeckoClient {
    #[instrument(skip(self), fields(pages = self.pages, per_page = self.per_page))]
    async fn fetch_market_metadata(&self) -> Result<Vec<MarketMetadata>, ClientError> {
        let mut metadata = Vec::new();

        for page in 1..=self.pages {
            let coins = self.fetch_page(page).await?;
            let received = coins.len();
            debug!(page = page, received = received, "Fetched CoinGecko markets page");

            metadata.extend(coins.into_iter().map(MarketMetadata::from));

            if received < self.per_page as usize {
                break;
            }
        }

        info!(entries = metadata.len(), "Market metadata retrieved");
        Ok(metadata)
    }
}

pub(crate) fn parse_markets(body: &str) -> Result<Vec<CoinMarket>, ClientError> {
    serde_json::from_str(body).map_err(|e| ClientError::decode(SERVICE, e.to_string()))
}
