/// Spot REST client for exchanges speaking the Binance v3 API dialect

use std::collections::{HashMap, HashSet};
use std::time::Duration;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::config::{ExchangeKind, ScreenerConfig};
use crate::core::types::{Candle, TickerSnapshot};
use super::{ClientError, ExchangeGateway, RequestPacer, RetryPolicy};

const EXCHANGE_INFO_PATH: &str = "/api/v3/exchangeInfo";
const TICKER_24H_PATH: &str = "/api/v3/ticker/24hr";
const KLINES_PATH: &str = "/api/v3/klines";
const DAILY_INTERVAL: &str = "1d";
const TRADABLE_STATUSES: [&str; 3] = ["TRADING", "ENABLED", "1"];
const ERROR_BODY_LIMIT: usize = 200;

#[derive(Debug, Deserialize)]
struct ExchangeInfoResponse {
    symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SymbolInfo {
    symbol: String,
    status: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Ticker24h {
    symbol: String,
    last_price: Option<String>,
    quote_volume: Option<String>,
}

pub struct SpotRestClient {
    client: Client,
    kind: ExchangeKind,
    base_url: String,
    api_key: String,
    pacer: RequestPacer,
    retry: RetryPolicy,
}

impl SpotRestClient {
    pub fn new(kind: ExchangeKind, base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, ClientError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            kind,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            pacer: RequestPacer::new(Duration::ZERO),
            retry: RetryPolicy::none(),
        })
    }

    pub fn from_config(config: &ScreenerConfig) -> Result<Self, ClientError> {
        let client = Self::new(
            config.exchange_kind()?,
            &config.exchange_base_url()?,
            &config.exchange.api_key,
            Duration::from_secs(config.exchange.request_timeout_secs),
        )?
        .with_pacing(Duration::from_millis(config.exchange.min_request_interval_ms))
        .with_retry(RetryPolicy::from_config(&config.retry));
        Ok(client)
    }

    pub fn with_pacing(mut self, min_interval: Duration) -> Self {
        self.pacer = RequestPacer::new(min_interval);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn api_key_header(&self) -> &'static str {
        match self.kind {
            ExchangeKind::Binance => "X-MBX-APIKEY",
            ExchangeKind::Mexc => "X-MEXC-APIKEY",
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        let url = url.as_str();
        let service = self.kind.id();

        self.retry
            .run(path, || async move {
                self.pacer.wait().await;

                let mut request = self.client.get(url).query(query);
                if !self.api_key.is_empty() {
                    request = request.header(self.api_key_header(), &self.api_key);
                }

                let response = request.send().await?;
                let status = response.status();
                if !status.is_success() {
                    let body: String = response
                        .text()
                        .await
                        .unwrap_or_default()
                        .chars()
                        .take(ERROR_BODY_LIMIT)
                        .collect();
                    return Err(ClientError::Status {
                        service,
                        status: status.as_u16(),
                        body,
                    });
                }

                let text = response.text().await?;
                serde_json::from_str(&text).map_err(|e| ClientError::decode(service, e.to_string()))
            })
            .await
    }
}

#[async_trait]
impl ExchangeGateway for SpotRestClient {
    fn exchange_id(&self) -> &str {
        self.kind.id()
    }

    #[instrument(skip(self), fields(exchange = self.kind.id()))]
    async fn list_tradable_symbols(&self) -> Result<HashSet<String>, ClientError> {
        let info: ExchangeInfoResponse = self.get_json(EXCHANGE_INFO_PATH, &[]).await?;
        let symbols = tradable_symbols(info);
        debug!(count = symbols.len(), "Tradable symbols listed");
        Ok(symbols)
    }

    #[instrument(skip(self), fields(exchange = self.kind.id()))]
    async fn fetch_tickers(&self) -> Result<HashMap<String, TickerSnapshot>, ClientError> {
        let raw: Vec<Ticker24h> = self.get_json(TICKER_24H_PATH, &[]).await?;
        let tickers = ticker_snapshots(raw);
        debug!(count = tickers.len(), "Tickers fetched");
        Ok(tickers)
    }

    #[instrument(skip(self), fields(exchange = self.kind.id()))]
    async fn fetch_daily_candles(&self, symbol: &str, limit: usize) -> Result<Vec<Candle>, ClientError> {
        let query = [
            ("symbol", symbol.to_string()),
            ("interval", DAILY_INTERVAL.to_string()),
            ("limit", limit.to_string()),
        ];
        let rows: Vec<Vec<Value>> = self.get_json(KLINES_PATH, &query).await?;
        parse_klines(self.kind.id(), &rows)
    }
}

fn status_text(status: &Value) -> String {
    match status {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn tradable_symbols(info: ExchangeInfoResponse) -> HashSet<String> {
    info.symbols
        .into_iter()
        .filter(|s| TRADABLE_STATUSES.contains(&status_text(&s.status).as_str()))
        .map(|s| s.symbol.to_uppercase())
        .collect()
}

fn ticker_snapshots(raw: Vec<Ticker24h>) -> HashMap<String, TickerSnapshot> {
    raw.into_iter()
        .filter_map(|t| {
            let price = t.last_price.as_deref()?.parse::<f64>().ok()?;
            let quote_volume = t.quote_volume.as_deref()?.parse::<f64>().ok()?;
            let symbol = t.symbol.to_uppercase();
            Some((symbol.clone(), TickerSnapshot { symbol, quote_volume, price }))
        })
        .collect()
}

fn number_at(service: &'static str, row: &[Value], index: usize) -> Result<f64, ClientError> {
    let value = row
        .get(index)
        .ok_or_else(|| ClientError::decode(service, format!("kline row has no field {}", index)))?;

    let number = match value {
        Value::String(s) => s.parse::<f64>().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    };

    number
        .filter(|n| n.is_finite())
        .ok_or_else(|| ClientError::decode(service, format!("kline field {} is not a number: {}", index, value)))
}

/// Rows are `[openTime, open, high, low, close, volume, ...]` with decimal strings.
/// Any malformed row fails the whole series.
pub(crate) fn parse_klines(service: &'static str, rows: &[Vec<Value>]) -> Result<Vec<Candle>, ClientError> {
    let mut candles = rows
        .iter()
        .map(|row| {
            let timestamp = row
                .first()
                .and_then(Value::as_i64)
                .ok_or_else(|| ClientError::decode(service, "kline row has no open time"))?;
            Ok(Candle {
                timestamp,
                open: number_at(service, row, 1)?,
                high: number_at(service, row, 2)?,
                low: number_at(service, row, 3)?,
                close: number_at(service, row, 4)?,
                volume: number_at(service, row, 5)?,
            })
        })
        .collect::<Result<Vec<_>, ClientError>>()?;

    candles.sort_by_key(|c| c.timestamp);
    Ok(candles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::time::Instant;
    use crate::client::stub_server::StubServer;
    use crate::config::ConfigError;

    const ONE_KLINE: &str = r#"[[1700000000000,"1.00","1.20","0.90","1.10","800.0",1700086399999,"880.0",9,"1","1","0"]]"#;

    fn rest_client(server: &StubServer, kind: ExchangeKind, api_key: &str) -> SpotRestClient {
        SpotRestClient::new(kind, &server.base_url, api_key, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_transient_status_is_retried_with_pacing() {
        let server = StubServer::start(|_, index| match index {
            0 => (503, "maintenance".to_string()),
            _ => (200, ONE_KLINE.to_string()),
        })
        .await;
        let client = rest_client(&server, ExchangeKind::Binance, "")
            .with_pacing(Duration::from_millis(30))
            .with_retry(RetryPolicy::new(3, Duration::from_millis(1)));

        let started = Instant::now();
        let candles = client.fetch_daily_candles("PEPEUSDT", 8).await.unwrap();

        assert_eq!(candles.len(), 1);
        assert_eq!(candles[0].close, 1.10);
        assert!(started.elapsed() >= Duration::from_millis(30));

        let requests = server.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].path, KLINES_PATH);
        assert_eq!(requests[1].query_param("symbol"), Some("PEPEUSDT"));
        assert_eq!(requests[1].query_param("interval"), Some(DAILY_INTERVAL));
        assert_eq!(requests[1].query_param("limit"), Some("8"));
    }

    #[tokio::test]
    async fn test_client_error_status_is_not_retried() {
        let long_body = "x".repeat(ERROR_BODY_LIMIT * 3);
        let server = StubServer::start(move |_, _| (400, long_body.clone())).await;
        let client = rest_client(&server, ExchangeKind::Binance, "")
            .with_retry(RetryPolicy::new(3, Duration::from_millis(1)));

        match client.fetch_daily_candles("NOPEUSDT", 8).await {
            Err(ClientError::Status { service, status, body }) => {
                assert_eq!(service, "binance");
                assert_eq!(status, 400);
                assert_eq!(body.chars().count(), ERROR_BODY_LIMIT);
            }
            other => panic!("unexpected result: {:?}", other.map(|c| c.len())),
        }
        assert_eq!(server.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_api_key_header_follows_exchange() {
        let server = StubServer::start(|_, _| (200, ONE_KLINE.to_string())).await;

        rest_client(&server, ExchangeKind::Binance, "bn-key")
            .fetch_daily_candles("AAAUSDT", 8)
            .await
            .unwrap();
        rest_client(&server, ExchangeKind::Mexc, "mx-key")
            .fetch_daily_candles("AAAUSDT", 8)
            .await
            .unwrap();
        rest_client(&server, ExchangeKind::Mexc, "")
            .fetch_daily_candles("AAAUSDT", 8)
            .await
            .unwrap();

        let requests = server.requests();
        assert_eq!(requests[0].headers.get("x-mbx-apikey").map(String::as_str), Some("bn-key"));
        assert!(!requests[0].headers.contains_key("x-mexc-apikey"));
        assert_eq!(requests[1].headers.get("x-mexc-apikey").map(String::as_str), Some("mx-key"));
        assert!(!requests[1].headers.contains_key("x-mbx-apikey"));
        assert!(!requests[2].headers.contains_key("x-mexc-apikey"));
    }

    #[test]
    fn test_from_config_reports_unsupported_exchange() {
        let mut config = ScreenerConfig::default();
        config.exchange.id = "kraken".to_string();

        let err = SpotRestClient::from_config(&config).err();
        assert!(matches!(err, Some(ClientError::Config(ConfigError::UnsupportedExchange(_)))));
    }

    #[test]
    fn test_exchange_info_keeps_trading_symbols_only() {
        let info: ExchangeInfoResponse = serde_json::from_value(json!({
            "timezone": "UTC",
            "symbols": [
                {"symbol": "PEPEUSDT", "status": "TRADING", "baseAsset": "PEPE", "quoteAsset": "USDT"},
                {"symbol": "OLDUSDT", "status": "BREAK", "baseAsset": "OLD", "quoteAsset": "USDT"},
                {"symbol": "mxusdt", "status": "1", "baseAsset": "MX", "quoteAsset": "USDT"},
                {"symbol": "NUMUSDT", "status": 1, "baseAsset": "NUM", "quoteAsset": "USDT"}
            ]
        }))
        .unwrap();

        let symbols = tradable_symbols(info);
        assert_eq!(symbols.len(), 3);
        assert!(symbols.contains("PEPEUSDT"));
        assert!(symbols.contains("MXUSDT"));
        assert!(symbols.contains("NUMUSDT"));
        assert!(!symbols.contains("OLDUSDT"));
    }

    #[test]
    fn test_tickers_skip_unparseable_entries() {
        let raw: Vec<Ticker24h> = serde_json::from_value(json!([
            {"symbol": "PEPEUSDT", "lastPrice": "0.00001234", "quoteVolume": "52000000.5"},
            {"symbol": "BADUSDT", "lastPrice": "n/a", "quoteVolume": "1"},
            {"symbol": "NULLUSDT", "lastPrice": "1.0", "quoteVolume": null}
        ]))
        .unwrap();

        let tickers = ticker_snapshots(raw);
        assert_eq!(tickers.len(), 1);
        let pepe = &tickers["PEPEUSDT"];
        assert_eq!(pepe.price, 0.00001234);
        assert_eq!(pepe.quote_volume, 52000000.5);
    }

    #[test]
    fn test_parse_klines_from_decimal_strings() {
        let rows: Vec<Vec<Value>> = serde_json::from_value(json!([
            [1700086400000i64, "1.10", "1.30", "1.00", "1.20", "900.5", 1700172799999i64, "1000.0", 10, "1", "1", "0"],
            [1700000000000i64, "1.00", "1.20", "0.90", "1.10", "800.0", 1700086399999i64, "880.0", 9, "1", "1", "0"]
        ]))
        .unwrap();

        let candles = parse_klines("binance", &rows).unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].timestamp, 1700000000000);
        assert_eq!(candles[0].volume, 800.0);
        assert_eq!(candles[1].open, 1.10);
        assert_eq!(candles[1].close, 1.20);
    }

    #[test]
    fn test_malformed_kline_fails_the_series() {
        let rows: Vec<Vec<Value>> = serde_json::from_value(json!([
            [1700000000000i64, "1.00", "1.20", "0.90", "1.10", "800.0"],
            [1700086400000i64, "1.10", "1.30", "1.00", "oops", "900.5"]
        ]))
        .unwrap();

        let err = parse_klines("binance", &rows).unwrap_err();
        assert!(matches!(err, ClientError::Decode { .. }));
    }

    #[test]
    fn test_short_kline_row_is_rejected() {
        let rows: Vec<Vec<Value>> = vec![vec![json!(1700000000000i64), json!("1.0")]];
        assert!(parse_klines("mexc", &rows).is_err());
    }
}
