use std::collections::HashSet;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::config::{Filter, ScreenerConfig};
use crate::core::types::{MarketMetadata, Watchlist};

/// Why a metadata entry did not make the watchlist
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    MissingMarketCap,
    MarketCapTooHigh,
    MissingVolume,
    VolumeTooLow,
    LeveragedToken,
    NotTradable,
    Duplicate,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterStats {
    pub accepted: usize,
    pub missing_market_cap: usize,
    pub market_cap_too_high: usize,
    pub missing_volume: usize,
    pub volume_too_low: usize,
    pub leveraged: usize,
    pub not_tradable: usize,
    pub duplicate: usize,
}

impl FilterStats {
    fn record(&mut self, rejection: Rejection) {
        match rejection {
            Rejection::MissingMarketCap => self.missing_market_cap += 1,
            Rejection::MarketCapTooHigh => self.market_cap_too_high += 1,
            Rejection::MissingVolume => self.missing_volume += 1,
            Rejection::VolumeTooLow => self.volume_too_low += 1,
            Rejection::LeveragedToken => self.leveraged += 1,
            Rejection::NotTradable => self.not_tradable += 1,
            Rejection::Duplicate => self.duplicate += 1,
        }
    }

    pub fn rejected(&self) -> usize {
        self.missing_market_cap
            + self.market_cap_too_high
            + self.missing_volume
            + self.volume_too_low
            + self.leveraged
            + self.not_tradable
            + self.duplicate
    }
}

/// Market cap and liquidity gate mapping metadata assets onto exchange pairs
#[derive(Debug, Clone)]
pub struct StructuralFilter {
    max_market_cap: f64,
    min_daily_volume: f64,
    quote_currency: String,
    excluded_markers: Vec<String>,
}

impl StructuralFilter {
    pub fn new(filter: &Filter) -> Self {
        Self {
            max_market_cap: filter.max_market_cap,
            min_daily_volume: filter.min_daily_volume,
            quote_currency: filter.quote_currency.trim().to_uppercase(),
            excluded_markers: filter
                .excluded_markers
                .iter()
                .map(|m| m.trim().to_uppercase())
                .filter(|m| !m.is_empty())
                .collect(),
        }
    }

    pub fn from_config(config: &ScreenerConfig) -> Self {
        Self::new(&config.filter)
    }

    pub fn pair_symbol(&self, base_symbol: &str) -> String {
        format!("{}{}", base_symbol.trim().to_uppercase(), self.quote_currency)
    }

    pub fn is_leveraged(&self, base_symbol: &str) -> bool {
        let base = base_symbol.to_uppercase();
        self.excluded_markers.iter().any(|marker| base.contains(marker.as_str()))
    }

    /// Eligibility of a single entry. Missing figures fail closed.
    pub fn check(&self, entry: &MarketMetadata, tradable: &HashSet<String>) -> Result<String, Rejection> {
        match entry.market_cap {
            None => return Err(Rejection::MissingMarketCap),
            Some(cap) if cap.is_nan() || cap > self.max_market_cap => return Err(Rejection::MarketCapTooHigh),
            Some(_) => {}
        }

        match entry.total_volume {
            None => return Err(Rejection::MissingVolume),
            Some(volume) if volume.is_nan() || volume < self.min_daily_volume => return Err(Rejection::VolumeTooLow),
            Some(_) => {}
        }

        if self.is_leveraged(&entry.base_symbol) {
            return Err(Rejection::LeveragedToken);
        }

        let pair = self.pair_symbol(&entry.base_symbol);
        if !tradable.contains(&pair) {
            return Err(Rejection::NotTradable);
        }

        Ok(pair)
    }

    /// Builds the watchlist in metadata order. A pair is listed once; the
    /// first (highest ranked) asset claiming it wins.
    #[instrument(skip_all, fields(entries = metadata.len(), tradable = tradable.len()))]
    pub fn apply(&self, metadata: &[MarketMetadata], tradable: &HashSet<String>) -> (Watchlist, FilterStats) {
        let mut watchlist = Watchlist::new();
        let mut seen = HashSet::new();
        let mut stats = FilterStats::default();

        for entry in metadata {
            let verdict = self.check(entry, tradable).and_then(|pair| {
                if seen.insert(pair.clone()) {
                    Ok(pair)
                } else {
                    Err(Rejection::Duplicate)
                }
            });

            match verdict {
                Ok(pair) => {
                    stats.accepted += 1;
                    watchlist.push(pair);
                }
                Err(rejection) => {
                    debug!(base = %entry.base_symbol, reason = ?rejection, "Excluded from watchlist");
                    stats.record(rejection);
                }
            }
        }

        debug!(accepted = stats.accepted, rejected = stats.rejected(), "Structural filter applied");
        (watchlist, stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tradable(symbols: &[&str]) -> HashSet<String> {
        symbols.iter().map(|s| s.to_string()).collect()
    }

    fn entry(base: &str, cap: Option<f64>, volume: Option<f64>) -> MarketMetadata {
        MarketMetadata::new(base, cap, volume)
    }

    fn filter() -> StructuralFilter {
        StructuralFilter::new(&Filter::default())
    }

    #[test]
    fn test_caps_and_floors_exclude() {
        let pairs = tradable(&["BIGUSDT", "THINUSDT", "OKUSDT"]);
        let metadata = vec![
            entry("big", Some(500_000_001.0), Some(50_000_000.0)),
            entry("thin", Some(20_000_000.0), Some(999_999.0)),
            entry("ok", Some(500_000_000.0), Some(1_000_000.0)),
        ];

        let (watchlist, stats) = filter().apply(&metadata, &pairs);
        assert_eq!(watchlist, vec!["OKUSDT".to_string()]);
        assert_eq!(stats.market_cap_too_high, 1);
        assert_eq!(stats.volume_too_low, 1);
    }

    #[test]
    fn test_null_market_cap_fails_closed() {
        let pairs = tradable(&["GSTUSDT"]);
        let result = filter().check(&entry("gst", None, Some(900_000_000.0)), &pairs);
        assert_eq!(result, Err(Rejection::MissingMarketCap));

        let result = filter().check(&entry("gst", Some(10_000_000.0), None), &pairs);
        assert_eq!(result, Err(Rejection::MissingVolume));
    }

    #[test]
    fn test_leveraged_tokens_are_excluded() {
        let pairs = tradable(&["BTC3LUSDT", "ETH3SUSDT"]);
        let metadata = vec![
            entry("btc3l", Some(1_000_000.0), Some(5_000_000.0)),
            entry("eth3s", Some(1_000_000.0), Some(5_000_000.0)),
        ];

        let (watchlist, stats) = filter().apply(&metadata, &pairs);
        assert!(watchlist.is_empty());
        assert_eq!(stats.leveraged, 2);
    }

    #[test]
    fn test_untradable_pairs_are_excluded() {
        let pairs = tradable(&["AAAUSDT"]);
        let result = filter().check(&entry("bbb", Some(1_000_000.0), Some(5_000_000.0)), &pairs);
        assert_eq!(result, Err(Rejection::NotTradable));
    }

    #[test]
    fn test_metadata_order_is_preserved() {
        let pairs = tradable(&["ZZZUSDT", "AAAUSDT", "MMMUSDT"]);
        let metadata = vec![
            entry("zzz", Some(300_000_000.0), Some(2_000_000.0)),
            entry("aaa", Some(200_000_000.0), Some(2_000_000.0)),
            entry("mmm", Some(100_000_000.0), Some(2_000_000.0)),
        ];

        let (watchlist, _) = filter().apply(&metadata, &pairs);
        assert_eq!(watchlist, vec!["ZZZUSDT", "AAAUSDT", "MMMUSDT"]);
    }

    #[test]
    fn test_duplicate_tickers_keep_first() {
        let pairs = tradable(&["ABCUSDT"]);
        let metadata = vec![
            entry("abc", Some(300_000_000.0), Some(2_000_000.0)),
            entry("abc", Some(1_000.0), Some(1_000_000.0)),
        ];

        let (watchlist, stats) = filter().apply(&metadata, &pairs);
        assert_eq!(watchlist, vec!["ABCUSDT"]);
        assert_eq!(stats.duplicate, 1);
    }

    #[test]
    fn test_custom_quote_currency() {
        let settings = Filter {
            quote_currency: "fdusd".to_string(),
            ..Filter::default()
        };
        let filter = StructuralFilter::new(&settings);
        let pairs = tradable(&["PEPEFDUSD", "PEPEUSDT"]);

        let result = filter.check(&entry("pepe", Some(1_000_000.0), Some(5_000_000.0)), &pairs);
        assert_eq!(result, Ok("PEPEFDUSD".to_string()));
    }

    #[test]
    fn test_empty_inputs_give_empty_watchlist() {
        let (watchlist, stats) = filter().apply(&[], &HashSet::new());
        assert!(watchlist.is_empty());
        assert_eq!(stats, FilterStats::default());
    }
}
