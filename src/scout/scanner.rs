use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use chrono::Utc;
use futures_util::future::join_all;
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

use crate::algo::{ResultAggregator, VolumeSpikeAnalyzer};
use crate::client::{ExchangeGateway, MarketMetadataProvider};
use crate::config::ScreenerConfig;
use crate::core::types::{
    ReportEntry, ScanSummary, ScreenReport, SpikeFailure, SpikeOutcome, TickerSnapshot, Watchlist,
};
use super::filter::{FilterStats, StructuralFilter};
use super::ScreenerError;

/// Structural filter output plus what it was computed from
#[derive(Debug, Clone)]
pub struct WatchlistBuild {
    pub watchlist: Watchlist,
    pub stats: FilterStats,
    pub metadata_entries: usize,
    pub tradable_pairs: usize,
}

/// Single batch pass: metadata + listing -> watchlist -> spike scores -> ranked report
pub struct VolumeScanner {
    gateway: Arc<dyn ExchangeGateway>,
    metadata: Arc<dyn MarketMetadataProvider>,
    filter: StructuralFilter,
    analyzer: VolumeSpikeAnalyzer,
    aggregator: ResultAggregator,
    concurrency: usize,
}

impl VolumeScanner {
    pub fn new(
        config: &ScreenerConfig,
        gateway: Arc<dyn ExchangeGateway>,
        metadata: Arc<dyn MarketMetadataProvider>,
    ) -> Self {
        Self {
            gateway,
            metadata,
            filter: StructuralFilter::from_config(config),
            analyzer: VolumeSpikeAnalyzer::from_config(config),
            aggregator: ResultAggregator::new(),
            concurrency: config.scan.concurrency.max(1),
        }
    }

    /// Fetches metadata and the tradable listing, then applies the structural
    /// filter. Every failure here is fatal to the run.
    #[instrument(skip(self), fields(exchange = self.gateway.exchange_id()))]
    pub async fn build_watchlist(&self) -> Result<WatchlistBuild, ScreenerError> {
        let (metadata, tradable) = tokio::join!(
            self.metadata.fetch_market_metadata(),
            self.gateway.list_tradable_symbols()
        );

        let metadata = metadata.map_err(ScreenerError::Metadata)?;
        if metadata.is_empty() {
            return Err(ScreenerError::EmptyMetadata);
        }
        let tradable = tradable.map_err(ScreenerError::TradableListing)?;

        let (watchlist, stats) = self.filter.apply(&metadata, &tradable);
        info!(
            metadata_entries = metadata.len(),
            tradable_pairs = tradable.len(),
            eligible = watchlist.len(),
            "Structural filter complete"
        );

        if watchlist.is_empty() {
            return Err(ScreenerError::EmptyWatchlist);
        }

        Ok(WatchlistBuild {
            watchlist,
            stats,
            metadata_entries: metadata.len(),
            tradable_pairs: tradable.len(),
        })
    }

    /// Scores every watchlist symbol with at most `concurrency` candle
    /// requests in flight. Outcomes come back in watchlist order and a
    /// failing symbol never affects its siblings.
    #[instrument(skip_all, fields(symbols = watchlist.len(), concurrency = self.concurrency))]
    pub async fn scan_watchlist(&self, watchlist: &[String]) -> Vec<SpikeOutcome> {
        let permits = Semaphore::new(self.concurrency);
        let permits = &permits;

        let evaluations = watchlist.iter().map(|symbol| async move {
            let _permit = match permits.acquire().await {
                Ok(permit) => permit,
                Err(e) => return SpikeOutcome::degraded(symbol, SpikeFailure::Fetch(e.to_string())),
            };
            self.analyzer.evaluate(self.gateway.as_ref(), symbol).await
        });

        join_all(evaluations).await
    }

    async fn fetch_tickers_soft(&self) -> Option<HashMap<String, TickerSnapshot>> {
        match self.gateway.fetch_tickers().await {
            Ok(tickers) => Some(tickers),
            Err(e) => {
                warn!(error = %e, "Ticker snapshot unavailable, report will omit price and 24h volume");
                None
            }
        }
    }

    #[instrument(skip(self), fields(exchange = self.gateway.exchange_id()))]
    pub async fn run(&self) -> Result<ScreenReport, ScreenerError> {
        let started = Instant::now();

        let build = self.build_watchlist().await?;
        info!(symbols = build.watchlist.len(), "Checking watchlist for volume spikes");

        let outcomes = self.scan_watchlist(&build.watchlist).await;
        let degraded = outcomes.iter().filter(|o| o.is_degraded()).count();
        let scored = outcomes.len() - degraded;

        let report = self.aggregator.rank(outcomes.into_iter().map(SpikeOutcome::into_result));
        for result in &report {
            debug!(
                symbol = %result.symbol,
                volume_ratio = result.volume_ratio,
                price_change_pct = result.price_change_pct,
                "Spike candidate"
            );
        }

        let tickers = if report.is_empty() {
            None
        } else {
            self.fetch_tickers_soft().await
        };

        let entries: Vec<ReportEntry> = report
            .into_iter()
            .map(|result| {
                let ticker = tickers.as_ref().and_then(|t| t.get(&result.symbol).cloned());
                ReportEntry { result, ticker }
            })
            .collect();

        let summary = ScanSummary {
            exchange: self.gateway.exchange_id().to_string(),
            metadata_entries: build.metadata_entries,
            tradable_pairs: build.tradable_pairs,
            watchlist_len: build.watchlist.len(),
            scored,
            degraded,
            candidates: entries.len(),
            duration_ms: started.elapsed().as_millis() as u64,
        };

        info!(
            watchlist = summary.watchlist_len,
            scored = summary.scored,
            degraded = summary.degraded,
            candidates = summary.candidates,
            duration_ms = summary.duration_ms,
            "Screening run complete"
        );

        Ok(ScreenReport {
            generated_at: Utc::now(),
            entries,
            summary,
        })
    }
}
