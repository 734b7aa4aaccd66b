use serde::{Deserialize, Serialize};
use std::fmt;

/// Point-in-time 24h market state for one pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerSnapshot {
    pub symbol: String,
    pub quote_volume: f64,
    pub price: f64,
}

/// Asset-level statistics from the metadata source, keyed by uppercase base symbol.
/// Missing figures stay `None` so the structural filter can fail them closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketMetadata {
    pub base_symbol: String,
    pub market_cap: Option<f64>,
    pub total_volume: Option<f64>,
}

impl MarketMetadata {
    pub fn new(base_symbol: &str, market_cap: Option<f64>, total_volume: Option<f64>) -> Self {
        Self {
            base_symbol: base_symbol.trim().to_uppercase(),
            market_cap,
            total_volume,
        }
    }
}

/// One daily OHLCV bar. `timestamp` is the open time in ms since epoch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Eligible pair symbols in discovery order
pub type Watchlist = Vec<String>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpikeResult {
    pub symbol: String,
    pub volume_ratio: f64,
    pub price_change_pct: f64,
    pub is_candidate: bool,
}

impl SpikeResult {
    /// The `(0, 0, false)` result used whenever a symbol cannot be scored
    pub fn neutral(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            volume_ratio: 0.0,
            price_change_pct: 0.0,
            is_candidate: false,
        }
    }
}

/// Why a symbol fell back to the neutral result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SpikeFailure {
    InsufficientCandles { required: usize, received: usize },
    Fetch(String),
    MalformedCandle(String),
}

impl fmt::Display for SpikeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpikeFailure::InsufficientCandles { required, received } => {
                write!(f, "insufficient candles: need {}, got {}", required, received)
            }
            SpikeFailure::Fetch(reason) => write!(f, "candle fetch failed: {}", reason),
            SpikeFailure::MalformedCandle(reason) => write!(f, "malformed candle: {}", reason),
        }
    }
}

/// Per-symbol analyzer outcome. A degraded outcome still carries the neutral
/// result so the batch can treat both variants uniformly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SpikeOutcome {
    Scored(SpikeResult),
    Degraded { result: SpikeResult, reason: SpikeFailure },
}

impl SpikeOutcome {
    pub fn degraded(symbol: &str, reason: SpikeFailure) -> Self {
        SpikeOutcome::Degraded {
            result: SpikeResult::neutral(symbol),
            reason,
        }
    }

    pub fn result(&self) -> &SpikeResult {
        match self {
            SpikeOutcome::Scored(result) => result,
            SpikeOutcome::Degraded { result, .. } => result,
        }
    }

    pub fn into_result(self) -> SpikeResult {
        match self {
            SpikeOutcome::Scored(result) => result,
            SpikeOutcome::Degraded { result, .. } => result,
        }
    }

    pub fn failure(&self) -> Option<&SpikeFailure> {
        match self {
            SpikeOutcome::Scored(_) => None,
            SpikeOutcome::Degraded { reason, .. } => Some(reason),
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, SpikeOutcome::Degraded { .. })
    }
}

/// Ranked candidates, highest volume ratio first
pub type Report = Vec<SpikeResult>;

/// A report row with the optional 24h ticker attached for display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportEntry {
    #[serde(flatten)]
    pub result: SpikeResult,
    pub ticker: Option<TickerSnapshot>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanSummary {
    pub exchange: String,
    pub metadata_entries: usize,
    pub tradable_pairs: usize,
    pub watchlist_len: usize,
    pub scored: usize,
    pub degraded: usize,
    pub candidates: usize,
    pub duration_ms: u64,
}

/// Everything a single screening run hands back to the caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenReport {
    pub generated_at: chrono::DateTime<chrono::Utc>,
    pub entries: Vec<ReportEntry>,
    pub summary: ScanSummary,
}
