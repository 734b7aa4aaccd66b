/// Volume spike analyzer: current daily volume against its EMA baseline

use tracing::{debug, warn};

use crate::client::{ClientError, ExchangeGateway};
use crate::config::{ScreenerConfig, Spike};
use crate::core::types::{Candle, SpikeFailure, SpikeOutcome, SpikeResult};
use super::math_calculations::{exponential_moving_average, open_to_close_change_pct, volume_ratio};

#[derive(Debug, Clone)]
pub struct VolumeSpikeAnalyzer {
    days: usize,
    ratio_threshold: f64,
    max_price_change_pct: f64,
}

impl VolumeSpikeAnalyzer {
    pub fn new(spike: &Spike) -> Self {
        Self {
            days: spike.days.max(1),
            ratio_threshold: spike.ratio_threshold,
            max_price_change_pct: spike.max_price_change_pct,
        }
    }

    pub fn from_config(config: &ScreenerConfig) -> Self {
        Self::new(&config.spike)
    }

    /// EMA window plus the current day
    pub fn required_candles(&self) -> usize {
        self.days + 1
    }

    /// Both bounds are inclusive
    pub fn is_candidate(&self, volume_ratio: f64, price_change_pct: f64) -> bool {
        volume_ratio >= self.ratio_threshold && price_change_pct <= self.max_price_change_pct
    }

    /// Scores one symbol from its oldest-first daily candles. Never fails:
    /// anything unusable comes back as a degraded neutral outcome.
    pub fn analyze(&self, symbol: &str, candles: &[Candle]) -> SpikeOutcome {
        let required = self.required_candles();
        if candles.len() < required {
            return SpikeOutcome::degraded(
                symbol,
                SpikeFailure::InsufficientCandles {
                    required,
                    received: candles.len(),
                },
            );
        }

        // Only the most recent window counts if the exchange sent extra history
        let window = &candles[candles.len() - required..];
        if let Some(reason) = malformed_reason(window) {
            return SpikeOutcome::degraded(symbol, SpikeFailure::MalformedCandle(reason));
        }

        let Some((current, historical)) = window.split_last() else {
            return SpikeOutcome::degraded(
                symbol,
                SpikeFailure::InsufficientCandles { required, received: 0 },
            );
        };

        let volumes: Vec<f64> = historical.iter().map(|c| c.volume).collect();
        let Some(baseline) = exponential_moving_average(&volumes, self.days) else {
            return SpikeOutcome::degraded(
                symbol,
                SpikeFailure::InsufficientCandles { required, received: candles.len() },
            );
        };

        let ratio = volume_ratio(current.volume, baseline);
        let change = open_to_close_change_pct(current.open, current.close);

        debug!(
            symbol = symbol,
            baseline = baseline,
            current_volume = current.volume,
            volume_ratio = ratio,
            price_change_pct = change,
            "Volume spike computed"
        );

        SpikeOutcome::Scored(SpikeResult {
            symbol: symbol.to_string(),
            volume_ratio: ratio,
            price_change_pct: change,
            is_candidate: self.is_candidate(ratio, change),
        })
    }

    /// Fetches daily candles through the gateway and scores them. Transport
    /// and decoding failures are folded into a degraded outcome.
    pub async fn evaluate<G>(&self, gateway: &G, symbol: &str) -> SpikeOutcome
    where
        G: ExchangeGateway + ?Sized,
    {
        let outcome = match gateway.fetch_daily_candles(symbol, self.required_candles()).await {
            Ok(candles) => self.analyze(symbol, &candles),
            Err(ClientError::Decode { reason, .. }) => {
                SpikeOutcome::degraded(symbol, SpikeFailure::MalformedCandle(reason))
            }
            Err(e) => SpikeOutcome::degraded(symbol, SpikeFailure::Fetch(e.to_string())),
        };

        if let Some(reason) = outcome.failure() {
            warn!(symbol = symbol, reason = %reason, "Symbol degraded to neutral result");
        }
        outcome
    }
}

fn malformed_reason(candles: &[Candle]) -> Option<String> {
    for candle in candles {
        let fields = [candle.open, candle.high, candle.low, candle.close, candle.volume];
        if fields.iter().any(|v| !v.is_finite()) {
            return Some(format!("non-finite value in candle at {}", candle.timestamp));
        }
        if candle.volume < 0.0 {
            return Some(format!("negative volume in candle at {}", candle.timestamp));
        }
    }

    match candles.last() {
        Some(current) if current.open <= 0.0 => {
            Some(format!("current candle opens at {}", current.open))
        }
        _ => None,
    }
}
