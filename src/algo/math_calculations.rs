/// Numeric helpers for the volume spike analyzer

/// Smoothing factor for an EMA with the given span: α = 2 / (span + 1)
pub fn ema_alpha(span: usize) -> f64 {
    2.0 / (span as f64 + 1.0)
}

/// Final value of the recursive EMA over `values`, seeded with the first value.
/// Formula: ema_t = α·v_t + (1 − α)·ema_{t−1}
/// Returns `None` for an empty series.
pub fn exponential_moving_average(values: &[f64], span: usize) -> Option<f64> {
    let (first, rest) = values.split_first()?;
    let alpha = ema_alpha(span);

    let ema = rest
        .iter()
        .fold(*first, |prev, value| alpha * value + (1.0 - alpha) * prev);
    Some(ema)
}

/// Current volume over baseline; zero when the baseline is not positive
pub fn volume_ratio(current_volume: f64, baseline: f64) -> f64 {
    if baseline > 0.0 {
        current_volume / baseline
    } else {
        0.0
    }
}

/// Intraday open-to-close change of one candle, in percent
pub fn open_to_close_change_pct(open: f64, close: f64) -> f64 {
    (close - open) / open * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_flat_series_ema_equals_value() {
        let volumes = [100.0; 7];
        assert!(approx(exponential_moving_average(&volumes, 7).unwrap(), 100.0));
    }

    #[test]
    fn test_ema_recursion_matches_hand_computation() {
        // span 3 -> alpha 0.5
        let ema = exponential_moving_average(&[10.0, 20.0, 40.0], 3).unwrap();
        // 10 -> 15 -> 27.5
        assert!(approx(ema, 27.5));
    }

    #[test]
    fn test_ema_weights_recent_values() {
        let rising = exponential_moving_average(&[100.0, 100.0, 100.0, 100.0, 100.0, 100.0, 200.0], 7).unwrap();
        let falling = exponential_moving_average(&[200.0, 100.0, 100.0, 100.0, 100.0, 100.0, 100.0], 7).unwrap();
        assert!(rising > falling);
        assert!(approx(rising, 125.0));
    }

    #[test]
    fn test_empty_series_has_no_ema() {
        assert_eq!(exponential_moving_average(&[], 7), None);
    }

    #[test]
    fn test_volume_ratio_guards_zero_baseline() {
        assert_eq!(volume_ratio(400.0, 100.0), 4.0);
        assert_eq!(volume_ratio(400.0, 0.0), 0.0);
    }

    #[test]
    fn test_open_to_close_change() {
        assert!(approx(open_to_close_change_pct(2.0, 2.2), 10.0));
        assert!(approx(open_to_close_change_pct(2.0, 1.5), -25.0));
    }
}
