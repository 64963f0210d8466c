//! Exponential smoothing recursions.
//!
//! The forecast engine relies on two primitive operations:
//! - a simple exponentially smoothed level (one-step base value)
//! - Holt's linear trend state `(level, trend)` for horizon extrapolation
//!
//! Both walk the series once and carry no state between calls.

/// Simple exponential smoothing: `level ← α·y + (1−α)·level`, seeded with the
/// first value. Returns the level after the last observation.
///
/// A single-value series returns that value; an empty series returns `None`.
pub fn simple_exponential(values: &[f64], alpha: f64) -> Option<f64> {
    let (&first, rest) = values.split_first()?;
    let mut level = first;
    for &y in rest {
        level = alpha * y + (1.0 - alpha) * level;
    }
    Some(level)
}

/// Holt's linear trend method. Returns `(level, trend)` after the last
/// observation; the horizon-`h` forecast is `level + h·trend`.
///
/// Seeds `level = y₁`, `trend = y₂ − y₁`, then updates from the second
/// observation on (the seed point participates in the first update as well).
/// Series shorter than three observations fall back to `(last, 0)`.
pub fn holt_linear(values: &[f64], alpha: f64, beta: f64) -> Option<(f64, f64)> {
    let &last = values.last()?;
    if values.len() < 3 {
        return Some((last, 0.0));
    }

    let mut level = values[0];
    let mut trend = values[1] - values[0];

    for &y in &values[1..] {
        let new_level = alpha * y + (1.0 - alpha) * (level + trend);
        trend = beta * (new_level - level) + (1.0 - beta) * trend;
        level = new_level;
    }

    Some((level, trend))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_exponential_constant_series() {
        let v = [3.5; 10];
        assert!((simple_exponential(&v, 0.3).unwrap() - 3.5).abs() < 1e-12);
    }

    #[test]
    fn simple_exponential_matches_hand_computation() {
        // level = 1.0; then 0.3·2 + 0.7·1 = 1.3; then 0.3·3 + 0.7·1.3 = 1.81
        let v = [1.0, 2.0, 3.0];
        assert!((simple_exponential(&v, 0.3).unwrap() - 1.81).abs() < 1e-12);
    }

    #[test]
    fn simple_exponential_empty_and_single() {
        assert!(simple_exponential(&[], 0.3).is_none());
        assert!((simple_exponential(&[7.0], 0.3).unwrap() - 7.0).abs() < 1e-12);
    }

    #[test]
    fn holt_tracks_exact_linear_ramp() {
        // On a perfect ramp the level tracks the series and the trend stays
        // at the true slope.
        let v: Vec<f64> = (0..24).map(|i| 5.0 + 0.1 * i as f64).collect();
        let (level, trend) = holt_linear(&v, 0.3, 0.1).unwrap();
        assert!((level - 7.3).abs() < 1e-9);
        assert!((trend - 0.1).abs() < 1e-9);
    }

    #[test]
    fn holt_constant_series_has_zero_trend() {
        let v = [2.0; 12];
        let (level, trend) = holt_linear(&v, 0.3, 0.1).unwrap();
        assert!((level - 2.0).abs() < 1e-12);
        assert!(trend.abs() < 1e-12);
    }

    #[test]
    fn holt_short_series_falls_back_to_last_value() {
        let (level, trend) = holt_linear(&[1.0, 9.0], 0.3, 0.1).unwrap();
        assert!((level - 9.0).abs() < 1e-12);
        assert_eq!(trend, 0.0);
    }
}
