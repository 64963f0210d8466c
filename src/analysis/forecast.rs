//! Six-month unemployment forecasts per eligible country.
//!
//! Three methods feed an ensemble at each horizon `h` (1..=6):
//! - the exponentially smoothed level plus `h` times the Holt trend
//! - Holt's linear trend forecast (`level + h·trend`)
//! - an OLS line fitted against the observation index
//!
//! The smoothing term deliberately borrows the Holt trend; downstream
//! consumers depend on that blend, so it is not a self-contained
//! trended-smoothing method.
//!
//! Countries with fewer than `min_history_months` non-missing observations
//! are skipped entirely (a minimum-history policy, not an error).

use chrono::{Datelike, Months, NaiveDate, NaiveDateTime};

use crate::domain::{ConfidenceBucket, CountrySeries, ForecastRecord, ForecastSettings, TrackedIndicator, MODEL_VERSION};
use crate::math::{fit_linear_trend, first_differences, mean, sample_std};
use crate::models::{holt_linear, simple_exponential};

pub struct ForecastEngine {
    settings: ForecastSettings,
}

impl ForecastEngine {
    pub fn new(settings: ForecastSettings) -> Self {
        Self { settings }
    }

    /// Exactly `horizon_months` records for an eligible country, an empty
    /// vector otherwise. `Err` means this one country could not be forecast
    /// (e.g. a forecast date outside the calendar range) and should be
    /// reported without affecting other countries.
    pub fn forecast(&self, series: &CountrySeries, generated_at: NaiveDateTime) -> Result<Vec<ForecastRecord>, String> {
        let observed: Vec<(NaiveDate, f64)> = series
            .readings
            .iter()
            .filter_map(|r| TrackedIndicator::Unemployment.value(r).map(|v| (r.reference_date, v)))
            .collect();

        if observed.len() < self.settings.min_history_months {
            return Ok(Vec::new());
        }

        let y: Vec<f64> = observed.iter().map(|(_, v)| *v).collect();
        let n = y.len();
        // Non-empty by the minimum-history check above.
        let (last_date, last_value) = observed[n - 1];

        let alpha = self.settings.smoothing_alpha;
        let beta = self.settings.trend_beta;

        let smoothed_level = simple_exponential(&y, alpha)
            .ok_or_else(|| "Empty series after minimum-history check.".to_string())?;
        let (holt_level, holt_trend) = holt_linear(&y, alpha, beta)
            .ok_or_else(|| "Empty series after minimum-history check.".to_string())?;
        let regression = fit_linear_trend(&y);

        let margin = self.interval_margin(&y);

        let mut records = Vec::with_capacity(self.settings.horizon_months as usize);
        for horizon in 1..=self.settings.horizon_months {
            let forecast_date = forecast_month(last_date, horizon)
                .ok_or_else(|| format!("Forecast date out of range at horizon {horizon}."))?;

            let h = horizon as f64;
            let smoothing_forecast = smoothed_level + h * holt_trend;
            let holt_forecast = holt_level + h * holt_trend;
            let regression_forecast = match regression {
                Some((intercept, slope)) => intercept + slope * (n as f64 + h - 1.0),
                // Too few usable points: repeat the last known value.
                None => last_value,
            };

            let ensemble = mean_of_finite(&[smoothing_forecast, holt_forecast, regression_forecast])
                .ok_or_else(|| format!("No finite forecast component at horizon {horizon}."))?;

            let lower = ensemble - margin;
            let upper = ensemble + margin;
            let width = upper - lower;

            records.push(ForecastRecord {
                country_code: series.country_code.clone(),
                forecast_date,
                forecast_horizon_months: horizon,
                last_actual_date: last_date,
                last_actual_value: last_value,
                forecast_exp_smoothing: smoothing_forecast,
                forecast_holt: holt_forecast,
                forecast_linear_reg: regression_forecast,
                forecast_ensemble: ensemble,
                prediction_interval_lower: lower,
                prediction_interval_upper: upper,
                prediction_interval_width: width,
                forecast_confidence: ConfidenceBucket::from_interval_width(width),
                forecast_generated_at: generated_at,
                model_version: MODEL_VERSION.to_string(),
                training_samples: n,
            });
        }

        Ok(records)
    }

    /// Half-width of the prediction interval, from the volatility of
    /// month-over-month changes: `z·σ·√(1 + 1/n)`. Below the minimum sample
    /// the interval is a flat ±1.
    fn interval_margin(&self, y: &[f64]) -> f64 {
        if y.len() < self.settings.min_interval_sample {
            return 1.0;
        }
        let sigma = sample_std(&first_differences(y)).unwrap_or(0.0);
        let z = if (self.settings.confidence_level - 0.95).abs() < 1e-12 {
            1.96
        } else {
            1.645
        };
        z * sigma * (1.0 + 1.0 / y.len() as f64).sqrt()
    }
}

/// First-of-month date `horizon` calendar months after `last_date`.
fn forecast_month(last_date: NaiveDate, horizon: u32) -> Option<NaiveDate> {
    last_date.checked_add_months(Months::new(horizon))?.with_day(1)
}

/// Mean over the finite entries; `None` when none remain.
fn mean_of_finite(components: &[f64]) -> Option<f64> {
    let finite: Vec<f64> = components.iter().copied().filter(|v| v.is_finite()).collect();
    mean(&finite)
}
