//! Synthetic fact-relation generation.
//!
//! Lets the analyzers be exercised end-to-end without network access: a
//! seeded random walk for unemployment (with occasional shocks so the
//! anomaly flags have something to find) and noisy month-over-month
//! inflation, over a fixed country set.

use chrono::{Datelike, Months, NaiveDate};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::IndicatorReading;
use crate::error::AppError;

/// Baseline levels per country: (code, unemployment %, inflation m/m %).
const COUNTRIES: [(&str, f64, f64); 6] = [
    ("AT", 5.1, 0.25),
    ("DE", 3.1, 0.20),
    ("ES", 11.7, 0.30),
    ("FR", 7.3, 0.25),
    ("IT", 7.8, 0.25),
    ("PL", 2.9, 0.35),
];

/// Unemployment stays inside this band regardless of the walk.
const UNEMPLOYMENT_FLOOR: f64 = 0.5;
const UNEMPLOYMENT_CEIL: f64 = 30.0;

#[derive(Debug, Clone)]
pub struct SampleSpec {
    /// Number of months per country, ending at `end_month`.
    pub months: usize,
    pub seed: u64,
    /// Last generated month (normalized to the first of the month).
    pub end_month: NaiveDate,
    /// Probability that a value is dropped (per indicator per row).
    pub missing_prob: f64,
    /// Probability of an unemployment shock in a given month.
    pub shock_prob: f64,
}

/// Generate a deterministic synthetic fact relation.
pub fn generate_facts(spec: &SampleSpec) -> Result<Vec<IndicatorReading>, AppError> {
    if spec.months == 0 {
        return Err(AppError::new(2, "Sample months must be > 0."));
    }
    if !(0.0..1.0).contains(&spec.missing_prob) || !(0.0..1.0).contains(&spec.shock_prob) {
        return Err(AppError::new(2, "Sample probabilities must be in [0, 1)."));
    }

    let end_month = spec
        .end_month
        .with_day(1)
        .ok_or_else(|| AppError::new(2, "Invalid sample end month."))?;
    let start_month = end_month
        .checked_sub_months(Months::new(spec.months as u32 - 1))
        .ok_or_else(|| AppError::new(2, "Sample window starts before the calendar range."))?;

    let mut rng = StdRng::seed_from_u64(spec.seed);
    let walk_step = Normal::new(0.0, 0.08)
        .map_err(|e| AppError::new(4, format!("Noise distribution error: {e}")))?;
    let inflation_noise = Normal::new(0.0, 0.4)
        .map_err(|e| AppError::new(4, format!("Noise distribution error: {e}")))?;

    let mut readings = Vec::with_capacity(COUNTRIES.len() * spec.months);

    for (code, unemployment_base, inflation_base) in COUNTRIES {
        let mut level = unemployment_base;
        let mut month = start_month;

        for _ in 0..spec.months {
            level += walk_step.sample(&mut rng);
            if rng.gen_range(0.0..1.0) < spec.shock_prob {
                level += 3.0;
            }
            level = level.clamp(UNEMPLOYMENT_FLOOR, UNEMPLOYMENT_CEIL);

            let inflation = inflation_base + inflation_noise.sample(&mut rng);

            // Draw the missing-value coins unconditionally so the stream of
            // random numbers (and thus every later value) does not depend on
            // the missing probability itself.
            let drop_unemployment = rng.gen_range(0.0..1.0) < spec.missing_prob;
            let drop_inflation = rng.gen_range(0.0..1.0) < spec.missing_prob;

            readings.push(IndicatorReading {
                country_code: code.to_string(),
                reference_date: month,
                reference_year: month.year(),
                reference_month: month.month(),
                indicator_key: format!("{code}_{}", month.format("%Y%m")),
                unemployment_rate_pct: (!drop_unemployment).then_some(level),
                inflation_rate_mom_pct: (!drop_inflation).then_some(inflation),
            });

            month = month
                .checked_add_months(Months::new(1))
                .ok_or_else(|| AppError::new(2, "Sample window exceeds the calendar range."))?;
        }
    }

    Ok(readings)
}
