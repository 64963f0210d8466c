//! Statistical anomaly flags per indicator per row.
//!
//! Three criteria per tracked indicator:
//! - z-score magnitude over the country's own history
//! - IQR fences (`Q1 − m·IQR`, `Q3 + m·IQR`)
//! - month-over-month rate of change
//!
//! Minimum-sample policy: below `min_sample` non-missing values the z-score
//! stays missing and no flag triggers for that indicator. A zero or undefined
//! standard deviation defines every z-score as 0, so a flat series is never
//! flagged on the z criterion alone.

use crate::domain::{AnomalyRecord, AnomalyThresholds, CountrySeries, IndicatorFlags, TrackedIndicator};
use crate::math::{clip, mean, quantile, sample_std};

pub struct AnomalyDetector {
    thresholds: AnomalyThresholds,
}

impl AnomalyDetector {
    pub fn new(thresholds: AnomalyThresholds) -> Self {
        Self { thresholds }
    }

    /// One record per reading, in date order.
    pub fn detect(&self, series: &CountrySeries) -> Vec<AnomalyRecord> {
        let unemployment = self.indicator_flags(&series.values(TrackedIndicator::Unemployment));
        let inflation = self.indicator_flags(&series.values(TrackedIndicator::Inflation));

        series
            .readings
            .iter()
            .zip(unemployment)
            .zip(inflation)
            .map(|((reading, u), i)| AnomalyRecord {
                indicator_key: reading.indicator_key.clone(),
                country_code: reading.country_code.clone(),
                reference_date: reading.reference_date,
                reference_year: reading.reference_year,
                reference_month: reading.reference_month,
                unemployment_rate_pct: reading.unemployment_rate_pct,
                inflation_rate_mom_pct: reading.inflation_rate_mom_pct,
                is_any_anomaly: u.is_anomaly || i.is_anomaly,
                anomaly_severity_score: severity(u.z_score, i.z_score),
                unemployment: u,
                inflation: i,
            })
            .collect()
    }

    /// Row-aligned flags for one indicator.
    fn indicator_flags(&self, values: &[Option<f64>]) -> Vec<IndicatorFlags> {
        let non_missing: Vec<f64> = values.iter().flatten().copied().collect();
        if non_missing.len() < self.thresholds.min_sample {
            return vec![IndicatorFlags::default(); values.len()];
        }

        let m = mean(&non_missing);
        let std = sample_std(&non_missing);
        let degenerate = match std {
            Some(s) => s == 0.0 || !s.is_finite(),
            None => true,
        };

        let fences = iqr_fences(&non_missing, self.thresholds.iqr_multiplier);

        let mut flags = Vec::with_capacity(values.len());
        let mut prev: Option<f64> = None;

        for &value in values {
            let z_score = match value {
                // Degenerate variance: every z-score is defined as 0.
                _ if degenerate => Some(0.0),
                Some(x) => match (m, std) {
                    (Some(m), Some(s)) => Some((x - m) / s),
                    _ => None,
                },
                None => None,
            };

            let iqr_outlier = match (value, fences) {
                (Some(x), Some((lo, hi))) => x < lo || x > hi,
                _ => false,
            };

            let roc_anomaly = match (value, prev) {
                (Some(x), Some(p)) => (x / p - 1.0).abs() > self.thresholds.rate_of_change_threshold,
                _ => false,
            };
            if let Some(x) = value {
                prev = Some(x);
            }

            let z_triggers = z_score.map(|z| z.abs() > self.thresholds.z_score_threshold).unwrap_or(false);

            flags.push(IndicatorFlags {
                z_score,
                iqr_outlier,
                roc_anomaly,
                is_anomaly: z_triggers || iqr_outlier || roc_anomaly,
            });
        }

        flags
    }
}

fn iqr_fences(values: &[f64], multiplier: f64) -> Option<(f64, f64)> {
    let q1 = quantile(values, 0.25)?;
    let q3 = quantile(values, 0.75)?;
    let iqr = q3 - q1;
    Some((q1 - multiplier * iqr, q3 + multiplier * iqr))
}

/// `10·clip(|z_u|,0,5) + 10·clip(|z_i|,0,5)`, clipped to [0,100];
/// a missing z contributes 0.
fn severity(z_unemployment: Option<f64>, z_inflation: Option<f64>) -> f64 {
    let part = |z: Option<f64>| 10.0 * clip(z.map(f64::abs).unwrap_or(0.0), 0.0, 5.0);
    clip(part(z_unemployment) + part(z_inflation), 0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::IndicatorReading;
    use chrono::NaiveDate;

    fn series(unemployment: &[Option<f64>]) -> CountrySeries {
        let readings = unemployment
            .iter()
            .enumerate()
            .map(|(i, &u)| {
                let year = 2023 + i as i32 / 12;
                let month = (i % 12) as u32 + 1;
                IndicatorReading {
                    country_code: "DE".to_string(),
                    reference_date: NaiveDate::from_ymd_opt(year, month, 1).unwrap(),
                    reference_year: year,
                    reference_month: month,
                    indicator_key: format!("DE_{year}{month:02}"),
                    unemployment_rate_pct: u,
                    inflation_rate_mom_pct: None,
                }
            })
            .collect();
        CountrySeries {
            country_code: "DE".to_string(),
            readings,
        }
    }

    fn detector() -> AnomalyDetector {
        AnomalyDetector::new(AnomalyThresholds::default())
    }

    #[test]
    fn identical_values_are_never_flagged() {
        let s = series(&[Some(5.0); 11]);
        let records = detector().detect(&s);

        assert_eq!(records.len(), 11);
        for r in &records {
            // Degenerate variance: z defined as exactly 0.
            assert_eq!(r.unemployment.z_score, Some(0.0));
            assert!(!r.unemployment.iqr_outlier);
            assert!(!r.unemployment.roc_anomaly);
            assert!(!r.unemployment.is_anomaly);
            assert!(!r.is_any_anomaly);
            assert_eq!(r.anomaly_severity_score, 0.0);
        }
    }

    #[test]
    fn below_minimum_sample_emits_missing_z_and_false_flags() {
        let s = series(&[Some(5.0), Some(9.0), Some(2.0), Some(14.0), Some(5.0)]);
        let records = detector().detect(&s);

        assert_eq!(records.len(), 5);
        for r in &records {
            assert!(r.unemployment.z_score.is_none());
            assert!(!r.unemployment.is_anomaly);
            assert!(!r.is_any_anomaly);
            assert_eq!(r.anomaly_severity_score, 0.0);
        }
    }

    #[test]
    fn spike_triggers_rate_of_change_and_iqr() {
        // Gentle ramp plus one large spike at the end.
        let mut values: Vec<Option<f64>> = (0..12).map(|i| Some(5.0 + 0.1 * i as f64)).collect();
        values.push(Some(20.0));
        let records = detector().detect(&series(&values));

        let spike = records.last().unwrap();
        assert!(spike.unemployment.roc_anomaly);
        assert!(spike.unemployment.iqr_outlier);
        assert!(spike.unemployment.is_anomaly);
        assert!(spike.is_any_anomaly);

        // A mid-ramp row stays clean.
        let mid = &records[5];
        assert!(!mid.unemployment.roc_anomaly);
        assert!(!mid.unemployment.iqr_outlier);
        assert!(mid.unemployment.z_score.is_some());
    }

    #[test]
    fn rate_of_change_skips_gaps_and_first_row() {
        let mut values: Vec<Option<f64>> = vec![Some(5.0); 10];
        values.push(None);
        values.push(Some(9.0)); // vs last non-missing 5.0 → +80%
        let records = detector().detect(&series(&values));

        assert!(!records[0].unemployment.roc_anomaly);
        assert!(!records[10].unemployment.roc_anomaly);
        assert!(records[11].unemployment.roc_anomaly);
    }

    #[test]
    fn severity_stays_within_bounds() {
        let mut values: Vec<Option<f64>> = (0..30).map(|i| Some(5.0 + 0.01 * i as f64)).collect();
        values.push(Some(500.0));
        let records = detector().detect(&series(&values));

        for r in &records {
            assert!(r.anomaly_severity_score >= 0.0);
            assert!(r.anomaly_severity_score <= 100.0);
        }
        // The spike maxes out the unemployment contribution.
        assert!(records.last().unwrap().anomaly_severity_score >= 50.0 - 1e-9);
    }

    #[test]
    fn missing_rows_keep_missing_z_but_count_toward_nothing() {
        let mut values: Vec<Option<f64>> = (0..11).map(|i| Some(5.0 + 0.2 * i as f64)).collect();
        values.insert(4, None);
        let records = detector().detect(&series(&values));

        assert!(records[4].unemployment.z_score.is_none());
        assert!(!records[4].unemployment.is_anomaly);
        // Rows with values still get a z-score.
        assert!(records[5].unemployment.z_score.is_some());
    }
}
