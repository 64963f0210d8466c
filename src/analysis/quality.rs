//! Composite data-quality scoring, one record per country.
//!
//! Four dimensions, each in [0,100]:
//! - completeness: share of non-missing values per tracked column
//! - timeliness: age of the latest reference date vs "now"
//! - validity: share of non-missing values inside the plausible range
//! - consistency: penalty for runs of repeated values
//!
//! The overall score is a weighted blend; the grade, primary issue and
//! attention flag are derived from it with fixed, inclusive boundaries.

use chrono::NaiveDateTime;

use crate::domain::{
    CountrySeries, Grade, PrimaryIssue, QualityScoreRecord, QualityThresholds, TrackedColumns, TrackedIndicator,
    MODEL_VERSION,
};
use crate::math::mean;

pub struct QualityScorer {
    thresholds: QualityThresholds,
}

impl QualityScorer {
    pub fn new(thresholds: QualityThresholds) -> Self {
        Self { thresholds }
    }

    /// Score one country's series. `now` drives timeliness and the
    /// `scored_at` stamp; callers pin it for reproducible runs.
    pub fn score(&self, series: &CountrySeries, tracked: TrackedColumns, now: NaiveDateTime) -> QualityScoreRecord {
        let completeness = self.completeness(series, tracked);
        let validity = self.validity(series);
        let consistency_score = self.consistency(series);

        // Series are non-empty by construction; fall back to "now" rather
        // than panicking if that ever changes.
        let latest = series.latest_date().unwrap_or_else(|| now.date());
        let days_since_latest = (now.date() - latest).num_days();
        let timeliness_score = self.timeliness(days_since_latest);

        let w = self.thresholds.weights;
        let overall = w.completeness * completeness.score
            + w.timeliness * timeliness_score
            + w.validity * validity.score
            + w.consistency * consistency_score;

        // Fixed priority order; the first dimension below the threshold wins.
        let ordered = [
            (PrimaryIssue::Completeness, completeness.score),
            (PrimaryIssue::Timeliness, timeliness_score),
            (PrimaryIssue::Validity, validity.score),
            (PrimaryIssue::Consistency, consistency_score),
        ];
        let primary_issue = ordered
            .into_iter()
            .find(|(_, score)| *score < self.thresholds.issue_threshold)
            .map(|(issue, _)| issue)
            .unwrap_or(PrimaryIssue::None);

        QualityScoreRecord {
            country_code: series.country_code.clone(),
            total_records: series.len(),
            completeness_score: completeness.score,
            unemployment_completeness: completeness.unemployment,
            inflation_completeness: completeness.inflation,
            timeliness_score,
            days_since_latest_data: days_since_latest,
            latest_data_date: latest,
            validity_score: validity.score,
            unemployment_validity: validity.unemployment,
            inflation_validity: validity.inflation,
            consistency_score,
            overall_quality_score: overall,
            quality_grade: Grade::from_score(overall),
            primary_issue,
            requires_attention: overall < self.thresholds.attention_threshold,
            scored_at: now,
            scoring_model_version: MODEL_VERSION.to_string(),
        }
    }

    /// Percent non-missing per present tracked column; the dimension is the
    /// mean over present columns, 0 when none are present.
    fn completeness(&self, series: &CountrySeries, tracked: TrackedColumns) -> DimensionParts {
        let total = series.len();
        let pct = |indicator: TrackedIndicator| -> Option<f64> {
            if !tracked.is_present(indicator) || total == 0 {
                return None;
            }
            Some(series.non_missing(indicator).len() as f64 / total as f64 * 100.0)
        };

        let unemployment = pct(TrackedIndicator::Unemployment);
        let inflation = pct(TrackedIndicator::Inflation);
        let present: Vec<f64> = [unemployment, inflation].into_iter().flatten().collect();

        DimensionParts {
            score: mean(&present).unwrap_or(0.0),
            unemployment,
            inflation,
        }
    }

    /// 100 inside the threshold window, then a 10-point decay per 30 days.
    fn timeliness(&self, days_since_latest: i64) -> f64 {
        if days_since_latest <= self.thresholds.timeliness_threshold_days {
            return 100.0;
        }
        let months_late = (days_since_latest - self.thresholds.timeliness_threshold_days) as f64 / 30.0;
        (100.0 - months_late * 10.0).max(0.0)
    }

    /// Percent of non-missing values inside the plausible range, per column
    /// with data; vacuously 100 when no data exists at all.
    fn validity(&self, series: &CountrySeries) -> DimensionParts {
        let pct = |indicator: TrackedIndicator| -> Option<f64> {
            let values = series.non_missing(indicator);
            if values.is_empty() {
                return None;
            }
            let (lo, hi) = self.thresholds.plausible_range(indicator);
            let in_range = values.iter().filter(|v| **v >= lo && **v <= hi).count();
            Some(in_range as f64 / values.len() as f64 * 100.0)
        };

        let unemployment = pct(TrackedIndicator::Unemployment);
        let inflation = pct(TrackedIndicator::Inflation);
        let with_data: Vec<f64> = [unemployment, inflation].into_iter().flatten().collect();

        DimensionParts {
            score: mean(&with_data).unwrap_or(100.0),
            unemployment,
            inflation,
        }
    }

    /// Penalize runs of repeated values: `max(0, 100 − 200·p)` where `p` is
    /// the fraction of consecutive equal-value transitions. Columns at or
    /// below the minimum sample default to 100, as does a country where no
    /// column qualifies.
    fn consistency(&self, series: &CountrySeries) -> f64 {
        let mut scores = Vec::new();
        for indicator in TrackedIndicator::ALL {
            let values = series.non_missing(indicator);
            if values.len() <= self.thresholds.min_consistency_sample {
                continue;
            }
            let repeats = values.windows(2).filter(|w| w[1] == w[0]).count();
            let p = repeats as f64 / values.len() as f64;
            scores.push((100.0 - 200.0 * p).max(0.0));
        }
        mean(&scores).unwrap_or(100.0)
    }
}

struct DimensionParts {
    score: f64,
    unemployment: Option<f64>,
    inflation: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::IndicatorReading;
    use chrono::{NaiveDate, NaiveTime};

    fn series(unemployment: &[Option<f64>], inflation: &[Option<f64>]) -> CountrySeries {
        assert_eq!(unemployment.len(), inflation.len());
        let readings = unemployment
            .iter()
            .zip(inflation)
            .enumerate()
            .map(|(i, (&u, &f))| {
                let year = 2023 + i as i32 / 12;
                let month = (i % 12) as u32 + 1;
                IndicatorReading {
                    country_code: "NL".to_string(),
                    reference_date: NaiveDate::from_ymd_opt(year, month, 1).unwrap(),
                    reference_year: year,
                    reference_month: month,
                    indicator_key: format!("NL_{year}{month:02}"),
                    unemployment_rate_pct: u,
                    inflation_rate_mom_pct: f,
                }
            })
            .collect();
        CountrySeries {
            country_code: "NL".to_string(),
            readings,
        }
    }

    fn at_midnight(date: NaiveDate) -> NaiveDateTime {
        date.and_time(NaiveTime::MIN)
    }

    fn scorer() -> QualityScorer {
        QualityScorer::new(QualityThresholds::default())
    }

    #[test]
    fn repeated_values_drive_consistency_to_zero_but_stay_computable() {
        let s = series(&[Some(5.0); 11], &[None; 11]);
        let now = at_midnight(s.latest_date().unwrap());
        let record = scorer().score(
            &s,
            TrackedColumns {
                unemployment: true,
                inflation: false,
            },
            now,
        );

        assert!((record.completeness_score - 100.0).abs() < 1e-9);
        assert!((record.timeliness_score - 100.0).abs() < 1e-9);
        assert!((record.validity_score - 100.0).abs() < 1e-9);
        // 10 of 11 transitions repeat: 100 − 200·(10/11) < 0.
        assert_eq!(record.consistency_score, 0.0);
        assert!((record.overall_quality_score - 80.0).abs() < 1e-9);
        assert_eq!(record.quality_grade, Grade::B);
        assert_eq!(record.primary_issue, PrimaryIssue::Consistency);
        assert!(!record.requires_attention);
    }

    #[test]
    fn timeliness_decays_ten_points_per_month_beyond_threshold() {
        let s = series(&[Some(5.0); 3], &[None; 3]);
        let latest = s.latest_date().unwrap();
        let now = at_midnight(latest + chrono::Duration::days(200));
        let record = scorer().score(&s, TrackedColumns::all(), now);

        assert_eq!(record.days_since_latest_data, 200);
        // 100 − 10·((200−90)/30) = 63.333…
        assert!((record.timeliness_score - 63.333333).abs() < 1e-4);
    }

    #[test]
    fn fresh_data_scores_full_timeliness() {
        let s = series(&[Some(5.0); 3], &[None; 3]);
        let now = at_midnight(s.latest_date().unwrap() + chrono::Duration::days(90));
        let record = scorer().score(&s, TrackedColumns::all(), now);
        assert!((record.timeliness_score - 100.0).abs() < 1e-9);
    }

    #[test]
    fn sparse_column_pulls_completeness_down() {
        // Inflation column present but entirely missing: contributes 0%.
        let s = series(&[Some(5.0); 4], &[None; 4]);
        let now = at_midnight(s.latest_date().unwrap());
        let record = scorer().score(&s, TrackedColumns::all(), now);

        assert_eq!(record.unemployment_completeness, Some(100.0));
        assert_eq!(record.inflation_completeness, Some(0.0));
        assert!((record.completeness_score - 50.0).abs() < 1e-9);
        assert_eq!(record.primary_issue, PrimaryIssue::Completeness);
    }

    #[test]
    fn out_of_range_values_reduce_validity() {
        let s = series(
            &[Some(5.0), Some(35.0), Some(10.0), Some(-2.0)],
            &[Some(1.0), Some(1.0), Some(1.0), Some(1.0)],
        );
        let now = at_midnight(s.latest_date().unwrap());
        let record = scorer().score(&s, TrackedColumns::all(), now);

        // 2 of 4 unemployment values inside [0, 30].
        assert_eq!(record.unemployment_validity, Some(50.0));
        assert_eq!(record.inflation_validity, Some(100.0));
        assert!((record.validity_score - 75.0).abs() < 1e-9);
    }

    #[test]
    fn absent_columns_yield_neutral_dimensions() {
        let s = series(&[None; 3], &[None; 3]);
        let now = at_midnight(s.latest_date().unwrap());
        let record = scorer().score(
            &s,
            TrackedColumns {
                unemployment: false,
                inflation: false,
            },
            now,
        );

        assert_eq!(record.completeness_score, 0.0);
        assert_eq!(record.validity_score, 100.0);
        assert_eq!(record.consistency_score, 100.0);
        assert_eq!(record.primary_issue, PrimaryIssue::Completeness);
    }

    #[test]
    fn short_series_defaults_consistency_to_full_score() {
        // 10 non-missing values is not strictly more than the minimum.
        let s = series(&[Some(5.0); 10], &[None; 10]);
        let now = at_midnight(s.latest_date().unwrap());
        let record = scorer().score(&s, TrackedColumns::all(), now);
        assert_eq!(record.consistency_score, 100.0);
    }
}
