//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during analysis
//! - exported to CSV/JSON
//! - reloaded later by dashboards or alerting jobs

use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Version tag stamped onto scored/forecast rows so downstream consumers can
/// tell which scoring logic produced them.
pub const MODEL_VERSION: &str = "1.0.0";

/// One monthly observation for one country.
///
/// This is the row shape of the fact relation produced by acquisition
/// (Eurostat fetch, synthetic sample, or an externally prepared CSV).
/// Immutable once ingested.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorReading {
    pub country_code: String,
    /// First-of-month reference date.
    pub reference_date: NaiveDate,
    pub reference_year: i32,
    pub reference_month: u32,
    /// Surrogate key carried through to the anomaly relation.
    pub indicator_key: String,
    pub unemployment_rate_pct: Option<f64>,
    pub inflation_rate_mom_pct: Option<f64>,
}

/// The two indicator columns the analyzers track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackedIndicator {
    Unemployment,
    Inflation,
}

impl TrackedIndicator {
    pub const ALL: [TrackedIndicator; 2] = [TrackedIndicator::Unemployment, TrackedIndicator::Inflation];

    /// Column name in the fact relation.
    pub fn column_name(self) -> &'static str {
        match self {
            TrackedIndicator::Unemployment => "unemployment_rate_pct",
            TrackedIndicator::Inflation => "inflation_rate_mom_pct",
        }
    }

    pub fn value(self, reading: &IndicatorReading) -> Option<f64> {
        match self {
            TrackedIndicator::Unemployment => reading.unemployment_rate_pct,
            TrackedIndicator::Inflation => reading.inflation_rate_mom_pct,
        }
    }
}

/// Which tracked indicator columns were present in the input header.
///
/// A column that is absent entirely (as opposed to present but sparse) is
/// excluded from completeness averaging and contributes no anomaly fields.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct TrackedColumns {
    pub unemployment: bool,
    pub inflation: bool,
}

impl TrackedColumns {
    pub fn all() -> Self {
        Self {
            unemployment: true,
            inflation: true,
        }
    }

    pub fn is_present(self, indicator: TrackedIndicator) -> bool {
        match indicator {
            TrackedIndicator::Unemployment => self.unemployment,
            TrackedIndicator::Inflation => self.inflation,
        }
    }
}

/// Ordered view of one country's readings.
///
/// Invariants (enforced by `series::build_country_series`):
/// - non-empty
/// - strictly ascending `reference_date`
/// - unique `reference_date` per row
#[derive(Debug, Clone)]
pub struct CountrySeries {
    pub country_code: String,
    pub readings: Vec<IndicatorReading>,
}

impl CountrySeries {
    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// Row-aligned values of one indicator (missing preserved as `None`).
    pub fn values(&self, indicator: TrackedIndicator) -> Vec<Option<f64>> {
        self.readings.iter().map(|r| indicator.value(r)).collect()
    }

    /// Non-missing values of one indicator, in date order.
    pub fn non_missing(&self, indicator: TrackedIndicator) -> Vec<f64> {
        self.readings.iter().filter_map(|r| indicator.value(r)).collect()
    }

    pub fn latest_date(&self) -> Option<NaiveDate> {
        self.readings.last().map(|r| r.reference_date)
    }
}

/// Per-indicator anomaly fields for one row.
///
/// `z_score` is `None` below the minimum-sample threshold or when the value
/// itself is missing; a missing z-score never triggers `is_anomaly`.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct IndicatorFlags {
    pub z_score: Option<f64>,
    pub iqr_outlier: bool,
    pub roc_anomaly: bool,
    /// OR of {|z| above threshold, IQR outlier, rate-of-change} with missing
    /// treated as false.
    pub is_anomaly: bool,
}

/// One anomaly relation row (one per input row).
#[derive(Debug, Clone, Serialize)]
pub struct AnomalyRecord {
    pub indicator_key: String,
    pub country_code: String,
    pub reference_date: NaiveDate,
    pub reference_year: i32,
    pub reference_month: u32,
    pub unemployment_rate_pct: Option<f64>,
    pub inflation_rate_mom_pct: Option<f64>,
    pub unemployment: IndicatorFlags,
    pub inflation: IndicatorFlags,
    pub is_any_anomaly: bool,
    /// `10·clip(|z_unemp|,0,5) + 10·clip(|z_infl|,0,5)`, clipped to [0,100].
    pub anomaly_severity_score: f64,
}

/// Letter grade derived from the overall quality score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    /// Step function with inclusive lower bounds at 90/80/70/60.
    pub fn from_score(overall: f64) -> Self {
        if overall >= 90.0 {
            Grade::A
        } else if overall >= 80.0 {
            Grade::B
        } else if overall >= 70.0 {
            Grade::C
        } else if overall >= 60.0 {
            Grade::D
        } else {
            Grade::F
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        }
    }
}

/// First quality dimension below the issue threshold, in fixed priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimaryIssue {
    Completeness,
    Timeliness,
    Validity,
    Consistency,
    None,
}

impl PrimaryIssue {
    pub fn as_str(self) -> &'static str {
        match self {
            PrimaryIssue::Completeness => "completeness",
            PrimaryIssue::Timeliness => "timeliness",
            PrimaryIssue::Validity => "validity",
            PrimaryIssue::Consistency => "consistency",
            PrimaryIssue::None => "none",
        }
    }
}

/// One quality relation row (one per country).
#[derive(Debug, Clone, Serialize)]
pub struct QualityScoreRecord {
    pub country_code: String,
    pub total_records: usize,

    pub completeness_score: f64,
    pub unemployment_completeness: Option<f64>,
    pub inflation_completeness: Option<f64>,

    pub timeliness_score: f64,
    pub days_since_latest_data: i64,
    pub latest_data_date: NaiveDate,

    pub validity_score: f64,
    pub unemployment_validity: Option<f64>,
    pub inflation_validity: Option<f64>,

    pub consistency_score: f64,

    pub overall_quality_score: f64,
    pub quality_grade: Grade,
    pub primary_issue: PrimaryIssue,
    pub requires_attention: bool,

    pub scored_at: NaiveDateTime,
    pub scoring_model_version: String,
}

/// Confidence bucket derived from the prediction-interval width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceBucket {
    High,
    Medium,
    Low,
}

impl ConfidenceBucket {
    pub fn from_interval_width(width: f64) -> Self {
        if width < 1.0 {
            ConfidenceBucket::High
        } else if width < 2.0 {
            ConfidenceBucket::Medium
        } else {
            ConfidenceBucket::Low
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConfidenceBucket::High => "high",
            ConfidenceBucket::Medium => "medium",
            ConfidenceBucket::Low => "low",
        }
    }
}

/// One forecast relation row (one per country per horizon month).
#[derive(Debug, Clone, Serialize)]
pub struct ForecastRecord {
    pub country_code: String,
    /// First-of-month date, `horizon` months after the last actual.
    pub forecast_date: NaiveDate,
    pub forecast_horizon_months: u32,
    pub last_actual_date: NaiveDate,
    pub last_actual_value: f64,

    pub forecast_exp_smoothing: f64,
    pub forecast_holt: f64,
    pub forecast_linear_reg: f64,
    pub forecast_ensemble: f64,

    pub prediction_interval_lower: f64,
    pub prediction_interval_upper: f64,
    pub prediction_interval_width: f64,
    pub forecast_confidence: ConfidenceBucket,

    pub forecast_generated_at: NaiveDateTime,
    pub model_version: String,
    pub training_samples: usize,
}

/// Thresholds for the anomaly detector.
///
/// Held by the detector at construction so tests can vary them independently.
#[derive(Debug, Clone)]
pub struct AnomalyThresholds {
    /// Absolute z-score above which a value is flagged.
    pub z_score_threshold: f64,
    /// IQR fence multiplier (`Q1 - m·IQR`, `Q3 + m·IQR`).
    pub iqr_multiplier: f64,
    /// Absolute month-over-month relative change above which a value is flagged.
    pub rate_of_change_threshold: f64,
    /// Minimum non-missing observations per indicator before any statistic is
    /// computed; below this, z-scores stay missing and no flag triggers.
    pub min_sample: usize,
}

impl Default for AnomalyThresholds {
    fn default() -> Self {
        Self {
            z_score_threshold: 3.0,
            iqr_multiplier: 1.5,
            rate_of_change_threshold: 0.5,
            min_sample: 11,
        }
    }
}

/// Weights of the four quality dimensions (should sum to 1).
#[derive(Debug, Clone, Copy)]
pub struct QualityWeights {
    pub completeness: f64,
    pub timeliness: f64,
    pub validity: f64,
    pub consistency: f64,
}

impl Default for QualityWeights {
    fn default() -> Self {
        Self {
            completeness: 0.30,
            timeliness: 0.25,
            validity: 0.25,
            consistency: 0.20,
        }
    }
}

/// Thresholds for the quality scorer.
#[derive(Debug, Clone)]
pub struct QualityThresholds {
    pub weights: QualityWeights,
    /// Days of data age tolerated before timeliness starts decaying.
    pub timeliness_threshold_days: i64,
    /// Plausible unemployment range (inclusive), percent.
    pub unemployment_range: (f64, f64),
    /// Plausible month-over-month inflation range (inclusive), percent.
    pub inflation_range: (f64, f64),
    /// Consistency requires strictly more than this many non-missing values.
    pub min_consistency_sample: usize,
    /// A dimension below this score becomes the primary issue.
    pub issue_threshold: f64,
    /// Overall score below this sets `requires_attention`.
    pub attention_threshold: f64,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            weights: QualityWeights::default(),
            timeliness_threshold_days: 90,
            unemployment_range: (0.0, 30.0),
            inflation_range: (-5.0, 20.0),
            min_consistency_sample: 10,
            issue_threshold: 80.0,
            attention_threshold: 70.0,
        }
    }
}

impl QualityThresholds {
    pub fn plausible_range(&self, indicator: TrackedIndicator) -> (f64, f64) {
        match indicator {
            TrackedIndicator::Unemployment => self.unemployment_range,
            TrackedIndicator::Inflation => self.inflation_range,
        }
    }
}

/// Settings for the forecast engine.
#[derive(Debug, Clone)]
pub struct ForecastSettings {
    /// Number of forward months to forecast.
    pub horizon_months: u32,
    /// Countries with fewer non-missing unemployment observations are skipped.
    pub min_history_months: usize,
    /// Exponential-smoothing level weight.
    pub smoothing_alpha: f64,
    /// Holt trend weight.
    pub trend_beta: f64,
    /// Minimum observations for a volatility-based prediction interval;
    /// below this the interval is the ensemble ± 1.
    pub min_interval_sample: usize,
    /// Interval confidence level (0.95 maps to z = 1.96, anything else to 1.645).
    pub confidence_level: f64,
}

impl Default for ForecastSettings {
    fn default() -> Self {
        Self {
            horizon_months: 6,
            min_history_months: 24,
            smoothing_alpha: 0.3,
            trend_beta: 0.1,
            min_interval_sample: 5,
            confidence_level: 0.95,
        }
    }
}

/// A full `msig analyze` run's configuration, derived from CLI flags.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub input_path: PathBuf,

    pub anomalies_out: Option<PathBuf>,
    pub quality_out: Option<PathBuf>,
    pub forecasts_out: Option<PathBuf>,
    pub summary_json_out: Option<PathBuf>,

    /// Pinned "now" for timeliness scoring and generated-at stamps.
    /// `None` means the local clock at invocation time.
    pub as_of: Option<NaiveDate>,

    pub anomaly: AnomalyThresholds,
    pub quality: QualityThresholds,
    pub forecast: ForecastSettings,

    /// How many top-severity anomaly rows to show in the report.
    pub top_n: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grade_boundaries_are_inclusive_at_lower_bound() {
        assert_eq!(Grade::from_score(90.0), Grade::A);
        assert_eq!(Grade::from_score(89.999), Grade::B);
        assert_eq!(Grade::from_score(80.0), Grade::B);
        assert_eq!(Grade::from_score(79.999), Grade::C);
        assert_eq!(Grade::from_score(70.0), Grade::C);
        assert_eq!(Grade::from_score(60.0), Grade::D);
        assert_eq!(Grade::from_score(59.999), Grade::F);
        assert_eq!(Grade::from_score(0.0), Grade::F);
    }

    #[test]
    fn confidence_bucket_boundaries() {
        assert_eq!(ConfidenceBucket::from_interval_width(0.99), ConfidenceBucket::High);
        assert_eq!(ConfidenceBucket::from_interval_width(1.0), ConfidenceBucket::Medium);
        assert_eq!(ConfidenceBucket::from_interval_width(1.99), ConfidenceBucket::Medium);
        assert_eq!(ConfidenceBucket::from_interval_width(2.0), ConfidenceBucket::Low);
    }

    #[test]
    fn default_quality_weights_sum_to_one() {
        let w = QualityWeights::default();
        let sum = w.completeness + w.timeliness + w.validity + w.consistency;
        assert!((sum - 1.0).abs() < 1e-12);
    }
}
