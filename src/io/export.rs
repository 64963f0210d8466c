//! Write the derived relations (and the fact relation) to CSV, plus a
//! machine-readable run summary as JSON.
//!
//! The CSV layouts are meant to be easy to consume in spreadsheets,
//! dashboards, or downstream alerting scripts.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::domain::{AnomalyRecord, ForecastRecord, IndicatorReading, QualityScoreRecord, MODEL_VERSION};
use crate::error::AppError;
use crate::io::ingest::{FactStats, RowError};
use crate::series::CountryError;

/// Write the anomaly relation (one row per input row).
pub fn write_anomalies_csv(path: &Path, records: &[AnomalyRecord]) -> Result<(), AppError> {
    let file = create(path)?;
    write_anomalies(file, records).map_err(|e| write_failed(path, e))
}

fn write_anomalies<W: Write>(mut out: W, records: &[AnomalyRecord]) -> std::io::Result<()> {
    writeln!(
        out,
        "indicator_key,country_code,reference_date,reference_year,reference_month,\
         unemployment_rate_pct,inflation_rate_mom_pct,\
         unemployment_z_score,unemployment_iqr_outlier,unemployment_roc_anomaly,\
         inflation_z_score,inflation_iqr_outlier,inflation_roc_anomaly,\
         is_unemployment_anomaly,is_inflation_anomaly,is_any_anomaly,anomaly_severity_score"
    )?;

    for r in records {
        writeln!(
            out,
            "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{:.6}",
            r.indicator_key,
            r.country_code,
            r.reference_date,
            r.reference_year,
            r.reference_month,
            fmt_opt(r.unemployment_rate_pct),
            fmt_opt(r.inflation_rate_mom_pct),
            fmt_opt(r.unemployment.z_score),
            r.unemployment.iqr_outlier,
            r.unemployment.roc_anomaly,
            fmt_opt(r.inflation.z_score),
            r.inflation.iqr_outlier,
            r.inflation.roc_anomaly,
            r.unemployment.is_anomaly,
            r.inflation.is_anomaly,
            r.is_any_anomaly,
            r.anomaly_severity_score,
        )?;
    }
    Ok(())
}

/// Write the quality relation (one row per country).
pub fn write_quality_csv(path: &Path, records: &[QualityScoreRecord]) -> Result<(), AppError> {
    let file = create(path)?;
    write_quality(file, records).map_err(|e| write_failed(path, e))
}

fn write_quality<W: Write>(mut out: W, records: &[QualityScoreRecord]) -> std::io::Result<()> {
    writeln!(
        out,
        "country_code,total_records,completeness_score,unemployment_completeness,inflation_completeness,\
         timeliness_score,days_since_latest_data,latest_data_date,\
         validity_score,unemployment_validity,inflation_validity,consistency_score,\
         overall_quality_score,quality_grade,primary_issue,requires_attention,scored_at,scoring_model_version"
    )?;

    for r in records {
        writeln!(
            out,
            "{},{},{:.6},{},{},{:.6},{},{},{:.6},{},{},{:.6},{:.6},{},{},{},{},{}",
            r.country_code,
            r.total_records,
            r.completeness_score,
            fmt_opt(r.unemployment_completeness),
            fmt_opt(r.inflation_completeness),
            r.timeliness_score,
            r.days_since_latest_data,
            r.latest_data_date,
            r.validity_score,
            fmt_opt(r.unemployment_validity),
            fmt_opt(r.inflation_validity),
            r.consistency_score,
            r.overall_quality_score,
            r.quality_grade.as_str(),
            r.primary_issue.as_str(),
            r.requires_attention,
            r.scored_at,
            r.scoring_model_version,
        )?;
    }
    Ok(())
}

/// Write the forecast relation (up to six rows per eligible country).
pub fn write_forecasts_csv(path: &Path, records: &[ForecastRecord]) -> Result<(), AppError> {
    let file = create(path)?;
    write_forecasts(file, records).map_err(|e| write_failed(path, e))
}

fn write_forecasts<W: Write>(mut out: W, records: &[ForecastRecord]) -> std::io::Result<()> {
    writeln!(
        out,
        "country_code,forecast_date,forecast_horizon_months,last_actual_date,last_actual_value,\
         forecast_exp_smoothing,forecast_holt,forecast_linear_reg,forecast_ensemble,\
         prediction_interval_lower,prediction_interval_upper,prediction_interval_width,\
         forecast_confidence,forecast_generated_at,model_version,training_samples"
    )?;

    for r in records {
        writeln!(
            out,
            "{},{},{},{},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6},{},{},{},{}",
            r.country_code,
            r.forecast_date,
            r.forecast_horizon_months,
            r.last_actual_date,
            r.last_actual_value,
            r.forecast_exp_smoothing,
            r.forecast_holt,
            r.forecast_linear_reg,
            r.forecast_ensemble,
            r.prediction_interval_lower,
            r.prediction_interval_upper,
            r.prediction_interval_width,
            r.forecast_confidence.as_str(),
            r.forecast_generated_at,
            r.model_version,
            r.training_samples,
        )?;
    }
    Ok(())
}

/// Write the fact relation itself (used by `fetch` and `sample`).
pub fn write_facts_csv(path: &Path, readings: &[IndicatorReading]) -> Result<(), AppError> {
    let file = create(path)?;
    write_facts(file, readings).map_err(|e| write_failed(path, e))
}

fn write_facts<W: Write>(mut out: W, readings: &[IndicatorReading]) -> std::io::Result<()> {
    writeln!(
        out,
        "country_code,reference_date,reference_year,reference_month,indicator_key,\
         unemployment_rate_pct,inflation_rate_mom_pct"
    )?;

    for r in readings {
        writeln!(
            out,
            "{},{},{},{},{},{},{}",
            r.country_code,
            r.reference_date,
            r.reference_year,
            r.reference_month,
            r.indicator_key,
            fmt_opt(r.unemployment_rate_pct),
            fmt_opt(r.inflation_rate_mom_pct),
        )?;
    }
    Ok(())
}

/// The "portable" representation of a full run, for dashboards that prefer
/// one JSON document over three CSVs.
#[derive(Debug, Serialize)]
pub struct RunSummaryFile<'a> {
    pub tool: &'static str,
    pub model_version: &'static str,
    pub generated_at: NaiveDateTime,
    pub stats: &'a FactStats,
    pub quality: &'a [QualityScoreRecord],
    pub forecasts: &'a [ForecastRecord],
    pub anomalous_rows: usize,
    pub anomaly_rows_total: usize,
    pub row_errors: &'a [RowError],
    pub country_errors: &'a [CountryError],
}

impl<'a> RunSummaryFile<'a> {
    pub fn new(
        generated_at: NaiveDateTime,
        stats: &'a FactStats,
        anomalies: &'a [AnomalyRecord],
        quality: &'a [QualityScoreRecord],
        forecasts: &'a [ForecastRecord],
        row_errors: &'a [RowError],
        country_errors: &'a [CountryError],
    ) -> Self {
        Self {
            tool: "msig",
            model_version: MODEL_VERSION,
            generated_at,
            stats,
            quality,
            forecasts,
            anomalous_rows: anomalies.iter().filter(|r| r.is_any_anomaly).count(),
            anomaly_rows_total: anomalies.len(),
            row_errors,
            country_errors,
        }
    }
}

/// Write the run summary JSON.
pub fn write_summary_json(path: &Path, summary: &RunSummaryFile<'_>) -> Result<(), AppError> {
    let file = create(path)?;
    serde_json::to_writer_pretty(file, summary)
        .map_err(|e| AppError::new(2, format!("Failed to write summary JSON '{}': {e}", path.display())))
}

fn create(path: &Path) -> Result<File, AppError> {
    File::create(path).map_err(|e| AppError::new(2, format!("Failed to create '{}': {e}", path.display())))
}

fn write_failed(path: &Path, e: std::io::Error) -> AppError {
    AppError::new(2, format!("Failed to write '{}': {e}", path.display()))
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.6}")).unwrap_or_default()
}
