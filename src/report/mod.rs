//! Reporting utilities: severity ranking and formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the analyzers stay clean and testable
//! - output changes are localized (important for future snapshot tests)

use crate::domain::{AnomalyRecord, ForecastRecord, QualityScoreRecord};
use crate::io::ingest::IngestedFacts;
use crate::series::CountryError;

/// Rank the most severe anomaly rows (highest score first).
pub fn top_severity(records: &[AnomalyRecord], top_n: usize) -> Vec<AnomalyRecord> {
    let mut sorted = records.to_vec();
    sorted.sort_by(|a, b| {
        b.anomaly_severity_score
            .partial_cmp(&a.anomaly_severity_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    sorted.into_iter().take(top_n).collect()
}

/// Format the full run summary (dataset stats + quality table + anomaly and
/// forecast coverage + accumulated errors).
pub fn format_run_summary(
    facts: &IngestedFacts,
    anomalies: &[AnomalyRecord],
    quality: &[QualityScoreRecord],
    forecasts: &[ForecastRecord],
    country_errors: &[CountryError],
    top_n: usize,
) -> String {
    let mut out = String::new();

    out.push_str("=== msig - Macro Indicator Signals ===\n");
    out.push_str(&format!(
        "Input: rows={}/{} | countries={} | span={}..{}\n",
        facts.rows_used, facts.rows_read, facts.stats.n_countries, facts.stats.date_min, facts.stats.date_max,
    ));

    if !facts.row_errors.is_empty() {
        out.push_str(&format!("Row errors: {} (showing up to 5)\n", facts.row_errors.len()));
        for e in facts.row_errors.iter().take(5) {
            out.push_str(&format!(
                "  line {}: {} {}\n",
                e.line,
                e.country_code.as_deref().unwrap_or("-"),
                e.message
            ));
        }
    }

    out.push_str("\nQuality:\n");
    out.push_str("  country  grade  overall  compl  timel  valid  consist  issue\n");
    for q in quality {
        let mark = if q.requires_attention { " !" } else { "" };
        out.push_str(&format!(
            "  {:<7}  {:<5}  {:>7.1}  {:>5.1}  {:>5.1}  {:>5.1}  {:>7.1}  {}{}\n",
            q.country_code,
            q.quality_grade.as_str(),
            q.overall_quality_score,
            q.completeness_score,
            q.timeliness_score,
            q.validity_score,
            q.consistency_score,
            q.primary_issue.as_str(),
            mark,
        ));
    }

    let flagged = anomalies.iter().filter(|r| r.is_any_anomaly).count();
    out.push_str(&format!("\nAnomalies: {flagged} flagged of {} rows\n", anomalies.len()));
    let top = top_severity(anomalies, top_n);
    for r in top.iter().filter(|r| r.is_any_anomaly) {
        out.push_str(&format!(
            "  {} {}  severity={:>5.1}  z_u={} z_i={}\n",
            r.reference_date,
            r.country_code,
            r.anomaly_severity_score,
            fmt_z(r.unemployment.z_score),
            fmt_z(r.inflation.z_score),
        ));
    }

    let forecast_countries = {
        let mut codes: Vec<&str> = forecasts.iter().map(|f| f.country_code.as_str()).collect();
        codes.dedup();
        codes.len()
    };
    out.push_str(&format!(
        "\nForecasts: {} rows across {forecast_countries} countries\n",
        forecasts.len()
    ));
    for f in forecasts.iter().filter(|f| f.forecast_horizon_months == 1) {
        out.push_str(&format!(
            "  {:<7} last={:.2} ({})  h1={:.2} [{:.2}, {:.2}]  confidence={}\n",
            f.country_code,
            f.last_actual_value,
            f.last_actual_date,
            f.forecast_ensemble,
            f.prediction_interval_lower,
            f.prediction_interval_upper,
            f.forecast_confidence.as_str(),
        ));
    }

    if !country_errors.is_empty() {
        out.push_str(&format!("\nCountries skipped: {}\n", country_errors.len()));
        for e in country_errors {
            out.push_str(&format!("  {}: {}\n", e.country_code, e.message));
        }
    }

    out
}

fn fmt_z(z: Option<f64>) -> String {
    z.map(|v| format!("{v:+.2}")).unwrap_or_else(|| "-".to_string())
}
