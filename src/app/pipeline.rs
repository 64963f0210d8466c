//! Shared analysis pipeline used by the CLI front-end.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! ingest -> group by country -> {anomalies, quality, forecasts} -> outputs
//!
//! The three analyzers consume the same per-country series independently;
//! there is no inter-analyzer dependency. Countries are processed in
//! parallel and results aggregated by concatenation, so the output order is
//! deterministic (countries sorted by code, rows by date).

use chrono::NaiveDateTime;
use rayon::prelude::*;

use crate::analysis::{AnomalyDetector, ForecastEngine, QualityScorer};
use crate::domain::{AnalysisConfig, AnomalyRecord, ForecastRecord, QualityScoreRecord};
use crate::error::AppError;
use crate::io::ingest::{load_facts, IngestedFacts};
use crate::series::{build_country_series, CountryError};

/// All computed outputs of a single `msig analyze` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub facts: IngestedFacts,
    pub countries_analyzed: usize,
    pub anomalies: Vec<AnomalyRecord>,
    pub quality: Vec<QualityScoreRecord>,
    pub forecasts: Vec<ForecastRecord>,
    pub country_errors: Vec<CountryError>,
}

/// Execute the full analysis pipeline from the input CSV.
pub fn run_analysis(config: &AnalysisConfig, now: NaiveDateTime) -> Result<RunOutput, AppError> {
    let facts = load_facts(&config.input_path)?;
    run_analysis_with_facts(config, facts, now)
}

/// Execute the analysis pipeline with already-ingested facts.
///
/// This is useful for tests and for front-ends that source the relation
/// elsewhere (e.g. straight from the Eurostat client).
pub fn run_analysis_with_facts(
    config: &AnalysisConfig,
    facts: IngestedFacts,
    now: NaiveDateTime,
) -> Result<RunOutput, AppError> {
    let (series, mut country_errors) = build_country_series(facts.readings.clone());

    let detector = AnomalyDetector::new(config.anomaly.clone());
    let scorer = QualityScorer::new(config.quality.clone());
    let engine = ForecastEngine::new(config.forecast.clone());
    let tracked = facts.tracked;

    // Per-country passes are pure; collect() preserves the (sorted) country
    // order, so concatenated outputs are reproducible run to run.
    let per_country_anomalies: Vec<Vec<AnomalyRecord>> =
        series.par_iter().map(|s| detector.detect(s)).collect();
    let anomalies: Vec<AnomalyRecord> = per_country_anomalies.into_iter().flatten().collect();

    let quality: Vec<QualityScoreRecord> = series
        .par_iter()
        .map(|s| scorer.score(s, tracked, now))
        .collect();

    let forecast_results: Vec<Result<Vec<ForecastRecord>, CountryError>> = series
        .par_iter()
        .map(|s| {
            engine.forecast(s, now).map_err(|message| CountryError {
                country_code: s.country_code.clone(),
                message,
            })
        })
        .collect();

    let mut forecasts = Vec::new();
    for result in forecast_results {
        match result {
            Ok(rows) => forecasts.extend(rows),
            Err(e) => country_errors.push(e),
        }
    }

    Ok(RunOutput {
        facts,
        countries_analyzed: series.len(),
        anomalies,
        quality,
        forecasts,
        country_errors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::IndicatorReading;
    use crate::io::ingest::read_facts;
    use chrono::{Months, NaiveDate, NaiveTime};
    use std::fmt::Write as _;

    fn monthly_csv(countries: &[(&str, usize, f64)]) -> String {
        // For each (code, months, base): a gently rising unemployment series
        // and a flat inflation series.
        let mut csv = String::from(
            "country_code,reference_date,reference_year,reference_month,indicator_key,unemployment_rate_pct,inflation_rate_mom_pct\n",
        );
        let start = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap();
        for (code, months, base) in countries {
            for i in 0..*months {
                let date = start.checked_add_months(Months::new(i as u32)).unwrap();
                writeln!(
                    csv,
                    "{code},{date},{},{},{code}_{},{:.3},0.2",
                    date.format("%Y"),
                    date.format("%m"),
                    date.format("%Y%m"),
                    base + 0.05 * i as f64,
                )
                .unwrap();
            }
        }
        csv
    }

    fn config() -> AnalysisConfig {
        AnalysisConfig {
            input_path: std::path::PathBuf::from("unused"),
            anomalies_out: None,
            quality_out: None,
            forecasts_out: None,
            summary_json_out: None,
            as_of: None,
            anomaly: Default::default(),
            quality: Default::default(),
            forecast: Default::default(),
            top_n: 10,
        }
    }

    fn midnight(year: i32, month: u32, day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(year, month, day).unwrap().and_time(NaiveTime::MIN)
    }

    #[test]
    fn produces_all_three_relations() {
        let csv = monthly_csv(&[("DE", 30, 3.0), ("FR", 30, 7.0)]);
        let facts = read_facts(csv.as_bytes()).unwrap();
        let run = run_analysis_with_facts(&config(), facts, midnight(2024, 7, 15)).unwrap();

        assert_eq!(run.countries_analyzed, 2);
        assert_eq!(run.anomalies.len(), 60);
        assert_eq!(run.quality.len(), 2);
        // Both countries have ≥24 months → 6 forecast rows each.
        assert_eq!(run.forecasts.len(), 12);
        assert!(run.country_errors.is_empty());

        // Output ordering follows sorted country codes.
        assert_eq!(run.quality[0].country_code, "DE");
        assert_eq!(run.quality[1].country_code, "FR");
        assert_eq!(run.anomalies[0].country_code, "DE");
        assert_eq!(run.forecasts[0].country_code, "DE");
    }

    #[test]
    fn short_history_country_gets_no_forecast_but_everything_else() {
        let csv = monthly_csv(&[("DE", 30, 3.0), ("PL", 5, 2.9)]);
        let facts = read_facts(csv.as_bytes()).unwrap();
        let run = run_analysis_with_facts(&config(), facts, midnight(2024, 7, 15)).unwrap();

        assert_eq!(run.countries_analyzed, 2);
        assert_eq!(run.quality.len(), 2);
        assert_eq!(run.forecasts.len(), 6);
        assert!(run.forecasts.iter().all(|f| f.country_code == "DE"));

        // The short country still gets anomaly rows, with missing z-scores.
        let pl: Vec<_> = run.anomalies.iter().filter(|a| a.country_code == "PL").collect();
        assert_eq!(pl.len(), 5);
        assert!(pl.iter().all(|a| a.unemployment.z_score.is_none() && !a.is_any_anomaly));
    }

    #[test]
    fn duplicate_date_country_is_isolated() {
        let mut readings = Vec::new();
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        for code in ["DE", "DE", "FR"] {
            readings.push(IndicatorReading {
                country_code: code.to_string(),
                reference_date: date,
                reference_year: 2024,
                reference_month: 1,
                indicator_key: format!("{code}_202401"),
                unemployment_rate_pct: Some(5.0),
                inflation_rate_mom_pct: None,
            });
        }
        let csv = monthly_csv(&[("FR", 2, 7.0)]);
        let mut facts = read_facts(csv.as_bytes()).unwrap();
        facts.readings = readings;

        let run = run_analysis_with_facts(&config(), facts, midnight(2024, 7, 15)).unwrap();
        assert_eq!(run.countries_analyzed, 1);
        assert_eq!(run.country_errors.len(), 1);
        assert_eq!(run.country_errors[0].country_code, "DE");
        assert_eq!(run.quality.len(), 1);
        assert_eq!(run.quality[0].country_code, "FR");
    }
}
