//! Fact-relation CSV ingest.
//!
//! This module turns the acquisition collaborator's flat table into validated
//! `IndicatorReading` rows.
//!
//! Design goals:
//! - **Strict schema** for required identifying columns (clear errors + exit code 2)
//! - **Row-level validation** (skip bad rows, but report what happened)
//! - **Column-presence tracking**: an absent indicator column is a policy
//!   case (its derived fields stay missing/false), not an error
//! - **Deterministic behavior** (no hidden coercions)
//!
//! Expected columns: `country_code`, `reference_date`, `reference_year`,
//! `reference_month`, `indicator_key`, and optionally the two tracked value
//! columns `unemployment_rate_pct` / `inflation_rate_mom_pct`.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use csv::StringRecord;
use serde::Serialize;

use crate::domain::{IndicatorReading, TrackedColumns, TrackedIndicator};
use crate::error::AppError;

/// A row-level error encountered during ingest.
#[derive(Debug, Clone, Serialize)]
pub struct RowError {
    pub line: usize,
    pub country_code: Option<String>,
    pub message: String,
}

/// Summary stats about the rows actually ingested.
#[derive(Debug, Clone, Serialize)]
pub struct FactStats {
    pub n_rows: usize,
    pub n_countries: usize,
    pub date_min: NaiveDate,
    pub date_max: NaiveDate,
}

/// Ingest output: validated readings + column presence + stats + row errors.
#[derive(Debug, Clone, Serialize)]
pub struct IngestedFacts {
    pub readings: Vec<IndicatorReading>,
    pub tracked: TrackedColumns,
    pub stats: FactStats,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
    pub rows_used: usize,
}

/// Load and validate the fact relation from a CSV file.
pub fn load_facts(path: &Path) -> Result<IngestedFacts, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open facts CSV '{}': {e}", path.display())))?;
    read_facts(file)
}

/// Load and validate the fact relation from any reader.
pub fn read_facts<R: Read>(reader: R) -> Result<IngestedFacts, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers: {e}")))?
        .clone();

    let header_map = build_header_map(&headers);
    ensure_required_columns_exist(&header_map)?;

    let tracked = TrackedColumns {
        unemployment: header_map.contains_key(TrackedIndicator::Unemployment.column_name()),
        inflation: header_map.contains_key(TrackedIndicator::Inflation.column_name()),
    };

    let mut readings = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // +2 because records() starts after the header row and CSV line
        // numbers are 1-based.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    country_code: None,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        match parse_row(&record, &header_map) {
            Ok(reading) => readings.push(reading),
            Err((country_code, message)) => row_errors.push(RowError {
                line,
                country_code,
                message,
            }),
        }
    }

    let rows_used = readings.len();
    if rows_used == 0 {
        return Err(AppError::new(3, "No valid rows remain after validation."));
    }

    let stats = compute_stats(&readings)
        .ok_or_else(|| AppError::new(3, "No valid rows remain after validation."))?;

    Ok(IngestedFacts {
        readings,
        tracked,
        stats,
        row_errors,
        rows_read,
        rows_used,
    })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet tools sometimes emit UTF-8 CSVs with a BOM prefix on the
    // first header. If we don't strip it, schema validation will incorrectly
    // report a missing column.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn ensure_required_columns_exist(header_map: &HashMap<String, usize>) -> Result<(), AppError> {
    for name in [
        "country_code",
        "reference_date",
        "reference_year",
        "reference_month",
        "indicator_key",
    ] {
        if !header_map.contains_key(name) {
            return Err(AppError::new(2, format!("Missing required column: `{name}`")));
        }
    }
    Ok(())
}

type RowParseError = (Option<String>, String);

fn parse_row(record: &StringRecord, header_map: &HashMap<String, usize>) -> Result<IndicatorReading, RowParseError> {
    let country_code = get_required(record, header_map, "country_code")
        .map_err(|e| (None, e))?
        .to_string();

    let with_country = |e: String| (Some(country_code.clone()), e);

    let reference_date = get_required(record, header_map, "reference_date")
        .and_then(parse_date)
        .map_err(with_country)?;
    let reference_year = get_required(record, header_map, "reference_year")
        .and_then(parse_int::<i32>)
        .map_err(with_country)?;
    let reference_month = get_required(record, header_map, "reference_month")
        .and_then(parse_int::<u32>)
        .map_err(with_country)?;
    if !(1..=12).contains(&reference_month) {
        return Err(with_country(format!("Invalid reference_month {reference_month} (expected 1..=12).")));
    }
    let indicator_key = get_required(record, header_map, "indicator_key")
        .map_err(with_country)?
        .to_string();

    let unemployment_rate_pct =
        parse_opt_f64(get_optional(record, header_map, TrackedIndicator::Unemployment.column_name()));
    let inflation_rate_mom_pct =
        parse_opt_f64(get_optional(record, header_map, TrackedIndicator::Inflation.column_name()));

    Ok(IndicatorReading {
        country_code,
        reference_date,
        reference_year,
        reference_month,
        indicator_key,
        unemployment_rate_pct,
        inflation_rate_mom_pct,
    })
}

fn compute_stats(readings: &[IndicatorReading]) -> Option<FactStats> {
    let mut countries = HashSet::new();
    let mut date_min: Option<NaiveDate> = None;
    let mut date_max: Option<NaiveDate> = None;

    for r in readings {
        countries.insert(r.country_code.as_str());
        date_min = Some(date_min.map_or(r.reference_date, |d: NaiveDate| d.min(r.reference_date)));
        date_max = Some(date_max.map_or(r.reference_date, |d: NaiveDate| d.max(r.reference_date)));
    }

    Some(FactStats {
        n_rows: readings.len(),
        n_countries: countries.len(),
        date_min: date_min?,
        date_max: date_max?,
    })
}

fn get_required<'a>(
    record: &'a StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> Result<&'a str, String> {
    let idx = header_map
        .get(name)
        .ok_or_else(|| format!("Missing required column: `{name}`"))?;
    record
        .get(*idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("Missing required value: `{name}`"))
}

fn get_optional<'a>(record: &'a StringRecord, header_map: &HashMap<String, usize>, name: &str) -> Option<&'a str> {
    let idx = header_map.get(name)?;
    record.get(*idx).map(str::trim).filter(|s| !s.is_empty())
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    // ISO dates are the norm; Eurostat time codes come as `YYYY-MM`, which we
    // resolve to the first of the month.
    const FMTS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];
    for fmt in FMTS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(d);
        }
    }
    if let Some(d) = parse_year_month(s) {
        return Ok(d);
    }
    Err(format!("Invalid date '{s}'. Expected YYYY-MM-DD, YYYY/MM/DD, or YYYY-MM."))
}

fn parse_year_month(s: &str) -> Option<NaiveDate> {
    let (year, month) = s.split_once('-')?;
    let year: i32 = year.parse().ok()?;
    let month: u32 = month.parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, 1)
}

fn parse_int<T: std::str::FromStr>(s: &str) -> Result<T, String> {
    s.parse::<T>().map_err(|_| format!("Invalid integer '{s}'."))
}

fn parse_opt_f64(s: Option<&str>) -> Option<f64> {
    let s = s?;
    let v = s.parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}
