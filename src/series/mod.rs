//! Grouping substrate: fact relation → ordered per-country series.
//!
//! Design goals:
//! - **Deterministic order** (countries sorted by code, rows by date)
//! - **Per-country isolation**: a malformed country (duplicate reference
//!   dates) is dropped with an error record; other countries are unaffected
//! - **No side effects**: the analyzers receive an owned, validated view

use std::collections::BTreeMap;

use serde::Serialize;

use crate::domain::{CountrySeries, IndicatorReading};

/// A country that could not be turned into a valid series.
#[derive(Debug, Clone, Serialize)]
pub struct CountryError {
    pub country_code: String,
    pub message: String,
}

/// Partition readings by country and sort each partition by reference date.
///
/// Countries violating the unique-date invariant are reported and omitted.
pub fn build_country_series(readings: Vec<IndicatorReading>) -> (Vec<CountrySeries>, Vec<CountryError>) {
    let mut by_country: BTreeMap<String, Vec<IndicatorReading>> = BTreeMap::new();
    for reading in readings {
        by_country.entry(reading.country_code.clone()).or_default().push(reading);
    }

    let mut series = Vec::with_capacity(by_country.len());
    let mut errors = Vec::new();

    for (country_code, mut rows) in by_country {
        rows.sort_by_key(|r| r.reference_date);

        if let Some(dup) = first_duplicate_date(&rows) {
            errors.push(CountryError {
                country_code,
                message: format!("Duplicate reference_date {dup} violates the one-row-per-month contract."),
            });
            continue;
        }

        series.push(CountrySeries {
            country_code,
            readings: rows,
        });
    }

    (series, errors)
}

fn first_duplicate_date(rows: &[IndicatorReading]) -> Option<chrono::NaiveDate> {
    rows.windows(2)
        .find(|w| w[0].reference_date == w[1].reference_date)
        .map(|w| w[0].reference_date)
}
