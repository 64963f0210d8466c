//! Eurostat dissemination-API integration for the monthly fact relation.
//!
//! Eurostat serves JSON-stat: dimension metadata plus a sparse map from a
//! single flattened index to a value. We decode the flattened index into
//! per-dimension category codes using precomputed strides, then join the
//! unemployment and inflation datasets on (geography, month) into the flat
//! fact-relation rows the analyzers consume.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::Duration;

use chrono::{Datelike, NaiveDate};
use reqwest::blocking::Client;
use serde::Deserialize;

use crate::domain::IndicatorReading;
use crate::error::AppError;

const BASE_URL: &str = "https://ec.europa.eu/eurostat/api/dissemination/statistics/1.0/data";

/// Monthly unemployment rate, % of active population.
const DATASET_UNEMPLOYMENT: &str = "une_rt_m";
/// HICP all-items, month-over-month rate of change.
const DATASET_INFLATION: &str = "prc_hicp_mmor";

/// Geographies fetched by default.
pub const GEO_CODES: [&str; 9] = ["DE", "FR", "IT", "ES", "NL", "BE", "AT", "PL", "EU27_2020"];

/// The subset of a JSON-stat response we rely on.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonStatDataset {
    /// Dimension ids, outermost first.
    pub id: Vec<String>,
    /// Category count per dimension, aligned with `id`.
    pub size: Vec<usize>,
    pub dimension: HashMap<String, JsonStatDimension>,
    /// Sparse flattened-index → value map. Absent indices are missing data.
    #[serde(default)]
    pub value: HashMap<String, Option<f64>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JsonStatDimension {
    pub category: JsonStatCategory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JsonStatCategory {
    /// Category code → position within the dimension.
    pub index: HashMap<String, usize>,
}

pub struct EurostatClient {
    client: Client,
    base_url: String,
}

impl EurostatClient {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        let base_url = std::env::var("EUROSTAT_BASE_URL").unwrap_or_else(|_| BASE_URL.to_string());
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| AppError::new(2, format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client, base_url })
    }

    /// Fetch both monthly datasets and join them into fact rows.
    pub fn fetch_monthly_facts(&self) -> Result<Vec<IndicatorReading>, AppError> {
        let unemployment = self.fetch_series(
            DATASET_UNEMPLOYMENT,
            &[("s_adj", "SA"), ("age", "TOTAL"), ("unit", "PC_ACT"), ("sex", "T")],
        )?;
        let inflation = self.fetch_series(DATASET_INFLATION, &[("coicop", "CP00")])?;

        let readings = join_monthly(&unemployment, &inflation);
        if readings.is_empty() {
            return Err(AppError::new(3, "Eurostat returned no observations for the requested geographies."));
        }
        Ok(readings)
    }

    /// Fetch one dataset and decode it to a (geo, month) → value map.
    fn fetch_series(&self, dataset: &str, filters: &[(&str, &str)]) -> Result<SeriesMap, AppError> {
        let url = format!("{}/{dataset}", self.base_url);

        let mut query: Vec<(&str, &str)> = vec![("format", "JSON"), ("lang", "en")];
        query.extend_from_slice(filters);
        for geo in GEO_CODES {
            query.push(("geo", geo));
        }

        let response = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| AppError::new(2, format!("Failed to fetch {dataset}: {e}")))?;

        let doc: JsonStatDataset = response
            .json()
            .map_err(|e| AppError::new(2, format!("Invalid JSON-stat response for {dataset}: {e}")))?;

        series_by_geo_month(&doc).map_err(|e| AppError::new(2, format!("Failed to decode {dataset}: {e}")))
    }
}

type SeriesMap = BTreeMap<(String, NaiveDate), f64>;

/// Decode a JSON-stat document into a (geo, month) → value map.
pub fn series_by_geo_month(doc: &JsonStatDataset) -> Result<SeriesMap, String> {
    if doc.id.len() != doc.size.len() {
        return Err("Dimension id/size length mismatch.".to_string());
    }

    let geo_pos = dimension_position(doc, "geo")?;
    let time_pos = dimension_position(doc, "time")?;

    let geo_codes = codes_by_position(doc, "geo")?;
    let time_codes = codes_by_position(doc, "time")?;

    // Row-major strides: the last dimension varies fastest.
    let mut strides = vec![1usize; doc.size.len()];
    for i in (0..doc.size.len().saturating_sub(1)).rev() {
        strides[i] = strides[i + 1] * doc.size[i + 1];
    }

    let mut series = BTreeMap::new();
    for (flat_key, value) in &doc.value {
        let Some(value) = value else { continue };
        let flat: usize = flat_key
            .parse()
            .map_err(|_| format!("Non-numeric flattened index '{flat_key}'."))?;

        let mut remaining = flat;
        let mut geo_idx = 0usize;
        let mut time_idx = 0usize;
        for (i, &stride) in strides.iter().enumerate() {
            let dim_idx = remaining / stride;
            remaining %= stride;
            if i == geo_pos {
                geo_idx = dim_idx;
            }
            if i == time_pos {
                time_idx = dim_idx;
            }
        }

        let geo = geo_codes
            .get(geo_idx)
            .and_then(|c| c.as_deref())
            .ok_or_else(|| format!("Flattened index {flat} decodes to an unknown geo position {geo_idx}."))?;
        let time = time_codes
            .get(time_idx)
            .and_then(|c| c.as_deref())
            .ok_or_else(|| format!("Flattened index {flat} decodes to an unknown time position {time_idx}."))?;

        let date = parse_month_code(time).ok_or_else(|| format!("Unparseable time code '{time}'."))?;
        series.insert((geo.to_string(), date), *value);
    }

    Ok(series)
}

fn dimension_position(doc: &JsonStatDataset, dim: &str) -> Result<usize, String> {
    doc.id
        .iter()
        .position(|id| id == dim)
        .ok_or_else(|| format!("Response is missing the `{dim}` dimension."))
}

/// Invert a dimension's code → position map into position → code.
fn codes_by_position(doc: &JsonStatDataset, dim: &str) -> Result<Vec<Option<String>>, String> {
    let pos = dimension_position(doc, dim)?;
    let dimension = doc
        .dimension
        .get(dim)
        .ok_or_else(|| format!("Response is missing metadata for `{dim}`."))?;

    let mut codes = vec![None; doc.size[pos]];
    for (code, &idx) in &dimension.category.index {
        if idx < codes.len() {
            codes[idx] = Some(code.clone());
        }
    }
    Ok(codes)
}

/// Eurostat monthly time codes: `2024-05` (JSON-stat) or `2024M05` (SDMX).
fn parse_month_code(code: &str) -> Option<NaiveDate> {
    let (year, month) = code.split_once(['-', 'M'])?;
    let year: i32 = year.parse().ok()?;
    let month: u32 = month.parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, 1)
}

/// Join the two indicator maps on (geo, month) into fact rows, sorted by
/// country then date.
fn join_monthly(unemployment: &SeriesMap, inflation: &SeriesMap) -> Vec<IndicatorReading> {
    let keys: BTreeSet<&(String, NaiveDate)> = unemployment.keys().chain(inflation.keys()).collect();

    keys.into_iter()
        .map(|key| {
            let (geo, date) = key;
            IndicatorReading {
                country_code: geo.clone(),
                reference_date: *date,
                reference_year: date.year(),
                reference_month: date.month(),
                indicator_key: format!("{geo}_{}", date.format("%Y%m")),
                unemployment_rate_pct: unemployment.get(key).copied(),
                inflation_rate_mom_pct: inflation.get(key).copied(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_by_three() -> JsonStatDataset {
        let geo_index: HashMap<String, usize> =
            [("DE".to_string(), 0), ("FR".to_string(), 1)].into_iter().collect();
        let time_index: HashMap<String, usize> = [
            ("2024-01".to_string(), 0),
            ("2024-02".to_string(), 1),
            ("2024-03".to_string(), 2),
        ]
        .into_iter()
        .collect();

        let mut dimension = HashMap::new();
        dimension.insert(
            "geo".to_string(),
            JsonStatDimension {
                category: JsonStatCategory { index: geo_index },
            },
        );
        dimension.insert(
            "time".to_string(),
            JsonStatDimension {
                category: JsonStatCategory { index: time_index },
            },
        );

        let value: HashMap<String, Option<f64>> =
            [("0".to_string(), Some(3.0)), ("4".to_string(), Some(4.5))].into_iter().collect();

        JsonStatDataset {
            id: vec!["geo".to_string(), "time".to_string()],
            size: vec![2, 3],
            dimension,
            value,
        }
    }

    #[test]
    fn decodes_flattened_indices_with_strides() {
        let series = series_by_geo_month(&two_by_three()).unwrap();

        // Index 0 → (geo 0, time 0); index 4 → (geo 1, time 1).
        assert_eq!(series.len(), 2);
        assert_eq!(
            series[&("DE".to_string(), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())],
            3.0
        );
        assert_eq!(
            series[&("FR".to_string(), NaiveDate::from_ymd_opt(2024, 2, 1).unwrap())],
            4.5
        );
    }

    #[test]
    fn missing_time_dimension_is_an_error() {
        let mut doc = two_by_three();
        doc.id = vec!["geo".to_string(), "period".to_string()];
        assert!(series_by_geo_month(&doc).is_err());
    }

    #[test]
    fn month_codes_parse_both_spellings() {
        assert_eq!(parse_month_code("2024-05"), NaiveDate::from_ymd_opt(2024, 5, 1));
        assert_eq!(parse_month_code("2024M05"), NaiveDate::from_ymd_opt(2024, 5, 1));
        assert_eq!(parse_month_code("garbage"), None);
    }

    #[test]
    fn join_takes_the_union_of_keys() {
        let jan = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let feb = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();

        let mut unemployment = SeriesMap::new();
        unemployment.insert(("DE".to_string(), jan), 3.0);
        let mut inflation = SeriesMap::new();
        inflation.insert(("DE".to_string(), jan), 0.2);
        inflation.insert(("FR".to_string(), feb), 0.1);

        let readings = join_monthly(&unemployment, &inflation);
        assert_eq!(readings.len(), 2);

        assert_eq!(readings[0].country_code, "DE");
        assert_eq!(readings[0].unemployment_rate_pct, Some(3.0));
        assert_eq!(readings[0].inflation_rate_mom_pct, Some(0.2));
        assert_eq!(readings[0].indicator_key, "DE_202401");

        assert_eq!(readings[1].country_code, "FR");
        assert_eq!(readings[1].unemployment_rate_pct, None);
        assert_eq!(readings[1].inflation_rate_mom_pct, Some(0.1));
    }
}
