//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the fact-relation row (`IndicatorReading`) and per-country view (`CountrySeries`)
//! - the three derived records (`AnomalyRecord`, `QualityScoreRecord`, `ForecastRecord`)
//! - analyzer threshold configuration (`AnomalyThresholds`, `QualityThresholds`, `ForecastSettings`)

pub mod types;

pub use types::*;
