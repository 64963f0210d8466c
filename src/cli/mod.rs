//! Command-line parsing for the macro indicator signals tool.
//!
//! The goal of this module is to keep **argument parsing** and **command
//! dispatch** separate from the analytics code.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "msig", version, about = "Macro indicator signals: anomaly flags, quality scores, forecasts")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the analyzers over a fact CSV, print the report, write the derived relations.
    Analyze(AnalyzeArgs),
    /// Fetch monthly unemployment/inflation data from Eurostat into a fact CSV.
    Fetch(FetchArgs),
    /// Generate a synthetic fact CSV (no network required).
    Sample(SampleArgs),
}

/// Options for `msig analyze`.
#[derive(Debug, Parser, Clone)]
pub struct AnalyzeArgs {
    /// Fact relation CSV (from `msig fetch`, `msig sample`, or elsewhere).
    #[arg(short = 'i', long)]
    pub input: PathBuf,

    /// Write the anomaly relation (one row per input row) to this CSV.
    #[arg(long)]
    pub anomalies: Option<PathBuf>,

    /// Write the quality relation (one row per country) to this CSV.
    #[arg(long)]
    pub quality: Option<PathBuf>,

    /// Write the forecast relation (six rows per eligible country) to this CSV.
    #[arg(long)]
    pub forecasts: Option<PathBuf>,

    /// Write a machine-readable run summary to this JSON file.
    #[arg(long = "summary-json")]
    pub summary_json: Option<PathBuf>,

    /// Pin "now" (YYYY-MM-DD) for timeliness scoring and generated-at stamps,
    /// making the run reproducible. Defaults to the local clock.
    #[arg(long = "as-of")]
    pub as_of: Option<NaiveDate>,

    /// Absolute z-score above which a value is flagged.
    #[arg(long, default_value_t = 3.0)]
    pub z_threshold: f64,

    /// IQR fence multiplier.
    #[arg(long, default_value_t = 1.5)]
    pub iqr_multiplier: f64,

    /// Absolute month-over-month relative change above which a value is flagged.
    #[arg(long, default_value_t = 0.5)]
    pub roc_threshold: f64,

    /// Minimum months of unemployment history before a country is forecast.
    #[arg(long, default_value_t = 24)]
    pub min_history: usize,

    /// Forecast horizon in months.
    #[arg(long, default_value_t = 6)]
    pub horizon: u32,

    /// Show the top-N most severe anomaly rows in the report.
    #[arg(long, default_value_t = 10)]
    pub top: usize,
}

/// Options for `msig fetch`.
#[derive(Debug, Parser)]
pub struct FetchArgs {
    /// Where to write the fetched fact relation CSV.
    #[arg(short = 'o', long)]
    pub output: PathBuf,
}

/// Options for `msig sample`.
#[derive(Debug, Parser)]
pub struct SampleArgs {
    /// Where to write the synthetic fact relation CSV.
    #[arg(short = 'o', long)]
    pub output: PathBuf,

    /// Months of history per country.
    #[arg(long, default_value_t = 48)]
    pub months: usize,

    /// Random seed (same seed → identical relation).
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Last generated month (YYYY-MM-DD; defaults to the current month).
    #[arg(long)]
    pub end: Option<NaiveDate>,

    /// Probability that a value is dropped, per indicator per row.
    #[arg(long = "missing-prob", default_value_t = 0.02)]
    pub missing_prob: f64,

    /// Probability of an unemployment shock in a given month.
    #[arg(long = "shock-prob", default_value_t = 0.02)]
    pub shock_prob: f64,
}
