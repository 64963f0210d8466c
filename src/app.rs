//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments into config structs
//! - resolves "now" (pinned via `--as-of` or taken from the local clock)
//! - runs the analysis pipeline / acquisition commands
//! - prints the report and writes the requested exports

use chrono::{Local, NaiveDateTime, NaiveTime};
use clap::Parser;

use crate::cli::{AnalyzeArgs, Cli, Command, FetchArgs, SampleArgs};
use crate::domain::{AnalysisConfig, AnomalyThresholds, ForecastSettings, QualityThresholds};
use crate::error::AppError;
use crate::io::export;

pub mod pipeline;

/// Entry point for the `msig` binary.
pub fn run() -> Result<(), AppError> {
    let cli = Cli::parse();

    match cli.command {
        Command::Analyze(args) => handle_analyze(args),
        Command::Fetch(args) => handle_fetch(args),
        Command::Sample(args) => handle_sample(args),
    }
}

fn handle_analyze(args: AnalyzeArgs) -> Result<(), AppError> {
    let config = analysis_config_from_args(&args);
    let now = resolve_now(&config);

    let run = pipeline::run_analysis(&config, now)?;

    println!(
        "{}",
        crate::report::format_run_summary(
            &run.facts,
            &run.anomalies,
            &run.quality,
            &run.forecasts,
            &run.country_errors,
            config.top_n,
        )
    );

    if let Some(path) = &config.anomalies_out {
        export::write_anomalies_csv(path, &run.anomalies)?;
    }
    if let Some(path) = &config.quality_out {
        export::write_quality_csv(path, &run.quality)?;
    }
    if let Some(path) = &config.forecasts_out {
        export::write_forecasts_csv(path, &run.forecasts)?;
    }
    if let Some(path) = &config.summary_json_out {
        let summary = export::RunSummaryFile::new(
            now,
            &run.facts.stats,
            &run.anomalies,
            &run.quality,
            &run.forecasts,
            &run.facts.row_errors,
            &run.country_errors,
        );
        export::write_summary_json(path, &summary)?;
    }

    Ok(())
}

fn handle_fetch(args: FetchArgs) -> Result<(), AppError> {
    let client = crate::data::EurostatClient::from_env()?;
    let readings = client.fetch_monthly_facts()?;
    export::write_facts_csv(&args.output, &readings)?;

    println!("Fetched {} fact rows -> {}", readings.len(), args.output.display());
    Ok(())
}

fn handle_sample(args: SampleArgs) -> Result<(), AppError> {
    let spec = crate::data::SampleSpec {
        months: args.months,
        seed: args.seed,
        end_month: args.end.unwrap_or_else(|| Local::now().date_naive()),
        missing_prob: args.missing_prob,
        shock_prob: args.shock_prob,
    };
    let readings = crate::data::generate_facts(&spec)?;
    export::write_facts_csv(&args.output, &readings)?;

    println!(
        "Generated {} fact rows (seed={}) -> {}",
        readings.len(),
        args.seed,
        args.output.display()
    );
    Ok(())
}

pub fn analysis_config_from_args(args: &AnalyzeArgs) -> AnalysisConfig {
    AnalysisConfig {
        input_path: args.input.clone(),
        anomalies_out: args.anomalies.clone(),
        quality_out: args.quality.clone(),
        forecasts_out: args.forecasts.clone(),
        summary_json_out: args.summary_json.clone(),
        as_of: args.as_of,
        anomaly: AnomalyThresholds {
            z_score_threshold: args.z_threshold,
            iqr_multiplier: args.iqr_multiplier,
            rate_of_change_threshold: args.roc_threshold,
            ..AnomalyThresholds::default()
        },
        quality: QualityThresholds::default(),
        forecast: ForecastSettings {
            horizon_months: args.horizon,
            min_history_months: args.min_history,
            ..ForecastSettings::default()
        },
        top_n: args.top,
    }
}

fn resolve_now(config: &AnalysisConfig) -> NaiveDateTime {
    match config.as_of {
        Some(date) => date.and_time(NaiveTime::MIN),
        None => Local::now().naive_local(),
    }
}
