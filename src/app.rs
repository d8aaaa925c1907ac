//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - builds the analysis configuration
//! - runs the pipeline (in parallel across multiple inputs)
//! - prints reports
//! - writes optional exports

use std::path::PathBuf;

use clap::Parser;
use rayon::prelude::*;

use crate::cli::{
    AnalyzeArgs, ClassifyArgs, Cli, Command, ConfigArgs, EstimateArgs, PeaksArgs, SampleArgs,
    ShowArgs,
};
use crate::data::sample::{write_sample_csv, SampleSpec};
use crate::domain::{
    AnalysisConfig, Bucket, ColumnMap, GapRule, ThresholdMode,
};
use crate::error::{LcError, LcResult};
use crate::estimate::{estimate_from_means, estimate_with_interval};
use crate::io::curve::{read_curve_json, write_curve_json};
use crate::io::export::write_curve_csv;
use crate::report;

pub mod pipeline;

use pipeline::{run_analysis, RunOutput};

/// Entry point for the `lc` binary.
pub fn run() -> Result<(), LcError> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Analyze(args) => handle_analyze(args),
        Command::Estimate(args) => handle_estimate(args),
        Command::Peaks(args) => handle_peaks(args),
        Command::Classify(args) => handle_classify(args),
        Command::Show(args) => handle_show(args),
        Command::Sample(args) => handle_sample(args),
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}

fn handle_analyze(args: AnalyzeArgs) -> LcResult<()> {
    let config = analysis_config_from_args(&args.config)?;

    if args.inputs.len() > 1 && (args.export_curve.is_some() || args.export_csv.is_some()) {
        return Err(LcError::Config(
            "Exports require a single input file.".to_string(),
        ));
    }

    // Independent datasets; the engine is stateless, so fan out freely.
    let results: Vec<(PathBuf, LcResult<RunOutput>)> = args
        .inputs
        .par_iter()
        .map(|path| (path.clone(), run_analysis(path, &config)))
        .collect();

    let multi = results.len() > 1;
    let mut first_err = None;
    let mut single_run = None;
    for (path, result) in results {
        match result {
            Ok(run) => {
                print_run(&path, &run, &config, args.table);
                if !multi {
                    single_run = Some(run);
                }
            }
            Err(err) => {
                eprintln!("{}: {err}", path.display());
                if first_err.is_none() {
                    first_err = Some(err);
                }
            }
        }
        if multi {
            println!();
        }
    }

    if let Some(err) = first_err {
        return Err(err);
    }

    // Exports only apply to the single-input case (checked above).
    if let Some(run) = &single_run {
        if let Some(path) = &args.export_curve {
            write_curve_json(path, &run.analysis.curve)?;
            println!("Curve JSON written to {}", path.display());
        }
        if let Some(path) = &args.export_csv {
            write_curve_csv(path, &run.analysis.curve)?;
            println!("Curve CSV written to {}", path.display());
        }
    }

    Ok(())
}

fn print_run(path: &PathBuf, run: &RunOutput, config: &AnalysisConfig, table: bool) {
    println!(
        "{}",
        report::format_run_summary(
            &path.display().to_string(),
            &run.ingest,
            &run.analysis.excluded,
            &run.analysis.curve,
        )
    );
    if table {
        println!("{}", report::format_curve_table(&run.analysis.curve));
    }
    println!(
        "{}",
        report::format_peaks(
            &run.analysis.peak_ranges,
            &run.analysis.curve,
            config.peak_threshold,
        )
    );
    println!(
        "{}",
        report::format_classification(&run.analysis.features, &run.analysis.classification)
    );
}

fn handle_estimate(args: EstimateArgs) -> LcResult<()> {
    let config = analysis_config_from_args(&args.config)?;
    let known = parse_bucket(&args.known_time)?;
    let target = parse_bucket(&args.target_time)?;

    let run = run_analysis(&args.input, &config)?;
    let curve = &run.analysis.curve;

    if args.no_interval {
        let est = estimate_from_means(curve, known, args.known_current, target)?;
        println!("{}", report::format_quick_estimate(&est));
        return Ok(());
    }

    match estimate_with_interval(curve, known, args.known_current, target, config.confidence) {
        Ok(est) => {
            println!("{}", report::format_estimate(&est));
            Ok(())
        }
        Err(err @ LcError::InsufficientSamples { .. }) => {
            eprintln!("hint: re-run with --no-interval for a point estimate without a confidence interval");
            Err(err)
        }
        Err(err) => Err(err),
    }
}

fn handle_peaks(args: PeaksArgs) -> LcResult<()> {
    let config = analysis_config_from_args(&args.config)?;
    let run = run_analysis(&args.input, &config)?;
    println!(
        "{}",
        report::format_peaks(
            &run.analysis.peak_ranges,
            &run.analysis.curve,
            config.peak_threshold,
        )
    );
    Ok(())
}

fn handle_classify(args: ClassifyArgs) -> LcResult<()> {
    let config = analysis_config_from_args(&args.config)?;
    let run = run_analysis(&args.input, &config)?;
    println!(
        "{}",
        report::format_classification(&run.analysis.features, &run.analysis.classification)
    );
    Ok(())
}

fn handle_show(args: ShowArgs) -> LcResult<()> {
    let config = analysis_config_from_args(&args.config)?;
    let curve = read_curve_json(&args.curve)?;

    println!("Curve: {}", args.curve.display());
    println!(
        "Buckets: {} at {} min over {} day(s)\n",
        curve.len(),
        curve.interval_minutes,
        curve.days.len()
    );

    let (features, classification) = crate::classify::classify_curve(&curve, &config)?;
    let ranges = crate::peaks::find_peak_ranges(&curve, config.peak_threshold, config.gap_rule)?;
    println!("{}", report::format_peaks(&ranges, &curve, config.peak_threshold));
    println!("{}", report::format_classification(&features, &classification));

    match (&args.known_time, args.known_current, &args.target_time) {
        (Some(known), Some(current), Some(target)) => {
            let est =
                estimate_from_means(&curve, parse_bucket(known)?, current, parse_bucket(target)?)?;
            println!("{}", report::format_quick_estimate(&est));
        }
        (None, None, None) => {}
        _ => {
            return Err(LcError::Config(
                "Estimation needs --known-time, --known-current, and --target-time together."
                    .to_string(),
            ));
        }
    }

    Ok(())
}

fn handle_sample(args: SampleArgs) -> LcResult<()> {
    let spec = SampleSpec {
        profile: args.profile,
        days: args.days,
        interval_minutes: args.interval,
        start_date: args.start_date,
        base_current: args.base_current,
        noise: args.noise,
        seed: args.seed,
    };
    write_sample_csv(&args.output, &spec)?;
    println!(
        "Wrote {}-day {} dataset to {}",
        args.days,
        args.profile.display_name().to_lowercase(),
        args.output.display()
    );
    Ok(())
}

fn analysis_config_from_args(args: &ConfigArgs) -> LcResult<AnalysisConfig> {
    let config = AnalysisConfig {
        columns: ColumnMap {
            timestamp: args.timestamp_column.clone(),
            currents: three_columns(&args.current_columns, "current")?,
            voltages: three_columns(&args.voltage_columns, "voltage")?,
        },
        interval_minutes: args.interval,
        peak_threshold: args.peak_threshold,
        gap_rule: if args.strict_gaps {
            GapRule::Strict
        } else {
            GapRule::Lenient
        },
        threshold_mode: if args.percentile_thresholds {
            ThresholdMode::Percentile
        } else {
            ThresholdMode::Fixed
        },
        confidence: args.confidence,
        ..AnalysisConfig::default()
    };
    config.validate().map_err(LcError::Config)?;
    Ok(config)
}

fn three_columns(names: &[String], what: &str) -> LcResult<[String; 3]> {
    match names {
        [a, b, c] => Ok([a.clone(), b.clone(), c.clone()]),
        _ => Err(LcError::Config(format!(
            "Expected exactly three {what} column names, got {}.",
            names.len()
        ))),
    }
}

fn parse_bucket(s: &str) -> LcResult<Bucket> {
    s.parse().map_err(LcError::Config)
}
