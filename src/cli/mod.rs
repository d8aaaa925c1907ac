//! Command-line parsing for the load-curve analyzer.
//!
//! The goal of this module is to keep **argument parsing** and **command
//! dispatch** separate from the engine code.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use crate::domain::LoadClass;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "lc",
    version,
    about = "Substation load-curve estimation and classification"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Analyze dataset(s): summary, classification, peak ranges, exports.
    Analyze(AnalyzeArgs),
    /// Estimate the current at a target time from one known reading.
    Estimate(EstimateArgs),
    /// Print peak time ranges only.
    Peaks(PeaksArgs),
    /// Print shape features and the classification only.
    Classify(ClassifyArgs),
    /// Summarize a previously exported curve JSON.
    ///
    /// A saved curve carries means only, so `show` supports classification,
    /// peak ranges, and the mean-ratio estimate, but no confidence interval.
    Show(ShowArgs),
    /// Generate a synthetic dataset CSV for trying the tool.
    Sample(SampleArgs),
}

/// Options shared by every dataset-reading subcommand.
#[derive(Debug, Parser, Clone)]
pub struct ConfigArgs {
    /// Sampling interval / bucket resolution (minutes). Must match the data.
    #[arg(long, default_value_t = 10)]
    pub interval: u16,

    /// Timestamp column name (matched case-insensitively).
    #[arg(long, default_value = "Starttime")]
    pub timestamp_column: String,

    /// Phase-current column names (three, comma-separated).
    #[arg(long, value_delimiter = ',', default_value = "I1Avg,I2Avg,I3Avg")]
    pub current_columns: Vec<String>,

    /// Phase-voltage column names (three, comma-separated).
    #[arg(long, value_delimiter = ',', default_value = "U1Avg,U2Avg,U3Avg")]
    pub voltage_columns: Vec<String>,

    /// Relative peak threshold θ in (0, 1].
    #[arg(long, default_value_t = 0.90)]
    pub peak_threshold: f64,

    /// Require exact one-interval adjacency when merging peak ranges
    /// (historical behavior; a missing bucket splits the range).
    #[arg(long)]
    pub strict_gaps: bool,

    /// Derive classifier thresholds from the curve's own percentiles
    /// instead of the fixed defaults.
    #[arg(long)]
    pub percentile_thresholds: bool,

    /// Two-sided confidence level for estimates.
    #[arg(long, default_value_t = 0.95)]
    pub confidence: f64,
}

/// Full analysis over one or more datasets.
#[derive(Debug, Parser)]
pub struct AnalyzeArgs {
    /// Input CSV file(s). Multiple files are analyzed independently, in
    /// parallel.
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Print the full per-bucket curve table.
    #[arg(long)]
    pub table: bool,

    /// Export the reference curve as JSON (single input only).
    #[arg(long, value_name = "JSON")]
    pub export_curve: Option<PathBuf>,

    /// Export the per-bucket curve as CSV (single input only).
    #[arg(long, value_name = "CSV")]
    pub export_csv: Option<PathBuf>,

    #[command(flatten)]
    pub config: ConfigArgs,
}

/// Estimation from one known reading.
#[derive(Debug, Parser)]
pub struct EstimateArgs {
    /// Input CSV file.
    pub input: PathBuf,

    /// Time of the known reading, HH:MM.
    #[arg(long)]
    pub known_time: String,

    /// Known current in amperes.
    #[arg(long)]
    pub known_current: f64,

    /// Time to estimate, HH:MM.
    #[arg(long)]
    pub target_time: String,

    /// Skip the confidence interval and use the mean-ratio fallback.
    #[arg(long)]
    pub no_interval: bool,

    #[command(flatten)]
    pub config: ConfigArgs,
}

/// Peak ranges only.
#[derive(Debug, Parser)]
pub struct PeaksArgs {
    /// Input CSV file.
    pub input: PathBuf,

    #[command(flatten)]
    pub config: ConfigArgs,
}

/// Classification only.
#[derive(Debug, Parser)]
pub struct ClassifyArgs {
    /// Input CSV file.
    pub input: PathBuf,

    #[command(flatten)]
    pub config: ConfigArgs,
}

/// Summarize a saved curve JSON.
#[derive(Debug, Parser)]
pub struct ShowArgs {
    /// Curve JSON produced by `lc analyze --export-curve`.
    #[arg(long, value_name = "JSON")]
    pub curve: PathBuf,

    /// Time of a known reading, HH:MM (enables the mean-ratio estimate;
    /// needs --known-current and --target-time).
    #[arg(long)]
    pub known_time: Option<String>,

    /// Known current in amperes.
    #[arg(long)]
    pub known_current: Option<f64>,

    /// Time to estimate, HH:MM.
    #[arg(long)]
    pub target_time: Option<String>,

    #[command(flatten)]
    pub config: ConfigArgs,
}

/// Synthetic dataset generation.
#[derive(Debug, Parser)]
pub struct SampleArgs {
    /// Output CSV path.
    pub output: PathBuf,

    /// Consumption profile to synthesize.
    #[arg(long, value_enum, default_value_t = LoadClass::Residential)]
    pub profile: LoadClass,

    /// Number of calendar days.
    #[arg(long, default_value_t = 14)]
    pub days: usize,

    /// Sampling interval in minutes.
    #[arg(long, default_value_t = 10)]
    pub interval: u16,

    /// First calendar day.
    #[arg(long, default_value = "2024-03-04")]
    pub start_date: NaiveDate,

    /// Nominal per-phase peak current in amperes.
    #[arg(long, default_value_t = 120.0)]
    pub base_current: f64,

    /// Relative per-sample noise (standard deviation).
    #[arg(long, default_value_t = 0.02)]
    pub noise: f64,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn column_lists_split_on_commas() {
        let cli = Cli::parse_from([
            "lc",
            "classify",
            "data.csv",
            "--current-columns",
            "ia,ib,ic",
        ]);
        let Command::Classify(args) = cli.command else {
            panic!("expected classify");
        };
        assert_eq!(args.config.current_columns, vec!["ia", "ib", "ic"]);
        assert_eq!(args.config.voltage_columns.len(), 3);
    }
}
