//! CSV ingest and derivation.
//!
//! This module turns a raw measurement export into `AugmentedSample` rows
//! that are safe to normalize and aggregate.
//!
//! Design goals:
//! - **Strict schema** for required columns (clear errors + exit code 2)
//! - **Row-level validation** (skip bad rows, but report what happened)
//! - **Case-insensitive header resolution** (vendor exports disagree on
//!   casing; `Starttime` and `starttime` must both resolve)
//! - **Separation of concerns**: no normalization or aggregation here

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{NaiveDateTime, NaiveDate};
use csv::StringRecord;
use tracing::warn;

use crate::domain::{AnalysisConfig, AugmentedSample};
use crate::error::{LcError, LcResult};

/// A row-level error encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Summary stats about the samples actually loaded.
#[derive(Debug, Clone)]
pub struct DatasetStats {
    pub n_samples: usize,
    pub n_days: usize,
    pub first: NaiveDateTime,
    pub last: NaiveDateTime,
    pub total_min: f64,
    pub total_max: f64,
}

/// Ingest output: derived samples + stats + row errors.
#[derive(Debug, Clone)]
pub struct IngestedData {
    pub samples: Vec<AugmentedSample>,
    pub stats: DatasetStats,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
    pub rows_used: usize,
}

/// Column indices after case-insensitive resolution against the header row.
struct ResolvedColumns {
    timestamp: usize,
    currents: [usize; 3],
    voltages: [usize; 3],
}

/// Load and derive samples from a CSV file.
pub fn load_samples(path: &Path, config: &AnalysisConfig) -> LcResult<IngestedData> {
    let file = File::open(path)
        .map_err(|e| LcError::io(format!("Failed to open CSV '{}'", path.display()), e))?;
    read_samples(file, config)
}

/// Load and derive samples from any reader (the file-free entry point used
/// by tests).
pub fn read_samples<R: Read>(reader: R, config: &AnalysisConfig) -> LcResult<IngestedData> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| LcError::Schema(format!("Failed to read CSV headers: {e}")))?
        .clone();

    let header_map = build_header_map(&headers);
    let columns = resolve_columns(&header_map, config)?;

    let mut samples = Vec::new();
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
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        match parse_row(&record, &columns, config.interval_minutes) {
            Ok(sample) => samples.push(sample),
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    if !row_errors.is_empty() {
        warn!(
            skipped = row_errors.len(),
            read = rows_read,
            "skipped malformed rows during ingest"
        );
    }

    let rows_used = samples.len();
    let stats = compute_stats(&samples).ok_or_else(|| {
        LcError::Schema("No valid rows remain after validation.".to_string())
    })?;

    Ok(IngestedData {
        samples,
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
    // Excel and other tools sometimes emit UTF-8 CSVs with a BOM prefix on
    // the first header. If we don't strip it, schema validation will
    // incorrectly report missing columns.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn resolve_columns(
    header_map: &HashMap<String, usize>,
    config: &AnalysisConfig,
) -> LcResult<ResolvedColumns> {
    let mut missing = Vec::new();
    let mut lookup = |name: &str| -> usize {
        match header_map.get(&normalize_header_name(name)) {
            Some(&idx) => idx,
            None => {
                missing.push(name.to_string());
                usize::MAX
            }
        }
    };

    let map = &config.columns;
    let columns = ResolvedColumns {
        timestamp: lookup(&map.timestamp),
        currents: [
            lookup(&map.currents[0]),
            lookup(&map.currents[1]),
            lookup(&map.currents[2]),
        ],
        voltages: [
            lookup(&map.voltages[0]),
            lookup(&map.voltages[1]),
            lookup(&map.voltages[2]),
        ],
    };

    if !missing.is_empty() {
        return Err(LcError::Schema(format!(
            "Missing required column(s): {}",
            missing.join(", ")
        )));
    }
    Ok(columns)
}

fn parse_row(
    record: &StringRecord,
    columns: &ResolvedColumns,
    interval_minutes: u16,
) -> Result<AugmentedSample, String> {
    let timestamp = parse_timestamp(get_field(record, columns.timestamp, "timestamp")?)?;

    let mut currents = [0.0f64; 3];
    for (i, &idx) in columns.currents.iter().enumerate() {
        let v = parse_f64(get_field(record, idx, "current")?)?;
        if v < 0.0 {
            return Err(format!("Negative phase current ({v})."));
        }
        currents[i] = v;
    }

    let mut voltages = [0.0f64; 3];
    for (i, &idx) in columns.voltages.iter().enumerate() {
        voltages[i] = parse_f64(get_field(record, idx, "voltage")?)?;
    }

    Ok(AugmentedSample::derive(
        timestamp,
        currents,
        voltages,
        interval_minutes,
    ))
}

fn get_field<'a>(record: &'a StringRecord, idx: usize, what: &str) -> Result<&'a str, String> {
    record
        .get(idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("Missing {what} value."))
}

fn parse_timestamp(s: &str) -> Result<NaiveDateTime, String> {
    // ISO-8601 is recommended, but SCADA/metering exports commonly use
    // locale formats. A small fixed set keeps parsing deterministic.
    const FMTS: [&str; 7] = [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%d/%m/%Y %H:%M:%S",
        "%d/%m/%Y %H:%M",
        "%d.%m.%Y %H:%M:%S",
        "%d.%m.%Y %H:%M",
    ];
    for fmt in FMTS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt);
        }
    }
    Err(format!(
        "Invalid timestamp '{s}'. Expected ISO-8601 or DD/MM/YYYY HH:MM[:SS]."
    ))
}

fn parse_f64(s: &str) -> Result<f64, String> {
    let v: f64 = s
        .parse()
        .map_err(|_| format!("Invalid numeric value '{s}'."))?;
    if !v.is_finite() {
        return Err(format!("Non-finite numeric value '{s}'."));
    }
    Ok(v)
}

fn compute_stats(samples: &[AugmentedSample]) -> Option<DatasetStats> {
    let first = samples.iter().map(|s| s.timestamp).min()?;
    let last = samples.iter().map(|s| s.timestamp).max()?;

    let mut total_min = f64::INFINITY;
    let mut total_max = f64::NEG_INFINITY;
    let mut days: Vec<NaiveDate> = Vec::new();
    for s in samples {
        total_min = total_min.min(s.total_current);
        total_max = total_max.max(s.total_current);
        if !days.contains(&s.date) {
            days.push(s.date);
        }
    }

    Some(DatasetStats {
        n_samples: samples.len(),
        n_days: days.len(),
        first,
        last,
        total_min,
        total_max,
    })
}
