//! Read/write curve JSON files.
//!
//! Curve JSON is the "portable" representation of a reference curve:
//! bucket grid, across-day means, contributing days, sampling interval.
//! The per-day ratio matrix stays with the raw dataset, so a reloaded curve
//! supports the mean-ratio estimate, peak ranges, and classification, but
//! not confidence intervals.

use std::fs::File;
use std::path::Path;

use crate::domain::{Bucket, CurveFile, CurveGrid, ReferenceCurve, MINUTES_PER_DAY};
use crate::error::{LcError, LcResult};

/// Write a curve JSON file.
pub fn write_curve_json(path: &Path, curve: &ReferenceCurve) -> LcResult<()> {
    let file = File::create(path)
        .map_err(|e| LcError::io(format!("Failed to create curve JSON '{}'", path.display()), e))?;

    let out = CurveFile {
        tool: "lc".to_string(),
        interval_minutes: curve.interval_minutes,
        days: curve.days.clone(),
        grid: CurveGrid {
            time: curve.buckets.iter().map(Bucket::to_string).collect(),
            mean: curve.mean.clone(),
        },
    };

    serde_json::to_writer_pretty(file, &out)
        .map_err(|e| LcError::CurveFile(format!("Failed to write curve JSON: {e}")))?;
    Ok(())
}

/// Read a curve JSON file into a means-only reference curve.
pub fn read_curve_json(path: &Path) -> LcResult<ReferenceCurve> {
    let file = File::open(path)
        .map_err(|e| LcError::io(format!("Failed to open curve JSON '{}'", path.display()), e))?;
    let parsed: CurveFile =
        serde_json::from_reader(file).map_err(|e| LcError::CurveFile(e.to_string()))?;
    curve_from_file(parsed)
}

fn curve_from_file(file: CurveFile) -> LcResult<ReferenceCurve> {
    if file.grid.time.len() != file.grid.mean.len() {
        return Err(LcError::CurveFile(format!(
            "grid length mismatch: {} time labels vs {} means",
            file.grid.time.len(),
            file.grid.mean.len()
        )));
    }
    if file.interval_minutes == 0 || file.interval_minutes > MINUTES_PER_DAY {
        return Err(LcError::CurveFile(format!(
            "invalid sampling interval: {}",
            file.interval_minutes
        )));
    }

    let mut buckets = Vec::with_capacity(file.grid.time.len());
    for label in &file.grid.time {
        let bucket: Bucket = label
            .parse()
            .map_err(|e| LcError::CurveFile(format!("bad bucket label: {e}")))?;
        if let Some(prev) = buckets.last() {
            if bucket <= *prev {
                return Err(LcError::CurveFile(format!(
                    "bucket grid not chronological at '{label}'"
                )));
            }
        }
        buckets.push(bucket);
    }

    let mut curve = ReferenceCurve::from_means(file.interval_minutes, buckets, file.grid.mean);
    curve.days = file.days;
    Ok(curve)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_file() -> CurveFile {
        CurveFile {
            tool: "lc".to_string(),
            interval_minutes: 10,
            days: vec![NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()],
            grid: CurveGrid {
                time: vec!["00:00".into(), "00:10".into()],
                mean: vec![0.4, 0.8],
            },
        }
    }

    #[test]
    fn round_trips_through_the_means_only_view() {
        let curve = curve_from_file(sample_file()).unwrap();
        assert_eq!(curve.len(), 2);
        assert_eq!(curve.mean_at("00:10".parse().unwrap()), Some(0.8));
        assert!(curve.per_day.is_empty());
    }

    #[test]
    fn rejects_mismatched_grid_lengths() {
        let mut file = sample_file();
        file.grid.mean.pop();
        assert!(matches!(curve_from_file(file), Err(LcError::CurveFile(_))));
    }

    #[test]
    fn rejects_unsorted_or_bad_labels() {
        let mut file = sample_file();
        file.grid.time = vec!["00:10".into(), "00:00".into()];
        assert!(matches!(curve_from_file(file), Err(LcError::CurveFile(_))));

        let mut file = sample_file();
        file.grid.time[0] = "25:00".into();
        assert!(matches!(curve_from_file(file), Err(LcError::CurveFile(_))));
    }
}
