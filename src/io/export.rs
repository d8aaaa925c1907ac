//! Export the reference curve to CSV.
//!
//! The export is meant to be easy to consume in spreadsheets or downstream
//! scripts: one row per bucket, chronological.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::domain::ReferenceCurve;
use crate::error::{LcError, LcResult};

/// Write the per-bucket curve to a CSV file.
pub fn write_curve_csv(path: &Path, curve: &ReferenceCurve) -> LcResult<()> {
    let mut file = File::create(path)
        .map_err(|e| LcError::io(format!("Failed to create export CSV '{}'", path.display()), e))?;

    writeln!(file, "time,mean_ratio,contributing_days")
        .map_err(|e| LcError::io("Failed to write export CSV header".to_string(), e))?;

    for (i, (bucket, mean)) in curve.buckets.iter().zip(&curve.mean).enumerate() {
        // Contributing-day counts exist only when the per-day matrix does
        // (curves reloaded from JSON are means-only).
        let days = curve
            .per_day
            .get(i)
            .map(|row| row.iter().flatten().count().to_string())
            .unwrap_or_default();
        writeln!(file, "{bucket},{mean:.6},{days}")
            .map_err(|e| LcError::io("Failed to write export CSV row".to_string(), e))?;
    }

    Ok(())
}
