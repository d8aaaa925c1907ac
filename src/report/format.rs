//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the engine modules stay clean and testable
//! - output changes are localized

use crate::domain::{
    Classification, Estimate, PeakRange, QuickEstimate, ReferenceCurve, ShapeFeatures,
};
use crate::io::ingest::IngestedData;
use crate::normalize::ExcludedDay;

/// Format the run header: dataset stats, exclusions, curve shape.
pub fn format_run_summary(
    source: &str,
    ingest: &IngestedData,
    excluded: &[ExcludedDay],
    curve: &ReferenceCurve,
) -> String {
    let mut out = String::new();

    out.push_str("=== lc - Substation Load Curve Analysis ===\n");
    out.push_str(&format!("Source: {source}\n"));
    out.push_str(&format!(
        "Rows: read={} used={} skipped={}\n",
        ingest.rows_read,
        ingest.rows_used,
        ingest.row_errors.len()
    ));
    out.push_str(&format!(
        "Span: {} .. {} ({} day(s))\n",
        ingest.stats.first, ingest.stats.last, ingest.stats.n_days
    ));
    out.push_str(&format!(
        "Total current: [{:.2}, {:.2}] A\n",
        ingest.stats.total_min, ingest.stats.total_max
    ));
    out.push_str(&format!(
        "Curve: {} bucket(s) at {} min over {} day(s)\n",
        curve.len(),
        curve.interval_minutes,
        curve.days.len()
    ));

    if !excluded.is_empty() {
        out.push_str("\nExcluded days:\n");
        for day in excluded {
            out.push_str(&format!("- {} ({})\n", day.date, day.reason));
        }
    }

    out
}

/// Format the full per-bucket curve table.
pub fn format_curve_table(curve: &ReferenceCurve) -> String {
    let mut out = String::new();
    out.push_str(&format!("{:<6} {:>10} {:>6}\n", "time", "mean", "days"));
    out.push_str(&format!("{:-<6} {:-<10} {:-<6}\n", "", "", ""));
    for (i, (bucket, mean)) in curve.buckets.iter().zip(&curve.mean).enumerate() {
        let days = curve
            .per_day
            .get(i)
            .map(|row| row.iter().flatten().count().to_string())
            .unwrap_or_default();
        out.push_str(&format!("{bucket:<6} {mean:>10.4} {days:>6}\n"));
    }
    out
}

/// Format the estimate with its confidence interval.
pub fn format_estimate(est: &Estimate) -> String {
    let mut out = String::new();
    out.push_str("Estimate:\n");
    out.push_str(&format!(
        "- known: {} -> target: {}\n",
        est.known_bucket, est.target_bucket
    ));
    out.push_str(&format!("- implied day peak: {:.2} A\n", est.implied_peak_current));
    out.push_str(&format!(
        "- current at {}: {:.2} A  [{:.2}, {:.2}] at {:.0}% ({} day(s))\n",
        est.target_bucket,
        est.point,
        est.lower,
        est.upper,
        est.confidence * 100.0,
        est.n_days
    ));
    out
}

/// Format the mean-ratio fallback estimate (no interval).
pub fn format_quick_estimate(est: &QuickEstimate) -> String {
    let mut out = String::new();
    out.push_str("Estimate (mean-ratio, no interval):\n");
    out.push_str(&format!(
        "- known: {} -> target: {}\n",
        est.known_bucket, est.target_bucket
    ));
    out.push_str(&format!("- implied day peak: {:.2} A\n", est.implied_peak_current));
    out.push_str(&format!(
        "- current at {}: {:.2} A\n",
        est.target_bucket, est.point
    ));
    out
}

/// Format the peak ranges against the threshold actually applied.
pub fn format_peaks(ranges: &[PeakRange], curve: &ReferenceCurve, theta: f64) -> String {
    let mut out = String::new();
    let max = curve.peak().map(|(_, v)| v).unwrap_or(0.0);
    out.push_str(&format!(
        "Peak ranges (ratio >= {:.2} x max {:.4}):\n",
        theta, max
    ));
    if ranges.is_empty() {
        out.push_str("- none\n");
        return out;
    }
    for r in ranges {
        out.push_str(&format!("- {}\n", r.label()));
    }
    out
}

/// Format shape features and the resulting label.
pub fn format_classification(features: &ShapeFeatures, classification: &Classification) -> String {
    let mut out = String::new();

    out.push_str("Shape features:\n");
    out.push_str(&format!(
        "- mean={:.4} max={:.4} peak={} load_factor={:.3} std={:.3}\n",
        features.mean_all,
        features.max_val,
        features.peak_bucket,
        features.load_factor,
        features.std_shape
    ));
    for band in &features.bands {
        match (band.mean, band.ratio) {
            (Some(mean), Some(ratio)) => out.push_str(&format!(
                "- {:<14} mean={mean:.4} ratio={ratio:.3}\n",
                band.name.display_name()
            )),
            _ => out.push_str(&format!(
                "- {:<14} (no buckets in band)\n",
                band.name.display_name()
            )),
        }
    }

    out.push_str(&format!(
        "\nClassification: {}",
        classification.label.display_name()
    ));
    match classification.matched_rule {
        Some(rule) => out.push_str(&format!(" (rule: {})\n", rule.display_name())),
        None => out.push_str(" (tie-break)\n"),
    }
    out.push_str(&format!(
        "Scores: residential={:.3} commercial={:.3} industrial={:.3}\n",
        classification.scores.residential,
        classification.scores.commercial,
        classification.scores.industrial
    ));

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Bucket, ReferenceCurve};

    #[test]
    fn curve_table_lists_every_bucket() {
        let buckets: Vec<Bucket> = ["00:00", "00:10"].iter().map(|s| s.parse().unwrap()).collect();
        let curve = ReferenceCurve::from_means(10, buckets, vec![0.5, 1.0]);
        let table = format_curve_table(&curve);
        assert!(table.contains("00:00") && table.contains("00:10"));
        assert!(table.contains("1.0000"));
    }

    #[test]
    fn peaks_formatting_handles_empty() {
        let curve = ReferenceCurve::from_means(10, Vec::new(), Vec::new());
        let text = format_peaks(&[], &curve, 0.9);
        assert!(text.contains("none"));
    }
}
