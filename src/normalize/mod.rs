//! Per-day peak normalization.
//!
//! Partitions samples by calendar date and divides every sample's total
//! current by that day's maximum. Days whose maximum is zero (or that carry
//! no usable samples at all) cannot be normalized; they are excluded from
//! downstream aggregation and reported, instead of silently propagating
//! NaN/inf ratios.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::warn;

use crate::domain::{AugmentedSample, NormalizedSample};
use crate::error::{LcError, LcResult};

/// A day removed from the analysis, with the reason it was removed.
#[derive(Debug, Clone)]
pub struct ExcludedDay {
    pub date: NaiveDate,
    pub reason: String,
}

/// Normalization output: surviving rows plus the exclusion report.
#[derive(Debug, Clone)]
pub struct NormalizedData {
    pub samples: Vec<NormalizedSample>,
    pub excluded: Vec<ExcludedDay>,
    /// Surviving calendar days, ordered by date.
    pub days_used: Vec<NaiveDate>,
}

/// Normalize every sample by its calendar day's peak total current.
///
/// Fails only when no day survives; individual degenerate days are excluded
/// and warned about.
pub fn normalize_by_day(samples: &[AugmentedSample]) -> LcResult<NormalizedData> {
    if samples.is_empty() {
        return Err(LcError::DegenerateDay("empty dataset".to_string()));
    }

    // BTreeMap keeps day iteration (and therefore output order)
    // deterministic regardless of input row order.
    let mut by_day: BTreeMap<NaiveDate, Vec<&AugmentedSample>> = BTreeMap::new();
    for s in samples {
        by_day.entry(s.date).or_default().push(s);
    }
    let n_days = by_day.len();

    let mut out = Vec::with_capacity(samples.len());
    let mut excluded = Vec::new();
    let mut days_used = Vec::new();

    for (date, day) in by_day {
        let max = day
            .iter()
            .map(|s| s.total_current)
            .filter(|v| v.is_finite())
            .fold(f64::NEG_INFINITY, f64::max);

        if !(max.is_finite() && max > 0.0) {
            let reason = if max == 0.0 {
                "peak total current is zero".to_string()
            } else {
                "no finite total current values".to_string()
            };
            warn!(%date, %reason, "excluding day from aggregation");
            excluded.push(ExcludedDay { date, reason });
            continue;
        }

        days_used.push(date);
        for s in day {
            out.push(NormalizedSample {
                sample: (*s).clone(),
                ratio: s.total_current / max,
            });
        }
    }

    if days_used.is_empty() {
        return Err(LcError::DegenerateDay(format!(
            "all {n_days} day(s) had zero or undefined peak current"
        )));
    }

    Ok(NormalizedData {
        samples: out,
        excluded,
        days_used,
    })
}
