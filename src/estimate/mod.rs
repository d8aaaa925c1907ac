//! Current estimation from the reference curve.
//!
//! Two modes, both exposed; the caller chooses based on what data it holds:
//!
//! - `estimate_with_interval` — the canonical method. Works on the per-day
//!   ratio matrix: for every day carrying a ratio at both buckets it forms
//!   `target/known`, then reports the sample mean scaled by the known
//!   reading, with a two-sided Student-t confidence interval.
//! - `estimate_from_means` — the single-ratio fallback for callers that hold
//!   only the aggregated curve means (e.g. a reloaded curve JSON). No
//!   interval.
//!
//! The interval is symmetric around the point in ratio space. Negative known
//! currents are rejected up front: current is physically non-negative.

use crate::domain::{Bucket, Estimate, QuickEstimate, ReferenceCurve};
use crate::error::{LcError, LcResult};
use crate::math::{stats, student_t};

/// Minimum contributing days for a confidence interval; below this a
/// standard deviation is undefined.
const MIN_DAYS: usize = 2;

/// Estimate the current at `target_bucket` from one known reading, with a
/// two-sided confidence interval at the given level.
pub fn estimate_with_interval(
    curve: &ReferenceCurve,
    known_bucket: Bucket,
    known_current: f64,
    target_bucket: Bucket,
    confidence: f64,
) -> LcResult<Estimate> {
    validate_known_current(known_current)?;
    if !(confidence > 0.0 && confidence < 1.0) {
        return Err(LcError::Config(format!(
            "Confidence level must be in (0, 1), got {confidence}."
        )));
    }

    let ki = curve
        .index_of(known_bucket)
        .ok_or(LcError::UnknownBucket(known_bucket))?;
    let ti = curve
        .index_of(target_bucket)
        .ok_or(LcError::UnknownBucket(target_bucket))?;

    // Per-day target/known ratios over days with both cells present. A zero
    // known-cell cannot form a ratio and counts as missing.
    let mut ratios = Vec::with_capacity(curve.days.len());
    for day in 0..curve.days.len() {
        if let (Some(k), Some(t)) = (curve.per_day[ki][day], curve.per_day[ti][day]) {
            if k > 0.0 {
                ratios.push(t / k);
            }
        }
    }

    let n = ratios.len();
    if n < MIN_DAYS {
        return Err(LcError::InsufficientSamples {
            needed: MIN_DAYS,
            got: n,
        });
    }

    let m = stats::mean(&ratios)
        .ok_or_else(|| LcError::Internal("mean of non-empty ratio set".into()))?;
    let s = stats::sample_std(&ratios)
        .ok_or_else(|| LcError::Internal("std of n >= 2 ratio set".into()))?;

    let p = 1.0 - (1.0 - confidence) / 2.0;
    let t = student_t::quantile(p, n - 1)
        .ok_or_else(|| LcError::Internal(format!("t quantile at p={p}, df={}", n - 1)))?;
    let half_width = t * s / (n as f64).sqrt();

    Ok(Estimate {
        known_bucket,
        target_bucket,
        point: known_current * m,
        lower: known_current * (m - half_width),
        upper: known_current * (m + half_width),
        n_days: n,
        confidence,
        implied_peak_current: implied_peak(curve, ki, known_bucket, known_current)?,
    })
}

/// Single-ratio estimate from the aggregated curve means. No interval.
pub fn estimate_from_means(
    curve: &ReferenceCurve,
    known_bucket: Bucket,
    known_current: f64,
    target_bucket: Bucket,
) -> LcResult<QuickEstimate> {
    validate_known_current(known_current)?;

    let ki = curve
        .index_of(known_bucket)
        .ok_or(LcError::UnknownBucket(known_bucket))?;
    let target_ratio = curve
        .mean_at(target_bucket)
        .ok_or(LcError::UnknownBucket(target_bucket))?;

    let peak = implied_peak(curve, ki, known_bucket, known_current)?;
    Ok(QuickEstimate {
        known_bucket,
        target_bucket,
        point: peak * target_ratio,
        implied_peak_current: peak,
    })
}

fn validate_known_current(known_current: f64) -> LcResult<()> {
    if !known_current.is_finite() || known_current < 0.0 {
        return Err(LcError::Config(format!(
            "Known current must be finite and non-negative, got {known_current}."
        )));
    }
    Ok(())
}

/// Day-peak current implied by the known reading: `known / mean_ratio(known)`.
fn implied_peak(
    curve: &ReferenceCurve,
    known_idx: usize,
    known_bucket: Bucket,
    known_current: f64,
) -> LcResult<f64> {
    let r = curve.mean[known_idx];
    if r <= 0.0 {
        return Err(LcError::DegenerateDay(format!(
            "reference ratio at {known_bucket} is zero"
        )));
    }
    Ok(known_current / r)
}
