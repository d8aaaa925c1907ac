//! Reference-curve aggregation.
//!
//! Groups normalized samples by time-of-day bucket and averages the ratios
//! across days. The per-day ratio matrix is retained alongside the means:
//! the estimator's confidence interval needs the day-level vectors, not just
//! the aggregate.
//!
//! Determinism: buckets iterate chronologically (00:00 first) regardless of
//! input row order. Buckets with zero contributing days are omitted from the
//! curve, never zero-filled.

use std::collections::BTreeMap;

use crate::domain::{Bucket, ReferenceCurve};
use crate::error::{LcError, LcResult};
use crate::normalize::NormalizedData;

/// Build the reference curve from normalized samples.
///
/// When a day carries several samples in one bucket (input sampled finer
/// than the configured interval), their ratios are averaged into a single
/// cell first, so every (bucket, day) pair contributes one value.
pub fn build_reference_curve(
    data: &NormalizedData,
    interval_minutes: u16,
) -> LcResult<ReferenceCurve> {
    let days = data.days_used.clone();
    let day_index: BTreeMap<_, _> = days.iter().enumerate().map(|(i, d)| (*d, i)).collect();

    // bucket -> per-day (sum, count) accumulators.
    let mut cells: BTreeMap<Bucket, Vec<Option<(f64, usize)>>> = BTreeMap::new();
    for n in &data.samples {
        let Some(&di) = day_index.get(&n.sample.date) else {
            // Samples from excluded days never reach here by construction.
            return Err(LcError::Internal(format!(
                "normalized sample on unlisted day {}",
                n.sample.date
            )));
        };
        let row = cells
            .entry(n.sample.bucket)
            .or_insert_with(|| vec![None; days.len()]);
        let cell = row[di].get_or_insert((0.0, 0));
        cell.0 += n.ratio;
        cell.1 += 1;
    }

    let mut buckets = Vec::with_capacity(cells.len());
    let mut mean = Vec::with_capacity(cells.len());
    let mut per_day = Vec::with_capacity(cells.len());

    for (bucket, row) in cells {
        let day_ratios: Vec<Option<f64>> = row
            .into_iter()
            .map(|cell| cell.map(|(sum, count)| sum / count as f64))
            .collect();

        let present: Vec<f64> = day_ratios.iter().filter_map(|r| *r).collect();
        if present.is_empty() {
            continue;
        }

        buckets.push(bucket);
        mean.push(present.iter().sum::<f64>() / present.len() as f64);
        per_day.push(day_ratios);
    }

    Ok(ReferenceCurve {
        interval_minutes,
        buckets,
        mean,
        days,
        per_day,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AugmentedSample;
    use crate::normalize::normalize_by_day;
    use chrono::NaiveDate;

    fn sample(day: u32, hour: u32, min: u32, total: f64) -> AugmentedSample {
        let ts = NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(hour, min, 0)
            .unwrap();
        AugmentedSample::derive(ts, [total, 0.0, 0.0], [230.0; 3], 10)
    }

    #[test]
    fn buckets_are_chronological_regardless_of_input_order() {
        let samples = vec![
            sample(4, 19, 0, 8.0),
            sample(4, 0, 10, 2.0),
            sample(4, 10, 0, 10.0),
        ];
        let data = normalize_by_day(&samples).unwrap();
        let curve = build_reference_curve(&data, 10).unwrap();
        let labels: Vec<String> = curve.buckets.iter().map(|b| b.to_string()).collect();
        assert_eq!(labels, vec!["00:10", "10:00", "19:00"]);
    }

    #[test]
    fn shared_peak_bucket_means_one_across_days() {
        // Day 1 peaks at 20, day 2 at 10, both at 10:00.
        let samples = vec![
            sample(4, 9, 0, 10.0),
            sample(4, 10, 0, 20.0),
            sample(4, 11, 0, 10.0),
            sample(5, 9, 0, 5.0),
            sample(5, 10, 0, 10.0),
            sample(5, 11, 0, 5.0),
        ];
        let data = normalize_by_day(&samples).unwrap();
        let curve = build_reference_curve(&data, 10).unwrap();
        let peak: Bucket = "10:00".parse().unwrap();
        assert_eq!(curve.mean_at(peak), Some(1.0));
        let side: Bucket = "09:00".parse().unwrap();
        assert_eq!(curve.mean_at(side), Some(0.5));
    }

    #[test]
    fn bucket_count_never_exceeds_observed_buckets() {
        let samples = vec![
            sample(4, 0, 0, 1.0),
            sample(4, 0, 0, 2.0),
            sample(5, 0, 0, 3.0),
            sample(5, 12, 0, 4.0),
        ];
        let data = normalize_by_day(&samples).unwrap();
        let curve = build_reference_curve(&data, 10).unwrap();
        assert_eq!(curve.len(), 2);
    }

    #[test]
    fn missing_day_cells_stay_none() {
        let samples = vec![
            sample(4, 0, 0, 1.0),
            sample(4, 12, 0, 2.0),
            sample(5, 12, 0, 3.0),
        ];
        let data = normalize_by_day(&samples).unwrap();
        let curve = build_reference_curve(&data, 10).unwrap();
        let midnight = curve.index_of("00:00".parse().unwrap()).unwrap();
        assert_eq!(curve.per_day[midnight], vec![Some(1.0 / 2.0), None]);
    }

    #[test]
    fn over_resolution_samples_average_into_one_cell() {
        // Two 10:00-bucket samples on the same day (10:00 and 10:05 at a
        // 10-minute interval) collapse into their mean.
        let samples = vec![
            sample(4, 10, 0, 10.0),
            sample(4, 10, 5, 20.0),
            sample(4, 12, 0, 20.0),
        ];
        let data = normalize_by_day(&samples).unwrap();
        let curve = build_reference_curve(&data, 10).unwrap();
        let ten: Bucket = "10:00".parse().unwrap();
        // Ratios are 0.5 and 1.0; the cell holds 0.75.
        assert_eq!(curve.mean_at(ten), Some(0.75));
    }
}
