//! Peak-range detection on the reference curve.
//!
//! Selects every bucket whose mean ratio reaches `θ × max(curve)` and merges
//! the selection into maximal contiguous runs. Contiguity is judged against
//! the sampling interval; the gap rule is configurable because the
//! historical exact-equality test silently split ranges at any missing
//! bucket.

use crate::domain::{GapRule, PeakRange, ReferenceCurve};
use crate::error::{LcError, LcResult};

/// Find contiguous above-threshold ranges, ordered by start time.
///
/// `theta` is the relative threshold in (0, 1]; `theta = 1.0` selects
/// exactly the bucket(s) attaining the curve maximum.
pub fn find_peak_ranges(
    curve: &ReferenceCurve,
    theta: f64,
    gap_rule: GapRule,
) -> LcResult<Vec<PeakRange>> {
    if !(theta > 0.0 && theta <= 1.0) {
        return Err(LcError::Config(format!(
            "Peak threshold must be in (0, 1], got {theta}."
        )));
    }

    let Some((_, max_val)) = curve.peak() else {
        return Ok(Vec::new());
    };
    let threshold = theta * max_val;

    let interval = u32::from(curve.interval_minutes.max(1));
    let mut ranges: Vec<PeakRange> = Vec::new();

    for (bucket, &value) in curve.buckets.iter().zip(&curve.mean) {
        if value < threshold {
            continue;
        }

        let extends_last = ranges.last().is_some_and(|last| {
            let gap = u32::from(bucket.minutes()) - u32::from(last.end.minutes());
            match gap_rule {
                GapRule::Lenient => gap <= interval,
                GapRule::Strict => gap == interval,
            }
        });

        if extends_last {
            ranges.last_mut().expect("just checked").end = *bucket;
        } else {
            ranges.push(PeakRange {
                start: *bucket,
                end: *bucket,
            });
        }
    }

    Ok(ranges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Bucket, ReferenceCurve};

    fn curve(entries: &[(&str, f64)]) -> ReferenceCurve {
        let buckets: Vec<Bucket> = entries.iter().map(|(s, _)| s.parse().unwrap()).collect();
        let mean = entries.iter().map(|(_, v)| *v).collect();
        ReferenceCurve::from_means(10, buckets, mean)
    }

    #[test]
    fn theta_one_selects_exactly_the_maximum() {
        let c = curve(&[("10:00", 0.5), ("10:10", 1.0), ("10:20", 0.99)]);
        let ranges = find_peak_ranges(&c, 1.0, GapRule::Lenient).unwrap();
        assert_eq!(ranges.len(), 1);
        assert_eq!(ranges[0].label(), "10:10-10:10");
    }

    #[test]
    fn adjacent_buckets_merge_into_one_range() {
        let c = curve(&[
            ("18:00", 0.95),
            ("18:10", 0.97),
            ("18:20", 1.0),
            ("18:30", 0.5),
            ("20:00", 0.96),
        ]);
        let ranges = find_peak_ranges(&c, 0.90, GapRule::Lenient).unwrap();
        let labels: Vec<String> = ranges.iter().map(|r| r.label()).collect();
        assert_eq!(labels, vec!["18:00-18:20", "20:00-20:00"]);
    }

    #[test]
    fn lenient_rule_bridges_a_same_interval_gap_strict_does_too() {
        // Selected buckets 10 minutes apart are contiguous under both rules.
        let c = curve(&[("09:00", 1.0), ("09:10", 1.0)]);
        for rule in [GapRule::Lenient, GapRule::Strict] {
            let ranges = find_peak_ranges(&c, 0.9, rule).unwrap();
            assert_eq!(ranges.len(), 1, "{rule:?}");
        }
    }

    #[test]
    fn strict_rule_splits_on_a_missing_bucket() {
        // 09:20 is missing from the curve entirely: the gap between the
        // selected neighbors is 20 minutes.
        let c = curve(&[("09:00", 1.0), ("09:10", 1.0), ("09:30", 1.0)]);
        let strict = find_peak_ranges(&c, 0.9, GapRule::Strict).unwrap();
        assert_eq!(strict.len(), 2);

        let lenient = find_peak_ranges(&c, 0.9, GapRule::Lenient).unwrap();
        assert_eq!(lenient.len(), 2, "a 20-minute hole splits either way");

        // A sub-interval irregularity (gap < interval) only merges leniently.
        let c = curve(&[("09:00", 1.0), ("09:05", 1.0)]);
        assert_eq!(find_peak_ranges(&c, 0.9, GapRule::Strict).unwrap().len(), 2);
        assert_eq!(
            find_peak_ranges(&c, 0.9, GapRule::Lenient).unwrap().len(),
            1
        );
    }

    #[test]
    fn invalid_theta_is_a_config_error() {
        let c = curve(&[("09:00", 1.0)]);
        assert!(matches!(
            find_peak_ranges(&c, 0.0, GapRule::Lenient),
            Err(LcError::Config(_))
        ));
        assert!(matches!(
            find_peak_ranges(&c, 1.5, GapRule::Lenient),
            Err(LcError::Config(_))
        ));
    }

    #[test]
    fn empty_curve_yields_no_ranges() {
        let c = ReferenceCurve::from_means(10, Vec::new(), Vec::new());
        assert!(find_peak_ranges(&c, 0.9, GapRule::Lenient).unwrap().is_empty());
    }
}
