//! Shared analysis pipeline used by every subcommand.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! ingest -> normalize -> aggregate -> features/peaks/classification.
//!
//! The subcommands then focus on presentation and on the extra inputs they
//! need (e.g. the known reading for `estimate`).

use std::path::Path;

use tracing::info;

use crate::aggregate::build_reference_curve;
use crate::classify::classify_curve;
use crate::domain::{
    AnalysisConfig, AugmentedSample, Classification, PeakRange, ReferenceCurve, ShapeFeatures,
};
use crate::error::{LcError, LcResult};
use crate::io::ingest::{load_samples, IngestedData};
use crate::normalize::{normalize_by_day, ExcludedDay};
use crate::peaks::find_peak_ranges;

/// Everything the engine derives from one dataset.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub excluded: Vec<ExcludedDay>,
    pub curve: ReferenceCurve,
    pub features: ShapeFeatures,
    pub classification: Classification,
    pub peak_ranges: Vec<PeakRange>,
}

/// A full run's outputs: ingest bookkeeping plus the analysis.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub ingest: IngestedData,
    pub analysis: Analysis,
}

/// Run the engine on already-loaded samples (the file-free entry point).
pub fn analyze_samples(
    samples: &[AugmentedSample],
    config: &AnalysisConfig,
) -> LcResult<Analysis> {
    config.validate().map_err(LcError::Config)?;

    let normalized = normalize_by_day(samples)?;
    let curve = build_reference_curve(&normalized, config.interval_minutes)?;
    let (features, classification) = classify_curve(&curve, config)?;
    let peak_ranges = find_peak_ranges(&curve, config.peak_threshold, config.gap_rule)?;

    info!(
        buckets = curve.len(),
        days = curve.days.len(),
        excluded = normalized.excluded.len(),
        label = classification.label.display_name(),
        "analysis complete"
    );

    Ok(Analysis {
        excluded: normalized.excluded,
        curve,
        features,
        classification,
        peak_ranges,
    })
}

/// Load a CSV and run the engine on it.
pub fn run_analysis(path: &Path, config: &AnalysisConfig) -> LcResult<RunOutput> {
    let ingest = load_samples(path, config)?;
    let analysis = analyze_samples(&ingest.samples, config)?;
    Ok(RunOutput { ingest, analysis })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sample::{generate_samples, SampleSpec};
    use crate::domain::{Bucket, GapRule, LoadClass};
    use crate::estimate::{estimate_from_means, estimate_with_interval};
    use crate::io::ingest::read_samples;
    use crate::peaks::find_peak_ranges;

    fn bucket(s: &str) -> Bucket {
        s.parse().unwrap()
    }

    #[test]
    fn two_day_dataset_normalizes_the_shared_peak_to_one() {
        // Day 1 totals [10, 20, 10] peaking at 01:00; day 2 [5, 10, 5].
        let csv = "\
Starttime,I1Avg,I2Avg,I3Avg,U1Avg,U2Avg,U3Avg
2024-03-04 00:00:00,10,0,0,230,230,230
2024-03-04 01:00:00,20,0,0,230,230,230
2024-03-04 02:00:00,10,0,0,230,230,230
2024-03-05 00:00:00,5,0,0,230,230,230
2024-03-05 01:00:00,10,0,0,230,230,230
2024-03-05 02:00:00,5,0,0,230,230,230
";
        let config = AnalysisConfig::default();
        let ingest = read_samples(csv.as_bytes(), &config).unwrap();
        let analysis = analyze_samples(&ingest.samples, &config).unwrap();

        let curve = &analysis.curve;
        assert_eq!(curve.mean_at(bucket("01:00")), Some(1.0));
        assert_eq!(curve.mean_at(bucket("00:00")), Some(0.5));
        assert_eq!(curve.len(), 3);

        // With theta = 1.0 only the shared peak bucket qualifies.
        let ranges = find_peak_ranges(curve, 1.0, GapRule::Lenient).unwrap();
        assert_eq!(ranges.len(), 1);
        assert_eq!(ranges[0].label(), "01:00-01:00");

        // Same-bucket estimation returns the reading unchanged.
        let est =
            estimate_with_interval(curve, bucket("01:00"), 250.0, bucket("01:00"), 0.95).unwrap();
        assert_eq!(est.point, 250.0);
        assert_eq!(est.n_days, 2);

        // Mean-ratio fallback follows the known ratio formula:
        // 100 A at ratio 0.5 -> 200 A peak -> 200 A * 1.0 at the peak bucket.
        let quick = estimate_from_means(curve, bucket("00:00"), 100.0, bucket("01:00")).unwrap();
        assert!((quick.point - 200.0).abs() < 1e-9);
    }

    #[test]
    fn synthetic_profiles_round_trip_to_their_label() {
        for profile in [
            LoadClass::Residential,
            LoadClass::Commercial,
            LoadClass::Industrial,
        ] {
            let spec = SampleSpec {
                profile,
                ..SampleSpec::default()
            };
            let samples = generate_samples(&spec).unwrap();
            let analysis = analyze_samples(&samples, &AnalysisConfig::default()).unwrap();
            assert_eq!(
                analysis.classification.label, profile,
                "profile {:?} misclassified as {:?}",
                profile, analysis.classification.label
            );
        }
    }

    #[test]
    fn estimator_tracks_the_synthetic_shape() {
        let spec = SampleSpec {
            profile: LoadClass::Commercial,
            noise: 0.01,
            ..SampleSpec::default()
        };
        let samples = generate_samples(&spec).unwrap();
        let analysis = analyze_samples(&samples, &AnalysisConfig::default()).unwrap();
        let curve = &analysis.curve;

        let known = bucket("13:00");
        let target = bucket("03:00");
        let est = estimate_with_interval(curve, known, 300.0, target, 0.95).unwrap();

        // Interval brackets the point and stays tight at 1% noise.
        assert!(est.lower <= est.point && est.point <= est.upper);
        assert!(est.n_days == spec.days);

        // The point should sit near the curve-mean prediction.
        let quick = estimate_from_means(curve, known, 300.0, target).unwrap();
        let rel = ((est.point - quick.point) / quick.point).abs();
        assert!(rel < 0.05, "CI point {} vs mean point {}", est.point, quick.point);
    }

    #[test]
    fn degenerate_days_are_excluded_from_the_run() {
        let csv = "\
Starttime,I1Avg,I2Avg,I3Avg,U1Avg,U2Avg,U3Avg
2024-03-04 00:00:00,0,0,0,230,230,230
2024-03-04 01:00:00,0,0,0,230,230,230
2024-03-05 00:00:00,5,0,0,230,230,230
2024-03-05 01:00:00,10,0,0,230,230,230
";
        let config = AnalysisConfig::default();
        let ingest = read_samples(csv.as_bytes(), &config).unwrap();
        let analysis = analyze_samples(&ingest.samples, &config).unwrap();
        assert_eq!(analysis.excluded.len(), 1);
        assert_eq!(analysis.curve.days.len(), 1);
    }

    #[test]
    fn invalid_config_fails_before_touching_data() {
        let mut config = AnalysisConfig::default();
        config.peak_threshold = 2.0;
        let err = analyze_samples(&[], &config).unwrap_err();
        assert!(matches!(err, LcError::Config(_)));
    }
}
