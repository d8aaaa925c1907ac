//! Shape features and rule-based load classification.
//!
//! Feature extraction reduces the reference curve to a handful of scalars
//! (load factor, dispersion, band ratios); classification applies threshold
//! rules in a fixed priority order with a score-based tie-break. Identical
//! curves always produce identical labels.

use crate::domain::{
    AnalysisConfig, BandFeature, ClassScores, Classification, ClassifierThresholds, LoadClass,
    ReferenceCurve, ShapeFeatures, ThresholdMode, TimeBands,
};
use crate::error::{LcError, LcResult};
use crate::math::stats;

/// Extract scalar shape features from the curve means.
pub fn shape_features(curve: &ReferenceCurve, bands: &TimeBands) -> LcResult<ShapeFeatures> {
    let mean_all = stats::mean(&curve.mean)
        .ok_or_else(|| LcError::DegenerateDay("empty reference curve".to_string()))?;
    let (peak_bucket, max_val) = curve
        .peak()
        .ok_or_else(|| LcError::DegenerateDay("empty reference curve".to_string()))?;
    if max_val <= 0.0 {
        return Err(LcError::DegenerateDay("reference curve is all zero".to_string()));
    }

    let std_shape = stats::population_std(&curve.mean)
        .ok_or_else(|| LcError::DegenerateDay("empty reference curve".to_string()))?;

    let band_features = bands
        .all()
        .into_iter()
        .map(|(name, span)| {
            let values: Vec<f64> = curve
                .buckets
                .iter()
                .zip(&curve.mean)
                .filter(|(b, _)| span.contains(**b))
                .map(|(_, &v)| v)
                .collect();
            let mean = stats::mean(&values);
            BandFeature {
                name,
                mean,
                ratio: mean.map(|m| m / mean_all),
            }
        })
        .collect();

    Ok(ShapeFeatures {
        mean_all,
        max_val,
        peak_bucket,
        load_factor: mean_all / max_val,
        std_shape,
        bands: band_features,
    })
}

/// Derive thresholds from the curve's own bucket-mean distribution.
///
/// q25/q50/q75 replace the fixed literals: "low band" cutoffs become
/// q25/mean, "elevated band" cutoffs become q75/mean, the industrial
/// load-factor floor becomes q75/max, the other load-factor bounds become
/// q50/max, and the flatness cap becomes IQR/1.349 (the robust normal-std
/// proxy). Peak-hour clock windows are not distribution quantities and stay
/// fixed.
pub fn percentile_thresholds(curve: &ReferenceCurve) -> LcResult<ClassifierThresholds> {
    let mean_all = stats::mean(&curve.mean)
        .ok_or_else(|| LcError::DegenerateDay("empty reference curve".to_string()))?;
    let (_, max_val) = curve
        .peak()
        .ok_or_else(|| LcError::DegenerateDay("empty reference curve".to_string()))?;
    if mean_all <= 0.0 || max_val <= 0.0 {
        return Err(LcError::DegenerateDay("reference curve is all zero".to_string()));
    }

    let q = |p: f64| stats::quantile(&curve.mean, p).expect("non-empty curve");
    let (q25, q50, q75) = (q(0.25), q(0.50), q(0.75));

    let low = q25 / mean_all;
    let high = q75 / mean_all;

    let defaults = ClassifierThresholds::default();
    Ok(ClassifierThresholds {
        industrial_load_factor_min: q75 / max_val,
        industrial_early_morning_min: low,
        industrial_std_max: (q75 - q25) / 1.349,

        commercial_peak_hours: defaults.commercial_peak_hours,
        commercial_business_ratio_min: high,
        commercial_early_morning_max: low,
        commercial_load_factor_min: q50 / max_val,

        residential_peak_hours: defaults.residential_peak_hours,
        residential_evening_ratio_min: high,
        residential_early_morning_max: low,
        residential_load_factor_max: q50 / max_val,
    })
}

/// Resolve the thresholds the configuration asks for.
pub fn resolve_thresholds(
    curve: &ReferenceCurve,
    config: &AnalysisConfig,
) -> LcResult<ClassifierThresholds> {
    match config.threshold_mode {
        ThresholdMode::Fixed => Ok(config.thresholds.clone()),
        ThresholdMode::Percentile => percentile_thresholds(curve),
    }
}

/// Apply the priority rules, falling back to the scores when none matches.
pub fn classify(features: &ShapeFeatures, thresholds: &ClassifierThresholds) -> Classification {
    use crate::domain::BandName::{Business, EarlyMorning, Evening};

    let early = features.band_ratio_or_zero(EarlyMorning);
    let business = features.band_ratio_or_zero(Business);
    let evening = features.band_ratio_or_zero(Evening);
    let peak_hour = features.peak_bucket.hour();

    let scores = ClassScores {
        residential: evening - early,
        commercial: business - early,
        industrial: features.load_factor - features.std_shape,
    };

    let in_window = |(lo, hi): (u8, u8)| peak_hour >= lo && peak_hour <= hi;

    // Priority order is fixed; first match wins.
    let matched_rule = if features.load_factor >= thresholds.industrial_load_factor_min
        && early >= thresholds.industrial_early_morning_min
        && features.std_shape <= thresholds.industrial_std_max
    {
        Some(LoadClass::Industrial)
    } else if in_window(thresholds.commercial_peak_hours)
        && business >= thresholds.commercial_business_ratio_min
        && early <= thresholds.commercial_early_morning_max
        && features.load_factor >= thresholds.commercial_load_factor_min
    {
        Some(LoadClass::Commercial)
    } else if in_window(thresholds.residential_peak_hours)
        && evening >= thresholds.residential_evening_ratio_min
        && early <= thresholds.residential_early_morning_max
        && features.load_factor <= thresholds.residential_load_factor_max
    {
        Some(LoadClass::Residential)
    } else {
        None
    };

    Classification {
        label: matched_rule.unwrap_or_else(|| scores.best()),
        matched_rule,
        scores,
    }
}

/// Features + classification in one call, honoring the threshold mode.
pub fn classify_curve(
    curve: &ReferenceCurve,
    config: &AnalysisConfig,
) -> LcResult<(ShapeFeatures, Classification)> {
    let features = shape_features(curve, &config.bands)?;
    let thresholds = resolve_thresholds(curve, config)?;
    let classification = classify(&features, &thresholds);
    Ok((features, classification))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Bucket, MINUTES_PER_DAY};

    /// Full-day curve at a 10-minute interval from a shape function over
    /// minutes-since-midnight.
    fn curve_from_shape(shape: impl Fn(u16) -> f64) -> ReferenceCurve {
        let mut buckets = Vec::new();
        let mut mean = Vec::new();
        let mut m = 0u16;
        while m < MINUTES_PER_DAY {
            buckets.push(Bucket::from_minutes(m).unwrap());
            mean.push(shape(m));
            m += 10;
        }
        ReferenceCurve::from_means(10, buckets, mean)
    }

    #[test]
    fn flat_curve_classifies_industrial_by_rule() {
        let curve = curve_from_shape(|_| 0.95);
        let features = shape_features(&curve, &TimeBands::default()).unwrap();
        assert!((features.load_factor - 1.0).abs() < 1e-12);
        assert!(features.std_shape < 1e-12);

        let c = classify(&features, &ClassifierThresholds::default());
        assert_eq!(c.label, LoadClass::Industrial);
        assert_eq!(c.matched_rule, Some(LoadClass::Industrial));
    }

    #[test]
    fn business_plateau_classifies_commercial() {
        // Moderate overnight base, high 09:00–17:59 plateau peaking at noon.
        let curve = curve_from_shape(|m| {
            let h = m / 60;
            if (9..18).contains(&h) {
                if h == 12 { 1.0 } else { 0.95 }
            } else {
                0.4
            }
        });
        let (features, c) = classify_curve(&curve, &AnalysisConfig::default()).unwrap();
        assert_eq!(features.peak_bucket.hour(), 12);
        assert_eq!(c.label, LoadClass::Commercial);
        assert_eq!(c.matched_rule, Some(LoadClass::Commercial));
    }

    #[test]
    fn evening_peak_classifies_residential() {
        // Quiet nights, modest daytime, strong 18:00–22:59 evening peak.
        let curve = curve_from_shape(|m| {
            let h = m / 60;
            match h {
                0..=5 => 0.2,
                18..=22 => {
                    if h == 20 { 1.0 } else { 0.9 }
                }
                _ => 0.45,
            }
        });
        let (features, c) = classify_curve(&curve, &AnalysisConfig::default()).unwrap();
        assert_eq!(features.peak_bucket.hour(), 20);
        assert_eq!(c.label, LoadClass::Residential);
        assert_eq!(c.matched_rule, Some(LoadClass::Residential));
    }

    #[test]
    fn classification_is_deterministic() {
        let curve = curve_from_shape(|m| 0.4 + 0.3 * ((m as f64) / 1440.0));
        let first = classify_curve(&curve, &AnalysisConfig::default()).unwrap().1;
        for _ in 0..3 {
            let again = classify_curve(&curve, &AnalysisConfig::default()).unwrap().1;
            assert_eq!(again.label, first.label);
        }
    }

    #[test]
    fn empty_band_is_scored_as_zero_not_a_crash() {
        // Curve restricted to business hours: the early-morning and evening
        // bands have no buckets at all.
        let mut buckets = Vec::new();
        let mut mean = Vec::new();
        for m in (9 * 60..18 * 60).step_by(10) {
            buckets.push(Bucket::from_minutes(m as u16).unwrap());
            mean.push(1.0);
        }
        let curve = ReferenceCurve::from_means(10, buckets, mean);

        let features = shape_features(&curve, &TimeBands::default()).unwrap();
        assert!(features.band_ratio(crate::domain::BandName::EarlyMorning).is_none());
        assert_eq!(features.band_ratio_or_zero(crate::domain::BandName::EarlyMorning), 0.0);

        // Flat business-only curve: no rule fires (business ratio is 1.0),
        // and the tie-break lands on Commercial over Industrial by score
        // order at equal scores.
        let c = classify(&features, &ClassifierThresholds::default());
        assert_eq!(c.matched_rule, None);
        assert_eq!(c.label, LoadClass::Commercial);
    }

    #[test]
    fn percentile_mode_derives_thresholds_from_the_curve() {
        let curve = curve_from_shape(|m| if m < 720 { 0.4 } else { 0.8 });
        let t = percentile_thresholds(&curve).unwrap();
        // q25 = 0.4, q75 = 0.8, mean = 0.6, max = 0.8.
        assert!((t.industrial_early_morning_min - 0.4 / 0.6).abs() < 1e-9);
        assert!((t.commercial_business_ratio_min - 0.8 / 0.6).abs() < 1e-9);
        assert!((t.industrial_load_factor_min - 1.0).abs() < 1e-9);
        assert!((t.industrial_std_max - 0.4 / 1.349).abs() < 1e-9);
    }
}
