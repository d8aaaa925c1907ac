//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during an analysis run
//! - exported to JSON/CSV
//! - reloaded later for summaries or comparisons

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// A fixed time-of-day slot, stored as minutes since midnight.
///
/// Buckets align samples from different calendar days for aggregation. The
/// bucket grid is defined by the configured sampling interval; raw timestamps
/// are floored onto it. Displays and parses as `"HH:MM"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Bucket(u16);

pub const MINUTES_PER_DAY: u16 = 24 * 60;

impl Bucket {
    pub fn from_minutes(minutes: u16) -> Option<Self> {
        (minutes < MINUTES_PER_DAY).then_some(Bucket(minutes))
    }

    /// Floor a wall-clock time onto the bucket grid for the given interval.
    pub fn from_time(time: NaiveTime, interval_minutes: u16) -> Self {
        let m = (time.hour() * 60 + time.minute()) as u16;
        let interval = interval_minutes.clamp(1, MINUTES_PER_DAY);
        Bucket(m - m % interval)
    }

    pub fn minutes(self) -> u16 {
        self.0
    }

    pub fn hour(self) -> u8 {
        (self.0 / 60) as u8
    }

    pub fn minute(self) -> u8 {
        (self.0 % 60) as u8
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl FromStr for Bucket {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (h, m) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| format!("Invalid time '{s}'. Expected HH:MM."))?;
        let h: u16 = h.parse().map_err(|_| format!("Invalid hour in '{s}'."))?;
        let m: u16 = m.parse().map_err(|_| format!("Invalid minute in '{s}'."))?;
        if h > 23 || m > 59 {
            return Err(format!("Time '{s}' out of range (00:00–23:59)."));
        }
        Ok(Bucket(h * 60 + m))
    }
}

/// One raw measurement row after derivation: timestamp plus per-phase
/// channels and the derived fields the engine works with.
#[derive(Debug, Clone)]
pub struct AugmentedSample {
    pub timestamp: NaiveDateTime,
    pub date: NaiveDate,
    pub bucket: Bucket,

    pub currents: [f64; 3],
    pub voltages: [f64; 3],

    /// Sum of the three phase currents.
    pub total_current: f64,
    /// `total_current / 3`.
    pub avg_current: f64,
    /// Mean of the three phase voltages.
    pub avg_voltage: f64,
}

impl AugmentedSample {
    /// Derive all computed fields from a raw row. Pure; no validation beyond
    /// what the caller already performed.
    pub fn derive(
        timestamp: NaiveDateTime,
        currents: [f64; 3],
        voltages: [f64; 3],
        interval_minutes: u16,
    ) -> Self {
        let total_current = currents.iter().sum();
        AugmentedSample {
            timestamp,
            date: timestamp.date(),
            bucket: Bucket::from_time(timestamp.time(), interval_minutes),
            currents,
            voltages,
            total_current,
            avg_current: total_current / 3.0,
            avg_voltage: voltages.iter().sum::<f64>() / 3.0,
        }
    }
}

/// An `AugmentedSample` plus its day-relative load ratio.
///
/// Invariant: the sample carrying its day's maximum total current has ratio
/// exactly 1.0; every other same-day ratio lies in [0, 1].
#[derive(Debug, Clone)]
pub struct NormalizedSample {
    pub sample: AugmentedSample,
    pub ratio: f64,
}

/// The canonical daily load shape: per-bucket across-day mean ratios, plus
/// the per-day ratio matrix the estimator needs.
///
/// Buckets are strictly chronological (00:00 first). Buckets no day
/// contributed to are omitted, never zero-filled. The curve is rebuilt whole
/// whenever the underlying dataset changes.
#[derive(Debug, Clone)]
pub struct ReferenceCurve {
    pub interval_minutes: u16,

    /// Chronological bucket grid actually observed.
    pub buckets: Vec<Bucket>,
    /// Across-day mean ratio per bucket, parallel to `buckets`.
    pub mean: Vec<f64>,

    /// Contributing calendar days, ordered by date.
    pub days: Vec<NaiveDate>,
    /// `per_day[bucket_idx][day_idx]`: that day's mean ratio at that bucket,
    /// `None` where the day has no sample there. Empty when the curve was
    /// reloaded from a portable export (means only).
    pub per_day: Vec<Vec<Option<f64>>>,
}

impl ReferenceCurve {
    /// Build a means-only view (e.g. from a curve JSON). Estimation with a
    /// confidence interval is unavailable on such a curve; the mean-ratio
    /// fallback still works.
    pub fn from_means(interval_minutes: u16, buckets: Vec<Bucket>, mean: Vec<f64>) -> Self {
        ReferenceCurve {
            interval_minutes,
            buckets,
            mean,
            days: Vec::new(),
            per_day: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Index of a bucket on the chronological grid.
    pub fn index_of(&self, bucket: Bucket) -> Option<usize> {
        self.buckets.binary_search(&bucket).ok()
    }

    pub fn mean_at(&self, bucket: Bucket) -> Option<f64> {
        self.index_of(bucket).map(|i| self.mean[i])
    }

    /// Bucket attaining the curve maximum (first such bucket on ties).
    pub fn peak(&self) -> Option<(Bucket, f64)> {
        let mut best: Option<(Bucket, f64)> = None;
        for (b, &v) in self.buckets.iter().zip(&self.mean) {
            match best {
                Some((_, bv)) if v <= bv => {}
                _ => best = Some((*b, v)),
            }
        }
        best
    }
}

/// Point estimate with a two-sided confidence interval, from the per-day
/// ratio method.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Estimate {
    pub known_bucket: Bucket,
    pub target_bucket: Bucket,

    pub point: f64,
    pub lower: f64,
    pub upper: f64,

    /// Calendar days contributing a ratio at both buckets.
    pub n_days: usize,
    /// Two-sided confidence level, e.g. 0.95.
    pub confidence: f64,

    /// Day-peak current implied by the known reading and the reference
    /// curve: `known / mean_ratio(known_bucket)`.
    pub implied_peak_current: f64,
}

/// Point estimate from curve means only (no interval). The fallback mode for
/// callers that hold just the aggregated curve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuickEstimate {
    pub known_bucket: Bucket,
    pub target_bucket: Bucket,
    pub point: f64,
    pub implied_peak_current: f64,
}

/// Named time-of-day bands used for shape features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BandName {
    EarlyMorning,
    Morning,
    Business,
    Evening,
}

impl BandName {
    pub fn display_name(self) -> &'static str {
        match self {
            BandName::EarlyMorning => "early-morning",
            BandName::Morning => "morning",
            BandName::Business => "business",
            BandName::Evening => "evening",
        }
    }
}

/// Inclusive time-of-day span.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BandSpan {
    pub start: Bucket,
    pub end: Bucket,
}

impl BandSpan {
    pub fn contains(&self, bucket: Bucket) -> bool {
        self.start <= bucket && bucket <= self.end
    }
}

/// The fixed band set. Business deliberately overlaps morning and evening;
/// each band mean feeds its rules independently.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimeBands {
    pub early_morning: BandSpan,
    pub morning: BandSpan,
    pub business: BandSpan,
    pub evening: BandSpan,
}

impl Default for TimeBands {
    fn default() -> Self {
        let span = |a: u16, b: u16| BandSpan {
            start: Bucket::from_minutes(a).expect("band bound in range"),
            end: Bucket::from_minutes(b).expect("band bound in range"),
        };
        TimeBands {
            early_morning: span(0, 5 * 60 + 59),
            morning: span(6 * 60, 10 * 60 + 59),
            business: span(9 * 60, 17 * 60 + 59),
            evening: span(18 * 60, 22 * 60 + 59),
        }
    }
}

impl TimeBands {
    pub fn get(&self, name: BandName) -> BandSpan {
        match name {
            BandName::EarlyMorning => self.early_morning,
            BandName::Morning => self.morning,
            BandName::Business => self.business,
            BandName::Evening => self.evening,
        }
    }

    pub fn all(&self) -> [(BandName, BandSpan); 4] {
        [
            (BandName::EarlyMorning, self.early_morning),
            (BandName::Morning, self.morning),
            (BandName::Business, self.business),
            (BandName::Evening, self.evening),
        ]
    }
}

/// Mean and mean-relative ratio of the curve over one named band.
///
/// `None` when no bucket of the curve falls inside the band; downstream
/// scoring treats that as 0, never as a failure.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BandFeature {
    pub name: BandName,
    pub mean: Option<f64>,
    pub ratio: Option<f64>,
}

/// Scalar shape features derived from the reference curve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShapeFeatures {
    pub mean_all: f64,
    pub max_val: f64,
    pub peak_bucket: Bucket,
    /// `mean_all / max_val`; measures flatness.
    pub load_factor: f64,
    /// Population standard deviation of the curve.
    pub std_shape: f64,
    pub bands: Vec<BandFeature>,
}

impl ShapeFeatures {
    pub fn band_ratio(&self, name: BandName) -> Option<f64> {
        self.bands
            .iter()
            .find(|b| b.name == name)
            .and_then(|b| b.ratio)
    }

    pub fn band_ratio_or_zero(&self, name: BandName) -> f64 {
        self.band_ratio(name).unwrap_or(0.0)
    }
}

/// The closed set of consumption-pattern labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LoadClass {
    Residential,
    Commercial,
    Industrial,
}

impl LoadClass {
    pub fn display_name(self) -> &'static str {
        match self {
            LoadClass::Residential => "Residential",
            LoadClass::Commercial => "Commercial",
            LoadClass::Industrial => "Industrial",
        }
    }
}

/// Tie-break scores, kept for reporting.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ClassScores {
    pub residential: f64,
    pub commercial: f64,
    pub industrial: f64,
}

impl ClassScores {
    /// Highest score wins; ties resolve Residential, Commercial, Industrial.
    pub fn best(&self) -> LoadClass {
        let mut label = LoadClass::Residential;
        let mut best = self.residential;
        if self.commercial > best {
            label = LoadClass::Commercial;
            best = self.commercial;
        }
        if self.industrial > best {
            label = LoadClass::Industrial;
        }
        label
    }
}

/// Classifier output: the label plus how it was reached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    pub label: LoadClass,
    /// Which priority rule fired, or `None` when the tie-break decided.
    pub matched_rule: Option<LoadClass>,
    pub scores: ClassScores,
}

/// How classifier thresholds are obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThresholdMode {
    /// The fixed literal thresholds below.
    #[default]
    Fixed,
    /// Thresholds derived from the curve's own q25/q50/q75 distribution.
    Percentile,
}

/// All classification thresholds in one place. Values are configuration, not
/// constants: nothing downstream hardcodes them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierThresholds {
    pub industrial_load_factor_min: f64,
    pub industrial_early_morning_min: f64,
    pub industrial_std_max: f64,

    /// Inclusive peak-hour window for the commercial rule.
    pub commercial_peak_hours: (u8, u8),
    pub commercial_business_ratio_min: f64,
    pub commercial_early_morning_max: f64,
    pub commercial_load_factor_min: f64,

    /// Inclusive peak-hour window for the residential rule.
    pub residential_peak_hours: (u8, u8),
    pub residential_evening_ratio_min: f64,
    pub residential_early_morning_max: f64,
    pub residential_load_factor_max: f64,
}

impl Default for ClassifierThresholds {
    fn default() -> Self {
        ClassifierThresholds {
            industrial_load_factor_min: 0.80,
            industrial_early_morning_min: 0.75,
            industrial_std_max: 0.12,

            commercial_peak_hours: (9, 17),
            commercial_business_ratio_min: 1.10,
            commercial_early_morning_max: 0.70,
            commercial_load_factor_min: 0.60,

            residential_peak_hours: (18, 22),
            residential_evening_ratio_min: 1.15,
            residential_early_morning_max: 0.65,
            residential_load_factor_max: 0.70,
        }
    }
}

/// How peak-range merging treats gaps between selected buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GapRule {
    /// Buckets are contiguous when the gap is at most one sampling interval.
    #[default]
    Lenient,
    /// Historical behavior: the gap must equal exactly one interval, so a
    /// single missing bucket splits the range.
    Strict,
}

/// A contiguous span of buckets above the peak threshold, inclusive.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PeakRange {
    pub start: Bucket,
    pub end: Bucket,
}

impl PeakRange {
    pub fn label(&self) -> String {
        format!("{}-{}", self.start, self.end)
    }
}

/// Mapping from canonical fields to input column names. Resolution against
/// the header row is case-insensitive.
#[derive(Debug, Clone)]
pub struct ColumnMap {
    pub timestamp: String,
    pub currents: [String; 3],
    pub voltages: [String; 3],
}

impl Default for ColumnMap {
    fn default() -> Self {
        ColumnMap {
            timestamp: "Starttime".to_string(),
            currents: ["I1Avg".into(), "I2Avg".into(), "I3Avg".into()],
            voltages: ["U1Avg".into(), "U2Avg".into(), "U3Avg".into()],
        }
    }
}

/// A full run's configuration as understood by the pipeline.
///
/// Derived from CLI flags (plus defaults); passed explicitly everywhere, no
/// ambient state.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub columns: ColumnMap,
    /// Bucket resolution; must match the data's sampling interval.
    pub interval_minutes: u16,

    /// Relative peak threshold θ in (0, 1].
    pub peak_threshold: f64,
    pub gap_rule: GapRule,

    pub bands: TimeBands,
    pub threshold_mode: ThresholdMode,
    pub thresholds: ClassifierThresholds,

    /// Two-sided confidence level for the estimator.
    pub confidence: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            columns: ColumnMap::default(),
            interval_minutes: 10,
            peak_threshold: 0.90,
            gap_rule: GapRule::default(),
            bands: TimeBands::default(),
            threshold_mode: ThresholdMode::default(),
            thresholds: ClassifierThresholds::default(),
            confidence: 0.95,
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.interval_minutes == 0 || self.interval_minutes > MINUTES_PER_DAY {
            return Err(format!(
                "Sampling interval must be in 1..={MINUTES_PER_DAY} minutes, got {}.",
                self.interval_minutes
            ));
        }
        if MINUTES_PER_DAY % self.interval_minutes != 0 {
            return Err(format!(
                "Sampling interval must divide a day evenly, got {} minutes.",
                self.interval_minutes
            ));
        }
        if !(self.peak_threshold > 0.0 && self.peak_threshold <= 1.0) {
            return Err(format!(
                "Peak threshold must be in (0, 1], got {}.",
                self.peak_threshold
            ));
        }
        if !(self.confidence > 0.0 && self.confidence < 1.0) {
            return Err(format!(
                "Confidence level must be in (0, 1), got {}.",
                self.confidence
            ));
        }
        Ok(())
    }
}

/// A saved curve file (JSON): the portable representation of a reference
/// curve. Means only; the per-day matrix stays with the raw dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurveFile {
    pub tool: String,
    pub interval_minutes: u16,
    pub days: Vec<NaiveDate>,
    pub grid: CurveGrid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurveGrid {
    /// Bucket labels, `"HH:MM"`, chronological.
    pub time: Vec<String>,
    pub mean: Vec<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_parses_and_displays_hh_mm() {
        let b: Bucket = "19:30".parse().unwrap();
        assert_eq!(b.minutes(), 19 * 60 + 30);
        assert_eq!(b.to_string(), "19:30");
        assert!("24:00".parse::<Bucket>().is_err());
        assert!("9h30".parse::<Bucket>().is_err());
    }

    #[test]
    fn bucket_floors_onto_the_interval_grid() {
        let t = NaiveTime::from_hms_opt(14, 37, 12).unwrap();
        assert_eq!(Bucket::from_time(t, 10).to_string(), "14:30");
        assert_eq!(Bucket::from_time(t, 15).to_string(), "14:30");
        assert_eq!(Bucket::from_time(t, 1).to_string(), "14:37");
    }

    #[test]
    fn derive_computes_totals_and_averages() {
        let ts = NaiveDate::from_ymd_opt(2024, 3, 4)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        let s = AugmentedSample::derive(ts, [10.0, 20.0, 30.0], [230.0, 231.0, 232.0], 10);
        assert_eq!(s.total_current, 60.0);
        assert_eq!(s.avg_current, 20.0);
        assert!((s.avg_voltage - 231.0).abs() < 1e-12);
        assert_eq!(s.bucket.to_string(), "10:00");
        assert_eq!(s.date, NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());
    }

    #[test]
    fn curve_peak_returns_first_bucket_on_ties() {
        let buckets: Vec<Bucket> = [540u16, 550, 560]
            .iter()
            .map(|&m| Bucket::from_minutes(m).unwrap())
            .collect();
        let curve = ReferenceCurve::from_means(10, buckets.clone(), vec![1.0, 0.5, 1.0]);
        let (b, v) = curve.peak().unwrap();
        assert_eq!(b, buckets[0]);
        assert_eq!(v, 1.0);
    }

    #[test]
    fn scores_tie_break_order_is_fixed() {
        let scores = ClassScores {
            residential: 0.5,
            commercial: 0.5,
            industrial: 0.5,
        };
        assert_eq!(scores.best(), LoadClass::Residential);
        let scores = ClassScores {
            residential: 0.1,
            commercial: 0.4,
            industrial: 0.4,
        };
        assert_eq!(scores.best(), LoadClass::Commercial);
    }

    #[test]
    fn config_validation_rejects_bad_values() {
        let mut config = AnalysisConfig::default();
        assert!(config.validate().is_ok());
        config.interval_minutes = 7;
        assert!(config.validate().is_err());
        config.interval_minutes = 10;
        config.peak_threshold = 0.0;
        assert!(config.validate().is_err());
        config.peak_threshold = 1.0;
        config.confidence = 1.0;
        assert!(config.validate().is_err());
    }
}
