//! Synthetic substation dataset generation.
//!
//! Produces deterministic, seeded multi-day measurement tables shaped like a
//! residential, commercial, or industrial substation, so the pipeline can be
//! exercised without a real SCADA export. Also used by the end-to-end tests.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{AugmentedSample, LoadClass, MINUTES_PER_DAY};
use crate::error::{LcError, LcResult};

/// Parameters for a synthetic dataset.
#[derive(Debug, Clone)]
pub struct SampleSpec {
    pub profile: LoadClass,
    pub days: usize,
    pub interval_minutes: u16,
    pub start_date: NaiveDate,
    /// Nominal per-phase current at the daily peak, in amperes.
    pub base_current: f64,
    /// Relative per-sample noise (standard deviation of a multiplicative
    /// factor), e.g. 0.02 for 2%.
    pub noise: f64,
    pub seed: u64,
}

impl Default for SampleSpec {
    fn default() -> Self {
        SampleSpec {
            profile: LoadClass::Residential,
            days: 14,
            interval_minutes: 10,
            start_date: NaiveDate::from_ymd_opt(2024, 3, 4).expect("valid date"),
            base_current: 120.0,
            noise: 0.02,
            seed: 42,
        }
    }
}

/// One generated raw row, matching the default input schema.
#[derive(Debug, Clone)]
pub struct SampleRow {
    pub timestamp: NaiveDateTime,
    pub currents: [f64; 3],
    pub voltages: [f64; 3],
}

/// Generate the raw rows for a spec. Same spec, same output.
pub fn generate_rows(spec: &SampleSpec) -> LcResult<Vec<SampleRow>> {
    validate(spec)?;

    let mut rng = StdRng::seed_from_u64(spec.seed);
    let noise = Normal::new(0.0, 1.0)
        .map_err(|e| LcError::Internal(format!("noise distribution: {e}")))?;
    let volt_noise = Normal::new(0.0, 1.5)
        .map_err(|e| LcError::Internal(format!("voltage distribution: {e}")))?;

    let buckets_per_day = (MINUTES_PER_DAY / spec.interval_minutes) as usize;
    let mut rows = Vec::with_capacity(spec.days * buckets_per_day);

    for day in 0..spec.days {
        let date = spec.start_date + Duration::days(day as i64);
        // Day-to-day level drift; normalization removes it from the curve,
        // which is exactly what the pipeline is supposed to demonstrate.
        let day_scale: f64 = 1.0 + 0.10 * noise.sample(&mut rng);
        let day_scale = day_scale.max(0.5);

        for step in 0..buckets_per_day {
            let minute = step as u16 * spec.interval_minutes;
            let timestamp = date
                .and_hms_opt(u32::from(minute / 60), u32::from(minute % 60), 0)
                .expect("minute within day");

            let shape = profile_shape(spec.profile, minute);
            let factor = (1.0 + spec.noise * noise.sample(&mut rng)).max(0.0);
            let total = 3.0 * spec.base_current * shape * day_scale * factor;

            // Mild fixed phase imbalance, as real feeders show.
            let shares = [0.35, 0.33, 0.32];
            let currents = [
                total * shares[0],
                total * shares[1],
                total * shares[2],
            ];
            let voltages = [
                230.0 + volt_noise.sample(&mut rng),
                230.0 + volt_noise.sample(&mut rng),
                230.0 + volt_noise.sample(&mut rng),
            ];

            rows.push(SampleRow {
                timestamp,
                currents,
                voltages,
            });
        }
    }

    Ok(rows)
}

/// Generate rows already derived into `AugmentedSample`s (the file-free
/// entry point used by tests).
pub fn generate_samples(spec: &SampleSpec) -> LcResult<Vec<AugmentedSample>> {
    Ok(generate_rows(spec)?
        .into_iter()
        .map(|r| AugmentedSample::derive(r.timestamp, r.currents, r.voltages, spec.interval_minutes))
        .collect())
}

/// Write a generated dataset as CSV under the default column names.
pub fn write_sample_csv(path: &Path, spec: &SampleSpec) -> LcResult<()> {
    let rows = generate_rows(spec)?;
    let mut file = File::create(path)
        .map_err(|e| LcError::io(format!("Failed to create sample CSV '{}'", path.display()), e))?;

    writeln!(file, "Starttime,I1Avg,I2Avg,I3Avg,U1Avg,U2Avg,U3Avg")
        .map_err(|e| LcError::io("Failed to write sample CSV header".to_string(), e))?;
    for r in rows {
        writeln!(
            file,
            "{},{:.3},{:.3},{:.3},{:.2},{:.2},{:.2}",
            r.timestamp.format("%Y-%m-%d %H:%M:%S"),
            r.currents[0],
            r.currents[1],
            r.currents[2],
            r.voltages[0],
            r.voltages[1],
            r.voltages[2],
        )
        .map_err(|e| LcError::io("Failed to write sample CSV row".to_string(), e))?;
    }
    Ok(())
}

fn validate(spec: &SampleSpec) -> LcResult<()> {
    if spec.days == 0 {
        return Err(LcError::Config("Sample days must be > 0.".to_string()));
    }
    if spec.interval_minutes == 0 || MINUTES_PER_DAY % spec.interval_minutes != 0 {
        return Err(LcError::Config(format!(
            "Sample interval must divide a day evenly, got {} minutes.",
            spec.interval_minutes
        )));
    }
    if !(spec.base_current.is_finite() && spec.base_current > 0.0) {
        return Err(LcError::Config("Base current must be > 0.".to_string()));
    }
    if !(spec.noise.is_finite() && (0.0..0.5).contains(&spec.noise)) {
        return Err(LcError::Config("Noise must be in [0, 0.5).".to_string()));
    }
    Ok(())
}

/// Normalized daily load shape per profile, in (0, 1].
fn profile_shape(profile: LoadClass, minute: u16) -> f64 {
    let m = f64::from(minute);
    match profile {
        // Quiet nights, small morning bump, dominant evening peak at 20:30.
        LoadClass::Residential => {
            0.22 + 0.10 * gauss_bump(m, 7.5 * 60.0, 90.0) + 0.70 * gauss_bump(m, 20.5 * 60.0, 120.0)
        }
        // Business-hours plateau between ~09:00 and ~18:00.
        LoadClass::Commercial => {
            let rise = logistic((m - 9.0 * 60.0) / 30.0);
            let fall = logistic((18.0 * 60.0 - m) / 30.0);
            0.40 + 0.60 * rise * fall
        }
        // Continuous process load: high and nearly flat.
        LoadClass::Industrial => {
            0.92 + 0.03 * (2.0 * std::f64::consts::PI * m / f64::from(MINUTES_PER_DAY)).sin()
        }
    }
}

fn gauss_bump(x: f64, center: f64, sigma: f64) -> f64 {
    let z = (x - center) / sigma;
    (-0.5 * z * z).exp()
}

fn logistic(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}
