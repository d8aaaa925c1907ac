//! Crate-wide error type.
//!
//! Every failure the engine can produce maps to one variant so the caller can
//! distinguish user-input problems from data problems, and to one process
//! exit code for the `lc` binary:
//!
//! - `2` — bad input or configuration (schema, unknown bucket, flags, I/O)
//! - `3` — data is structurally fine but too thin/degenerate to analyze
//! - `4` — internal invariant violation (should not happen)

use thiserror::Error;

use crate::domain::Bucket;

/// Convenience alias used throughout the crate.
pub type LcResult<T> = Result<T, LcError>;

#[derive(Debug, Error)]
pub enum LcError {
    /// Required input columns are missing or the table is malformed.
    #[error("schema error: {0}")]
    Schema(String),

    /// A day (or the whole dataset) has no usable peak current to normalize
    /// by. Single days are excluded and warned about upstream; this surfaces
    /// as an error only when nothing usable remains.
    #[error("degenerate data: {0}")]
    DegenerateDay(String),

    /// A requested time-of-day is not present on the reference curve.
    #[error("time {0} is not on the reference curve")]
    UnknownBucket(Bucket),

    /// Too few contributing days for a confidence interval.
    #[error("need at least {needed} contributing days for a confidence interval, found {got}")]
    InsufficientSamples { needed: usize, got: usize },

    /// Invalid flag/threshold/configuration value.
    #[error("configuration error: {0}")]
    Config(String),

    /// File access failure, with the path baked into the context.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Malformed curve JSON.
    #[error("invalid curve JSON: {0}")]
    CurveFile(String),

    /// Internal invariant violation.
    #[error("internal error: {0}")]
    Internal(String),
}

impl LcError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        LcError::Io {
            context: context.into(),
            source,
        }
    }

    /// Process exit code for the `lc` binary.
    pub fn exit_code(&self) -> u8 {
        match self {
            LcError::Schema(_)
            | LcError::UnknownBucket(_)
            | LcError::Config(_)
            | LcError::Io { .. }
            | LcError::CurveFile(_) => 2,
            LcError::DegenerateDay(_) | LcError::InsufficientSamples { .. } => 3,
            LcError::Internal(_) => 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_group_by_failure_class() {
        assert_eq!(LcError::Schema("x".into()).exit_code(), 2);
        assert_eq!(
            LcError::InsufficientSamples { needed: 2, got: 1 }.exit_code(),
            3
        );
        assert_eq!(LcError::Internal("x".into()).exit_code(), 4);
    }

    #[test]
    fn unknown_bucket_message_names_the_time() {
        let b = Bucket::from_minutes(19 * 60).unwrap();
        assert!(LcError::UnknownBucket(b).to_string().contains("19:00"));
    }
}
