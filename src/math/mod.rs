//! Mathematical utilities: statistical primitives and the Student-t
//! distribution.
//!
//! Kept as separate modules (no glob re-export): both expose a `quantile`.

pub mod stats;
pub mod student_t;
