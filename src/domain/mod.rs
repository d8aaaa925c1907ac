//! Domain model for substation load-shape analysis.
//!
//! Everything here is a read-only projection of the raw dataset: loaded,
//! derived, discarded with the run. Nothing is mutated after construction.

mod types;

pub use types::*;
