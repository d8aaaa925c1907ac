//! `load-curves` library crate.
//!
//! The binary (`lc`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the engine is reusable from other front-ends (service, notebook, GUI)
//! - code stays easy to navigate as the project grows
//!
//! Engine data flow: `io::ingest` -> `normalize` -> `aggregate` ->
//! {`estimate`, `peaks`, `classify`}. Every engine stage is a pure function
//! over immutable inputs; all state lives in the structs flowing between
//! them.

pub mod aggregate;
pub mod app;
pub mod classify;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod estimate;
pub mod io;
pub mod math;
pub mod normalize;
pub mod peaks;
pub mod report;
