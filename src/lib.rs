//! `jetuple` builds flat event ntuples from jet-analysis object
//! collections.
//!
//! For every input event, the registered object collections are run
//! through selection cuts and jet energy/mass correction lookups, the
//! per-collection variable schema is evaluated, and one row of
//! variable-length columns is appended to the output table.
//!
//! # How to use
//!
//! Assemble an [Ntupler](tabulate::Ntupler) from a reader, the extraction
//! plans, a corrector bank and a tabulation sink, then call
//! [run](tabulate::Ntupler::run). The `jetuple` binary does exactly this.
//!
//! ## Most relevant modules
//!
//! - [prelude] exports a list of the most relevant classes and objects
//! - [tabulate] contains the pipeline driver and lists the steps that are
//!   performed per event
//! - [schema] declares which collections and variables exist
//! - [extract] computes the per-object variables
//! - [sink] owns the accumulation buffers and commits rows
//! - [correction] wraps the external correction lookups
//! - [reader] and [writer] for event input and table output
//!

/// Output compression
pub mod compression;
/// Run configuration
pub mod config;
/// Jet energy and mass correction lookups
pub mod correction;
/// Per-event input records
pub mod event;
/// Per-collection variable extraction
pub mod extract;
/// Four-vector class
pub mod four_vector;
/// Physics objects and vertices
pub mod object;
/// Most important exports
pub mod prelude;
/// Event readers
pub mod reader;
/// Collection and variable schemas
pub mod schema;
/// Accumulation buffers and row commits
pub mod sink;
/// The tabulation pipeline
pub mod tabulate;
/// Common traits
pub mod traits;
/// Table row writers
pub mod writer;

mod parsing;

use lazy_static::lazy_static;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
lazy_static! {
    pub static ref VERSION_MAJOR: u32 =
        env!("CARGO_PKG_VERSION_MAJOR").parse().unwrap();
    pub static ref VERSION_MINOR: u32 =
        env!("CARGO_PKG_VERSION_MINOR").parse().unwrap();
    pub static ref VERSION_PATCH: u32 =
        env!("CARGO_PKG_VERSION_PATCH").parse().unwrap();
}
pub const GIT_REV: Option<&str> = option_env!("VERGEN_GIT_SHA");
pub const GIT_BRANCH: Option<&str> = option_env!("VERGEN_GIT_BRANCH");
