//! Core pipeline and domain logic for trackalt.
//!
//! This crate ties the markup tree and the elevation client together:
//! trackpoint collection, altitude injection, output writing, and the
//! end-to-end [`pipeline::enrich`] workflow.

pub mod inject;
pub mod output;
pub mod pipeline;
pub mod trackpoints;

pub use pipeline::{EnrichConfig, EnrichResult, ProgressReporter, SilentProgress, enrich};
