//! Elevation lookup client.
//!
//! This crate provides:
//! - [`ElevationClient`]: sequential batched lookups with retry and backoff
//! - [`batch`]: batch partitioning, request encoding and rounding helpers

pub mod batch;
pub mod client;

pub use batch::{backoff_delay, batch_ranges, locations_param, round_elevation};
pub use client::ElevationClient;
